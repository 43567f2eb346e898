// ドメイン層
// 集約、値オブジェクト、ドメインイベント、ポートを定義する

pub mod error;
pub mod event;
pub mod model;
pub mod port;
pub mod service;
