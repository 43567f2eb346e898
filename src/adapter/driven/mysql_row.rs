// MySQLの行からドメインの値を取り出す補助関数

use crate::domain::model::Money;
use crate::domain::port::RepositoryError;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Row};
use std::fmt::Display;

/// 列の値を取得する
pub(super) fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name).map_err(|e| {
        RepositoryError::FetchFailed(format!("列{}の取得に失敗しました: {}", name, e))
    })
}

/// 文字列の列を解析する
pub(super) fn parse_column<T, E, F>(
    row: &MySqlRow,
    name: &str,
    parse: F,
) -> Result<T, RepositoryError>
where
    E: Display,
    F: FnOnce(&str) -> Result<T, E>,
{
    let value: String = column(row, name)?;
    parse(&value).map_err(|e| {
        RepositoryError::FetchFailed(format!("列{}の解析に失敗しました: {}", name, e))
    })
}

/// 金額と通貨コードの列から金額を組み立てる
pub(super) fn money(
    row: &MySqlRow,
    amount_column: &str,
    currency_column: &str,
) -> Result<Money, RepositoryError> {
    let amount: Decimal = column(row, amount_column)?;
    let currency: String = column(row, currency_column)?;
    Money::new(amount, &currency)
        .map_err(|e| RepositoryError::FetchFailed(format!("金額の構築に失敗しました: {}", e)))
}

/// IN句のプレースホルダーを生成する（例: "?, ?, ?"）
pub(super) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
