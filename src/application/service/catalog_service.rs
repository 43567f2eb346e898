use crate::application::ApplicationError;
use crate::domain::model::{Book, BookId};
use crate::domain::port::CatalogRepository;
use std::sync::Arc;

/// 書籍カタログアプリケーションサービス
pub struct CatalogApplicationService {
    catalog_repository: Arc<dyn CatalogRepository>,
}

impl CatalogApplicationService {
    pub fn new(catalog_repository: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog_repository }
    }

    /// 書籍を登録
    ///
    /// # Returns
    /// * `Ok(Book)` - 登録された書籍
    /// * `Err(ApplicationError)` - タイトル・著者が空、または保存失敗
    #[tracing::instrument(name = "catalog.register_book", skip(self, categories), err)]
    pub async fn register_book(
        &self,
        isbn: String,
        title: String,
        author: String,
        categories: Vec<String>,
    ) -> Result<Book, ApplicationError> {
        let book = Book::new(
            self.catalog_repository.next_identity(),
            isbn,
            title,
            author,
            categories,
        )?;
        self.catalog_repository.save(&book).await?;

        tracing::info!(book_id = %book.id(), "registered book");
        Ok(book)
    }

    /// 書籍IDで書籍を取得
    pub async fn get_book(&self, book_id: BookId) -> Result<Book, ApplicationError> {
        self.catalog_repository
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("書籍", book_id))
    }
}
