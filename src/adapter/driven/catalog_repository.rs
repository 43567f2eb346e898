use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::mysql_row::{column, parse_column};
use crate::domain::model::{Book, BookId};
use crate::domain::port::{CatalogRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::{MySql, Pool};

/// MySQL書籍カタログリポジトリ
pub struct MySqlCatalogRepository {
    pool: Pool<MySql>,
}

impl MySqlCatalogRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for MySqlCatalogRepository {
    async fn save(&self, book: &Book) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        sqlx::query(
            r#"
            INSERT INTO books (id, isbn, title, author)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                isbn = VALUES(isbn),
                title = VALUES(title),
                author = VALUES(author)
            "#,
        )
        .bind(book.id().to_string())
        .bind(book.isbn())
        .bind(book.title())
        .bind(book.author())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("書籍の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        // カテゴリは保存内容で置き換える
        sqlx::query("DELETE FROM book_categories WHERE book_id = ?")
            .bind(book.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("カテゴリの削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        for category in book.categories() {
            sqlx::query("INSERT INTO book_categories (book_id, name) VALUES (?, ?)")
                .bind(book.id().to_string())
                .bind(category)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::query("カテゴリの保存に失敗しました", e))
                .map_err(RepositoryError::from)?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query("SELECT id, isbn, title, author FROM books WHERE id = ?")
            .bind(book_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("書籍の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let category_rows =
            sqlx::query("SELECT name FROM book_categories WHERE book_id = ? ORDER BY name")
                .bind(book_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DatabaseError::query("カテゴリの取得に失敗しました", e))
                .map_err(RepositoryError::from)?;
        let categories = category_rows
            .iter()
            .map(|r| column(r, "name"))
            .collect::<Result<Vec<String>, _>>()?;

        let book = Book::new(
            parse_column(&row, "id", BookId::from_string)?,
            column(&row, "isbn")?,
            column(&row, "title")?,
            column(&row, "author")?,
            categories,
        )
        .map_err(|e| RepositoryError::FetchFailed(format!("書籍の再構築に失敗しました: {}", e)))?;

        Ok(Some(book))
    }

    fn next_identity(&self) -> BookId {
        BookId::new()
    }
}
