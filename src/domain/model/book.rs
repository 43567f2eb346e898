use crate::domain::error::DomainError;
use crate::domain::model::BookId;

/// カタログ上の書籍
/// 出品の参照先であり、表示用にのみ使う
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    id: BookId,
    isbn: String,
    title: String,
    author: String,
    categories: Vec<String>,
}

impl Book {
    /// 新しい書籍を作成
    /// タイトルと著者は空にできない
    pub fn new(
        id: BookId,
        isbn: String,
        title: String,
        author: String,
        categories: Vec<String>,
    ) -> Result<Self, DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::InvalidValue(
                "タイトルは空にできません".to_string(),
            ));
        }
        if author.trim().is_empty() {
            return Err(DomainError::InvalidValue("著者は空にできません".to_string()));
        }

        let mut categories: Vec<String> = categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();

        Ok(Self {
            id,
            isbn,
            title,
            author,
            categories,
        })
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}
