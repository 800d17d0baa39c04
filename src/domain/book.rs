use serde::{Deserialize, Serialize};

use super::Isbn;

/// Book - 蔵書エンティティ
///
/// 不変条件：`0 <= available_copies <= total_copies`
///
/// 在庫数の増減は`checkout_copy`/`return_copy`のみが行い、
/// 両端で飽和させることで不変条件を型の外に漏らさない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    isbn: Isbn,
    title: String,
    author: String,
    total_copies: u32,
    available_copies: u32,
}

impl Book {
    /// 新規登録。登録時点では全冊が貸出可能。
    pub fn new(isbn: Isbn, title: impl Into<String>, author: impl Into<String>, total_copies: u32) -> Self {
        Self {
            isbn,
            title: title.into(),
            author: author.into(),
            total_copies,
            available_copies: total_copies,
        }
    }

    pub fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.available_copies
    }

    pub fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }

    /// 1冊を貸出に回す。在庫0では何もしない（下限で飽和）。
    ///
    /// 在庫確認はサービス層の事前条件チェックの責務。ここでの飽和は
    /// 不変条件の最後の砦であり、業務判断ではない。
    pub fn checkout_copy(&mut self) {
        if self.available_copies > 0 {
            self.available_copies -= 1;
        }
    }

    /// 1冊を在庫に戻す。全冊揃っている場合は何もしない（上限で飽和）。
    pub fn return_copy(&mut self) {
        if self.available_copies < self.total_copies {
            self.available_copies += 1;
        }
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} by {} | total: {}, available: {}",
            self.isbn, self.title, self.author, self.total_copies, self.available_copies
        )
    }
}
