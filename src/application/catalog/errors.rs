use thiserror::Error;

use crate::domain::{Isbn, LoanId, MemberId};

/// 貸出カタログのエラー
///
/// すべてのエラーは、違反した事前条件の時点で、いかなる状態変更よりも
/// 先に返される。部分適用された変更が観測されることはない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// 蔵書が存在しない
    #[error("Book with ISBN {0} not found")]
    BookNotFound(Isbn),

    /// 会員が存在しない
    #[error("Member {0} not found")]
    MemberNotFound(MemberId),

    /// 在庫切れ
    #[error("No copies available for ISBN {0}")]
    NoCopiesAvailable(Isbn),

    /// 会員が貸出上限に達している
    #[error("Member {0} has reached max active loans")]
    LoanLimitReached(MemberId),

    /// 貸出IDが台帳に存在しない
    #[error("Invalid loan id {0}")]
    UnknownLoan(LoanId),
}

/// エラー種別 - プレゼンテーション層向けの3分類
///
/// 個別のバリアントは業務上の失敗をそのまま名指しし、こちらは
/// 外側での扱い（存在しない／今は無理／参照が不正）だけを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 参照された蔵書・会員が存在しない
    NotFound,
    /// 在庫切れ、または貸出上限
    Unavailable,
    /// 未知の貸出ID
    InvalidReference,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::BookNotFound(_) | CatalogError::MemberNotFound(_) => ErrorKind::NotFound,
            CatalogError::NoCopiesAvailable(_) | CatalogError::LoanLimitReached(_) => {
                ErrorKind::Unavailable
            }
            CatalogError::UnknownLoan(_) => ErrorKind::InvalidReference,
        }
    }
}

/// カタログ操作のResult型
pub type Result<T> = std::result::Result<T, CatalogError>;
