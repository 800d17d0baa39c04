use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{LoanId, MemberId};

/// 会員1人あたりの貸出上限（登録時に固定）
pub const DEFAULT_MAX_BOOKS: usize = 3;

/// Member - 会員エンティティ
///
/// 不変条件：`active_loan_ids.len() <= max_books`
///
/// 貸出中IDの集合は貸出台帳の導出値だが、上限チェックを一回の参照で
/// 行うため会員側にも保持する。両者の一致はスナップショット復元時に
/// 検証される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    member_id: MemberId,
    name: String,
    max_books: usize,
    active_loan_ids: HashSet<LoanId>,
}

impl Member {
    /// 新規登録。貸出上限は既定値で固定される。
    pub fn new(member_id: MemberId, name: impl Into<String>) -> Self {
        Self {
            member_id,
            name: name.into(),
            max_books: DEFAULT_MAX_BOOKS,
            active_loan_ids: HashSet::new(),
        }
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_books(&self) -> usize {
        self.max_books
    }

    pub fn active_loan_ids(&self) -> &HashSet<LoanId> {
        &self.active_loan_ids
    }

    pub fn active_loan_count(&self) -> usize {
        self.active_loan_ids.len()
    }

    /// まだ上限に達していないか
    pub fn can_borrow(&self) -> bool {
        self.active_loan_ids.len() < self.max_books
    }

    /// 貸出IDを記録する。上限チェックはサービス層の事前条件の責務。
    pub fn record_loan(&mut self, loan_id: LoanId) {
        self.active_loan_ids.insert(loan_id);
    }

    /// 返却された貸出IDを消し込む。未登録のIDは何もしない。
    pub fn clear_loan(&mut self, loan_id: &LoanId) {
        self.active_loan_ids.remove(loan_id);
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Member{{id={}, name='{}', activeLoans={}}}",
            self.member_id,
            self.name,
            self.active_loan_ids.len()
        )
    }
}
