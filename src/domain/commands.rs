use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Isbn, LoanId, MemberId};

/// コマンド：書籍を貸し出す
///
/// 操作日はコマンドが運ぶ。呼び出し側（プレゼンテーション層）が
/// 当日の日付を詰めることで、コア側は時計を持たず決定的に動く。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBook {
    pub isbn: Isbn,
    pub member_id: MemberId,
    pub issued_at: NaiveDate,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
    pub returned_at: NaiveDate,
}
