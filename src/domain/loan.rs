use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Isbn, LoanId, MemberId};

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// Loan集約の共通フィールド
///
/// 貸出中・返却済みの両状態で共有されるコアデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    // 識別子
    pub loan_id: LoanId,

    // 他の集約への参照（キーのみ。所有ではないため、蔵書の除籍後は
    // 宙に浮いた参照になり得る。それでも貸出記録自体は有効）
    pub isbn: Isbn,
    pub member_id: MemberId,

    // 貸出管理の責務
    pub issued_at: NaiveDate,
    pub due_date: NaiveDate,
}

/// 貸出中状態
///
/// ビジネスルール：
/// - 返却期限は貸出日に確定し、以後変わらない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for ActiveLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態
///
/// ビジネスルール：
/// - returned_atが必須（型で保証）
/// - 一度設定された返却日は変わらない（再返却は状態遷移にならない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub returned_at: NaiveDate,
}

impl std::ops::Deref for ReturnedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl ReturnedLoan {
    /// 延滞日数（期限内返却なら0）
    pub fn overdue_days(&self) -> i64 {
        (self.returned_at - self.due_date).num_days().max(0)
    }
}

/// Loan集約の統合型
///
/// 型安全な状態パターン：
/// - 貸出中→返却済みの一方向遷移のみ
/// - 返却済みからの再遷移は型レベルで存在しない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Loan {
    Active(ActiveLoan),
    Returned(ReturnedLoan),
}

impl Loan {
    pub fn loan_id(&self) -> LoanId {
        self.core().loan_id
    }

    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Active(active) => &active.core,
            Loan::Returned(returned) => &returned.core,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Loan::Active(_))
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：貸出を起票する
///
/// ビジネスルール：
/// - 返却期限 = 貸出日 + 貸出期間（日数）
/// - 貸出IDはここで採番される
///
/// 副作用なし。在庫・上限の事前条件チェックはサービス層の責務。
pub fn issue_loan(isbn: Isbn, member_id: MemberId, issued_at: NaiveDate, loan_days: i64) -> ActiveLoan {
    ActiveLoan {
        core: LoanCore {
            loan_id: LoanId::new(),
            isbn,
            member_id,
            issued_at,
            due_date: issued_at + Duration::days(loan_days),
        },
    }
}

/// 純粋関数：貸出を閉じる
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける
/// - 返却期限は変更しない（延滞料金の算定基準）
///
/// 副作用なし。ActiveLoanのみ受け付けるため「二重返却」は型レベルで
/// 起こり得ない。
pub fn close_loan(loan: ActiveLoan, returned_at: NaiveDate) -> ReturnedLoan {
    ReturnedLoan {
        core: loan.core,
        returned_at,
    }
}

/// 純粋関数：延滞判定
pub fn is_overdue(loan: &ActiveLoan, today: NaiveDate) -> bool {
    today > loan.due_date
}

impl std::fmt::Display for Loan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core();
        let returned = match self {
            Loan::Active(_) => "-".to_string(),
            Loan::Returned(r) => r.returned_at.to_string(),
        };
        write!(
            f,
            "Loan{{loanId='{}', isbn='{}', memberId={}, issue={}, due={}, return={}}}",
            core.loan_id, core.isbn, core.member_id, core.issued_at, core.due_date, returned
        )
    }
}
