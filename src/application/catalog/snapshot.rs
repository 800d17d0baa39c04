use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Book, Isbn, Loan, LoanId, Member, MemberId};

use super::catalog_service::{CatalogConfig, LendingCatalog};

/// 現行のスナップショット形式バージョン
///
/// 形式を変えるときはこの値を上げ、旧バージョンの読み込みは
/// 明示的な移行コードを書くまで拒否する。
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// CatalogSnapshot - カタログ全状態の永続化表現
///
/// メモリ内レイアウトから切り離した明示的なスキーマ。コレクションは
/// キー昇順のVecで持ち、同じ状態からは同じスナップショットが得られる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub schema_version: u32,
    pub config: CatalogConfig,
    pub books: Vec<Book>,
    pub members: Vec<Member>,
    pub loans: Vec<Loan>,
}

/// スナップショット復元のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotRestoreError {
    /// 未対応の形式バージョン
    #[error("Unsupported snapshot schema version {0} (expected {SNAPSHOT_SCHEMA_VERSION})")]
    UnsupportedVersion(u32),

    /// 会員の貸出中集合が貸出台帳と食い違っている
    #[error("Member {0}: active-loan set disagrees with the loan ledger")]
    InconsistentActiveLoans(MemberId),

    /// 貸出中集合に会員台帳にない会員が現れた
    #[error("Loan ledger references member {0} with active loans, but the member is unknown")]
    UnknownMemberInLedger(MemberId),
}

impl LendingCatalog {
    /// カタログ全状態をスナップショットに写し取る
    pub fn snapshot(&self) -> CatalogSnapshot {
        let mut books: Vec<Book> = self.books().values().cloned().collect();
        books.sort_by(|a, b| a.isbn().cmp(b.isbn()));

        let mut members: Vec<Member> = self.members().values().cloned().collect();
        members.sort_by_key(|m| m.member_id());

        let mut loans: Vec<Loan> = self.loans().values().cloned().collect();
        loans.sort_by_key(|l| l.loan_id());

        CatalogSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            config: self.config().clone(),
            books,
            members,
            loans,
        }
    }

    /// スナップショットからカタログを復元する
    ///
    /// 会員の貸出中集合は貸出台帳の導出値であるため、ここで突き合わせて
    /// 検証する。食い違うスナップショットは壊れているとみなして拒否する
    /// （呼び出し側は「保存なし」と同じ扱いで空のカタログから始める）。
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, SnapshotRestoreError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotRestoreError::UnsupportedVersion(snapshot.schema_version));
        }

        let books: HashMap<Isbn, Book> = snapshot
            .books
            .into_iter()
            .map(|b| (b.isbn().clone(), b))
            .collect();
        let members: HashMap<MemberId, Member> = snapshot
            .members
            .into_iter()
            .map(|m| (m.member_id(), m))
            .collect();
        let loans: HashMap<LoanId, Loan> = snapshot
            .loans
            .into_iter()
            .map(|l| (l.loan_id(), l))
            .collect();

        // 導出不変条件の検証：会員ごとの貸出中集合 ==
        // その会員のActiveな貸出IDの集合
        let mut derived: HashMap<MemberId, std::collections::HashSet<LoanId>> = HashMap::new();
        for loan in loans.values() {
            if let Loan::Active(active) = loan {
                derived.entry(active.member_id).or_default().insert(active.loan_id);
            }
        }
        for (member_id, loan_ids) in &derived {
            let member = members
                .get(member_id)
                .ok_or(SnapshotRestoreError::UnknownMemberInLedger(*member_id))?;
            if member.active_loan_ids() != loan_ids {
                return Err(SnapshotRestoreError::InconsistentActiveLoans(*member_id));
            }
        }
        for member in members.values() {
            if !member.active_loan_ids().is_empty() && !derived.contains_key(&member.member_id()) {
                return Err(SnapshotRestoreError::InconsistentActiveLoans(member.member_id()));
            }
        }

        Ok(LendingCatalog::from_parts(books, members, loans, snapshot.config))
    }
}
