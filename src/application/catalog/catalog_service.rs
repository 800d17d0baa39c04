use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::commands::{IssueBook, ReturnBook};
use crate::domain::{self, ActiveLoan, Book, Isbn, Loan, LoanId, Member, MemberId};

use super::errors::{CatalogError, Result};

/// 業務設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// 貸出期間（日数）
    pub loan_period_days: i64,
    /// 延滞1日あたりの料金
    pub fine_per_overdue_day: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
            fine_per_overdue_day: 5.0,
        }
    }
}

/// LendingCatalog - 貸出カタログの集約ルート
///
/// 蔵書・会員・貸出の3つのコレクションと業務設定を1つの境界の内側に
/// 置く。全操作は同期的なメソッド呼び出しで、状態を変更する操作は
/// `&mut self`を取る。複数の呼び出し元から共有する場合は、この構造体
/// ごと1つのMutexで包めば操作単位の排他境界になる。
///
/// issue/returnの複数フィールド更新は、事前条件をすべて確認してから
/// 一括で適用する。呼び出し元から途中状態が観測されることはない。
///
/// 永続化はこの構造体自身ではなく、明示的なスキーマを持つ
/// `CatalogSnapshot`を経由する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LendingCatalog {
    books: HashMap<Isbn, Book>,
    members: HashMap<MemberId, Member>,
    loans: HashMap<LoanId, Loan>,
    config: CatalogConfig,
}

impl LendingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // ========================================================================
    // 蔵書
    // ========================================================================

    /// 蔵書を登録する
    ///
    /// 同じISBNが既にあれば上書きし、貸出可能数は総数にリセットされる。
    /// 意図しない重複登録を避けるのは呼び出し側の責務。
    pub fn add_book(
        &mut self,
        isbn: Isbn,
        title: impl Into<String>,
        author: impl Into<String>,
        total_copies: u32,
    ) {
        let book = Book::new(isbn.clone(), title, author, total_copies);
        self.books.insert(isbn, book);
    }

    /// タイトルの部分一致検索（大文字小文字を無視）
    ///
    /// 結果はタイトル昇順、同タイトルはISBN昇順で安定。空文字は全件。
    pub fn search_books_by_title(&self, keyword: &str) -> Vec<&Book> {
        let keyword = keyword.to_lowercase();
        let mut hits: Vec<&Book> = self
            .books
            .values()
            .filter(|b| b.title().to_lowercase().contains(&keyword))
            .collect();
        hits.sort_by(|a, b| a.title().cmp(b.title()).then_with(|| a.isbn().cmp(b.isbn())));
        hits
    }

    /// 蔵書を除籍する
    ///
    /// その蔵書への貸出中の記録には触れない。除籍と貸出中は正当に
    /// 共存する（貸出記録のISBNはキー参照であり所有ではない）。
    pub fn remove_book(&mut self, isbn: &Isbn) -> Result<()> {
        self.books
            .remove(isbn)
            .map(|_| ())
            .ok_or_else(|| CatalogError::BookNotFound(isbn.clone()))
    }

    // ========================================================================
    // 会員
    // ========================================================================

    /// 会員を登録する
    ///
    /// 同じ会員IDが既にあれば上書きし、貸出中の集合は空になる。
    /// 上書きの是非は蔵書と同じく呼び出し側の責務。
    pub fn register_member(&mut self, member_id: MemberId, name: impl Into<String>) {
        self.members.insert(member_id, Member::new(member_id, name));
    }

    // ========================================================================
    // 貸出・返却
    // ========================================================================

    /// 書籍を貸し出す
    ///
    /// 事前条件（この順に確認する）：
    /// 1. 蔵書が存在する
    /// 2. 会員が存在する
    /// 3. 在庫がある
    /// 4. 会員が貸出上限未満
    ///
    /// すべて満たされた後にのみ状態を変更する。貸出の起票・会員への
    /// 記録・在庫の引き落としは一括で適用され、途中で失敗しない。
    pub fn issue_book(&mut self, cmd: IssueBook) -> Result<ActiveLoan> {
        // 1. 蔵書の存在確認
        let book = self
            .books
            .get(&cmd.isbn)
            .ok_or_else(|| CatalogError::BookNotFound(cmd.isbn.clone()))?;

        // 2. 会員の存在確認
        let member = self
            .members
            .get(&cmd.member_id)
            .ok_or(CatalogError::MemberNotFound(cmd.member_id))?;

        // 3. 在庫確認
        if !book.has_available_copy() {
            return Err(CatalogError::NoCopiesAvailable(cmd.isbn.clone()));
        }

        // 4. 貸出上限確認
        if !member.can_borrow() {
            return Err(CatalogError::LoanLimitReached(cmd.member_id));
        }

        // 事前条件はすべて満たされた。以降の更新は失敗しない。
        let loan = domain::loan::issue_loan(
            cmd.isbn.clone(),
            cmd.member_id,
            cmd.issued_at,
            self.config.loan_period_days,
        );

        if let Some(book) = self.books.get_mut(&cmd.isbn) {
            book.checkout_copy();
        }
        if let Some(member) = self.members.get_mut(&cmd.member_id) {
            member.record_loan(loan.loan_id);
        }
        self.loans.insert(loan.loan_id, Loan::Active(loan.clone()));

        Ok(loan)
    }

    /// 書籍を返却し、延滞料金を返す
    ///
    /// ビジネスルール：
    /// - 既に返却済みの貸出IDは料金0.0の無害な再送として扱う（冪等）
    /// - 料金 = max(0, 返却日 - 返却期限) × 日額
    /// - 蔵書が除籍済みなら在庫は戻さない（除籍の設計判断と整合）
    /// - 会員が上書き登録済みなら消し込みは黙ってスキップする
    pub fn return_book(&mut self, cmd: ReturnBook) -> Result<f64> {
        let loan = self
            .loans
            .get(&cmd.loan_id)
            .ok_or(CatalogError::UnknownLoan(cmd.loan_id))?;

        let active = match loan {
            // 冪等：二重返却は料金を再請求しない
            Loan::Returned(_) => return Ok(0.0),
            Loan::Active(active) => active.clone(),
        };

        let returned = domain::loan::close_loan(active, cmd.returned_at);
        let fine = returned.overdue_days() as f64 * self.config.fine_per_overdue_day;

        if let Some(book) = self.books.get_mut(&returned.isbn) {
            book.return_copy();
        }
        if let Some(member) = self.members.get_mut(&returned.member_id) {
            member.clear_loan(&returned.loan_id);
        }
        self.loans.insert(returned.loan_id, Loan::Returned(returned));

        Ok(fine)
    }

    // ========================================================================
    // 照会
    // ========================================================================

    /// 会員の貸出中一覧（返却期限の昇順）
    ///
    /// 未知の会員・貸出なしはエラーではなく空列。
    pub fn active_loans_by_member(&self, member_id: MemberId) -> Vec<&ActiveLoan> {
        let mut loans: Vec<&ActiveLoan> = self
            .loans
            .values()
            .filter_map(|loan| match loan {
                Loan::Active(active) if active.member_id == member_id => Some(active),
                _ => None,
            })
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.loan_id.cmp(&b.loan_id)));
        loans
    }

    /// 館全体の貸出中一覧（返却期限の昇順）
    pub fn all_active_loans(&self) -> Vec<&ActiveLoan> {
        let mut loans: Vec<&ActiveLoan> = self
            .loans
            .values()
            .filter_map(|loan| match loan {
                Loan::Active(active) => Some(active),
                _ => None,
            })
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.loan_id.cmp(&b.loan_id)));
        loans
    }

    /// 全蔵書（順序保証なし）
    pub fn all_books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// 全会員（順序保証なし）
    pub fn all_members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub(super) fn books(&self) -> &HashMap<Isbn, Book> {
        &self.books
    }

    pub(super) fn members(&self) -> &HashMap<MemberId, Member> {
        &self.members
    }

    pub(super) fn loans(&self) -> &HashMap<LoanId, Loan> {
        &self.loans
    }

    pub(super) fn from_parts(
        books: HashMap<Isbn, Book>,
        members: HashMap<MemberId, Member>,
        loans: HashMap<LoanId, Loan>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            books,
            members,
            loans,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::errors::ErrorKind;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn issue_cmd(isbn: &str, member_id: u32, issued_at: NaiveDate) -> IssueBook {
        IssueBook {
            isbn: Isbn::from(isbn),
            member_id: MemberId::new(member_id),
            issued_at,
        }
    }

    fn catalog_with_one_book() -> LendingCatalog {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-1"), "Refactoring", "M. Fowler", 1);
        catalog.register_member(MemberId::new(7), "Alice");
        catalog
    }

    // ========================================================================
    // 蔵書
    // ========================================================================

    #[test]
    fn test_add_book_overwrites_and_resets_availability() {
        let mut catalog = catalog_with_one_book();
        catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        // 上書き登録で在庫は総数にリセットされる
        catalog.add_book(Isbn::from("978-1"), "Refactoring 2nd", "M. Fowler", 5);
        let book = catalog.search_books_by_title("refactoring")[0];
        assert_eq!(book.total_copies(), 5);
        assert_eq!(book.available_copies(), 5);
    }

    #[test]
    fn test_search_empty_keyword_returns_all_sorted_by_title() {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-3"), "Zebra Patterns", "Z. Author", 1);
        catalog.add_book(Isbn::from("978-1"), "Analysis Patterns", "M. Fowler", 1);
        catalog.add_book(Isbn::from("978-2"), "Refactoring", "M. Fowler", 1);

        let all = catalog.search_books_by_title("");
        let titles: Vec<&str> = all.iter().map(|b| b.title()).collect();
        assert_eq!(titles, vec!["Analysis Patterns", "Refactoring", "Zebra Patterns"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-1"), "Domain-Driven Design", "E. Evans", 1);

        assert_eq!(catalog.search_books_by_title("dRiVeN").len(), 1);
        assert_eq!(catalog.search_books_by_title("ZZZNOPE").len(), 0);
    }

    #[test]
    fn test_search_equal_titles_ordered_by_isbn() {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-9"), "Refactoring", "M. Fowler", 1);
        catalog.add_book(Isbn::from("978-1"), "Refactoring", "M. Fowler", 1);

        let hits = catalog.search_books_by_title("refactoring");
        let isbns: Vec<&str> = hits.iter().map(|b| b.isbn().as_str()).collect();
        assert_eq!(isbns, vec!["978-1", "978-9"]);
    }

    #[test]
    fn test_remove_book_unknown_isbn_fails_and_leaves_catalog_unchanged() {
        let mut catalog = catalog_with_one_book();
        let before = catalog.clone();

        let err = catalog.remove_book(&Isbn::from("978-404")).unwrap_err();
        assert_eq!(err, CatalogError::BookNotFound(Isbn::from("978-404")));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_remove_book_with_outstanding_loan_is_allowed() {
        let mut catalog = catalog_with_one_book();
        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        // 貸出中でも除籍できる。貸出記録はそのまま残る。
        catalog.remove_book(&Isbn::from("978-1")).unwrap();
        assert_eq!(catalog.active_loans_by_member(MemberId::new(7)).len(), 1);

        // 除籍後の返却：在庫は戻せないが、貸出は閉じて消し込まれる
        let fine = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 3, 10),
            })
            .unwrap();
        assert_eq!(fine, 0.0);
        assert_eq!(catalog.active_loans_by_member(MemberId::new(7)).len(), 0);
    }

    // ========================================================================
    // 貸出
    // ========================================================================

    #[test]
    fn test_issue_book_creates_loan_and_decrements_availability() {
        let mut catalog = catalog_with_one_book();
        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        assert_eq!(loan.due_date, date(2024, 3, 15));
        assert_eq!(catalog.search_books_by_title("")[0].available_copies(), 0);

        let member = catalog.all_members().next().unwrap();
        assert_eq!(member.active_loan_count(), 1);
        assert!(member.active_loan_ids().contains(&loan.loan_id));
    }

    #[test]
    fn test_issue_book_precondition_order() {
        let mut catalog = catalog_with_one_book();

        // 蔵書も会員も未知：蔵書のエラーが先
        let err = catalog.issue_book(issue_cmd("978-404", 404, date(2024, 3, 1))).unwrap_err();
        assert_eq!(err, CatalogError::BookNotFound(Isbn::from("978-404")));

        // 蔵書はあるが会員が未知
        let err = catalog.issue_book(issue_cmd("978-1", 404, date(2024, 3, 1))).unwrap_err();
        assert_eq!(err, CatalogError::MemberNotFound(MemberId::new(404)));
    }

    #[test]
    fn test_issue_book_fails_when_no_copies_available() {
        let mut catalog = catalog_with_one_book();
        catalog.register_member(MemberId::new(8), "Bob");
        catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        // 在庫0：他の会員にも貸せない
        let err = catalog.issue_book(issue_cmd("978-1", 8, date(2024, 3, 1))).unwrap_err();
        assert_eq!(err, CatalogError::NoCopiesAvailable(Isbn::from("978-1")));
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        // 失敗した呼び出しは状態を変えない
        assert_eq!(catalog.active_loans_by_member(MemberId::new(8)).len(), 0);
    }

    #[test]
    fn test_issue_book_fails_at_member_loan_limit() {
        let mut catalog = LendingCatalog::new();
        for i in 1..=4 {
            catalog.add_book(Isbn::new(format!("978-{i}")), format!("Book {i}"), "A. Uthor", 1);
        }
        catalog.register_member(MemberId::new(7), "Alice");

        for i in 1..=3 {
            catalog
                .issue_book(issue_cmd(&format!("978-{i}"), 7, date(2024, 3, 1)))
                .unwrap();
        }

        let err = catalog.issue_book(issue_cmd("978-4", 7, date(2024, 3, 1))).unwrap_err();
        assert_eq!(err, CatalogError::LoanLimitReached(MemberId::new(7)));
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        // 上限の蔵書在庫は減っていない
        assert_eq!(catalog.search_books_by_title("Book 4")[0].available_copies(), 1);
    }

    // ========================================================================
    // 返却
    // ========================================================================

    #[test]
    fn test_return_on_time_has_no_fine_and_restores_availability() {
        let mut catalog = catalog_with_one_book();
        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        let fine = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 3, 15),
            })
            .unwrap();

        assert_eq!(fine, 0.0);
        assert_eq!(catalog.search_books_by_title("")[0].available_copies(), 1);
        assert_eq!(catalog.all_members().next().unwrap().active_loan_count(), 0);
    }

    #[test]
    fn test_overdue_return_charges_per_day_fine() {
        // 14日貸出、期限20日超過、日額5.0 → 100.0
        let mut catalog = catalog_with_one_book();
        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();
        assert_eq!(loan.due_date, date(2024, 3, 15));

        let fine = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 4, 4),
            })
            .unwrap();

        assert_eq!(fine, 100.0);
        assert_eq!(catalog.search_books_by_title("")[0].available_copies(), 1);
    }

    #[test]
    fn test_return_unknown_loan_id_fails() {
        let mut catalog = catalog_with_one_book();
        let bogus = LoanId::new();
        let err = catalog
            .return_book(ReturnBook {
                loan_id: bogus,
                returned_at: date(2024, 3, 15),
            })
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownLoan(bogus));
        assert_eq!(err.kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn test_double_return_is_idempotent() {
        let mut catalog = catalog_with_one_book();
        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        let first = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 4, 4),
            })
            .unwrap();
        assert_eq!(first, 100.0);

        // 再送：料金0.0、在庫の二重加算なし
        let second = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 5, 1),
            })
            .unwrap();
        assert_eq!(second, 0.0);
        assert_eq!(catalog.search_books_by_title("")[0].available_copies(), 1);
    }

    #[test]
    fn test_custom_config_drives_due_date_and_fine() {
        let mut catalog = LendingCatalog::with_config(CatalogConfig {
            loan_period_days: 7,
            fine_per_overdue_day: 2.5,
        });
        catalog.add_book(Isbn::from("978-1"), "Refactoring", "M. Fowler", 1);
        catalog.register_member(MemberId::new(7), "Alice");

        let loan = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();
        assert_eq!(loan.due_date, date(2024, 3, 8));

        let fine = catalog
            .return_book(ReturnBook {
                loan_id: loan.loan_id,
                returned_at: date(2024, 3, 10),
            })
            .unwrap();
        assert_eq!(fine, 5.0);
    }

    // ========================================================================
    // 照会
    // ========================================================================

    #[test]
    fn test_active_loans_by_member_filters_and_sorts_by_due_date() {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-1"), "A", "X", 1);
        catalog.add_book(Isbn::from("978-2"), "B", "X", 1);
        catalog.add_book(Isbn::from("978-3"), "C", "X", 1);
        catalog.register_member(MemberId::new(7), "Alice");
        catalog.register_member(MemberId::new(8), "Bob");

        let late = catalog.issue_book(issue_cmd("978-2", 7, date(2024, 3, 10))).unwrap();
        let early = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();
        let other = catalog.issue_book(issue_cmd("978-3", 8, date(2024, 3, 1))).unwrap();

        // 返却済みは一覧に出ない
        catalog
            .return_book(ReturnBook {
                loan_id: other.loan_id,
                returned_at: date(2024, 3, 2),
            })
            .unwrap();

        let loans = catalog.active_loans_by_member(MemberId::new(7));
        let ids: Vec<_> = loans.iter().map(|l| l.loan_id).collect();
        assert_eq!(ids, vec![early.loan_id, late.loan_id]);

        // 他会員・未知会員
        assert!(catalog.active_loans_by_member(MemberId::new(8)).is_empty());
        assert!(catalog.active_loans_by_member(MemberId::new(404)).is_empty());
    }

    #[test]
    fn test_all_active_loans_spans_members() {
        let mut catalog = LendingCatalog::new();
        catalog.add_book(Isbn::from("978-1"), "A", "X", 1);
        catalog.add_book(Isbn::from("978-2"), "B", "X", 1);
        catalog.register_member(MemberId::new(7), "Alice");
        catalog.register_member(MemberId::new(8), "Bob");

        let b = catalog.issue_book(issue_cmd("978-2", 8, date(2024, 3, 5))).unwrap();
        let a = catalog.issue_book(issue_cmd("978-1", 7, date(2024, 3, 1))).unwrap();

        let ids: Vec<_> = catalog.all_active_loans().iter().map(|l| l.loan_id).collect();
        assert_eq!(ids, vec![a.loan_id, b.loan_id]);
    }
}
