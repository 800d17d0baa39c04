use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::application::catalog::LendingCatalog;
use crate::domain::commands::{IssueBook, ReturnBook};
use crate::domain::{Isbn, LoanId, MemberId};
use crate::ports::SnapshotStore;

/// メニューループ
///
/// 固定メニューを提示し、1選択につきコア操作を1回だけ呼び出す。
/// 業務判断（在庫・上限・料金）は一切持たず、結果かエラーメッセージを
/// そのまま表示してメニューに戻る。
///
/// 入出力を差し替えられるよう`BufRead`/`Write`で受ける。EOFは
/// 「保存せずに終了」として扱う。
pub fn run<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    store: &dyn SnapshotStore,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    loop {
        writeln!(out)?;
        writeln!(out, "=== Library Management System ===")?;
        writeln!(out, "1. Add Book")?;
        writeln!(out, "2. Search Books by Title")?;
        writeln!(out, "3. Remove Book")?;
        writeln!(out, "4. Register Member")?;
        writeln!(out, "5. Issue Book")?;
        writeln!(out, "6. Return Book")?;
        writeln!(out, "7. List All Books")?;
        writeln!(out, "8. List Members & Active Loans")?;
        writeln!(out, "9. Save & Exit")?;

        let Some(choice) = prompt_number(input, out, "Enter choice: ")? else {
            return Ok(());
        };

        match choice {
            1 => add_book_ui(catalog, input, out)?,
            2 => search_books_ui(catalog, input, out)?,
            3 => remove_book_ui(catalog, input, out)?,
            4 => register_member_ui(catalog, input, out)?,
            5 => issue_book_ui(catalog, input, out)?,
            6 => return_book_ui(catalog, input, out)?,
            7 => list_all_books_ui(catalog, out)?,
            8 => list_members_ui(catalog, out)?,
            9 => {
                save_ui(catalog, store, out)?;
                writeln!(out, "Bye!")?;
                return Ok(());
            }
            _ => writeln!(out, "Invalid option.")?,
        }
    }
}

/// 当日の日付（コマンドの操作日として使う）
fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// 1行読む。EOFなら`None`。
fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// 数値が出るまで問い直す。EOFなら`None`。
fn prompt_number<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> io::Result<Option<u32>> {
    let mut prompt = prompt;
    loop {
        let Some(line) = prompt_line(input, out, prompt)? else {
            return Ok(None);
        };
        match line.parse() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => prompt = "Enter a number: ",
        }
    }
}

fn add_book_ui<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(isbn) = prompt_line(input, out, "ISBN: ")? else {
        return Ok(());
    };
    let Some(title) = prompt_line(input, out, "Title: ")? else {
        return Ok(());
    };
    let Some(author) = prompt_line(input, out, "Author: ")? else {
        return Ok(());
    };
    let Some(copies) = prompt_number(input, out, "Total copies: ")? else {
        return Ok(());
    };

    catalog.add_book(Isbn::new(isbn), title, author, copies);
    writeln!(out, "Book added.")
}

fn search_books_ui<R: BufRead, W: Write>(
    catalog: &LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(keyword) = prompt_line(input, out, "Search title keyword: ")? else {
        return Ok(());
    };

    let results = catalog.search_books_by_title(&keyword);
    if results.is_empty() {
        writeln!(out, "No books found.")
    } else {
        for book in results {
            writeln!(out, "{book}")?;
        }
        Ok(())
    }
}

fn remove_book_ui<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(isbn) = prompt_line(input, out, "ISBN to remove: ")? else {
        return Ok(());
    };

    match catalog.remove_book(&Isbn::new(isbn)) {
        Ok(()) => writeln!(out, "Book removed."),
        Err(e) => writeln!(out, "Error: {e}"),
    }
}

fn register_member_ui<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(id) = prompt_number(input, out, "Member ID (number): ")? else {
        return Ok(());
    };
    let Some(name) = prompt_line(input, out, "Member name: ")? else {
        return Ok(());
    };

    catalog.register_member(MemberId::new(id), name);
    writeln!(out, "Member registered.")
}

fn issue_book_ui<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(isbn) = prompt_line(input, out, "ISBN: ")? else {
        return Ok(());
    };
    let Some(id) = prompt_number(input, out, "Member ID: ")? else {
        return Ok(());
    };

    let cmd = IssueBook {
        isbn: Isbn::new(isbn),
        member_id: MemberId::new(id),
        issued_at: today(),
    };
    match catalog.issue_book(cmd) {
        Ok(loan) => writeln!(out, "Issued. Loan ID: {} | Due: {}", loan.loan_id, loan.due_date),
        Err(e) => writeln!(out, "Error: {e}"),
    }
}

fn return_book_ui<R: BufRead, W: Write>(
    catalog: &mut LendingCatalog,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    let Some(raw) = prompt_line(input, out, "Loan ID: ")? else {
        return Ok(());
    };

    // UUIDとして読めないIDは台帳に存在し得ない
    let Ok(uuid) = raw.parse::<Uuid>() else {
        return writeln!(out, "Error: Invalid loan id {raw}");
    };

    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(uuid),
        returned_at: today(),
    };
    match catalog.return_book(cmd) {
        Ok(fine) if fine > 0.0 => writeln!(out, "Overdue fine: {fine}"),
        Ok(_) => writeln!(out, "Returned. No fine."),
        Err(e) => writeln!(out, "Error: {e}"),
    }
}

fn list_all_books_ui<W: Write>(catalog: &LendingCatalog, out: &mut W) -> io::Result<()> {
    let books = catalog.search_books_by_title("");
    if books.is_empty() {
        return writeln!(out, "No books in catalog.");
    }
    for book in books {
        writeln!(out, "{book}")?;
    }
    Ok(())
}

fn list_members_ui<W: Write>(catalog: &LendingCatalog, out: &mut W) -> io::Result<()> {
    let mut members: Vec<_> = catalog.all_members().collect();
    if members.is_empty() {
        return writeln!(out, "No members registered.");
    }
    members.sort_by_key(|m| m.member_id());

    for member in members {
        writeln!(out, "{member}")?;
        let loans = catalog.active_loans_by_member(member.member_id());
        if loans.is_empty() {
            writeln!(out, "  (No active loans)")?;
        } else {
            for loan in loans {
                writeln!(
                    out,
                    "  -> [{}] due {} (loan {})",
                    loan.isbn, loan.due_date, loan.loan_id
                )?;
            }
        }
    }
    Ok(())
}

/// 保存の失敗は警告として表示するだけで、終了は止めない
fn save_ui<W: Write>(
    catalog: &LendingCatalog,
    store: &dyn SnapshotStore,
    out: &mut W,
) -> io::Result<()> {
    match store.save(&catalog.snapshot()) {
        Ok(()) => writeln!(out, "Data saved."),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save snapshot");
            writeln!(out, "Warning: failed to save: {e}")
        }
    }
}
