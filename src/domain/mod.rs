pub mod book;
pub mod commands;
pub mod loan;
pub mod member;
pub mod value_objects;

pub use book::Book;
pub use loan::{ActiveLoan, Loan, LoanCore, ReturnedLoan};
pub use member::{DEFAULT_MAX_BOOKS, Member};
pub use value_objects::*;
