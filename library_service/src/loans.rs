//! Loan lifecycle rules: creating and returning loans, due dates and lateness.
//!
//! Every function takes the repository handle explicitly, the current time is
//! passed in by the caller.

use chrono::{DateTime, Duration, Utc};

use crate::api::{
    BookId, CustomerLoanInfo, FindBookResponse, FindCustomerResponse, LateLoanRecord, LoanId,
    LoanRecord, LoanStatus, DATE_FORMAT, NOT_RETURNED,
};
use crate::library_repository::{LibraryRepository, LibraryRepositoryError, Loan};

#[derive(Debug, thiserror::Error)]
pub enum LoanError {
    #[error("Customer or book not found")]
    NotFound,

    #[error("This book is already on loan")]
    AlreadyLoaned,

    #[error("This book is not currently on loan to the specified customer")]
    NotOnLoan,

    #[error("Repository failure {0}")]
    Repository(#[from] LibraryRepositoryError),
}

/// Number of days a book of given type may be kept, None for unknown types
pub fn loan_duration_days(book_type: i32) -> Option<i64> {
    match book_type {
        1 => Some(10),
        2 => Some(5),
        3 => Some(2),
        _ => None,
    }
}

/// Loans of unknown book types have no due date and never become late
pub fn due_date(loan_date: DateTime<Utc>, book_type: i32) -> Option<DateTime<Utc>> {
    loan_duration_days(book_type).map(|days| loan_date + Duration::days(days))
}

/// A loan due exactly at `now` is not late yet
pub fn is_late(now: DateTime<Utc>, due_date: DateTime<Utc>) -> bool {
    now > due_date
}

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub async fn create_loan(
    repository: &dyn LibraryRepository,
    customer_name: &str,
    book_name: &str,
    now: DateTime<Utc>,
) -> Result<LoanId, LoanError> {
    let customer = repository.find_customer_by_name(customer_name).await?;
    let book = repository.find_book_by_name(book_name).await?;
    let (Some(customer), Some(book)) = (customer, book) else {
        tracing::warn!(customer_name, book_name, "Loan rejected, customer or book not found");
        return Err(LoanError::NotFound);
    };

    match repository.create_loan(customer.id, book.id, now).await {
        Ok(loan_id) => {
            tracing::info!(
                loan_id,
                customer_id = customer.id,
                book_id = book.id,
                "Book loaned"
            );
            Ok(loan_id)
        }
        Err(LibraryRepositoryError::AlreadyLoaned { .. }) => {
            tracing::warn!(
                customer_id = customer.id,
                book_id = book.id,
                "Loan rejected, book already on loan"
            );
            Err(LoanError::AlreadyLoaned)
        }
        // Deleted between lookup and insert
        Err(
            LibraryRepositoryError::CustomerNotFound(_) | LibraryRepositoryError::BookNotFound(_),
        ) => Err(LoanError::NotFound),
        Err(err) => Err(err.into()),
    }
}

pub async fn return_loan(
    repository: &dyn LibraryRepository,
    customer_name: &str,
    book_name: &str,
    now: DateTime<Utc>,
) -> Result<(), LoanError> {
    let customer = repository.find_customer_by_name(customer_name).await?;
    let book = repository.find_book_by_name(book_name).await?;
    let (Some(customer), Some(book)) = (customer, book) else {
        tracing::warn!(customer_name, book_name, "Return rejected, customer or book not found");
        return Err(LoanError::NotFound);
    };

    match repository.return_loan(customer.id, book.id, now).await {
        Ok(()) => {
            tracing::info!(
                customer_id = customer.id,
                book_id = book.id,
                "Book returned"
            );
            Ok(())
        }
        Err(LibraryRepositoryError::NotOnLoan { .. }) => {
            tracing::warn!(
                customer_id = customer.id,
                book_id = book.id,
                "Return rejected, book not on loan to customer"
            );
            Err(LoanError::NotOnLoan)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn loan_status(
    repository: &dyn LibraryRepository,
    book_id: BookId,
) -> Result<LoanStatus, LoanError> {
    Ok(if repository.has_active_loan(book_id).await? {
        LoanStatus::OnLoan
    } else {
        LoanStatus::Available
    })
}

/// Active loans past their due date, in the order the store returns active loans
pub async fn list_late_loans(
    repository: &dyn LibraryRepository,
    now: DateTime<Utc>,
) -> Result<Vec<LateLoanRecord>, LoanError> {
    let mut late_loans = vec![];

    for loan in repository.list_active_loans().await? {
        let book = repository.get_book(loan.book_id).await?;
        let Some(due_date) = due_date(loan.loan_date, book.book_type) else {
            continue;
        };
        if !is_late(now, due_date) {
            continue;
        }
        let customer = repository.get_customer(loan.customer_id).await?;
        late_loans.push(LateLoanRecord {
            customer_name: customer.name,
            book_name: book.name,
            loan_date: format_date(loan.loan_date),
            due_date: format_date(due_date),
        });
    }

    Ok(late_loans)
}

pub async fn list_loans(repository: &dyn LibraryRepository) -> Result<Vec<LoanRecord>, LoanError> {
    let mut records = vec![];
    for loan in repository.list_loans().await? {
        let customer = repository.get_customer(loan.customer_id).await?;
        let book = repository.get_book(loan.book_id).await?;
        records.push(LoanRecord {
            customer_name: customer.name,
            book_name: book.name,
            loan_date: format_date(loan.loan_date),
            return_date: loan.return_date.map(format_date),
        });
    }
    Ok(records)
}

pub async fn find_book(
    repository: &dyn LibraryRepository,
    book_name: &str,
) -> Result<FindBookResponse, LoanError> {
    let book = repository
        .find_book_by_name(book_name)
        .await?
        .ok_or(LoanError::NotFound)?;
    let loan_status = loan_status(repository, book.id).await?;

    Ok(FindBookResponse {
        book_name: book.name,
        author: book.author,
        loan_status,
    })
}

pub async fn find_customer(
    repository: &dyn LibraryRepository,
    customer_name: &str,
) -> Result<FindCustomerResponse, LoanError> {
    let customer = repository
        .find_customer_by_name(customer_name)
        .await?
        .ok_or(LoanError::NotFound)?;

    let mut loan_info = vec![];
    for Loan {
        book_id,
        loan_date,
        return_date,
        ..
    } in repository.list_customer_loans(customer.id).await?
    {
        let book = repository.get_book(book_id).await?;
        loan_info.push(CustomerLoanInfo {
            book_name: book.name,
            loan_date: format_date(loan_date),
            return_date: return_date
                .map(format_date)
                .unwrap_or_else(|| NOT_RETURNED.to_string()),
        });
    }

    Ok(FindCustomerResponse {
        customer_name: customer.name,
        city: customer.city,
        age: customer.age,
        loan_info,
    })
}
