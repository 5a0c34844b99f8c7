use chrono::{DateTime, Utc};

pub use in_memory_library_repository::InMemoryLibraryRepository;
pub use postgres_library_repository::{
    PostgresLibraryRepository, PostgresLibraryRepositoryConfig,
};

use crate::api::{AddBookRequest, AddCustomerRequest, Book, BookId, Customer, CustomerId, LoanId};

mod in_memory_library_repository;
mod postgres_library_repository;

/// Loan row as kept by the store
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub book_id: BookId,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryRepositoryError {
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("Customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("Book {book_id} already on loan to customer {customer_id}")]
    AlreadyLoaned {
        customer_id: CustomerId,
        book_id: BookId,
    },

    #[error("Book {book_id} not on loan to customer {customer_id}")]
    NotOnLoan {
        customer_id: CustomerId,
        book_id: BookId,
    },

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Storage of books, customers and loans.
///
/// Listing methods return rows in insertion order.
#[async_trait::async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn add_book(&self, details: AddBookRequest) -> Result<BookId, LibraryRepositoryError>;

    async fn add_customer(
        &self,
        details: AddCustomerRequest,
    ) -> Result<CustomerId, LibraryRepositoryError>;

    async fn get_book(&self, book_id: BookId) -> Result<Book, LibraryRepositoryError>;

    async fn get_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, LibraryRepositoryError>;

    async fn list_books(&self) -> Result<Vec<Book>, LibraryRepositoryError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, LibraryRepositoryError>;

    /// Returns the first book with exactly this name, if any
    async fn find_book_by_name(&self, name: &str) -> Result<Option<Book>, LibraryRepositoryError>;

    /// Returns the first customer with exactly this name, if any
    async fn find_customer_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Customer>, LibraryRepositoryError>;

    /// Inserts a new active loan.
    /// Fails with AlreadyLoaned if the pair already has an active loan,
    /// the check and the insert happen atomically.
    async fn create_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        loan_date: DateTime<Utc>,
    ) -> Result<LoanId, LibraryRepositoryError>;

    /// Sets return date on the active loan of the pair, fails with NotOnLoan if there is none
    async fn return_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        return_date: DateTime<Utc>,
    ) -> Result<(), LibraryRepositoryError>;

    /// True if the book has an active loan for any customer
    async fn has_active_loan(&self, book_id: BookId) -> Result<bool, LibraryRepositoryError>;

    async fn list_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError>;

    async fn list_active_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError>;

    async fn list_customer_loans(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Loan>, LibraryRepositoryError>;
}
