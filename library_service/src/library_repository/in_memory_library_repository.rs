use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, Utc};

use crate::api::{AddBookRequest, AddCustomerRequest, Book, Customer};
use crate::library_repository::{
    BookId, CustomerId, LibraryRepository, LibraryRepositoryError, Loan, LoanId,
};

/// Keys are handed out in increasing order, so BTreeMap iteration follows insertion order
pub struct InMemoryLibraryRepository {
    books: parking_lot::RwLock<BTreeMap<BookId, Book>>,
    customers: parking_lot::RwLock<BTreeMap<CustomerId, Customer>>,
    loans: parking_lot::RwLock<BTreeMap<LoanId, Loan>>,
    book_sequence_generator: AtomicI32,
    customer_sequence_generator: AtomicI32,
    loan_sequence_generator: AtomicI32,
}

impl Default for InMemoryLibraryRepository {
    fn default() -> Self {
        Self {
            books: Default::default(),
            customers: Default::default(),
            loans: Default::default(),
            book_sequence_generator: AtomicI32::new(1),
            customer_sequence_generator: AtomicI32::new(1),
            loan_sequence_generator: AtomicI32::new(1),
        }
    }
}

#[async_trait::async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn add_book(&self, details: AddBookRequest) -> Result<BookId, LibraryRepositoryError> {
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        self.books.write().insert(
            id,
            Book {
                id,
                name: details.name,
                author: details.author,
                year_published: details.year_published,
                book_type: details.book_type,
            },
        );
        Ok(id)
    }

    async fn add_customer(
        &self,
        details: AddCustomerRequest,
    ) -> Result<CustomerId, LibraryRepositoryError> {
        let id = self
            .customer_sequence_generator
            .fetch_add(1, Ordering::Relaxed);
        self.customers.write().insert(
            id,
            Customer {
                id,
                name: details.name,
                city: details.city,
                age: details.age,
            },
        );
        Ok(id)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, LibraryRepositoryError> {
        self.books
            .read()
            .get(&book_id)
            .cloned()
            .ok_or(LibraryRepositoryError::BookNotFound(book_id))
    }

    async fn get_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, LibraryRepositoryError> {
        self.customers
            .read()
            .get(&customer_id)
            .cloned()
            .ok_or(LibraryRepositoryError::CustomerNotFound(customer_id))
    }

    async fn list_books(&self) -> Result<Vec<Book>, LibraryRepositoryError> {
        Ok(self.books.read().values().cloned().collect())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, LibraryRepositoryError> {
        Ok(self.customers.read().values().cloned().collect())
    }

    async fn find_book_by_name(&self, name: &str) -> Result<Option<Book>, LibraryRepositoryError> {
        Ok(self
            .books
            .read()
            .values()
            .find(|book| book.name == name)
            .cloned())
    }

    async fn find_customer_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Customer>, LibraryRepositoryError> {
        Ok(self
            .customers
            .read()
            .values()
            .find(|customer| customer.name == name)
            .cloned())
    }

    async fn create_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        loan_date: DateTime<Utc>,
    ) -> Result<LoanId, LibraryRepositoryError> {
        if !self.customers.read().contains_key(&customer_id) {
            return Err(LibraryRepositoryError::CustomerNotFound(customer_id));
        }
        if !self.books.read().contains_key(&book_id) {
            return Err(LibraryRepositoryError::BookNotFound(book_id));
        }

        // Check and insert under one write lock
        let mut loans_lock = self.loans.write();
        let already_loaned = loans_lock.values().any(|loan| {
            loan.customer_id == customer_id && loan.book_id == book_id && loan.is_active()
        });
        if already_loaned {
            return Err(LibraryRepositoryError::AlreadyLoaned {
                customer_id,
                book_id,
            });
        }

        let id = self.loan_sequence_generator.fetch_add(1, Ordering::Relaxed);
        loans_lock.insert(
            id,
            Loan {
                id,
                customer_id,
                book_id,
                loan_date,
                return_date: None,
            },
        );
        Ok(id)
    }

    async fn return_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        return_date: DateTime<Utc>,
    ) -> Result<(), LibraryRepositoryError> {
        let mut loans_lock = self.loans.write();

        match loans_lock.values_mut().find(|loan| {
            loan.customer_id == customer_id && loan.book_id == book_id && loan.is_active()
        }) {
            Some(loan) => {
                loan.return_date = Some(return_date);
                Ok(())
            }
            None => Err(LibraryRepositoryError::NotOnLoan {
                customer_id,
                book_id,
            }),
        }
    }

    async fn has_active_loan(&self, book_id: BookId) -> Result<bool, LibraryRepositoryError> {
        Ok(self
            .loans
            .read()
            .values()
            .any(|loan| loan.book_id == book_id && loan.is_active()))
    }

    async fn list_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError> {
        Ok(self.loans.read().values().cloned().collect())
    }

    async fn list_active_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError> {
        Ok(self
            .loans
            .read()
            .values()
            .filter(|loan| loan.is_active())
            .cloned()
            .collect())
    }

    async fn list_customer_loans(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Loan>, LibraryRepositoryError> {
        Ok(self
            .loans
            .read()
            .values()
            .filter(|loan| loan.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests_in_memory_library_repository {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn book(name: &str, book_type: i32) -> AddBookRequest {
        AddBookRequest {
            name: name.to_string(),
            author: "Author".to_string(),
            year_published: 1999,
            book_type,
        }
    }

    fn customer(name: &str) -> AddCustomerRequest {
        AddCustomerRequest {
            name: name.to_string(),
            city: "Gdansk".to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    /// Simple test to cover catalog management
    /// 1. Lists books and customers - expects empty
    /// 2. Adds two books with the same name and a customer
    /// 3. Gets them by id and by name, the first added book wins a name lookup
    /// 4. Gets not existing ids to get not found
    async fn test_catalog_management() {
        let repository = InMemoryLibraryRepository::default();
        assert_eq!(repository.list_books().await.unwrap(), Vec::<Book>::default());
        assert_eq!(
            repository.list_customers().await.unwrap(),
            Vec::<Customer>::default()
        );

        let book_1_id = repository.add_book(book("Dune", 1)).await.unwrap();
        let book_2_id = repository.add_book(book("Dune", 2)).await.unwrap();
        let customer_id = repository.add_customer(customer("Ann")).await.unwrap();

        let books = repository.list_books().await.unwrap();
        assert_eq!(
            books.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![book_1_id, book_2_id]
        );

        let returned_book = repository.get_book(book_2_id).await.unwrap();
        assert_eq!(returned_book.book_type, 2);

        let found_book = repository.find_book_by_name("Dune").await.unwrap().unwrap();
        assert_eq!(found_book.id, book_1_id);
        assert_eq!(repository.find_book_by_name("dune").await.unwrap(), None);

        let found_customer = repository
            .find_customer_by_name("Ann")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found_customer.id, customer_id);
        assert_eq!(found_customer.city, "Gdansk");

        assert!(matches!(
            repository.get_book(book_2_id + 1).await,
            Err(LibraryRepositoryError::BookNotFound(..))
        ));
        assert!(matches!(
            repository.get_customer(customer_id + 1).await,
            Err(LibraryRepositoryError::CustomerNotFound(..))
        ));
    }

    #[tokio::test]
    /// Simple test to cover loan management
    /// Combined into big unit test to avoid duplicate setup
    /// 1. Loans a book, second loan of the same pair is rejected
    /// 2. Other customer can loan the same book
    /// 3. Returns the loan, second return is rejected
    /// 4. Loans the pair again after return
    async fn test_loan_management() {
        let repository = InMemoryLibraryRepository::default();
        let book_id = repository.add_book(book("Dune", 1)).await.unwrap();
        let customer_1_id = repository.add_customer(customer("Ann")).await.unwrap();
        let customer_2_id = repository.add_customer(customer("Bob")).await.unwrap();
        let day_0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(!repository.has_active_loan(book_id).await.unwrap());

        let loan_id = repository
            .create_loan(customer_1_id, book_id, day_0)
            .await
            .unwrap();
        assert!(repository.has_active_loan(book_id).await.unwrap());

        let duplicate = repository.create_loan(customer_1_id, book_id, day_0).await;
        assert!(matches!(
            duplicate,
            Err(LibraryRepositoryError::AlreadyLoaned { .. })
        ));

        repository
            .create_loan(customer_2_id, book_id, day_0)
            .await
            .unwrap();

        let not_existing_customer = repository
            .create_loan(customer_2_id + 1, book_id, day_0)
            .await;
        assert!(matches!(
            not_existing_customer,
            Err(LibraryRepositoryError::CustomerNotFound(..))
        ));

        let day_3 = day_0 + Duration::days(3);
        repository
            .return_loan(customer_1_id, book_id, day_3)
            .await
            .unwrap();

        let second_return = repository.return_loan(customer_1_id, book_id, day_3).await;
        assert!(matches!(
            second_return,
            Err(LibraryRepositoryError::NotOnLoan { .. })
        ));

        let customer_1_loans = repository.list_customer_loans(customer_1_id).await.unwrap();
        assert_eq!(
            customer_1_loans,
            vec![Loan {
                id: loan_id,
                customer_id: customer_1_id,
                book_id,
                loan_date: day_0,
                return_date: Some(day_3),
            }]
        );

        // Still on loan to the second customer
        assert!(repository.has_active_loan(book_id).await.unwrap());
        assert_eq!(repository.list_active_loans().await.unwrap().len(), 1);

        let new_loan_id = repository
            .create_loan(customer_1_id, book_id, day_3)
            .await
            .unwrap();
        assert!(new_loan_id > loan_id);

        let all_loans = repository.list_loans().await.unwrap();
        assert_eq!(all_loans.len(), 3);
        assert_eq!(all_loans[0].id, loan_id);
        assert_eq!(all_loans[2].id, new_loan_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    /// Many tasks loan the same pair at once, only one of them gets the loan
    async fn test_concurrent_loans_of_same_pair() {
        const NO_OF_TASKS: usize = 16;

        let repository = std::sync::Arc::new(InMemoryLibraryRepository::default());
        let book_id = repository.add_book(book("Dune", 1)).await.unwrap();
        let customer_id = repository.add_customer(customer("Ann")).await.unwrap();
        let day_0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let tasks: Vec<_> = (0..NO_OF_TASKS)
            .map(|_| {
                let repository = repository.clone();
                tokio::spawn(async move { repository.create_loan(customer_id, book_id, day_0).await })
            })
            .collect();

        let mut loaned = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => loaned += 1,
                Err(LibraryRepositoryError::AlreadyLoaned { .. }) => rejected += 1,
                Err(err) => panic!("Unexpected error {}", err),
            }
        }

        assert_eq!(loaned, 1);
        assert_eq!(rejected, NO_OF_TASKS - 1);
        assert_eq!(repository.list_active_loans().await.unwrap().len(), 1);
    }
}
