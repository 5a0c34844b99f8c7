use std::time::UNIX_EPOCH;

use library_service::api::{AddBookRequest, AddCustomerRequest, LoanStatus, NOT_RETURNED};
use library_service::client::LibraryServiceClient;

const LIBRARY_SERVICE_URL: &str = "http://127.0.0.1:8080";

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[tokio::test]
/// Simple test for the catalog
/// Adds a book and a customer
/// Lists books and customers and checks they are there
async fn library_catalog_e2e_test() {
    let client = LibraryServiceClient::new(LIBRARY_SERVICE_URL).expect("Failed to create client");
    let suffix = unique_suffix();

    let book = AddBookRequest {
        name: format!("Catalog book {}", suffix),
        author: "Author1".to_string(),
        year_published: 2010,
        book_type: 2,
    };
    let response = client.add_book(&book).await.expect("Failed to add book");
    assert_eq!(response.message, "Book added successfully");

    let customer = AddCustomerRequest {
        name: format!("Catalog customer {}", suffix),
        city: "Lodz".to_string(),
        age: 19,
    };
    client
        .add_customer(&customer)
        .await
        .expect("Failed to add customer")
        .expect("Customer rejected");

    let books = client.list_books().await.expect("Failed to list books");
    assert!(books
        .iter()
        .any(|b| b.name == book.name && b.author == book.author && b.book_type == 2));

    let customers = client
        .list_customers()
        .await
        .expect("Failed to list customers");
    assert!(customers
        .iter()
        .any(|c| c.name == customer.name && c.city == "Lodz" && c.age == 19));
}

#[tokio::test]
/// Simple test for the loan lifecycle
/// Loans a book, loans it again - rejected
/// Returns it, returns it again - rejected
/// Checks loan status and customer loan info along the way
async fn library_loans_e2e_test() {
    let client = LibraryServiceClient::new(LIBRARY_SERVICE_URL).expect("Failed to create client");
    let suffix = unique_suffix();
    let book_name = format!("Loan book {}", suffix);
    let customer_name = format!("Loan customer {}", suffix);

    client
        .add_book(&AddBookRequest {
            name: book_name.clone(),
            author: "Author2".to_string(),
            year_published: 1990,
            book_type: 1,
        })
        .await
        .expect("Failed to add book");
    client
        .add_customer(&AddCustomerRequest {
            name: customer_name.clone(),
            city: "Torun".to_string(),
            age: 64,
        })
        .await
        .expect("Failed to add customer")
        .expect("Customer rejected");

    // LOAN with unknown customer
    let error = client
        .loan_book("Nobody at all", &book_name)
        .await
        .expect("Failed to loan book")
        .expect_err("Loan of unknown customer accepted");
    assert_eq!(error.error, "Customer or book not found");

    // LOAN
    client
        .loan_book(&customer_name, &book_name)
        .await
        .expect("Failed to loan book")
        .expect("Loan rejected");

    // LOAN AGAIN - this time should fail as already on loan
    let error = client
        .loan_book(&customer_name, &book_name)
        .await
        .expect("Failed to loan book")
        .expect_err("Second loan accepted");
    assert_eq!(error.error, "This book is already on loan");

    let found = client
        .find_book(&book_name)
        .await
        .expect("Failed to find book")
        .expect("Book not found");
    assert_eq!(found.loan_status, LoanStatus::OnLoan);

    // Loaned just now, cannot be late
    let late_loans = client
        .list_late_loans()
        .await
        .expect("Failed to list late loans");
    assert!(!late_loans.iter().any(|loan| loan.book_name == book_name));

    // RETURN
    client
        .return_book(&customer_name, &book_name)
        .await
        .expect("Failed to return book")
        .expect("Return rejected");

    let error = client
        .return_book(&customer_name, &book_name)
        .await
        .expect("Failed to return book")
        .expect_err("Second return accepted");
    assert_eq!(
        error.error,
        "This book is not currently on loan to the specified customer"
    );

    let found = client
        .find_book(&book_name)
        .await
        .expect("Failed to find book")
        .expect("Book not found");
    assert_eq!(found.loan_status, LoanStatus::Available);

    let customer = client
        .find_customer(&customer_name)
        .await
        .expect("Failed to find customer")
        .expect("Customer not found");
    assert_eq!(customer.loan_info.len(), 1);
    assert_eq!(customer.loan_info[0].book_name, book_name);
    assert_ne!(customer.loan_info[0].return_date, NOT_RETURNED);

    let loans = client.list_loans().await.expect("Failed to list loans");
    let loan = loans
        .iter()
        .find(|loan| loan.book_name == book_name)
        .expect("Loan not listed");
    assert_eq!(loan.customer_name, customer_name);
    assert!(loan.return_date.is_some());
}
