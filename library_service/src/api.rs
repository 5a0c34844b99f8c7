use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type BookId = i32;
pub type CustomerId = i32;
pub type LoanId = i32;

/// Format used for every date rendered in responses
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Marker rendered in customer loan info for loans which are still active
pub const NOT_RETURNED: &str = "Not returned";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /add_book
pub struct AddBookRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: String,
    #[validate(range(min = 0, message = "year_published must not be negative"))]
    pub year_published: i32,
    /// 1, 2 and 3 select a loan duration, other values are stored but never become late
    pub book_type: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /add_customer
pub struct AddCustomerRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "city must not be empty"))]
    pub city: String,
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    pub age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /loan_book
pub struct LoanBookRequest {
    #[validate(length(min = 1, message = "customer_name must not be empty"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "book_name must not be empty"))]
    pub book_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /return_book
pub struct ReturnBookRequest {
    #[validate(length(min = 1, message = "customer_name_return must not be empty"))]
    pub customer_name_return: String,
    #[validate(length(min = 1, message = "book_name_return must not be empty"))]
    pub book_name_return: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /find_book
pub struct FindBookRequest {
    #[validate(length(min = 1, message = "book_name must not be empty"))]
    pub book_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
/// Body of POST /find_customer
pub struct FindCustomerRequest {
    #[validate(length(min = 1, message = "customer_name must not be empty"))]
    pub customer_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub enum ToastifyType {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Response of POST /add_book, shaped for toast notifications in the frontend
pub struct AddBookResponse {
    pub message: String,
    pub toastify_type: ToastifyType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub author: String,
    pub year_published: i32,
    pub book_type: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub city: String,
    pub age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct GetAllBooksResponse {
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct GetAllCustomersResponse {
    pub customers: Vec<Customer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct LoanRecord {
    pub customer_name: String,
    pub book_name: String,
    pub loan_date: String,
    /// None while the book is still on loan
    pub return_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct GetAllLoansResponse {
    pub loans: Vec<LoanRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct LateLoanRecord {
    pub customer_name: String,
    pub book_name: String,
    pub loan_date: String,
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct GetLateLoansResponse {
    pub late_loans: Vec<LateLoanRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub enum LoanStatus {
    #[serde(rename = "On Loan")]
    OnLoan,
    #[serde(rename = "Available")]
    Available,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct FindBookResponse {
    pub book_name: String,
    pub author: String,
    pub loan_status: LoanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct CustomerLoanInfo {
    pub book_name: String,
    pub loan_date: String,
    /// Formatted return date, or "Not returned" while the book is still on loan
    pub return_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct FindCustomerResponse {
    pub customer_name: String,
    pub city: String,
    pub age: i32,
    pub loan_info: Vec<CustomerLoanInfo>,
}
