use anyhow::{bail, Context};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::{
    AddBookRequest, AddBookResponse, AddCustomerRequest, Book, Customer, ErrorResponse,
    FindBookRequest, FindBookResponse, FindCustomerRequest, FindCustomerResponse,
    GetAllBooksResponse, GetAllCustomersResponse, GetAllLoansResponse, GetLateLoansResponse,
    LateLoanRecord, LoanBookRequest, LoanRecord, MessageResponse, ReturnBookRequest,
};

/// Outcome of a request the service rejected with a structured error body
pub type ServiceResult<T> = Result<T, ErrorResponse>;

pub struct LibraryServiceClient {
    url: String,
    /// Used for requests that change the library, never retried
    client: ClientWithMiddleware,
    /// Used for lookups, retried on transient failures
    read_client: ClientWithMiddleware,
}

impl LibraryServiceClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client.clone())
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let read_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
            read_client,
        })
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        client: &ClientWithMiddleware,
        path: &str,
        request: &Req,
    ) -> anyhow::Result<ServiceResult<Resp>> {
        let response = client
            .post(format!("{}{}", self.url, path))
            .json(request)
            .send()
            .await?;
        Self::parse(path, response).await
    }

    async fn get<Resp: DeserializeOwned>(&self, path: &str) -> anyhow::Result<Resp> {
        let response = self
            .read_client
            .get(format!("{}{}", self.url, path))
            .send()
            .await?;
        match Self::parse(path, response).await? {
            Ok(body) => Ok(body),
            Err(error) => bail!("Failed to call {} {}", path, error.error),
        }
    }

    async fn parse<Resp: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> anyhow::Result<ServiceResult<Resp>> {
        let status = response.status();
        if status.is_success() {
            Ok(Ok(response.json().await?))
        } else if status.is_client_error() {
            let error: ErrorResponse = response
                .json()
                .await
                .with_context(|| format!("Unexpected error body from {} ({})", path, status))?;
            Ok(Err(error))
        } else {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to call {} ({}) {}", path, status, error)
        }
    }

    /// Calls POST /add_book endpoint
    /// Rejected books are reported as an error with the response message
    pub async fn add_book(&self, book: &AddBookRequest) -> anyhow::Result<AddBookResponse> {
        let response = self
            .client
            .post(format!("{}/add_book", self.url))
            .json(book)
            .send()
            .await?;
        let status = response.status();
        let body: AddBookResponse = response.json().await?;
        if !status.is_success() {
            bail!("Failed to add book {}", body.message)
        }
        Ok(body)
    }

    /// Calls POST /add_customer endpoint
    pub async fn add_customer(
        &self,
        customer: &AddCustomerRequest,
    ) -> anyhow::Result<ServiceResult<MessageResponse>> {
        self.post(&self.client, "/add_customer", customer).await
    }

    /// Calls POST /loan_book endpoint
    pub async fn loan_book(
        &self,
        customer_name: &str,
        book_name: &str,
    ) -> anyhow::Result<ServiceResult<MessageResponse>> {
        self.post(
            &self.client,
            "/loan_book",
            &LoanBookRequest {
                customer_name: customer_name.to_string(),
                book_name: book_name.to_string(),
            },
        )
        .await
    }

    /// Calls POST /return_book endpoint
    pub async fn return_book(
        &self,
        customer_name: &str,
        book_name: &str,
    ) -> anyhow::Result<ServiceResult<MessageResponse>> {
        self.post(
            &self.client,
            "/return_book",
            &ReturnBookRequest {
                customer_name_return: customer_name.to_string(),
                book_name_return: book_name.to_string(),
            },
        )
        .await
    }

    /// Calls GET /books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        let response: GetAllBooksResponse = self.get("/books").await?;
        Ok(response.books)
    }

    /// Calls GET /customers endpoint
    pub async fn list_customers(&self) -> anyhow::Result<Vec<Customer>> {
        let response: GetAllCustomersResponse = self.get("/customers").await?;
        Ok(response.customers)
    }

    /// Calls GET /loans endpoint
    pub async fn list_loans(&self) -> anyhow::Result<Vec<LoanRecord>> {
        let response: GetAllLoansResponse = self.get("/loans").await?;
        Ok(response.loans)
    }

    /// Calls GET /late_loans endpoint
    pub async fn list_late_loans(&self) -> anyhow::Result<Vec<LateLoanRecord>> {
        let response: GetLateLoansResponse = self.get("/late_loans").await?;
        Ok(response.late_loans)
    }

    /// Calls POST /find_book endpoint
    pub async fn find_book(
        &self,
        book_name: &str,
    ) -> anyhow::Result<ServiceResult<FindBookResponse>> {
        self.post(
            &self.read_client,
            "/find_book",
            &FindBookRequest {
                book_name: book_name.to_string(),
            },
        )
        .await
    }

    /// Calls POST /find_customer endpoint
    pub async fn find_customer(
        &self,
        customer_name: &str,
    ) -> anyhow::Result<ServiceResult<FindCustomerResponse>> {
        self.post(
            &self.read_client,
            "/find_customer",
            &FindCustomerRequest {
                customer_name: customer_name.to_string(),
            },
        )
        .await
    }
}
