use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{AddBookRequest, AddCustomerRequest, Book, Customer};
use crate::library_repository::{
    BookId, CustomerId, LibraryRepository, LibraryRepositoryError, Loan, LoanId,
};

const LOAN_COLUMNS: &str = "id, customer_id, book_id, loan_date, return_date";

pub struct PostgresLibraryRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

pub struct PostgresLibraryRepository {
    client: Client,
}

impl PostgresLibraryRepository {
    pub async fn init(config: PostgresLibraryRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Postgres host: {}", config.hostname);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              SERIAL PRIMARY KEY,
            name            TEXT NOT NULL,
            author          TEXT NOT NULL,
            year_published  INTEGER NOT NULL,
            book_type       INTEGER NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup books table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS customers (
            id              SERIAL PRIMARY KEY,
            name            TEXT NOT NULL,
            city            TEXT NOT NULL,
            age             INTEGER NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup customers table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS loans (
            id              SERIAL PRIMARY KEY,
            customer_id     INTEGER NOT NULL REFERENCES customers (id),
            book_id         INTEGER NOT NULL REFERENCES books (id),
            loan_date       TIMESTAMPTZ NOT NULL,
            return_date     TIMESTAMPTZ
            );
        CREATE UNIQUE INDEX IF NOT EXISTS loans_one_active_per_pair
            ON loans (customer_id, book_id) WHERE return_date IS NULL;
        ",
            )
            .await
            .context("Failed to setup loans table")?;

        Ok(Self { client })
    }

    async fn query_loans(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Loan>, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {LOAN_COLUMNS} FROM loans {filter} ORDER BY id"
            ))
            .await?;
        let rows = self.client.query(&stmt, params).await?;
        rows.iter().map(|row| Ok(loan_from_row(row)?)).collect()
    }
}

fn book_from_row(row: &Row) -> Result<Book, tokio_postgres::Error> {
    Ok(Book {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        author: row.try_get(2)?,
        year_published: row.try_get(3)?,
        book_type: row.try_get(4)?,
    })
}

fn customer_from_row(row: &Row) -> Result<Customer, tokio_postgres::Error> {
    Ok(Customer {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        city: row.try_get(2)?,
        age: row.try_get(3)?,
    })
}

fn loan_from_row(row: &Row) -> Result<Loan, tokio_postgres::Error> {
    Ok(Loan {
        id: row.try_get(0)?,
        customer_id: row.try_get(1)?,
        book_id: row.try_get(2)?,
        loan_date: row.try_get(3)?,
        return_date: row.try_get(4)?,
    })
}

#[async_trait::async_trait]
impl LibraryRepository for PostgresLibraryRepository {
    async fn add_book(&self, details: AddBookRequest) -> Result<BookId, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO books (name, author, year_published, book_type) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &details.name,
                    &details.author,
                    &details.year_published,
                    &details.book_type,
                ],
            )
            .await?;

        let book_id: BookId = rows
            .first()
            .ok_or_else(|| LibraryRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?;

        Ok(book_id)
    }

    async fn add_customer(
        &self,
        details: AddCustomerRequest,
    ) -> Result<CustomerId, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO customers (name, city, age) VALUES ($1, $2, $3) RETURNING id")
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&details.name, &details.city, &details.age])
            .await?;

        let customer_id: CustomerId = rows
            .first()
            .ok_or_else(|| LibraryRepositoryError::Other("Id not returned".to_string()))?
            .try_get(0)?;

        Ok(customer_id)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, author, year_published, book_type FROM books WHERE id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;
        let row = rows
            .first()
            .ok_or(LibraryRepositoryError::BookNotFound(book_id))?;
        Ok(book_from_row(row)?)
    }

    async fn get_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, city, age FROM customers WHERE id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&customer_id]).await?;
        let row = rows
            .first()
            .ok_or(LibraryRepositoryError::CustomerNotFound(customer_id))?;
        Ok(customer_from_row(row)?)
    }

    async fn list_books(&self) -> Result<Vec<Book>, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, author, year_published, book_type FROM books ORDER BY id")
            .await?;
        let rows = self.client.query(&stmt, &[]).await?;
        rows.iter().map(|row| Ok(book_from_row(row)?)).collect()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, city, age FROM customers ORDER BY id")
            .await?;
        let rows = self.client.query(&stmt, &[]).await?;
        rows.iter().map(|row| Ok(customer_from_row(row)?)).collect()
    }

    async fn find_book_by_name(&self, name: &str) -> Result<Option<Book>, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, name, author, year_published, book_type FROM books \
                 WHERE name = $1 ORDER BY id LIMIT 1",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&name]).await?;
        Ok(rows.first().map(book_from_row).transpose()?)
    }

    async fn find_customer_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Customer>, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, name, city, age FROM customers WHERE name = $1 ORDER BY id LIMIT 1",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&name]).await?;
        Ok(rows.first().map(customer_from_row).transpose()?)
    }

    async fn create_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        loan_date: DateTime<Utc>,
    ) -> Result<LoanId, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO loans (customer_id, book_id, loan_date) VALUES ($1, $2, $3) RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&customer_id, &book_id, &loan_date])
            .await;

        match rows {
            Ok(rows) => Ok(rows
                .first()
                .ok_or_else(|| LibraryRepositoryError::Other("Id not returned".to_string()))?
                .try_get(0)?),
            Err(err) => {
                let Some(db_err) = err.as_db_error() else {
                    return Err(err.into());
                };
                if db_err.code() == &SqlState::UNIQUE_VIOLATION {
                    // loans_one_active_per_pair rejected the insert
                    Err(LibraryRepositoryError::AlreadyLoaned {
                        customer_id,
                        book_id,
                    })
                } else if db_err.code() == &SqlState::FOREIGN_KEY_VIOLATION {
                    match db_err.constraint() {
                        Some(constraint) if constraint.contains("customer_id") => {
                            Err(LibraryRepositoryError::CustomerNotFound(customer_id))
                        }
                        _ => Err(LibraryRepositoryError::BookNotFound(book_id)),
                    }
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn return_loan(
        &self,
        customer_id: CustomerId,
        book_id: BookId,
        return_date: DateTime<Utc>,
    ) -> Result<(), LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE loans SET return_date = $3 \
                 WHERE customer_id = $1 AND book_id = $2 AND return_date IS NULL RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&customer_id, &book_id, &return_date])
            .await?;

        if rows.is_empty() {
            Err(LibraryRepositoryError::NotOnLoan {
                customer_id,
                book_id,
            })
        } else {
            Ok(())
        }
    }

    async fn has_active_loan(&self, book_id: BookId) -> Result<bool, LibraryRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT 1 FROM loans WHERE book_id = $1 AND return_date IS NULL LIMIT 1")
            .await?;
        let rows = self.client.query(&stmt, &[&book_id]).await?;
        Ok(!rows.is_empty())
    }

    async fn list_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError> {
        self.query_loans("", &[]).await
    }

    async fn list_active_loans(&self) -> Result<Vec<Loan>, LibraryRepositoryError> {
        self.query_loans("WHERE return_date IS NULL", &[]).await
    }

    async fn list_customer_loans(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Loan>, LibraryRepositoryError> {
        self.query_loans("WHERE customer_id = $1", &[&customer_id])
            .await
    }
}
