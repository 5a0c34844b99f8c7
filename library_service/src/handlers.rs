use std::sync::Arc;

use actix_web::web::{Data, JsonConfig};
use actix_web::{Error, HttpResponse};
use chrono::Utc;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use validator::Validate;

use crate::api::{
    AddBookRequest, AddBookResponse, AddCustomerRequest, ErrorResponse, FindBookRequest,
    FindCustomerRequest, GetAllBooksResponse, GetAllCustomersResponse, GetAllLoansResponse,
    GetLateLoansResponse, LoanBookRequest, MessageResponse, ReturnBookRequest, ToastifyType,
};
use crate::library_repository::LibraryRepository;
use crate::loans::{self, LoanError};

/// Turns malformed or incomplete JSON bodies into the same error shape the handlers use
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse {
            error: err.to_string(),
        });
        actix_web::error::InternalError::from_response(err, response).into()
    })
}

/// `/add_book` answers every failure with the toast body, malformed JSON included
pub fn add_book_json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Invalid book body {}", err);
        let response = HttpResponse::BadRequest().json(add_book_error());
        actix_web::error::InternalError::from_response(err, response).into()
    })
}

fn add_book_error() -> AddBookResponse {
    AddBookResponse {
        message: "Error adding book".to_string(),
        toastify_type: ToastifyType::Error,
    }
}

fn error_response(err: LoanError, not_found_message: &str) -> HttpResponse {
    match err {
        LoanError::NotFound => HttpResponse::NotFound().json(ErrorResponse {
            error: not_found_message.to_string(),
        }),
        LoanError::AlreadyLoaned | LoanError::NotOnLoan => {
            HttpResponse::Conflict().json(ErrorResponse {
                error: err.to_string(),
            })
        }
        LoanError::Repository(err) => {
            tracing::error!("Repository failure {}", err);
            internal_error()
        }
    }
}

fn listing_error(err: LoanError) -> HttpResponse {
    tracing::error!("Listing loans failed {}", err);
    internal_error()
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Internal server error".to_string(),
    })
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: errors.to_string(),
    })
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn add_book(
    repository: Data<Arc<dyn LibraryRepository>>,
    details: web::Json<AddBookRequest>,
) -> Result<HttpResponse, Error> {
    let details = details.into_inner();
    if let Err(errors) = details.validate() {
        tracing::warn!("Invalid book {}", errors);
        return Ok(HttpResponse::BadRequest().json(add_book_error()));
    }

    Ok(match repository.add_book(details).await {
        Ok(book_id) => {
            tracing::info!(book_id, "Book added");
            HttpResponse::Ok().json(AddBookResponse {
                message: "Book added successfully".to_string(),
                toastify_type: ToastifyType::Success,
            })
        }
        Err(err) => {
            tracing::error!("Add book failed {}", err);
            HttpResponse::InternalServerError().json(add_book_error())
        }
    })
}

#[api_v2_operation]
pub async fn add_customer(
    repository: Data<Arc<dyn LibraryRepository>>,
    details: web::Json<AddCustomerRequest>,
) -> Result<HttpResponse, Error> {
    let details = details.into_inner();
    if let Err(errors) = details.validate() {
        return Ok(validation_error(errors));
    }

    Ok(match repository.add_customer(details).await {
        Ok(customer_id) => {
            tracing::info!(customer_id, "Customer added");
            HttpResponse::Ok().json(MessageResponse {
                message: "Customer added successfully".to_string(),
            })
        }
        Err(err) => {
            tracing::error!("Add customer failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn loan_book(
    repository: Data<Arc<dyn LibraryRepository>>,
    request: web::Json<LoanBookRequest>,
) -> Result<HttpResponse, Error> {
    if let Err(errors) = request.validate() {
        return Ok(validation_error(errors));
    }

    Ok(
        match loans::create_loan(
            repository.get_ref().as_ref(),
            &request.customer_name,
            &request.book_name,
            Utc::now(),
        )
        .await
        {
            Ok(_) => HttpResponse::Ok().json(MessageResponse {
                message: "Book loaned successfully".to_string(),
            }),
            Err(err) => error_response(err, "Customer or book not found"),
        },
    )
}

#[api_v2_operation]
pub async fn return_book(
    repository: Data<Arc<dyn LibraryRepository>>,
    request: web::Json<ReturnBookRequest>,
) -> Result<HttpResponse, Error> {
    if let Err(errors) = request.validate() {
        return Ok(validation_error(errors));
    }

    Ok(
        match loans::return_loan(
            repository.get_ref().as_ref(),
            &request.customer_name_return,
            &request.book_name_return,
            Utc::now(),
        )
        .await
        {
            Ok(()) => HttpResponse::Ok().json(MessageResponse {
                message: "Book returned successfully".to_string(),
            }),
            Err(err) => error_response(err, "Customer or book not found"),
        },
    )
}

#[api_v2_operation]
pub async fn get_all_books(
    repository: Data<Arc<dyn LibraryRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match repository.list_books().await {
        Ok(books) => HttpResponse::Ok().json(GetAllBooksResponse { books }),
        Err(err) => {
            tracing::error!("Get all books failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn get_all_customers(
    repository: Data<Arc<dyn LibraryRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match repository.list_customers().await {
        Ok(customers) => HttpResponse::Ok().json(GetAllCustomersResponse { customers }),
        Err(err) => {
            tracing::error!("Get all customers failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn get_all_loans(
    repository: Data<Arc<dyn LibraryRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match loans::list_loans(repository.get_ref().as_ref()).await {
        Ok(loans) => HttpResponse::Ok().json(GetAllLoansResponse { loans }),
        Err(err) => listing_error(err),
    })
}

#[api_v2_operation]
pub async fn get_late_loans(
    repository: Data<Arc<dyn LibraryRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(
        match loans::list_late_loans(repository.get_ref().as_ref(), Utc::now()).await {
            Ok(late_loans) => HttpResponse::Ok().json(GetLateLoansResponse { late_loans }),
            Err(err) => listing_error(err),
        },
    )
}

#[api_v2_operation]
pub async fn find_book(
    repository: Data<Arc<dyn LibraryRepository>>,
    request: web::Json<FindBookRequest>,
) -> Result<HttpResponse, Error> {
    if let Err(errors) = request.validate() {
        return Ok(validation_error(errors));
    }

    Ok(
        match loans::find_book(repository.get_ref().as_ref(), &request.book_name).await {
            Ok(found) => HttpResponse::Ok().json(found),
            Err(err) => error_response(err, "Book not found"),
        },
    )
}

#[api_v2_operation]
pub async fn find_customer(
    repository: Data<Arc<dyn LibraryRepository>>,
    request: web::Json<FindCustomerRequest>,
) -> Result<HttpResponse, Error> {
    if let Err(errors) = request.validate() {
        return Ok(validation_error(errors));
    }

    Ok(
        match loans::find_customer(repository.get_ref().as_ref(), &request.customer_name).await {
            Ok(found) => HttpResponse::Ok().json(found),
            Err(err) => error_response(err, "Customer not found"),
        },
    )
}
