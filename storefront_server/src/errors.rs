use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::traits::{CheckoutError, GatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    CheckoutError(#[from] CheckoutError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::CheckoutError(e) => match e {
                CheckoutError::EmptyCart
                | CheckoutError::PriceMismatch { .. }
                | CheckoutError::MultiSellerCart
                | CheckoutError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CheckoutError::ProductNotFound(_)
                | CheckoutError::OrderNotFound(_)
                | CheckoutError::CorrelationIdNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::InsufficientStock { .. }
                | CheckoutError::OrderAlreadyExists(_)
                | CheckoutError::CorrelationIdAlreadySet(_)
                | CheckoutError::StaleOrDuplicateCallback(_) => StatusCode::CONFLICT,
                CheckoutError::DatabaseError(_) | CheckoutError::OrderNotDeletable(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                CheckoutError::GatewayError(g) => match g {
                    GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                },
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "message": self.to_string() }).to_string())
    }
}
