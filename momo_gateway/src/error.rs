use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MomoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Error sending request to the provider: {0}")]
    NetworkError(String),
    #[error("Could not authenticate with the provider: {0}")]
    AuthenticationError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider has no record of {0}")]
    NotFound(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("Invalid callback payload: {0}")]
    InvalidCallback(String),
}
