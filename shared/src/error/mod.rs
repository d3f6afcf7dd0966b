use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Another writer changed the record between our read and write; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Request timeout: {0}")]
    Timeout(String),
}

// Helper function to map general DynamoDB errors
pub fn map_dynamo_error<E>(operation: &str, err: SdkError<E>) -> ServiceError
where
    E: std::error::Error + 'static,
{
    ServiceError::StoreUnavailable(format!(
        "DynamoDB {} error: {}",
        operation,
        DisplayErrorContext(err)
    ))
}

// UpdateItem with `attribute_exists(#id)` fails its condition when the record is gone
pub fn map_update_dynamo_error(err: SdkError<UpdateItemError>, id: &str) -> ServiceError {
    let condition_failed = matches!(
        &err,
        SdkError::ServiceError(service_err)
            if service_err.err().is_conditional_check_failed_exception()
    );

    if condition_failed {
        ServiceError::NotFound(format!("Guest not found: {}", id))
    } else {
        map_dynamo_error("update_item", err)
    }
}

// A cancelled transaction reports one code per item, in request order.
// When any of them is a failed condition the caller decides what it means.
pub fn map_transact_dynamo_error(
    err: SdkError<TransactWriteItemsError>,
    on_condition_failed: impl FnOnce(&[String]) -> ServiceError,
) -> ServiceError {
    let reasons: Option<Vec<String>> = match &err {
        SdkError::ServiceError(service_err) => match service_err.err() {
            TransactWriteItemsError::TransactionCanceledException(cancelled) => Some(
                cancelled
                    .cancellation_reasons()
                    .iter()
                    .map(|reason| reason.code().unwrap_or("None").to_string())
                    .collect(),
            ),
            _ => None,
        },
        _ => None,
    };

    match reasons {
        Some(reasons) if reasons.iter().any(|code| code == "ConditionalCheckFailed") => {
            on_condition_failed(&reasons)
        }
        _ => map_dynamo_error("transact_write_items", err),
    }
}

impl From<aws_sdk_dynamodb::error::BuildError> for ServiceError {
    fn from(err: aws_sdk_dynamodb::error::BuildError) -> Self {
        ServiceError::StoreUnavailable(format!("DynamoDB request build error: {}", err))
    }
}

impl From<serde_dynamo::Error> for ServiceError {
    fn from(err: serde_dynamo::Error) -> Self {
        ServiceError::StoreUnavailable(format!("DynamoDB serialization error: {}", err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::StoreUnavailable(format!("JSON serialization error: {}", err))
    }
}
