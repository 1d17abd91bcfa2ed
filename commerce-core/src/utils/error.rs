use crate::db::StorageError;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Errors returned by the ledger, the state machine and the cart reconciler
///
/// Validation-class failures (`Validation`, `EmptyOrder`, `NegativeTotal`,
/// `RefundExceedsInitial`, `CartRecovered`) reject bad input before any
/// write happens. `Storage` means the write transaction was aborted and
/// nothing was applied.
#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Order total would be negative: {0}")]
    NegativeTotal(Decimal),

    #[error("Refund of {amount} would exceed the issued amount {initial}")]
    RefundExceedsInitial { amount: Decimal, initial: Decimal },

    #[error("Cart already recovered: {0}")]
    CartRecovered(u64),

    #[error("Gift card not found: {0}")]
    GiftCardNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Cart not found: {0}")]
    CartNotFound(String),

    #[error("Gift card expired: {0}")]
    Expired(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommerceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Bad input, rejected before anything was written
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::EmptyOrder
                | Self::NegativeTotal(_)
                | Self::RefundExceedsInitial { .. }
                | Self::CartRecovered(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GiftCardNotFound(_) | Self::OrderNotFound(_) | Self::CartNotFound(_)
        )
    }

    /// The caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

pub type CommerceResult<T> = Result<T, CommerceError>;

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) | StorageError::DanglingIndex(_) => {
            return ErrorCode::StorageCorrupted;
        }
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（Database/Transaction/Table/Storage/Commit）
    ErrorCode::SystemBusy
}

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = %code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            CommerceError::Validation(msg) => AppError::validation(msg),
            CommerceError::EmptyOrder => AppError::new(ErrorCode::OrderEmpty),
            CommerceError::NegativeTotal(total) => {
                AppError::new(ErrorCode::OrderTotalNegative).with_detail("total", total.to_string())
            }
            CommerceError::RefundExceedsInitial { amount, initial } => {
                AppError::new(ErrorCode::RefundExceedsInitial)
                    .with_detail("amount", amount.to_string())
                    .with_detail("initial_balance", initial.to_string())
            }
            CommerceError::CartRecovered(id) => {
                AppError::new(ErrorCode::CartRecovered).with_detail("cart_id", id)
            }
            CommerceError::GiftCardNotFound(code) => {
                AppError::new(ErrorCode::GiftCardNotFound).with_detail("code", code)
            }
            CommerceError::OrderNotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order", id)
            }
            CommerceError::CartNotFound(id) => {
                AppError::new(ErrorCode::CartNotFound).with_detail("cart", id)
            }
            CommerceError::Expired(code) => {
                AppError::new(ErrorCode::GiftCardExpired).with_detail("code", code)
            }
            CommerceError::InsufficientBalance {
                requested,
                available,
            } => AppError::new(ErrorCode::InsufficientBalance)
                .with_detail("requested", requested.to_string())
                .with_detail("available", available.to_string()),
            CommerceError::InvalidTransition { from, to } => AppError::with_message(
                ErrorCode::InvalidTransition,
                format!("Cannot change status from {from} to {to}"),
            )
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
            CommerceError::ConcurrencyConflict(msg) => {
                AppError::with_message(ErrorCode::ConcurrencyConflict, msg)
            }
            CommerceError::Internal(msg) => AppError::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_helpers() {
        assert!(CommerceError::EmptyOrder.is_validation());
        assert!(CommerceError::CartRecovered(1).is_validation());
        assert!(CommerceError::GiftCardNotFound("WZ".into()).is_not_found());
        assert!(CommerceError::ConcurrencyConflict("x".into()).is_retryable());
        assert!(!CommerceError::Expired("WZ".into()).is_retryable());
    }

    #[test]
    fn test_insufficient_balance_to_app_error() {
        let err: AppError = CommerceError::InsufficientBalance {
            requested: Decimal::new(7000, 2),
            available: Decimal::new(3000, 2),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientBalance);
        let details = err.details.unwrap();
        assert_eq!(details["requested"], "70.00");
        assert_eq!(details["available"], "30.00");
    }

    #[test]
    fn test_invalid_transition_to_app_error() {
        let err: AppError = CommerceError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.message, "Cannot change status from delivered to pending");
    }

    #[test]
    fn test_conflict_is_retryable_at_boundary() {
        let err: AppError = CommerceError::ConcurrencyConflict("card 1".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_serialization_error_is_corruption() {
        let json_err = serde_json::from_slice::<u64>(b"nope").unwrap_err();
        let err: AppError = CommerceError::Storage(StorageError::Serialization(json_err)).into();
        assert_eq!(err.code, ErrorCode::StorageCorrupted);
    }
}
