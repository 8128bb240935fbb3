//! # Result of a consumed operation.

use std::any::Any;

use crate::error::ServiceError;

/// Outcome of [`Consumer::consume`](crate::Consumer::consume): a value or an error, never both.
#[derive(Debug, Clone)]
#[must_use]
pub struct OperationResult<T> {
    value: Option<T>,
    error: Option<ServiceError>,
}

impl<T> OperationResult<T> {
    /// Successful outcome.
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    /// Failed outcome.
    pub fn failure(error: ServiceError) -> Self {
        Self {
            value: None,
            error: Some(error),
        }
    }

    /// `true` if the operation succeeded.
    pub fn has_no_exception(&self) -> bool {
        self.error.is_none()
    }

    /// `true` if the operation failed.
    pub fn has_exception(&self) -> bool {
        self.error.is_some()
    }

    /// `true` if the operation failed with a fault reported by the peer.
    pub fn has_fault_exception(&self) -> bool {
        self.error.as_ref().is_some_and(ServiceError::is_fault)
    }

    /// `true` if the peer reported a fault carrying a `D` detail.
    pub fn has_fault_of_type<D: Any>(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.fault_detail::<D>().is_some())
    }

    /// The value, if the operation succeeded.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The error, if the operation failed.
    pub fn error(&self) -> Option<&ServiceError> {
        self.error.as_ref()
    }

    /// Converts into the value, discarding any error.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<T, ServiceError> {
        match (self.value, self.error) {
            (_, Some(err)) => Err(err),
            (Some(value), None) => Ok(value),
            (None, None) => Err(ServiceError::unexpected("operation produced no value")),
        }
    }
}

impl<T> From<Result<T, ServiceError>> for OperationResult<T> {
    fn from(res: Result<T, ServiceError>) -> Self {
        match res {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Overdrawn;

    #[test]
    fn predicates_follow_the_outcome() {
        let ok = OperationResult::success(3);
        assert!(ok.has_no_exception());
        assert!(!ok.has_fault_exception());
        assert_eq!(ok.value(), Some(&3));

        let fault: OperationResult<i32> =
            OperationResult::failure(ServiceError::fault_with_detail("no", Overdrawn));
        assert!(fault.has_exception());
        assert!(fault.has_fault_exception());
        assert!(fault.has_fault_of_type::<Overdrawn>());
        assert!(!fault.has_fault_of_type::<String>());
        assert!(fault.value().is_none());
        assert!(fault.into_result().unwrap_err().is_fault());
    }
}
