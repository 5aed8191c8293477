//! Timeout helpers
//!
//! Wrap async operations so an expired deadline surfaces as
//! `ReportError::Timeout` with the operation name attached.

use std::future::Future;
use std::time::Duration;

use crate::types::{ReportError, Result};

/// Execute a fallible async operation with a timeout
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::timeout(operation_name, timeout)),
    }
}

/// Execute an infallible async operation with a timeout
pub async fn with_timeout_map<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| ReportError::timeout(operation_name, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, ReportError>(42) },
            "quick operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ReportError>(42)
            },
            "slow operation",
        )
        .await;
        match result {
            Err(ReportError::Timeout { operation, .. }) => assert_eq!(operation, "slow operation"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_map() {
        let value = with_timeout_map(Duration::from_secs(1), async { "done" }, "map")
            .await
            .unwrap();
        assert_eq!(value, "done");
    }
}
