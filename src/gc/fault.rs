//! Per-item fault isolation for daemon calls.
//!
//! A failed call is logged with the parameters that identify the item and
//! turned into `None`; the caller skips the item and carries on with the batch.

use crate::container::{ContainerError, Result};
use std::future::Future;
use tracing::warn;

/// Await `call`, logging and swallowing any failure.
pub async fn api_call<T, F>(operation: &str, params: &[(&str, &str)], call: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match call.await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{}", describe_failure(operation, params, &err));
            None
        }
    }
}

/// Log line for a failed call.
pub fn describe_failure(operation: &str, params: &[(&str, &str)], err: &ContainerError) -> String {
    let params = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",");

    if err.is_timeout() {
        format!("Failed to call {} {} {}", operation, params, err)
    } else {
        format!("Error calling {} {} {}", operation, params, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_call_success() {
        let result = api_call("inspect_container", &[("container", "abcd")], async {
            Ok::<_, ContainerError>(42)
        })
        .await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_api_call_failure_is_none() {
        let result: Option<()> = api_call("remove_image", &[("image", "abcd")], async {
            Err(ContainerError::Status {
                status: 409,
                message: "Conflict".into(),
            })
        })
        .await;
        assert_eq!(result, None);
    }

    #[test]
    fn test_describe_timeout() {
        let err = ContainerError::Timeout("msg".into());
        assert_eq!(
            describe_failure("remove_image", &[("image", "abcd")], &err),
            "Failed to call remove_image image=abcd timed out: msg"
        );
    }

    #[test]
    fn test_describe_api_error() {
        let err = ContainerError::Status {
            status: 409,
            message: "Conflict (\"failed\")".into(),
        };
        assert_eq!(
            describe_failure("remove_image", &[("image", "abcd"), ("force", "false")], &err),
            "Error calling remove_image image=abcd,force=false 409 Conflict (\"failed\")"
        );
    }
}
