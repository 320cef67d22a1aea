//! Deadline Notifications
//!
//! When a step watchdog expires, the step's configured URL is told which
//! run missed which step. Delivery is attempted exactly once.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Default request timeout of [`HttpNotifier`].
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload identifying the run and step whose deadline lapsed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StepNotification {
    pub workflow_name: String,
    pub workflow_step: String,
    pub workflow_run_id: String,
}

/// Capability consumed by the engine to report a lapsed deadline.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, notification: &StepNotification) -> Result<(), NotifyError>;
}

/// Posts notifications as JSON over HTTP.
///
/// Any non-2xx response counts as a failed delivery.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Creates a notifier with [`DEFAULT_NOTIFY_TIMEOUT`].
    pub fn new() -> Result<Self, NotifyError> {
        Self::with_timeout(DEFAULT_NOTIFY_TIMEOUT)
    }

    /// Creates a notifier whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, url: &str, notification: &StepNotification) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(notification).send().await?;
        let status = response.status();

        debug!(
            "Notification for run {} answered with {}",
            notification.workflow_run_id, status
        );

        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample() -> StepNotification {
        StepNotification {
            workflow_name: "onboarding".to_string(),
            workflow_step: "step1".to_string(),
            workflow_run_id: "run-42".to_string(),
        }
    }

    #[test]
    fn test_payload_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "workflow_name": "onboarding",
                "workflow_step": "step1",
                "workflow_run_id": "run-42",
            })
        );
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retry"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "workflow_name": "onboarding",
                "workflow_step": "step1",
                "workflow_run_id": "run-42",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new().unwrap();
        let result = notifier
            .notify(&format!("{}/retry", server.uri()), &sample())
            .await;

        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new().unwrap();
        let result = notifier.notify(&server.uri(), &sample()).await;

        assert!(matches!(result, Err(NotifyError::Rejected { status: 503 })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let notifier = HttpNotifier::with_timeout(Duration::from_secs(2)).unwrap();
        let result = notifier.notify("http://127.0.0.1:1/retry", &sample()).await;

        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
