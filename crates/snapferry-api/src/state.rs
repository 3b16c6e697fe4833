//! Shared state handed to every handler.

use std::sync::Arc;

use snapferry_config::{Secret, ServerSettings};
use snapferry_core::TransferWorkflow;
use snapferry_telemetry::Metrics;

/// Credentials expected in the `Authorization: Basic` header.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    username: String,
    password: Secret,
}

impl BasicCredentials {
    /// Credentials for `username` and `password`.
    #[must_use]
    pub fn new(username: impl Into<String>, password: Secret) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Credentials configured for the listener.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(settings.username.clone(), settings.password.clone())
    }

    /// Whether the supplied pair matches. Both halves are always compared.
    #[must_use]
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let pass_ok = constant_time_eq(self.password.expose().as_bytes(), password.as_bytes());
        user_ok & pass_ok
    }
}

fn constant_time_eq(expected: &[u8], supplied: &[u8]) -> bool {
    if expected.len() != supplied.len() {
        return false;
    }
    expected
        .iter()
        .zip(supplied)
        .fold(0_u8, |diff, (left, right)| diff | (left ^ right))
        == 0
}

/// Dependencies shared by the router.
pub struct ApiState {
    pub(crate) workflow: Arc<dyn TransferWorkflow>,
    pub(crate) credentials: BasicCredentials,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    /// Bundle the workflow, caller credentials, and metrics handle.
    #[must_use]
    pub fn new(
        workflow: Arc<dyn TransferWorkflow>,
        credentials: BasicCredentials,
        telemetry: Metrics,
    ) -> Self {
        Self {
            workflow,
            credentials,
            telemetry,
        }
    }
}
