//! Notifier (C9, §4.9).
//!
//! Formats a `SyncReport` and posts it to an outbound webhook. A missing configuration
//! makes this a logging no-op; a delivery failure is logged and discarded, never
//! propagated — a flaky webhook must not fail an otherwise successful sync job.

use crate::config::Settings;
use crate::models::SyncReport;

pub struct Notifier {
    webhook_url: Option<String>,
    webhook_token: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn from_settings(settings: &Settings) -> Self {
        Notifier {
            webhook_url: settings.notifier_webhook_url.clone(),
            webhook_token: settings.notifier_webhook_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Sends `report`, logging and swallowing any failure (§4.9 "failure never fails the job").
    pub async fn notify(&self, report: &SyncReport) {
        let Some(url) = &self.webhook_url else {
            tracing::info!(
                job_kind = %report.job_kind,
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                "NOTIFIER_WEBHOOK_URL unset, skipping notification"
            );
            return;
        };

        let mut request = self.client.post(url).json(&report);
        if let Some(token) = &self.webhook_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(job_kind = %report.job_kind, "sync report delivered");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "notifier webhook returned non-success status");
            }
            Err(err) => {
                tracing::warn!(error = %err, "notifier webhook delivery failed");
            }
        }
    }
}
