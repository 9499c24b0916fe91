// ABOUTME: Asynchronous report export protocol: submit, poll to a terminal state, download
// ABOUTME: Also selects which (page, visual) pairs are worth exporting as CSV samples
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Export Job Pipeline
//!
//! Exporting a visual is a three-phase protocol:
//!
//! 1. **Submit** an `ExportTo` request for one (page, visual) pair. The
//!    service answers `202 Accepted` with a `Location` header pointing at the
//!    job status resource.
//! 2. **Poll** that location with a fixed delay and a bounded number of
//!    attempts until the job reaches a terminal state.
//! 3. **Download** the artifact from the job's `resourceLocation`.
//!
//! Polling is modelled as an explicit state machine ([`PollState`]) driven by
//! [`poll_until_terminal`], which takes the status fetch as a closure so the
//! loop can be exercised with scripted statuses and a zero delay.

use std::future::Future;

use reqwest::{header::LOCATION, StatusCode};
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::{parse_json_body, read_body, AccessToken, PowerBiClient};
use crate::{
    config::{ExportPollConfig, ReportTarget, VisualRef},
    constants::sampling,
    errors::{BiError, BiResult},
};

/// Export job status as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// Queued or in progress
    Running,
    /// Artifact ready for download
    Succeeded,
    /// Job failed
    Failed,
    /// Job cancelled
    Cancelled,
    /// Anything the client does not recognize
    Unknown,
}

impl ExportStatus {
    /// Parse a status string case-insensitively
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "running" | "notstarted" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    /// Whether polling stops at this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// An export job created by a submission and updated by polling
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Job id, when the service returned one
    pub id: Option<String>,
    /// Last observed status
    pub status: ExportStatus,
    /// Status resource to poll
    pub status_location: Url,
    /// Artifact location, set once the job succeeds
    pub resource_location: Option<String>,
}

impl ExportJob {
    /// Apply a status payload to the job
    pub fn apply_status(&mut self, payload: &Value) {
        self.status = payload
            .get("status")
            .and_then(Value::as_str)
            .map_or(ExportStatus::Unknown, ExportStatus::parse);

        if let Some(id) = payload.get("id").and_then(Value::as_str) {
            self.id = Some(id.to_owned());
        }

        self.resource_location = payload
            .get("resourceLocation")
            .and_then(Value::as_str)
            .filter(|loc| !loc.is_empty())
            .map(str::to_owned);
    }
}

/// Polling state machine
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Non-terminal; `attempts` status fetches done so far
    Running {
        /// Status fetches performed
        attempts: u32,
    },
    /// Job succeeded, possibly without a result location
    Succeeded {
        /// Artifact location reported by the service
        resource_location: Option<String>,
    },
    /// Job failed; carries the status payload
    Failed(Value),
    /// Job cancelled; carries the status payload
    Cancelled(Value),
    /// Attempt budget exhausted before a terminal status
    TimedOut,
}

impl PollState {
    /// Convert a terminal state into the pipeline result
    ///
    /// Success without a location and time-outs are soft failures: they are
    /// logged and yield `Ok(None)`.
    fn into_result(self) -> BiResult<Option<String>> {
        match self {
            Self::Succeeded {
                resource_location: Some(location),
            } => Ok(Some(location)),
            Self::Succeeded {
                resource_location: None,
            } => {
                warn!("Export job succeeded without a resource location");
                Ok(None)
            }
            Self::Failed(payload) | Self::Cancelled(payload) => {
                Err(BiError::ExportFailure { payload })
            }
            Self::TimedOut => {
                warn!("Export job did not finish within the poll budget");
                Ok(None)
            }
            Self::Running { .. } => Ok(None),
        }
    }
}

/// Drive a job to a terminal state
///
/// `fetch_status` is called once per attempt; `policy.interval` is waited
/// between attempts, never before the first.
///
/// # Errors
///
/// Returns [`BiError::ExportFailure`] as soon as the job reports `failed` or
/// `cancelled`, or any error returned by `fetch_status`
pub async fn poll_until_terminal<F, Fut>(
    job: &mut ExportJob,
    policy: &ExportPollConfig,
    mut fetch_status: F,
) -> BiResult<Option<String>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BiResult<Value>>,
{
    let mut state = PollState::Running { attempts: 0 };

    loop {
        state = match state {
            PollState::Running { attempts } if attempts >= policy.max_attempts => {
                PollState::TimedOut
            }
            PollState::Running { attempts } => {
                if attempts > 0 {
                    sleep(policy.interval).await;
                }
                let payload = fetch_status().await?;
                job.apply_status(&payload);
                debug!(attempt = attempts + 1, status = ?job.status, "Polled export job");

                match job.status {
                    ExportStatus::Succeeded => PollState::Succeeded {
                        resource_location: job.resource_location.clone(),
                    },
                    ExportStatus::Failed => PollState::Failed(payload),
                    ExportStatus::Cancelled => PollState::Cancelled(payload),
                    ExportStatus::Running | ExportStatus::Unknown => PollState::Running {
                        attempts: attempts + 1,
                    },
                }
            }
            terminal => return terminal.into_result(),
        };
    }
}

impl PowerBiClient {
    /// Submit a CSV export of one visual
    ///
    /// # Errors
    ///
    /// Returns [`BiError::ExportSubmitFailure`] unless the service answers
    /// `202` with a `Location` header
    pub async fn submit_export(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        visual: &VisualRef,
    ) -> BiResult<ExportJob> {
        let response = self
            .http
            .post(self.report_url(target, "ExportTo"))
            .bearer_auth(token.secret())
            .json(&json!({
                "format": "CSV",
                "powerBIReportConfiguration": {
                    "pages": [{ "pageName": visual.page, "visualName": visual.visual }]
                }
            }))
            .send()
            .await?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let (code, body) = read_body(response).await?;

        if status != StatusCode::ACCEPTED {
            return Err(BiError::ExportSubmitFailure { status: code, body });
        }
        let Some(location) = location.filter(|l| !l.is_empty()) else {
            return Err(BiError::ExportSubmitFailure {
                status: code,
                body: "export accepted without a status location".to_owned(),
            });
        };

        let mut job = ExportJob {
            id: None,
            status: ExportStatus::Running,
            status_location: self.resolve_location(&location)?,
            resource_location: None,
        };
        if let Ok(Value::Object(ref fields)) = parse_json_body(&body) {
            job.id = fields.get("id").and_then(Value::as_str).map(str::to_owned);
        }

        info!(page = %visual.page, visual = %visual.visual, "Submitted export job");
        Ok(job)
    }

    /// Fetch the current status payload of a job
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// undecodable body
    pub async fn fetch_export_status(
        &self,
        token: &AccessToken,
        status_location: &Url,
    ) -> BiResult<Value> {
        let response = self
            .http
            .get(status_location.clone())
            .bearer_auth(token.secret())
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !(200..300).contains(&status) {
            return Err(BiError::ExportFailure {
                payload: json!({ "httpStatus": status, "body": body }),
            });
        }
        parse_json_body(&body)
    }

    /// Download an export artifact and decode it as UTF-8 text
    ///
    /// # Errors
    ///
    /// Returns [`BiError::DownloadFailure`] on a non-2xx response
    pub async fn download_export(
        &self,
        token: &AccessToken,
        resource_location: &str,
    ) -> BiResult<String> {
        let url = self.resolve_location(resource_location)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BiError::DownloadFailure {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Export one visual as CSV text
    ///
    /// Returns `Ok(None)` on soft failures (time-out, success without a
    /// result location).
    ///
    /// # Errors
    ///
    /// Propagates submission, terminal job and download failures
    pub async fn export_visual_csv(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        visual: &VisualRef,
        policy: &ExportPollConfig,
    ) -> BiResult<Option<String>> {
        let mut job = self.submit_export(token, target, visual).await?;
        let status_location = job.status_location.clone();
        let location_ref = &status_location;

        let resource_location = poll_until_terminal(&mut job, policy, move || {
            self.fetch_export_status(token, location_ref)
        })
        .await?;

        match resource_location {
            Some(location) => Ok(Some(self.download_export(token, &location).await?)),
            None => Ok(None),
        }
    }

    /// Choose the visuals the export tier should try, in order
    ///
    /// A configured pair is used alone when it exists on its page. Otherwise
    /// the first pages are scanned and the first table-like visual of each
    /// page becomes a candidate. Listing failures are logged and skipped.
    pub async fn find_export_candidates(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        configured: Option<&VisualRef>,
    ) -> Vec<VisualRef> {
        if let Some(pair) = configured {
            match self.list_visuals(token, target, &pair.page).await {
                Ok(visuals) if visuals.iter().any(|v| v.name == pair.visual) => {
                    return vec![pair.clone()];
                }
                Ok(_) => warn!(
                    page = %pair.page,
                    visual = %pair.visual,
                    "Configured visual not found, scanning report pages"
                ),
                Err(e) => warn!(
                    page = %pair.page,
                    error = %e,
                    "Could not list visuals for configured page, scanning report pages"
                ),
            }
        }

        let pages = match self.list_pages(token, target).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "Could not list report pages");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for page in pages.iter().take(sampling::MAX_SCANNED_PAGES) {
            match self.list_visuals(token, target, &page.name).await {
                Ok(visuals) => {
                    if let Some(visual) = visuals.iter().find(|v| v.is_table_like()) {
                        candidates.push(VisualRef {
                            page: page.name.clone(),
                            visual: visual.name.clone(),
                        });
                    }
                }
                Err(e) => warn!(page = %page.name, error = %e, "Skipping page, visual listing failed"),
            }
        }

        debug!(count = candidates.len(), "Export candidates selected");
        candidates
    }
}
