// ABOUTME: Report metadata resolution and page/visual enumeration
// ABOUTME: Maps a report id to its backing dataset and lists visuals for export selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{read_body, AccessToken, PowerBiClient};
use crate::{
    config::ReportTarget,
    errors::{BiError, BiResult},
    models::ReportMetadata,
};

/// A page of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    /// Internal page name used in API paths
    pub name: String,
    /// Display name shown in the report
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A visual on a report page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVisual {
    /// Internal visual name used in export requests
    pub name: String,
    /// Visual title, when set
    #[serde(default)]
    pub title: Option<String>,
    /// Declared visual type, e.g. `tableEx` or `pivotTable`
    #[serde(rename = "type", default)]
    pub visual_type: String,
}

impl ReportVisual {
    /// Whether the visual renders tabular data worth exporting
    #[must_use]
    pub fn is_table_like(&self) -> bool {
        let kind = self.visual_type.to_lowercase();
        kind.contains("table") || kind.contains("matrix") || kind.contains("pivot")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dataset_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

impl PowerBiClient {
    /// Resolve a report to its dataset id and display name
    ///
    /// Returns `Ok(None)` when the report has no dataset binding, which is a
    /// valid reason to skip BI augmentation rather than a failure.
    ///
    /// # Errors
    ///
    /// Returns [`BiError::MetadataFailure`] on a non-2xx response
    pub async fn report_metadata(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
    ) -> BiResult<Option<ReportMetadata>> {
        let response = self
            .http
            .get(self.report_url(target, ""))
            .bearer_auth(token.secret())
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !(200..300).contains(&status) {
            return Err(BiError::MetadataFailure {
                status,
                detail: body,
            });
        }

        let report: ReportResponse = serde_json::from_str(&body)?;
        let Some(dataset_id) = report.dataset_id.filter(|id| !id.is_empty()) else {
            warn!(
                report_id = %target.report_id,
                "Report metadata has no dataset binding"
            );
            return Ok(None);
        };

        let name = report
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| target.report_id.clone());
        debug!(report = %name, dataset_id = %dataset_id, "Resolved report metadata");

        Ok(Some(ReportMetadata { dataset_id, name }))
    }

    /// List the pages of the report
    ///
    /// # Errors
    ///
    /// Returns [`BiError::MetadataFailure`] on a non-2xx response
    pub async fn list_pages(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
    ) -> BiResult<Vec<ReportPage>> {
        self.get_value_list(token, self.report_url(target, "pages"))
            .await
    }

    /// List the visuals on one report page
    ///
    /// # Errors
    ///
    /// Returns [`BiError::MetadataFailure`] on a non-2xx response
    pub async fn list_visuals(
        &self,
        token: &AccessToken,
        target: &ReportTarget,
        page: &str,
    ) -> BiResult<Vec<ReportVisual>> {
        let path = format!("pages/{}/visuals", urlencoding::encode(page));
        self.get_value_list(token, self.report_url(target, &path))
            .await
    }

    async fn get_value_list<T>(&self, token: &AccessToken, url: String) -> BiResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !(200..300).contains(&status) {
            return Err(BiError::MetadataFailure {
                status,
                detail: body,
            });
        }

        let list: ValueList<T> = serde_json::from_str(&body)?;
        Ok(list.value)
    }
}
