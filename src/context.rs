// ABOUTME: Context assembler driving the prioritized BI data acquisition tiers
// ABOUTME: Short-circuits on the first tier that yields data and never surfaces tier failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors

//! # Context Assembler
//!
//! Turns the configured report into one bounded [`ContextBlock`]:
//!
//! 1. token exchange and report resolution (mandatory; any failure means
//!    no context at all)
//! 2. schema discovery and row sampling, unless sampling is disabled
//! 3. CSV export of a table-like visual
//! 4. the local snapshot file
//!
//! Tiers run strictly in order and only while every earlier tier came back
//! empty. Each tier is a function returning `Option`; failures inside a tier
//! are logged there and become `None`.

use tracing::{info, warn};

use crate::{
    config::{PowerBiConfig, ReportTarget},
    models::{ContextBlock, ReportMetadata, SampleBlock},
    powerbi::{AccessToken, PowerBiClient},
    snapshot::{load_snapshot, summarize_csv},
};

/// Token, target and metadata resolved by the mandatory first step
struct ResolvedReport {
    token: AccessToken,
    target: ReportTarget,
    metadata: ReportMetadata,
}

/// Builds the BI context for one chat request
pub struct ContextAssembler<'a> {
    client: &'a PowerBiClient,
    config: &'a PowerBiConfig,
}

impl<'a> ContextAssembler<'a> {
    /// Create an assembler over a client and immutable settings
    #[must_use]
    pub const fn new(client: &'a PowerBiClient, config: &'a PowerBiConfig) -> Self {
        Self { client, config }
    }

    /// Run the pipeline
    ///
    /// Returns `None` when the pipeline is unconfigured or the report could
    /// not be resolved. A resolved report with no sampleable data still
    /// yields a placeholder block.
    pub async fn assemble(&self) -> Option<ContextBlock> {
        let report = self.resolve_report().await?;

        if let Some(blocks) = self.sampling_tier(&report).await {
            info!(tier = "dataset_sample", blocks = blocks.len(), "BI context assembled");
            return Some(ContextBlock::with_samples(&report.metadata, blocks));
        }
        if let Some(blocks) = self.export_tier(&report).await {
            info!(tier = "visual_export", blocks = blocks.len(), "BI context assembled");
            return Some(ContextBlock::with_samples(&report.metadata, blocks));
        }
        if let Some(blocks) = self.snapshot_tier().await {
            info!(tier = "snapshot", "BI context assembled");
            return Some(ContextBlock::with_samples(&report.metadata, blocks));
        }

        info!(report = %report.metadata.name, "No tier produced data, using placeholder");
        Some(ContextBlock::unsampleable(&report.metadata))
    }

    async fn resolve_report(&self) -> Option<ResolvedReport> {
        let (credential, target) = match self.config.prerequisites() {
            Ok(prerequisites) => prerequisites,
            Err(e) => {
                info!(reason = %e, "Power BI not configured, skipping BI context");
                return None;
            }
        };

        let token = match self.client.acquire_token(&credential).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Power BI token exchange failed");
                return None;
            }
        };

        let metadata = match self.client.report_metadata(&token, &target).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Power BI report resolution failed");
                return None;
            }
        };

        Some(ResolvedReport {
            token,
            target,
            metadata,
        })
    }

    async fn sampling_tier(&self, report: &ResolvedReport) -> Option<Vec<SampleBlock>> {
        if self.config.sampling_disabled {
            info!("Dataset sampling disabled, skipping to export tier");
            return None;
        }

        let schema = match self
            .client
            .discover_schema(
                &report.token,
                &report.target,
                &report.metadata.dataset_id,
                &self.config.fallback_catalog,
            )
            .await
        {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "Schema discovery failed");
                return None;
            }
        };

        if schema.tables.is_empty() {
            info!("Schema discovery found no sampleable tables");
            return None;
        }

        let blocks = self
            .client
            .sample_tables(
                &report.token,
                &report.target,
                &report.metadata.dataset_id,
                &schema.tables,
            )
            .await;
        non_empty(blocks)
    }

    async fn export_tier(&self, report: &ResolvedReport) -> Option<Vec<SampleBlock>> {
        let configured = self.config.visual_override();
        let candidates = self
            .client
            .find_export_candidates(&report.token, &report.target, configured.as_ref())
            .await;

        for visual in candidates {
            let csv = match self
                .client
                .export_visual_csv(
                    &report.token,
                    &report.target,
                    &visual,
                    &self.config.export_poll,
                )
                .await
            {
                Ok(Some(csv)) => csv,
                Ok(None) => continue,
                Err(e) => {
                    warn!(page = %visual.page, visual = %visual.visual, error = %e, "Visual export failed");
                    continue;
                }
            };

            let label = format!("Visual: {} / {}", visual.page, visual.visual);
            if let Some(block) = summarize_csv(label, &csv) {
                return Some(vec![block]);
            }
        }

        None
    }

    async fn snapshot_tier(&self) -> Option<Vec<SampleBlock>> {
        let path = self.config.snapshot_path.as_deref()?;
        load_snapshot(path).await.map(|block| vec![block])
    }
}

fn non_empty(blocks: Vec<SampleBlock>) -> Option<Vec<SampleBlock>> {
    if blocks.is_empty() {
        None
    } else {
        Some(blocks)
    }
}
