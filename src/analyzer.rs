// Copyright 2026 Matchup Contributors
// SPDX-License-Identifier: Apache-2.0

//! One analysis job end to end: validate the two site URLs, acquire a
//! rendering session, walk both sites concurrently, and reconcile the two
//! feature maps into the comparison matrix.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::events::EventBus;
use crate::matrix;
use crate::renderer::Browser;
use crate::types::{AnalysisResult, SiteAnalysis};
use crate::walker::{collect_features, collect_screenshots, SiteLabel, SiteWalker};

/// Validate and normalize a site URL. Rejected before any walk starts.
pub fn parse_site_url(input: &str) -> Result<Url, AnalysisError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::InvalidInput("site URL is required".into()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| AnalysisError::InvalidInput(format!("malformed URL '{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AnalysisError::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AnalysisError::InvalidInput(format!(
            "URL '{trimmed}' has no host"
        )));
    }
    Ok(url)
}

/// Runs analysis jobs against a browser engine.
pub struct Analyzer {
    browser: Arc<dyn Browser>,
    nav_timeout_ms: u64,
    screenshot_dir: PathBuf,
    events: EventBus,
}

impl Analyzer {
    pub fn new(browser: Arc<dyn Browser>, config: &AppConfig, events: EventBus) -> Self {
        Self {
            browser,
            nav_timeout_ms: config.nav_timeout_ms,
            screenshot_dir: config.screenshot_dir(),
            events,
        }
    }

    pub fn browser(&self) -> &Arc<dyn Browser> {
        &self.browser
    }

    /// Analyze two competitor sites. `job_tag` labels emitted events (a job
    /// id, or "cli" for one-shot runs).
    ///
    /// The two walks share one rendering session and run concurrently; they
    /// have no shared mutable state and reconciliation is insensitive to
    /// which finishes first. Page-level failures surface only as missing
    /// matrix entries; only session acquisition fails the job.
    pub async fn analyze(
        &self,
        job_tag: &str,
        url_a: &str,
        url_b: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let base_a = parse_site_url(url_a)?;
        let base_b = parse_site_url(url_b)?;

        let session = self
            .browser
            .acquire_session()
            .await
            .map_err(|e| AnalysisError::SessionAcquisition(format!("{e:#}")))?;

        info!("analyzing {} vs {}", base_a, base_b);

        let walker_a = SiteWalker::new(
            SiteLabel::A,
            base_a.clone(),
            self.nav_timeout_ms,
            self.screenshot_dir.clone(),
            job_tag,
            self.events.clone(),
        );
        let walker_b = SiteWalker::new(
            SiteLabel::B,
            base_b.clone(),
            self.nav_timeout_ms,
            self.screenshot_dir.clone(),
            job_tag,
            self.events.clone(),
        );

        let (visits_a, visits_b) = tokio::join!(
            walker_a.walk(session.as_ref()),
            walker_b.walk(session.as_ref())
        );

        if let Err(e) = session.close().await {
            warn!("session close failed: {e:#}");
        }

        let features_a = collect_features(&visits_a);
        let features_b = collect_features(&visits_b);
        let feature_matrix = matrix::reconcile(&features_a, &features_b);

        Ok(AnalysisResult {
            site_a: SiteAnalysis {
                url: base_a.to_string(),
                screenshots: collect_screenshots(&visits_a),
                features: features_a,
            },
            site_b: SiteAnalysis {
                url: base_b.to_string(),
                screenshots: collect_screenshots(&visits_b),
                features: features_b,
            },
            feature_matrix,
        })
    }
}
