//! Site walker: visit the fixed page-path list on one site, capture a
//! screenshot and run the feature detector per page.
//!
//! Fault isolation is per page: a navigation timeout, detection failure or
//! screenshot failure is logged and recorded as an `Err` visit, and the walk
//! continues with the next path. The walk itself never fails — only session
//! acquisition (outside this module) can kill a job. Each page handle is
//! closed before the next path is attempted.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};
use url::Url;

use crate::detector;
use crate::error::PageError;
use crate::events::{AnalysisEvent, EventBus};
use crate::renderer::{PageHandle, Session};
use crate::types::{FeatureMap, PageFeatures, PageId, PAGE_PATHS};

/// Which side of the comparison a walk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteLabel {
    A,
    B,
}

impl SiteLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteLabel::A => "siteA",
            SiteLabel::B => "siteB",
        }
    }
}

/// Everything captured for one successfully visited page.
#[derive(Debug, Clone)]
pub struct PageCapture {
    /// Stored screenshot reference, `/screenshots/<file>`.
    pub screenshot: String,
    pub features: PageFeatures,
}

/// Outcome of one page path, success or failure, in walk order.
#[derive(Debug)]
pub struct PageVisit {
    pub page: PageId,
    pub outcome: Result<PageCapture, PageError>,
}

/// Walks the fixed page-path list for a single site.
pub struct SiteWalker {
    label: SiteLabel,
    base_url: Url,
    nav_timeout_ms: u64,
    screenshot_dir: PathBuf,
    job_id: String,
    events: EventBus,
}

impl SiteWalker {
    pub fn new(
        label: SiteLabel,
        base_url: Url,
        nav_timeout_ms: u64,
        screenshot_dir: PathBuf,
        job_id: impl Into<String>,
        events: EventBus,
    ) -> Self {
        Self {
            label,
            base_url,
            nav_timeout_ms,
            screenshot_dir,
            job_id: job_id.into(),
            events,
        }
    }

    /// Visit every path in [`PAGE_PATHS`] in order. Infallible as a whole;
    /// individual failures are carried in the returned sequence.
    pub async fn walk(&self, session: &dyn Session) -> Vec<PageVisit> {
        let mut visits = Vec::with_capacity(PAGE_PATHS.len());
        for page in PAGE_PATHS {
            let started = Instant::now();
            let outcome = self.visit(session, page).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                Ok(_) => {
                    info!(
                        "{} {}: captured in {}ms",
                        self.label.as_str(),
                        page,
                        elapsed_ms
                    );
                    self.events.emit(AnalysisEvent::PageCaptured {
                        job_id: self.job_id.clone(),
                        site: self.label.as_str().to_string(),
                        page: page.as_str().to_string(),
                        elapsed_ms,
                    });
                }
                Err(e) => {
                    warn!("{} {}: {e} — page omitted", self.label.as_str(), page);
                    self.events.emit(AnalysisEvent::PageFailed {
                        job_id: self.job_id.clone(),
                        site: self.label.as_str().to_string(),
                        page: page.as_str().to_string(),
                        kind: e.kind().to_string(),
                        error: e.to_string(),
                    });
                }
            }
            visits.push(PageVisit { page, outcome });
        }
        visits
    }

    async fn visit(&self, session: &dyn Session, page: PageId) -> Result<PageCapture, PageError> {
        let target = self
            .base_url
            .join(page.path())
            .map_err(|e| PageError::Navigation {
                url: format!("{}{}", self.base_url, page.path()),
                reason: format!("could not resolve target URL: {e}"),
            })?;

        let handle = session.open(target.as_str(), self.nav_timeout_ms).await?;
        // Capture first, then always release the page handle.
        let captured = self.capture(handle.as_ref(), page).await;
        if let Err(e) = handle.close().await {
            warn!("{} {}: page close failed: {e}", self.label.as_str(), page);
        }
        captured
    }

    async fn capture(
        &self,
        handle: &dyn PageHandle,
        page: PageId,
    ) -> Result<PageCapture, PageError> {
        let png = handle.screenshot().await?;
        let filename = format!(
            "{}_{}_{}.png",
            self.label.as_str(),
            page.as_str(),
            chrono::Utc::now().timestamp_millis()
        );
        tokio::fs::write(self.screenshot_dir.join(&filename), &png).await?;

        let features = detector::detect(handle).await?;
        Ok(PageCapture {
            screenshot: format!("/screenshots/{filename}"),
            features,
        })
    }
}

/// Build the per-site feature map from a walk. Failed pages are omitted
/// entirely — never present with zeroed features.
pub fn collect_features(visits: &[PageVisit]) -> FeatureMap {
    let mut map = FeatureMap::new();
    for visit in visits {
        if let Ok(capture) = &visit.outcome {
            map.insert(visit.page, capture.features.clone());
        }
    }
    map
}

/// Screenshot references for the pages that loaded.
pub fn collect_screenshots(visits: &[PageVisit]) -> BTreeMap<PageId, String> {
    let mut map = BTreeMap::new();
    for visit in visits {
        if let Ok(capture) = &visit.outcome {
            map.insert(visit.page, capture.screenshot.clone());
        }
    }
    map
}
