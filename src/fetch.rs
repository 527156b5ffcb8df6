//! Per-record concurrent fetch.
//!
//! [`FetchOrchestrator::fetch_all`] obtains a token, issues the image,
//! sample-points and cloud queries (plus stereo, when enabled) at the same
//! time, waits for all of them, and only then classifies the result. The
//! queries draw permits from one semaphore shared by the whole batch, so a
//! long to-do list never widens the fan-out.
//!
//! | Result | Outcome |
//! |--------|---------|
//! | image fetch non-2xx | [`FetchOutcome::Skipped`] with the status |
//! | image not ingest complete | [`FetchOutcome::Skipped`], incomplete |
//! | any other fetch error | [`FetchOutcome::Failed`] |
//! | all fetches succeed | [`FetchOutcome::Fetched`] |
//!
//! A token failure is returned as `Err`: it ends the batch.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{IngestError, IngestResult};
use crate::inventory::MetadataSource;
use crate::models::{CloudCovers, ImageRecord, SamplePoints, StereoPairs};
use crate::normalize::StereoPolicy;
use crate::token::TokenProvider;

/// Everything fetched for one record.
#[derive(Debug, Clone)]
pub struct Fragments {
    pub image: ImageRecord,
    pub points: SamplePoints,
    pub cloud: CloudCovers,
    pub stereo: Option<StereoPairs>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Status(u16),
    Incomplete,
}

impl SkipReason {
    pub fn ledger_category(&self) -> String {
        match self {
            SkipReason::Status(code) => code.to_string(),
            SkipReason::Incomplete => "incomplete".to_string(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Status(code) => write!(f, "inventory returned HTTP {}", code),
            SkipReason::Incomplete => write!(f, "image is not ingest complete"),
        }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Box<Fragments>),
    Skipped(SkipReason),
    Failed(IngestError),
}

pub struct FetchOrchestrator<S> {
    source: S,
    permits: Arc<Semaphore>,
    stereo: StereoPolicy,
}

impl<S: MetadataSource> FetchOrchestrator<S> {
    pub fn new(source: S, concurrency: usize, stereo: StereoPolicy) -> Self {
        Self {
            source,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            stereo,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn fetch_all(
        &self,
        tokens: &mut dyn TokenProvider,
        image_id: &str,
    ) -> IngestResult<FetchOutcome> {
        let token = tokens.get_token().await?;
        let token = token.as_str();

        let (image, points, cloud, stereo) = tokio::join!(
            self.bounded(self.source.get_image(token, image_id)),
            self.bounded(self.source.get_sample_points_summary(token, image_id)),
            self.bounded(self.source.get_cloud(token, image_id)),
            self.stereo_fetch(token, image_id),
        );

        Ok(classify(image_id, image, points, cloud, stereo))
    }

    async fn stereo_fetch(
        &self,
        token: &str,
        image_id: &str,
    ) -> IngestResult<Option<StereoPairs>> {
        match self.stereo {
            StereoPolicy::AssumeEmpty => Ok(None),
            StereoPolicy::Fetch => self
                .bounded(self.source.get_stereo(token, image_id))
                .await
                .map(Some),
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> IngestResult<T>
    where
        F: std::future::Future<Output = IngestResult<T>>,
    {
        // The semaphore is never closed.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| IngestError::data(format!("fetch pool closed: {}", e)))?;
        fut.await
    }
}

fn classify(
    image_id: &str,
    image: IngestResult<ImageRecord>,
    points: IngestResult<SamplePoints>,
    cloud: IngestResult<CloudCovers>,
    stereo: IngestResult<Option<StereoPairs>>,
) -> FetchOutcome {
    let image = match image {
        Ok(image) => image,
        Err(IngestError::Source { status, .. }) => {
            return FetchOutcome::Skipped(SkipReason::Status(status))
        }
        Err(e) => return FetchOutcome::Failed(e),
    };
    if !image.is_ingest_complete {
        return FetchOutcome::Skipped(SkipReason::Incomplete);
    }

    let fragments = points.and_then(|points| {
        let cloud = cloud?;
        let stereo = stereo?;
        Ok(Fragments {
            image,
            points,
            cloud,
            stereo,
        })
    });

    match fragments {
        Ok(f) => {
            tracing::debug!(image_id, "all fragments fetched");
            FetchOutcome::Fetched(Box::new(f))
        }
        Err(e) => FetchOutcome::Failed(e),
    }
}
