//! Upload → analyze → configure → generate orchestration.
//!
//! [`Workflow`] owns the canonical session state. Every mutation goes through
//! one lock and is published as an immutable [`Snapshot`] on a watch channel,
//! so renderers can either poll [`Workflow::snapshot`] or await changes from
//! [`Workflow::subscribe`]. The lock is never held across a vendor call.
//!
//! Each analysis and batch captures the session epoch when it starts.
//! Selecting or clearing an image bumps the epoch, and results that come back
//! under an older epoch are dropped.

use crate::error::{ProductShotError, Result};
use crate::source::SourceImage;
use crate::types::{AspectRatio, GeneratedImage, GenerationConfig, ProductAnalysis, StyleOption};
use crate::vendor::{SynthesisRequest, VendorClient};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};

/// Shown when analysis fails for any reason other than configuration.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Image analysis failed. Please try again.";
/// Shown when a batch fails for any reason other than configuration.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Generation failed. Please check your API key and try again.";
/// Shown when the vendor credential is missing.
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "No API key configured. Set GEMINI_API_KEY (or GOOGLE_API_KEY) and try again.";
/// Shown when the source image could not be read.
pub const ENCODING_FAILED_MESSAGE: &str =
    "The image could not be read. Please choose another file.";

/// Where the session is in the upload → generate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No analysis is available; an image may or may not be loaded.
    #[default]
    Idle,
    /// Waiting for the vendor to analyze the current image.
    Analyzing,
    /// Analysis is available; configuration and generation are possible.
    Ready,
    /// A batch is in flight.
    Generating,
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Results were committed to the session.
    Applied,
    /// Preconditions were not met; nothing happened.
    Skipped,
    /// The session moved on before the vendor answered; results were dropped.
    Stale,
    /// The batch was cancelled; the gallery is unchanged.
    Cancelled,
}

/// Immutable view of the session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Current phase.
    pub phase: Phase,
    /// The loaded product photo.
    #[serde(skip)]
    pub source: Option<SourceImage>,
    /// Live analysis of `source`.
    pub analysis: Option<Arc<ProductAnalysis>>,
    /// Ratio, count and selected style for the next batch.
    pub config: GenerationConfig,
    /// Free-text instructions added to every prompt of the next batch.
    pub custom_instructions: Option<String>,
    /// Generated images, newest first.
    pub gallery: Vec<GeneratedImage>,
    /// User-facing message from the last failed operation.
    pub error: Option<String>,
}

impl Snapshot {
    /// The selected style, if it resolves within the live analysis.
    pub fn selected_style(&self) -> Option<&StyleOption> {
        let id = self.config.selected_style_id()?;
        self.analysis.as_deref()?.style(id)
    }

    /// Whether [`Workflow::generate`] would start a batch right now.
    pub fn can_generate(&self) -> bool {
        self.phase == Phase::Ready && self.source.is_some() && self.selected_style().is_some()
    }

    /// Whether ratio, count and instructions can be edited.
    pub fn config_editable(&self) -> bool {
        self.phase != Phase::Generating
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Analysis,
    Generation,
}

/// Maps an error to the single message shown for its operation kind.
fn user_message(operation: Operation, err: &ProductShotError) -> String {
    match (err, operation) {
        (ProductShotError::Configuration(_), _) => MISSING_CREDENTIAL_MESSAGE.to_string(),
        (ProductShotError::Encoding(_), _) => ENCODING_FAILED_MESSAGE.to_string(),
        (_, Operation::Analysis) => ANALYSIS_FAILED_MESSAGE.to_string(),
        (_, Operation::Generation) => GENERATION_FAILED_MESSAGE.to_string(),
    }
}

struct ActiveBatch {
    seq: u64,
    cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct Session {
    snapshot: Snapshot,
    epoch: u64,
    batch_seq: u64,
    active_batch: Option<ActiveBatch>,
}

impl Session {
    /// Drops everything derived from the current image and starts a new epoch.
    /// Dropping the active batch's sender cancels it.
    fn invalidate(&mut self) -> u64 {
        self.active_batch = None;
        self.snapshot.analysis = None;
        self.snapshot.config.select_style(None);
        self.snapshot.gallery.clear();
        self.snapshot.error = None;
        self.epoch += 1;
        self.epoch
    }
}

struct BatchPlan {
    source: SourceImage,
    analysis: Arc<ProductAnalysis>,
    style: StyleOption,
    ratio: AspectRatio,
    count: u8,
    custom_instructions: Option<String>,
    epoch: u64,
    seq: u64,
    cancelled: oneshot::Receiver<()>,
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Analysis,
    Batch { seq: u64 },
}

/// Rolls the session back when an analysis or batch future is dropped
/// before it commits. Only acts if the epoch (and batch) it was armed for
/// is still current.
struct PendingGuard<'a, C: VendorClient> {
    workflow: &'a Workflow<C>,
    epoch: u64,
    pending: Pending,
    armed: bool,
}

impl<'a, C: VendorClient> PendingGuard<'a, C> {
    fn new(workflow: &'a Workflow<C>, epoch: u64, pending: Pending) -> Self {
        Self {
            workflow,
            epoch,
            pending,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<C: VendorClient> Drop for PendingGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let epoch = self.epoch;
        match self.pending {
            Pending::Analysis => self.workflow.update(|s| {
                if s.epoch == epoch && s.snapshot.phase == Phase::Analyzing {
                    tracing::warn!(epoch, "analysis dropped before completing");
                    s.snapshot.phase = Phase::Idle;
                }
            }),
            Pending::Batch { seq } => self.workflow.update(|s| {
                let current = s.active_batch.as_ref().is_some_and(|b| b.seq == seq);
                if s.epoch == epoch && current {
                    tracing::warn!(epoch, seq, "generation batch dropped before completing");
                    s.active_batch = None;
                    s.snapshot.phase = Phase::Ready;
                }
            }),
        }
    }
}

/// Session orchestrator driving a [`VendorClient`].
pub struct Workflow<C> {
    client: Arc<C>,
    session: Mutex<Session>,
    updates: watch::Sender<Snapshot>,
}

impl<C: VendorClient> Workflow<C> {
    /// Creates an idle workflow.
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    /// Creates an idle workflow around a shared client.
    pub fn with_shared_client(client: Arc<C>) -> Self {
        let (updates, _) = watch::channel(Snapshot::default());
        Self {
            client,
            session: Mutex::new(Session::default()),
            updates,
        }
    }

    /// The vendor client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Current state.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    /// Receives a new snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a mutation and publishes the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.lock();
        let result = f(&mut session);
        self.updates.send_replace(session.snapshot.clone());
        result
    }

    /// Replaces the source image and analyzes it.
    ///
    /// Prior analysis, style selection and gallery are cleared before the
    /// vendor is called. On success the first suggested style is selected.
    /// On failure the image is kept so [`retry_analysis`](Self::retry_analysis)
    /// can be used. The same holds if the returned future is dropped before
    /// the vendor answers.
    pub async fn select_image(&self, image: SourceImage) -> Result<Outcome> {
        let epoch = self.update(|s| {
            let epoch = s.invalidate();
            s.snapshot.source = Some(image.clone());
            s.snapshot.phase = Phase::Analyzing;
            epoch
        });

        tracing::debug!(
            epoch,
            mime_type = image.mime_type(),
            size_bytes = image.size(),
            "analyzing new source image"
        );
        self.run_analysis(image, epoch).await
    }

    /// Analyzes the current image again, replacing any live analysis.
    ///
    /// Skipped while analyzing or generating, or when no image is loaded.
    pub async fn retry_analysis(&self) -> Result<Outcome> {
        let started = self.update(|s| {
            if matches!(s.snapshot.phase, Phase::Analyzing | Phase::Generating) {
                return None;
            }
            let image = s.snapshot.source.clone()?;
            s.snapshot.analysis = None;
            s.snapshot.config.select_style(None);
            s.snapshot.error = None;
            s.snapshot.phase = Phase::Analyzing;
            s.epoch += 1;
            Some((image, s.epoch))
        });

        match started {
            Some((image, epoch)) => self.run_analysis(image, epoch).await,
            None => Ok(Outcome::Skipped),
        }
    }

    async fn run_analysis(&self, image: SourceImage, epoch: u64) -> Result<Outcome> {
        let mut guard = PendingGuard::new(self, epoch, Pending::Analysis);
        let result = self.client.analyze(&image).await;
        guard.disarm();

        self.update(|s| {
            if s.epoch != epoch {
                tracing::warn!(epoch, current = s.epoch, "discarding stale analysis");
                return Ok(Outcome::Stale);
            }
            match result {
                Ok(analysis) => {
                    let default_style = analysis.default_style().map(|st| st.id.clone());
                    if default_style.is_none() {
                        tracing::warn!(product = %analysis.product_name, "analysis suggested no styles");
                    }
                    s.snapshot.config.select_style(default_style);
                    s.snapshot.analysis = Some(Arc::new(analysis));
                    s.snapshot.phase = Phase::Ready;
                    Ok(Outcome::Applied)
                }
                Err(e) => {
                    tracing::error!(error = %e, "product analysis failed");
                    s.snapshot.error = Some(user_message(Operation::Analysis, &e));
                    s.snapshot.phase = Phase::Idle;
                    Err(e)
                }
            }
        })
    }

    /// Clears the image and everything derived from it, including the
    /// configuration. Cancels any in-flight batch.
    pub fn clear_image(&self) {
        self.update(|s| {
            s.invalidate();
            s.snapshot.source = None;
            s.snapshot.config = GenerationConfig::default();
            s.snapshot.custom_instructions = None;
            s.snapshot.phase = Phase::Idle;
        });
    }

    /// Selects a style for the next batch. Always allowed; an in-flight
    /// batch keeps the style it started with.
    pub fn select_style(&self, id: impl Into<String>) {
        let id = id.into();
        self.update(|s| s.snapshot.config.select_style(Some(id)));
    }

    /// Sets the aspect ratio. Ignored (returns false) while generating.
    pub fn set_ratio(&self, ratio: AspectRatio) -> bool {
        self.update(|s| {
            if !s.snapshot.config_editable() {
                return false;
            }
            s.snapshot.config.set_ratio(ratio);
            true
        })
    }

    /// Sets the batch size, clamped to 1..=4. Returns the stored value, or
    /// `None` if ignored while generating.
    pub fn set_count(&self, count: u32) -> Option<u8> {
        self.update(|s| {
            if !s.snapshot.config_editable() {
                return None;
            }
            Some(s.snapshot.config.set_count(count))
        })
    }

    /// Sets free-text instructions for later batches. Ignored (returns
    /// false) while generating.
    pub fn set_instructions(&self, instructions: Option<String>) -> bool {
        let instructions = instructions.filter(|s| !s.trim().is_empty());
        self.update(|s| {
            if !s.snapshot.config_editable() {
                return false;
            }
            s.snapshot.custom_instructions = instructions;
            true
        })
    }

    /// Cancels the in-flight batch. The gallery is left unchanged.
    pub fn cancel_generation(&self) -> bool {
        self.update(|s| match s.active_batch.take() {
            Some(batch) => {
                let _ = batch.cancel.send(());
                s.snapshot.phase = Phase::Ready;
                true
            }
            None => false,
        })
    }

    fn plan_batch(&self) -> Option<BatchPlan> {
        self.update(|s| {
            if s.snapshot.phase != Phase::Ready {
                return None;
            }
            let source = s.snapshot.source.clone()?;
            let analysis = s.snapshot.analysis.clone()?;
            let style = analysis.style(s.snapshot.config.selected_style_id()?)?.clone();

            let (cancel, cancelled) = oneshot::channel();
            s.batch_seq += 1;
            s.active_batch = Some(ActiveBatch {
                seq: s.batch_seq,
                cancel,
            });
            s.snapshot.error = None;
            s.snapshot.phase = Phase::Generating;

            Some(BatchPlan {
                source,
                analysis,
                style,
                ratio: s.snapshot.config.ratio(),
                count: s.snapshot.config.count(),
                custom_instructions: s.snapshot.custom_instructions.clone(),
                epoch: s.epoch,
                seq: s.batch_seq,
                cancelled,
            })
        })
    }

    /// Generates `count` images concurrently with the selected style and ratio.
    ///
    /// The batch is all-or-nothing: either every image is prepended to the
    /// gallery in ordinal order, or none are. Skipped unless the session is
    /// `Ready` with an image, an analysis and a style that resolves in it.
    ///
    /// Dropping the returned future cancels the batch the same way
    /// [`cancel_generation`](Self::cancel_generation) does.
    pub async fn generate(&self) -> Result<Outcome> {
        let Some(plan) = self.plan_batch() else {
            tracing::debug!("generate preconditions not met");
            return Ok(Outcome::Skipped);
        };
        let BatchPlan {
            source,
            analysis,
            style,
            ratio,
            count,
            custom_instructions,
            epoch,
            seq,
            cancelled,
        } = plan;
        let mut guard = PendingGuard::new(self, epoch, Pending::Batch { seq });

        let batch_id = uuid::Uuid::new_v4();
        tracing::debug!(%batch_id, count, %ratio, style = %style.name, "starting generation batch");

        let client = &*self.client;
        let request = SynthesisRequest {
            image: &source,
            analysis: &analysis,
            style: &style,
            ratio,
            custom_instructions: custom_instructions.as_deref(),
        };
        let style_name = style.name.as_str();

        let calls = (0..count).map(move |ordinal| async move {
            let url = client.synthesize(&request).await.inspect_err(|e| {
                tracing::warn!(%batch_id, ordinal, error = %e, "synthesis call failed");
            })?;
            Ok::<_, ProductShotError>(GeneratedImage {
                id: format!("{}-{}", batch_id, ordinal),
                url,
                style_name: style_name.to_string(),
                ratio,
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
        });

        let result = tokio::select! {
            result = try_join_all(calls) => Some(result),
            _ = cancelled => None,
        };
        guard.disarm();

        self.update(|s| {
            let still_active = s.active_batch.as_ref().is_some_and(|b| b.seq == seq);
            if s.epoch != epoch {
                tracing::warn!(%batch_id, "discarding stale generation batch");
                return Ok(Outcome::Stale);
            }
            let Some(result) = result.filter(|_| still_active) else {
                tracing::warn!(%batch_id, "generation batch cancelled");
                return Ok(Outcome::Cancelled);
            };

            s.active_batch = None;
            s.snapshot.phase = Phase::Ready;
            match result {
                Ok(mut images) => {
                    images.append(&mut s.snapshot.gallery);
                    s.snapshot.gallery = images;
                    tracing::debug!(%batch_id, gallery = s.snapshot.gallery.len(), "generation batch committed");
                    Ok(Outcome::Applied)
                }
                Err(e) => {
                    tracing::error!(%batch_id, error = %e, "generation batch failed");
                    s.snapshot.error = Some(user_message(Operation::Generation, &e));
                    Err(e)
                }
            }
        })
    }
}
