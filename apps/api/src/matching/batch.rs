//! Batch Orchestrator: drives the upload queue through analysis against one job.
//!
//! Flow per batch: credential check → claim the queue → authoritative job
//! lookup → for each file in queue order: throttle → analyze → store candidate
//! → write job counters → mark completed. Files are processed strictly one at
//! a time. The job value is threaded through the loop inside `BatchTally`, so
//! counter writes accumulate without re-fetching the job.
//!
//! Failure policy:
//! - missing AI credential, unknown job: the whole batch fails before any file.
//! - quota exhaustion: the failing file is marked ERROR and the loop stops.
//! - job removed mid-batch (counter write finds no job): same as quota.
//! - anything else: the file is marked ERROR and the loop moves on.
//!
//! Completed files are never rolled back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::llm_client::AiError;
use crate::matching::analyzer::{JobContext, ResumeAnalysis, ResumeAnalyzer};
use crate::matching::candidate::build_candidate;
use crate::matching::file_reader::ResumeFile;
use crate::matching::queue::{FileStatus, SharedQueue};
use crate::models::job::Job;
use crate::store::{PipelineStore, StoreError};

const QUOTA_MESSAGE: &str = "AI provider quota exceeded. Please wait or use a different API key.";

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    /// Pause before every AI call except the first one of a batch.
    pub throttle: Duration,
    /// How long the completion banner stays visible.
    pub success_banner: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        // 15 requests/minute on the provider's free tier.
        Self {
            throttle: Duration::from_secs(3),
            success_banner: Duration::from_secs(5),
        }
    }
}

/// Errors that stop a batch before any file is attempted.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{0}")]
    Configuration(AiError),

    #[error("A batch analysis is already running")]
    AlreadyRunning,

    #[error("The selected job {0} could not be found in the database. Please refresh.")]
    JobNotFound(String),

    #[error("Failed to load jobs: {0}")]
    Store(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HaltReason {
    QuotaExceeded,
    JobRemoved,
    MissingCredential,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub halted: Option<HaltReason>,
    /// The job with counters as written during this batch.
    pub job: Job,
}

/// Accumulator threaded through the loop: each step consumes the tally and
/// returns the next one.
#[derive(Debug)]
struct BatchTally {
    job: Job,
    attempted: usize,
    completed: usize,
    failed: usize,
    skipped: usize,
    halted: Option<HaltReason>,
}

impl BatchTally {
    fn new(job: Job) -> Self {
        Self {
            job,
            attempted: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            halted: None,
        }
    }

    fn skip(self) -> Self {
        Self {
            skipped: self.skipped + 1,
            ..self
        }
    }

    fn succeed(self, job: Job) -> Self {
        Self {
            job,
            attempted: self.attempted + 1,
            completed: self.completed + 1,
            ..self
        }
    }

    fn fail(self, halted: Option<HaltReason>) -> Self {
        Self {
            attempted: self.attempted + 1,
            failed: self.failed + 1,
            halted,
            ..self
        }
    }

    fn into_report(self) -> BatchReport {
        BatchReport {
            attempted: self.attempted,
            completed: self.completed,
            failed: self.failed,
            skipped: self.skipped,
            halted: self.halted,
            job: self.job,
        }
    }
}

/// Why a single file failed.
#[derive(Debug)]
enum FileFailure {
    Analysis(AiError),
    CandidateWrite(StoreError),
    CounterWrite(StoreError),
}

impl FileFailure {
    fn halt_reason(&self) -> Option<HaltReason> {
        match self {
            FileFailure::Analysis(e) if e.is_quota() => Some(HaltReason::QuotaExceeded),
            FileFailure::Analysis(AiError::MissingCredential) => {
                Some(HaltReason::MissingCredential)
            }
            FileFailure::CounterWrite(StoreError::NotFound(_)) => Some(HaltReason::JobRemoved),
            _ => None,
        }
    }

    fn user_message(&self, file_name: &str, job_id: &str) -> String {
        match self.halt_reason() {
            Some(HaltReason::QuotaExceeded) => QUOTA_MESSAGE.to_string(),
            Some(HaltReason::JobRemoved) => {
                format!("Job {job_id} no longer exists. Stopped after {file_name}.")
            }
            _ => match self {
                FileFailure::Analysis(e) => format!("Error with {file_name}: {e}"),
                FileFailure::CandidateWrite(e) => {
                    format!("Error saving candidate from {file_name}: {e}")
                }
                FileFailure::CounterWrite(e) => {
                    format!("Error updating job stats for {file_name}: {e}")
                }
            },
        }
    }
}

#[derive(Clone)]
pub struct BatchRunner {
    analyzer: Arc<dyn ResumeAnalyzer>,
    store: Arc<dyn PipelineStore>,
    settings: BatchSettings,
}

impl BatchRunner {
    pub fn new(
        analyzer: Arc<dyn ResumeAnalyzer>,
        store: Arc<dyn PipelineStore>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            analyzer,
            store,
            settings,
        }
    }

    /// Runs one batch of the queue against `job_id` to completion.
    pub async fn run(
        &self,
        queue: &SharedQueue,
        job_id: &str,
        user_id: Option<&str>,
    ) -> Result<BatchReport, BatchError> {
        self.claim(queue).await?;
        self.finish(queue, job_id, user_id).await
    }

    /// Claims the queue, then drives the batch on its own task so a dropped
    /// request cannot cancel it midway. Claim failures are returned directly.
    pub async fn spawn(
        &self,
        queue: SharedQueue,
        job_id: String,
        user_id: Option<String>,
    ) -> Result<JoinHandle<Result<BatchReport, BatchError>>, BatchError> {
        self.claim(&queue).await?;
        let runner = self.clone();
        Ok(tokio::spawn(async move {
            runner.finish(&queue, &job_id, user_id.as_deref()).await
        }))
    }

    async fn claim(&self, queue: &SharedQueue) -> Result<(), BatchError> {
        if let Err(e) = self.analyzer.ensure_configured() {
            error!("Batch refused: {e}");
            queue.write().await.set_error(e.to_string());
            return Err(BatchError::Configuration(e));
        }

        if !queue.write().await.begin_batch() {
            return Err(BatchError::AlreadyRunning);
        }
        Ok(())
    }

    async fn finish(
        &self,
        queue: &SharedQueue,
        job_id: &str,
        user_id: Option<&str>,
    ) -> Result<BatchReport, BatchError> {
        let result = self.run_claimed(queue, job_id, user_id).await;

        let mut guard = queue.write().await;
        if let Err(e) = &result {
            error!("Batch failed: {e}");
            guard.set_error(e.to_string());
        }
        guard.end_batch();
        info!("Analysis session finished");

        result
    }

    async fn run_claimed(
        &self,
        queue: &SharedQueue,
        job_id: &str,
        user_id: Option<&str>,
    ) -> Result<BatchReport, BatchError> {
        // Re-read the job right before starting; the caller's copy may be stale.
        let job = self
            .store
            .fetch_jobs(user_id)
            .await
            .map_err(BatchError::Store)?
            .into_iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| BatchError::JobNotFound(job_id.to_string()))?;

        info!("Target job found: {}", job.title);

        let ids = queue.read().await.ids();
        let total = ids.len();
        let mut tally = BatchTally::new(job);

        for (index, id) in ids.iter().enumerate() {
            let Some(file) = pending_file(queue, id).await else {
                tally = tally.skip();
                continue;
            };

            // Counts attempted files, not queue positions: skipped files never pause.
            if tally.attempted > 0 {
                info!("Throttling for {}ms", self.settings.throttle.as_millis());
                tokio::time::sleep(self.settings.throttle).await;
            }

            info!("Processing file {}/{}: {}", index + 1, total, file.name);
            tally = self.process_file(queue, tally, index, id, &file, user_id).await;

            if let Some(reason) = tally.halted {
                warn!("Stopping batch early: {reason:?}");
                break;
            }
        }

        if tally.attempted > 0 {
            queue
                .write()
                .await
                .show_success_until(Instant::now() + self.settings.success_banner);
        }

        Ok(tally.into_report())
    }

    async fn process_file(
        &self,
        queue: &SharedQueue,
        tally: BatchTally,
        index: usize,
        id: &str,
        file: &ResumeFile,
        user_id: Option<&str>,
    ) -> BatchTally {
        queue.write().await.mark_parsing(id);

        let outcome = self
            .analyze_and_store(queue, &tally.job, index, id, file, user_id)
            .await;

        match outcome {
            Ok((analysis, job)) => {
                info!("File {} completed: {}%", file.name, analysis.match_score);
                queue.write().await.mark_completed(id, analysis);
                tally.succeed(job)
            }
            Err(failure) => {
                warn!("Error analyzing {}: {failure:?}", file.name);
                let message = failure.user_message(&file.name, &tally.job.id);
                let mut guard = queue.write().await;
                guard.mark_failed(id);
                guard.set_error(message);
                drop(guard);
                tally.fail(failure.halt_reason())
            }
        }
    }

    /// Analysis, candidate insert, then counter update. Returns the analysis
    /// and the job as it stands after this file.
    async fn analyze_and_store(
        &self,
        queue: &SharedQueue,
        job: &Job,
        index: usize,
        id: &str,
        file: &ResumeFile,
        user_id: Option<&str>,
    ) -> Result<(ResumeAnalysis, Job), FileFailure> {
        let analysis = self
            .analyzer
            .analyze(file, &JobContext::from(job))
            .await
            .map_err(FileFailure::Analysis)?;

        queue.write().await.mark_analyzed(id);

        let candidate = build_candidate(&analysis, file, job, index, Utc::now());
        info!("Saving candidate {}", candidate.name);
        self.store
            .insert_candidate(user_id, &candidate)
            .await
            .map_err(FileFailure::CandidateWrite)?;

        // No transaction spans the two writes; a failure here leaves the
        // candidate stored without its counter increment.
        let next_job = job.clone().record_applicant(analysis.match_score);
        self.store
            .update_job_counters(user_id, &next_job.id, next_job.counters())
            .await
            .map_err(FileFailure::CounterWrite)?;

        Ok((analysis, next_job))
    }
}

/// The file to process for `id`, or `None` if it was removed or already completed.
async fn pending_file(queue: &SharedQueue, id: &str) -> Option<ResumeFile> {
    let guard = queue.read().await;
    let entry = guard.get(id)?;
    if entry.status == FileStatus::Completed {
        return None;
    }
    Some(entry.file.clone())
}
