//! Upload queue: the set of resumes waiting for, undergoing, or done with analysis.
//!
//! Lives only in memory. Shared between handlers and the batch runner as
//! `SharedQueue`; every state change takes the lock briefly so the queue
//! can be polled while a batch is running.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::matching::analyzer::ResumeAnalysis;
use crate::matching::file_reader::ResumeFile;

pub type SharedQueue = Arc<RwLock<UploadQueue>>;

pub const PROGRESS_PARSING: u8 = 30;
pub const PROGRESS_ANALYZED: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

/// Per-file state. `Reading` is declared for clients but the runner moves
/// straight from `Ready` to `Parsing`, since uploads are already in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Ready,
    #[allow(dead_code)]
    Reading,
    Parsing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    pub id: String,
    pub name: String,
    pub size: String,
    pub status: FileStatus,
    pub progress: u8,
    pub result: Option<ResumeAnalysis>,
    #[serde(skip)]
    pub file: ResumeFile,
}

/// Serializable snapshot returned by the queue endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub files: Vec<UploadFile>,
    pub error_message: Option<String>,
    pub show_success: bool,
    pub is_analyzing: bool,
}

#[derive(Debug, Default)]
pub struct UploadQueue {
    files: Vec<UploadFile>,
    error_message: Option<String>,
    banner_until: Option<Instant>,
    analyzing: bool,
}

impl UploadQueue {
    pub fn shared() -> SharedQueue {
        Arc::new(RwLock::new(UploadQueue::default()))
    }

    /// Appends a file in `Ready` state and returns its id.
    pub fn add(&mut self, file: ResumeFile) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.files.push(UploadFile {
            id: id.clone(),
            name: file.name.clone(),
            size: file.size_label(),
            status: FileStatus::Ready,
            progress: 0,
            result: None,
            file,
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        self.files.len() != before
    }

    /// Drops every file and notice. Refused while a batch is running.
    pub fn reset(&mut self) -> bool {
        if self.analyzing {
            return false;
        }
        self.files.clear();
        self.error_message = None;
        self.banner_until = None;
        true
    }

    pub fn get(&self, id: &str) -> Option<&UploadFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Replaces the single visible error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }

    pub fn show_success_until(&mut self, deadline: Instant) {
        self.banner_until = Some(deadline);
    }

    pub fn success_visible(&self, now: Instant) -> bool {
        self.banner_until.is_some_and(|deadline| now < deadline)
    }

    /// Marks a batch as started. `false` if one is already running.
    pub fn begin_batch(&mut self) -> bool {
        if self.analyzing {
            return false;
        }
        self.analyzing = true;
        self.error_message = None;
        true
    }

    pub fn end_batch(&mut self) {
        self.analyzing = false;
    }

    /// Ids in queue order, for the runner to walk without holding the lock.
    pub fn ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    fn update(&mut self, id: &str, status: FileStatus, progress: u8) -> Option<&mut UploadFile> {
        let entry = self.files.iter_mut().find(|f| f.id == id)?;
        entry.status = status;
        entry.progress = progress;
        Some(entry)
    }

    pub fn mark_parsing(&mut self, id: &str) {
        self.update(id, FileStatus::Parsing, PROGRESS_PARSING);
    }

    pub fn mark_analyzed(&mut self, id: &str) {
        self.update(id, FileStatus::Parsing, PROGRESS_ANALYZED);
    }

    pub fn mark_completed(&mut self, id: &str, result: ResumeAnalysis) {
        if let Some(entry) = self.update(id, FileStatus::Completed, PROGRESS_DONE) {
            entry.result = Some(result);
        }
    }

    pub fn mark_failed(&mut self, id: &str) {
        self.update(id, FileStatus::Error, 0);
    }

    pub fn view(&self, now: Instant) -> QueueView {
        QueueView {
            files: self.files.clone(),
            error_message: self.error_message.clone(),
            show_success: self.success_visible(now),
            is_analyzing: self.analyzing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use bytes::Bytes;

    fn resume(name: &str) -> ResumeFile {
        ResumeFile::new(name, None, Bytes::from_static(b"%PDF"))
    }

    #[test]
    fn test_add_starts_ready_with_unique_ids() {
        let mut queue = UploadQueue::default();
        let a = queue.add(resume("a.pdf"));
        let b = queue.add(resume("b.pdf"));

        assert_ne!(a, b);
        let entry = queue.get(&a).unwrap();
        assert_eq!(entry.status, FileStatus::Ready);
        assert_eq!(entry.progress, 0);
        assert_eq!(entry.size, "0.0 MB");
        assert_eq!(queue.ids(), vec![a, b]);
    }

    #[test]
    fn test_transitions_set_progress() {
        let mut queue = UploadQueue::default();
        let id = queue.add(resume("a.pdf"));

        queue.mark_parsing(&id);
        assert_eq!(queue.get(&id).unwrap().progress, PROGRESS_PARSING);
        queue.mark_analyzed(&id);
        assert_eq!(queue.get(&id).unwrap().progress, PROGRESS_ANALYZED);
        queue.mark_failed(&id);
        let entry = queue.get(&id).unwrap();
        assert_eq!(entry.status, FileStatus::Error);
        assert_eq!(entry.progress, 0);
    }

    #[test]
    fn test_remove_and_unknown_ids() {
        let mut queue = UploadQueue::default();
        let id = queue.add(resume("a.pdf"));
        queue.mark_parsing("missing");
        assert!(!queue.remove("missing"));
        assert!(queue.remove(&id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_only_one_batch_at_a_time() {
        let mut queue = UploadQueue::default();
        queue.set_error("old");
        assert!(queue.begin_batch());
        assert!(queue.error_message().is_none());
        assert!(!queue.begin_batch());
        assert!(!queue.reset());
        queue.end_batch();
        assert!(queue.begin_batch());
    }

    #[test]
    fn test_error_is_replaced_and_dismissable() {
        let mut queue = UploadQueue::default();
        queue.set_error("first");
        queue.set_error("second");
        assert_eq!(queue.error_message(), Some("second"));
        queue.dismiss_error();
        assert!(queue.error_message().is_none());
    }

    #[test]
    fn test_banner_expires() {
        let mut queue = UploadQueue::default();
        let now = Instant::now();
        assert!(!queue.success_visible(now));

        queue.show_success_until(now + Duration::from_secs(5));
        assert!(queue.view(now).show_success);
        assert!(!queue.success_visible(now + Duration::from_secs(5)));
    }

    #[test]
    fn test_view_serializes_status_names() {
        let mut queue = UploadQueue::default();
        queue.add(resume("a.pdf"));
        let value = serde_json::to_value(queue.view(Instant::now())).unwrap();
        assert_eq!(value["files"][0]["status"], "READY");
        assert!(value["files"][0].get("file").is_none());
        assert_eq!(value["isAnalyzing"], false);
    }
}
