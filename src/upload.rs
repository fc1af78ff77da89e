use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::config::UploadConfig;
use crate::error::{DocQaError, Result};
use crate::models::{Document, UploadFile};

pub const UPLOAD_CANCELLED_MESSAGE: &str = "Upload cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

/// One selected file and its upload lifecycle
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: Uuid,
    pub file: UploadFile,
    pub title: String,
    pub status: UploadStatus,
    /// 0-100
    pub progress: u8,
    pub error: Option<String>,
    pub document: Option<Document>,
}

impl UploadTask {
    fn new(file: UploadFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: strip_extension(&file.name).to_string(),
            file,
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            document: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedType,
    TooLarge { size: u64, max: u64 },
}

/// A file refused before it was queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRejection {
    pub file_name: String,
    pub reason: RejectReason,
}

impl std::fmt::Display for FileRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RejectReason::UnsupportedType => {
                write!(f, "{}: only plain-text files are accepted", self.file_name)
            }
            RejectReason::TooLarge { size, max } => write!(
                f,
                "{}: {} exceeds the {} limit",
                self.file_name,
                format_file_size(*size),
                format_file_size(*max)
            ),
        }
    }
}

/// Drops the final extension: `report.v2.txt` -> `report.v2`.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx + 1..].contains('/') => &name[..idx],
        _ => name,
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Tracks selected files and uploads them one at a time.
pub struct UploadOrchestrator {
    client: Arc<ApiClient>,
    cfg: UploadConfig,
    tasks: Arc<RwLock<Vec<UploadTask>>>,
    uploading: AtomicBool,
}

impl UploadOrchestrator {
    pub fn new(client: Arc<ApiClient>, cfg: UploadConfig) -> Self {
        Self {
            client,
            cfg,
            tasks: Arc::new(RwLock::new(Vec::new())),
            uploading: AtomicBool::new(false),
        }
    }

    /// Queue accepted files as pending tasks; returns the ones refused.
    pub async fn add_files(&self, files: Vec<UploadFile>) -> Vec<FileRejection> {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for file in files {
            match self.check_file(&file) {
                Ok(()) => accepted.push(UploadTask::new(file)),
                Err(reason) => {
                    tracing::warn!("Rejected {}: {:?}", file.name, reason);
                    rejected.push(FileRejection {
                        file_name: file.name,
                        reason,
                    });
                }
            }
        }

        if !accepted.is_empty() {
            tracing::info!("Queued {} file(s) for upload", accepted.len());
            self.tasks.write().await.extend(accepted);
        }
        rejected
    }

    fn check_file(&self, file: &UploadFile) -> std::result::Result<(), RejectReason> {
        let accepted_type = file.name.rsplit_once('.').is_some_and(|(_, ext)| {
            self.cfg
                .accepted_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(ext))
        });
        if !accepted_type {
            return Err(RejectReason::UnsupportedType);
        }
        if file.size() > self.cfg.max_file_bytes {
            return Err(RejectReason::TooLarge {
                size: file.size(),
                max: self.cfg.max_file_bytes,
            });
        }
        Ok(())
    }

    pub async fn tasks(&self) -> Vec<UploadTask> {
        self.tasks.read().await.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| t.status == UploadStatus::Pending)
            .count()
    }

    pub async fn has_successful_uploads(&self) -> bool {
        self.tasks
            .read()
            .await
            .iter()
            .any(|t| t.status == UploadStatus::Success)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    pub async fn update_title(&self, id: Uuid, title: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = find_pending(&mut tasks, id)?;
        task.title = title.to_string();
        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        find_pending(&mut tasks, id)?;
        tasks.retain(|t| t.id != id);
        Ok(())
    }

    /// Upload one pending task. An upload failure is recorded on the task
    /// and reported as `UploadStatus::Error`, not as an `Err`.
    pub async fn upload_task(&self, id: Uuid) -> Result<UploadStatus> {
        let (file, title) = {
            let mut tasks = self.tasks.write().await;
            let task = find_pending(&mut tasks, id)?;
            task.status = UploadStatus::Uploading;
            task.progress = 0;
            task.error = None;
            (task.file.clone(), task.title.clone())
        };

        tracing::info!("Uploading {} as '{}'", file.name, title);
        let mut guard = InFlight {
            ticker: self.spawn_ticker(id),
            tasks: Arc::clone(&self.tasks),
            id,
            settled: false,
        };
        let result = self.client.upload_document(&file, &title).await;
        guard.ticker.abort();

        let mut tasks = self.tasks.write().await;
        guard.settled = true;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Err(DocQaError::Internal(format!("upload task {id} vanished")));
        };
        match result {
            Ok(doc) => {
                tracing::info!("Uploaded {} as document {}", file.name, doc.id);
                task.status = UploadStatus::Success;
                task.progress = 100;
                task.document = Some(doc);
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", file.name, e);
                task.status = UploadStatus::Error;
                task.progress = 0;
                task.error = Some(e.to_string());
            }
        }
        Ok(task.status)
    }

    /// Upload every pending task in order, one at a time. Returns the final
    /// task snapshot once each has finished.
    pub async fn upload_all(&self) -> Vec<UploadTask> {
        if self.uploading.swap(true, Ordering::SeqCst) {
            tracing::warn!("Upload batch already running");
            return self.tasks().await;
        }
        let _batch = BatchFlag(&self.uploading);

        let pending: Vec<Uuid> = self
            .tasks
            .read()
            .await
            .iter()
            .filter(|t| t.status == UploadStatus::Pending)
            .map(|t| t.id)
            .collect();

        for id in pending {
            if let Err(e) = self.upload_task(id).await {
                tracing::warn!("Skipped upload task {}: {}", id, e);
            }
        }

        self.tasks().await
    }

    // Synthetic progress while the real request is outstanding.
    fn spawn_ticker(&self, id: Uuid) -> JoinHandle<()> {
        let tasks = Arc::clone(&self.tasks);
        let period = Duration::from_millis(self.cfg.tick_interval_ms.max(1));
        let step = self.cfg.tick_step;
        let cap = self.cfg.tick_cap.min(99);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut tasks = tasks.write().await;
                match tasks.iter_mut().find(|t| t.id == id) {
                    Some(task) if task.status == UploadStatus::Uploading => {
                        let next = task.progress.saturating_add(step).min(cap);
                        if next > task.progress {
                            task.progress = next;
                        }
                    }
                    _ => break,
                }
            }
        })
    }
}

/// Clears the batch flag however the batch ends.
struct BatchFlag<'a>(&'a AtomicBool);

impl Drop for BatchFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the ticker of one upload. If the upload future is dropped before the
/// result is recorded, the ticker is aborted and the task is marked failed.
struct InFlight {
    ticker: JoinHandle<()>,
    tasks: Arc<RwLock<Vec<UploadTask>>>,
    id: Uuid,
    settled: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.ticker.abort();
        if self.settled {
            return;
        }
        tracing::warn!("Upload task {} cancelled", self.id);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let tasks = Arc::clone(&self.tasks);
        let id = self.id;
        handle.spawn(async move {
            let mut tasks = tasks.write().await;
            if let Some(task) = tasks
                .iter_mut()
                .find(|t| t.id == id && t.status == UploadStatus::Uploading)
            {
                task.status = UploadStatus::Error;
                task.progress = 0;
                task.error = Some(UPLOAD_CANCELLED_MESSAGE.to_string());
            }
        });
    }
}

fn find_pending(tasks: &mut [UploadTask], id: Uuid) -> Result<&mut UploadTask> {
    let task = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| DocQaError::Validation(format!("no upload task {id}")))?;
    if task.status != UploadStatus::Pending {
        return Err(DocQaError::Validation(format!(
            "upload task {id} is not pending"
        )));
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DocumentBackend;
    use crate::client::ClientMode;
    use crate::config::MockDelays;
    use crate::mock;
    use crate::models::{AskRequest, QAResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // Logs call boundaries; fails files whose name starts with "bad"
    struct RecordingBackend {
        delay: Duration,
        events: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentBackend for RecordingBackend {
        async fn fetch_documents(&self) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn create_document(&self, file: &UploadFile, title: &str) -> Result<Document> {
            self.events.lock().unwrap().push(format!("start {}", file.name));
            tokio::time::sleep(self.delay).await;
            self.events.lock().unwrap().push(format!("end {}", file.name));
            if file.name.starts_with("bad") {
                return Err(DocQaError::Internal("rejected".to_string()));
            }
            Ok(mock::synthesize_uploaded(file, title))
        }

        async fn post_question(&self, _req: &AskRequest) -> Result<QAResponse> {
            Ok(mock::mock_qa_response())
        }
    }

    fn orchestrator(backend: Arc<RecordingBackend>) -> UploadOrchestrator {
        let client = ApiClient::new(ClientMode::Live(backend), None);
        UploadOrchestrator::new(Arc::new(client), UploadConfig::default())
    }

    fn txt(name: &str) -> UploadFile {
        UploadFile::new(name, b"some text".to_vec())
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("report.v2.txt"), "report.v2");
        assert_eq!(strip_extension("notes.txt"), "notes");
        assert_eq!(strip_extension("README"), "README");
        assert_eq!(strip_extension("trailing."), "trailing.");
        assert_eq!(strip_extension("dir.d/file"), "dir.d/file");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(15420), "15.06 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[tokio::test]
    async fn test_add_files_filters_and_titles() {
        let orch = orchestrator(Arc::new(RecordingBackend::new(Duration::ZERO)));
        let big = UploadFile::new("huge.txt", vec![0; 10 * 1024 * 1024 + 1]);
        let rejected = orch
            .add_files(vec![txt("report.v2.txt"), txt("photo.png"), txt("NOTES.TXT"), big])
            .await;

        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].reason, RejectReason::UnsupportedType);
        assert!(matches!(rejected[1].reason, RejectReason::TooLarge { .. }));

        let tasks = orch.tasks().await;
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["report.v2", "NOTES"]);
        assert!(tasks.iter().all(|t| t.status == UploadStatus::Pending && t.progress == 0));
        assert_eq!(orch.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_edit_and_remove_pending_only() {
        let orch = orchestrator(Arc::new(RecordingBackend::new(Duration::ZERO)));
        orch.add_files(vec![txt("a.txt"), txt("b.txt")]).await;
        let tasks = orch.tasks().await;

        orch.update_title(tasks[0].id, "Renamed").await.unwrap();
        orch.remove(tasks[1].id).await.unwrap();
        assert_eq!(orch.tasks().await.len(), 1);

        assert_eq!(orch.upload_task(tasks[0].id).await.unwrap(), UploadStatus::Success);
        assert!(orch.update_title(tasks[0].id, "Late").await.is_err());
        assert!(orch.remove(tasks[0].id).await.is_err());

        let task = &orch.tasks().await[0];
        assert_eq!(task.document.as_ref().map(|d| d.title.as_str()), Some("Renamed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_all_is_sequential() {
        let backend = Arc::new(RecordingBackend::new(Duration::from_secs(1)));
        let orch = orchestrator(Arc::clone(&backend));
        orch.add_files(vec![txt("a.txt"), txt("bad.txt"), txt("c.txt")]).await;

        let done = orch.upload_all().await;

        assert_eq!(
            backend.events(),
            ["start a.txt", "end a.txt", "start bad.txt", "end bad.txt", "start c.txt", "end c.txt"]
        );
        let statuses: Vec<UploadStatus> = done.iter().map(|t| t.status).collect();
        assert_eq!(statuses, [UploadStatus::Success, UploadStatus::Error, UploadStatus::Success]);
        assert_eq!(done[1].error.as_deref(), Some("Failed to upload document. Please try again."));
        assert_eq!(done[1].progress, 0);
        assert!(done.iter().all(|t| t.status.is_finished()));
        assert!(!orch.is_uploading());
        assert!(orch.has_successful_uploads().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_ticks_to_cap_then_completes() {
        let backend = Arc::new(RecordingBackend::new(Duration::from_secs(5)));
        let orch = Arc::new(orchestrator(backend));
        orch.add_files(vec![txt("slow.txt")]).await;
        let id = orch.tasks().await[0].id;

        let runner = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.upload_task(id).await })
        };

        let mut seen = Vec::new();
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let task = orch.tasks().await.remove(0);
            if task.status != UploadStatus::Uploading {
                break;
            }
            seen.push(task.progress);
        }

        assert!(!seen.is_empty());
        assert!(seen.iter().all(|p| *p <= 90));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&90));

        assert_eq!(runner.await.unwrap().unwrap(), UploadStatus::Success);
        let task = orch.tasks().await.remove(0);
        assert_eq!(task.progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_releases_ticker_and_flag() {
        let backend = Arc::new(RecordingBackend::new(Duration::from_secs(5)));
        let orch = orchestrator(Arc::clone(&backend));
        orch.add_files(vec![txt("a.txt")]).await;

        let cancelled = tokio::time::timeout(Duration::from_millis(700), orch.upload_all()).await;
        assert!(cancelled.is_err());
        assert!(!orch.is_uploading());

        // Let the cleanup run, then make sure nothing keeps ticking.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_cancel = orch.tasks().await.remove(0);
        assert_eq!(after_cancel.status, UploadStatus::Error);
        assert_eq!(after_cancel.error.as_deref(), Some(UPLOAD_CANCELLED_MESSAGE));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(orch.tasks().await[0].progress, after_cancel.progress);

        orch.add_files(vec![txt("b.txt")]).await;
        let done = orch.upload_all().await;
        let statuses: Vec<UploadStatus> = done.iter().map(|t| t.status).collect();
        assert_eq!(statuses, [UploadStatus::Error, UploadStatus::Success]);
        assert_eq!(backend.events().last().map(String::as_str), Some("end b.txt"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_mode_upload_all() {
        let client = ApiClient::new(ClientMode::Mock(MockDelays::default()), None);
        let orch = UploadOrchestrator::new(Arc::new(client), UploadConfig::default());
        orch.add_files(vec![txt("one.txt"), txt("two.txt")]).await;

        let done = orch.upload_all().await;
        assert!(done.iter().all(|t| t.status == UploadStatus::Success && t.progress == 100));
        assert_eq!(orch.pending_count().await, 0);
    }
}
