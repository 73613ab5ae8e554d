//! Import worker pool
//!
//! A fixed set of threads pulls sub-batches from one FIFO job queue. Each
//! sub-batch belongs to a request; the worker finishing a request's last
//! sub-batch sends its `Finished` message.

use super::loader::load_file;
use super::{ImportHandle, ImportMessage, SkipEntry};
use crate::cancel::CancelToken;
use crate::config::ImportConfig;
use crate::parser::UuidIds;
use crate::types::ImportedFile;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Bookkeeping shared by all sub-batches of one request
struct RequestState {
    request_id: u64,
    total: usize,
    completed: AtomicUsize,
    remaining_batches: AtomicUsize,
    cancelled: AtomicBool,
    cancel: CancelToken,
    sender: Sender<ImportMessage>,
}

impl RequestState {
    /// Record a finished or dropped sub-batch
    fn finish_batch(&self, results: Vec<ImportedFile>, skipped: Vec<SkipEntry>, processed: usize) {
        let completed = self.completed.fetch_add(processed, Ordering::SeqCst) + processed;
        if processed > 0 {
            let _ = self.sender.send(ImportMessage::Progress {
                request_id: self.request_id,
                results,
                skipped,
                completed,
                total: self.total,
            });
        }
        if self.remaining_batches.fetch_sub(1, Ordering::SeqCst) == 1 {
            let cancelled = self.cancelled.load(Ordering::SeqCst);
            tracing::info!(
                "Import request {} finished: {} of {} files processed{}",
                self.request_id,
                completed,
                self.total,
                if cancelled { " (cancelled)" } else { "" }
            );
            let _ = self.sender.send(ImportMessage::Finished {
                request_id: self.request_id,
                cancelled,
            });
        }
    }
}

struct Job {
    paths: Vec<PathBuf>,
    request: Arc<RequestState>,
}

fn run_job(job: Job) {
    let request = job.request;
    if request.cancel.is_cancelled() {
        request.cancelled.store(true, Ordering::SeqCst);
        request.finish_batch(Vec::new(), Vec::new(), 0);
        return;
    }

    let mut ids = UuidIds;
    let mut results = Vec::with_capacity(job.paths.len());
    let mut skipped = Vec::new();
    for path in &job.paths {
        match load_file(path, &mut ids) {
            Ok(file) => results.push(file),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                skipped.push(SkipEntry {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    request.finish_batch(results, skipped, job.paths.len());
}

fn worker_loop(index: usize, jobs: Receiver<Job>) {
    tracing::debug!("Import worker {} started", index);
    for job in jobs.iter() {
        run_job(job);
    }
    tracing::debug!("Import worker {} stopped", index);
}

/// Fixed-size pool of import threads
pub struct ImportPool {
    job_sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    sub_batch_size: usize,
    next_request: AtomicU64,
}

impl ImportPool {
    /// Spawn `config.worker_count()` workers
    pub fn new(config: &ImportConfig) -> Self {
        Self::with_workers(config.worker_count(), config.effective_sub_batch_size())
    }

    pub fn with_workers(worker_count: usize, sub_batch_size: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();

        let workers = (0..worker_count)
            .filter_map(|index| {
                let jobs = job_rx.clone();
                std::thread::Builder::new()
                    .name(format!("import-{}", index))
                    .spawn(move || worker_loop(index, jobs))
                    .map_err(|e| tracing::error!("Failed to spawn import worker {}: {}", index, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Import pool started with {} workers (sub-batch size {})",
            workers.len(),
            sub_batch_size
        );

        Self {
            job_sender: Some(job_tx),
            workers,
            sub_batch_size: sub_batch_size.max(1),
            next_request: AtomicU64::new(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue `paths` for import.
    ///
    /// The paths are split into sub-batches that join the back of the queue.
    /// Cancelling `cancel` keeps queued sub-batches from starting; running
    /// ones complete.
    pub fn submit(&self, paths: Vec<PathBuf>, cancel: CancelToken) -> ImportHandle {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst);
        let (msg_tx, msg_rx) = unbounded();
        let submitted = paths.len();

        let batches: Vec<Vec<PathBuf>> = paths
            .chunks(self.sub_batch_size)
            .map(<[PathBuf]>::to_vec)
            .collect();

        let request = Arc::new(RequestState {
            request_id,
            total: submitted,
            completed: AtomicUsize::new(0),
            remaining_batches: AtomicUsize::new(batches.len()),
            cancelled: AtomicBool::new(false),
            cancel: cancel.clone(),
            sender: msg_tx.clone(),
        });

        if batches.is_empty() {
            let _ = msg_tx.send(ImportMessage::Finished {
                request_id,
                cancelled: cancel.is_cancelled(),
            });
        }

        tracing::debug!(
            "Import request {}: {} files in {} sub-batches",
            request_id,
            submitted,
            batches.len()
        );

        for paths in batches {
            let job = Job {
                paths,
                request: request.clone(),
            };
            let sent = match &self.job_sender {
                Some(sender) => sender.send(job).map_err(|e| e.into_inner()),
                None => Err(job),
            };
            if let Err(job) = sent {
                tracing::warn!("Import pool is shut down, dropping sub-batch");
                job.request.cancelled.store(true, Ordering::SeqCst);
                job.request.finish_batch(Vec::new(), Vec::new(), 0);
            }
        }

        ImportHandle::new(request_id, submitted, msg_rx, cancel)
    }

    /// Stop accepting work and join the workers once the queue is drained
    pub fn shutdown(&mut self) {
        if self.job_sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Import worker panicked");
            }
        }
        tracing::info!("Import pool stopped");
    }
}

impl Drop for ImportPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<data><body><curves><curve><yName>Force</yName>
        <points>x="0" y="1"</points></curve></curves></body></data>"#;

    fn write_files(dir: &std::path::Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("f{i:02}.xml"));
                std::fs::write(&path, DOC).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_pool_imports_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_files(dir.path(), 10);
        paths.push(dir.path().join("missing.xml"));

        let pool = ImportPool::with_workers(3, 4);
        assert_eq!(pool.worker_count(), 3);
        let report = pool.submit(paths, CancelToken::new()).wait();
        assert_eq!(report.submitted, 11);
        assert_eq!(report.files.len(), 10);
        assert_eq!(report.skipped.len(), 1);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_progress_messages_per_sub_batch() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_files(dir.path(), 5);

        let pool = ImportPool::with_workers(1, 2);
        let handle = pool.submit(paths, CancelToken::new());
        let mut progress = Vec::new();
        let mut finished = false;
        for msg in handle.iter() {
            match msg {
                ImportMessage::Progress {
                    results,
                    completed,
                    total,
                    ..
                } => progress.push((results.len(), completed, total)),
                ImportMessage::Finished { cancelled, .. } => {
                    assert!(!cancelled);
                    finished = true;
                    break;
                }
            }
        }
        assert!(finished);
        assert_eq!(progress, vec![(2, 2, 5), (2, 4, 5), (1, 5, 5)]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_files(dir.path(), 6);
        let cancel = CancelToken::new();
        cancel.cancel();

        let pool = ImportPool::with_workers(2, 2);
        let report = pool.submit(paths, cancel).wait();
        assert!(report.cancelled);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_empty_submit_finishes() {
        let pool = ImportPool::with_workers(1, 8);
        let report = pool.submit(Vec::new(), CancelToken::new()).wait();
        assert_eq!(report.submitted, 0);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_submit_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_files(dir.path(), 2);
        let mut pool = ImportPool::with_workers(1, 8);
        pool.shutdown();
        let report = pool.submit(paths, CancelToken::new()).wait();
        assert!(report.cancelled);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_request_ids_increase() {
        let pool = ImportPool::with_workers(1, 8);
        let a = pool.submit(Vec::new(), CancelToken::new());
        let b = pool.submit(Vec::new(), CancelToken::new());
        assert!(b.request_id() > a.request_id());
    }
}
