/// Content hasher.
///
/// Computes the digest of one content source or an ordered list of them,
/// one item at a time, reporting lifecycle events to registered listeners:
///
/// ```text
/// start ─▶ progress* ─▶ result | error | cancel | skip
/// ```
///
/// A `Hasher` runs one job at a time; `start` while busy fails with
/// `NotReady`. Jobs are steered from outside (or from a listener) through a
/// `HasherControl`: `cancel` stops the job and leaves the remaining items
/// untouched, `skip` abandons only the current item.
pub mod source;
pub mod strategy;
pub mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

pub use source::ContentSource;
pub use strategy::Strategy;

use crate::config::HasherConfig;
use crate::error::{Result, VerifyError};
use strategy::ItemResult;
use worker::HashWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Progress,
    Result,
    Error,
    Cancel,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HasherEvent {
    Start { file: String },
    /// Fraction of the item hashed so far, in `0..=1`.
    Progress { progress: f64, file: String },
    Result { result: String, file: String },
    Error { error: String, message: String, file: String },
    Cancel { file: String },
    Skip { file: String },
}

impl HasherEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Progress { .. } => EventKind::Progress,
            Self::Result { .. } => EventKind::Result,
            Self::Error { .. } => EventKind::Error,
            Self::Cancel { .. } => EventKind::Cancel,
            Self::Skip { .. } => EventKind::Skip,
        }
    }
}

/// Final state of one item of a job.
#[derive(Debug)]
pub enum HashOutcome {
    Completed { file: String, digest: String },
    Cancelled { file: String },
    Skipped { file: String },
    Failed { file: String, error: VerifyError },
}

impl HashOutcome {
    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Completed { digest, .. } => Some(digest),
            _ => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&HasherEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Abort {
    Cancel = 1,
    Skip = 2,
}

const NO_ABORT: u8 = 0;

#[derive(Default)]
struct JobState {
    busy: AtomicBool,
    abort: AtomicU8,
}

/// Handle for steering the running job.
#[derive(Clone)]
pub struct HasherControl {
    state: Arc<JobState>,
}

impl HasherControl {
    /// Abort the current item and stop the job.
    pub fn cancel(&self) {
        if self.state.busy.load(Ordering::Acquire) {
            self.state.abort.store(Abort::Cancel as u8, Ordering::Release);
        }
    }

    /// Abort the current item and continue with the next one.
    pub fn skip(&self) {
        if self.state.busy.load(Ordering::Acquire) {
            // A pending cancel is never downgraded to a skip.
            let _ = self.state.abort.compare_exchange(
                NO_ABORT,
                Abort::Skip as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.state.busy.load(Ordering::Acquire)
    }
}

/// Releases the job slot however `start` exits.
struct JobGuard(Arc<JobState>);

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.0.abort.store(NO_ABORT, Ordering::Release);
        self.0.busy.store(false, Ordering::Release);
    }
}

pub struct Hasher {
    config: HasherConfig,
    state: Arc<JobState>,
    listeners: RwLock<HashMap<EventKind, Listener>>,
}

/// Per-item view handed to strategies.
pub(crate) struct ItemContext<'a> {
    hasher: &'a Hasher,
    pub(crate) file: &'a str,
    pub(crate) size: u64,
}

impl ItemContext<'_> {
    pub(crate) fn abort(&self) -> Option<Abort> {
        match self.hasher.state.abort.load(Ordering::Acquire) {
            1 => Some(Abort::Cancel),
            2 => Some(Abort::Skip),
            _ => None,
        }
    }

    pub(crate) fn progress(&self, offset: u64) {
        let progress = if self.size == 0 {
            1.0
        } else {
            (offset as f64 / self.size as f64).min(1.0)
        };
        self.hasher.emit(HasherEvent::Progress {
            progress,
            file: self.file.to_string(),
        });
    }
}

impl Hasher {
    pub fn new(config: HasherConfig) -> Self {
        Self {
            config,
            state: Arc::new(JobState::default()),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Register the listener for one event kind, replacing any previous one.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&HasherEvent) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.insert(kind, Arc::new(listener));
        }
    }

    pub fn off(&self, kind: EventKind) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.remove(&kind);
        }
    }

    pub fn control(&self) -> HasherControl {
        HasherControl {
            state: self.state.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.state.busy.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.control().cancel();
    }

    pub fn skip(&self) {
        self.control().skip();
    }

    fn has_listener(&self, kind: EventKind) -> bool {
        self.listeners
            .read()
            .map(|l| l.contains_key(&kind))
            .unwrap_or(false)
    }

    fn emit(&self, event: HasherEvent) {
        // Clone out so a listener may re-register without deadlocking.
        let listener = self
            .listeners
            .read()
            .ok()
            .and_then(|l| l.get(&event.kind()).cloned());
        if let Some(listener) = listener {
            listener(&event);
        }
    }

    /// Hash a single source and return its digest.
    pub async fn hash(&self, source: ContentSource) -> Result<String> {
        let outcome = self.start(vec![source]).await?.pop();
        match outcome {
            Some(HashOutcome::Completed { digest, .. }) => Ok(digest),
            Some(HashOutcome::Failed { error, .. }) => Err(error),
            Some(HashOutcome::Cancelled { file }) | Some(HashOutcome::Skipped { file }) => {
                Err(VerifyError::HashingAborted(file))
            }
            None => Err(VerifyError::HashingAborted(String::new())),
        }
    }

    /// Hash every source in order.
    ///
    /// Returns one outcome per item that was started. Item failures are
    /// reported through the `Error` listener and recorded as `Failed` when
    /// one is registered; otherwise the first failure aborts the job and is
    /// returned. A cancel ends the job early without error.
    pub async fn start(&self, sources: Vec<ContentSource>) -> Result<Vec<HashOutcome>> {
        if self
            .state
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VerifyError::NotReady);
        }
        let _guard = JobGuard(self.state.clone());

        if sources.is_empty() {
            return Err(VerifyError::InvalidParameter("nothing to hash".into()));
        }

        info!(items = sources.len(), "Hashing job started");
        let mut worker: Option<HashWorker> = None;
        let mut outcomes = Vec::with_capacity(sources.len());

        for source in &sources {
            // A skip only ever targets the item it was requested on; a cancel
            // requested between items still ends the job.
            let _ = self.state.abort.compare_exchange(
                Abort::Skip as u8,
                NO_ABORT,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            if self.state.abort.load(Ordering::Acquire) == Abort::Cancel as u8 {
                info!(completed = outcomes.len(), "Hashing job cancelled between items");
                break;
            }
            let file = source.name();
            self.emit(HasherEvent::Start { file: file.clone() });

            match self.hash_item(source, &file, &mut worker).await {
                Ok(ItemResult::Completed(digest)) => {
                    debug!(file = %file, digest = %digest, "Item hashed");
                    self.emit(HasherEvent::Result {
                        result: digest.clone(),
                        file: file.clone(),
                    });
                    outcomes.push(HashOutcome::Completed { file, digest });
                }
                Ok(ItemResult::Skipped) => {
                    info!(file = %file, "Item skipped");
                    if let Some(w) = &worker {
                        w.reset().await?;
                    }
                    self.emit(HasherEvent::Skip { file: file.clone() });
                    outcomes.push(HashOutcome::Skipped { file });
                }
                Ok(ItemResult::Cancelled) => {
                    info!(file = %file, "Hashing job cancelled");
                    // Tear the worker down with the job.
                    worker = None;
                    self.emit(HasherEvent::Cancel { file: file.clone() });
                    outcomes.push(HashOutcome::Cancelled { file });
                    break;
                }
                Err(error) => {
                    if !self.has_listener(EventKind::Error) {
                        warn!(file = %file, error = %error, "Hashing job failed");
                        return Err(error);
                    }
                    warn!(file = %file, error = %error, "Item failed, continuing");
                    self.emit(HasherEvent::Error {
                        error: error.code().to_string(),
                        message: error.to_string(),
                        file: file.clone(),
                    });
                    outcomes.push(HashOutcome::Failed { file, error });
                }
            }
        }

        drop(worker);
        info!(items = outcomes.len(), "Hashing job finished");
        Ok(outcomes)
    }

    async fn hash_item(
        &self,
        source: &ContentSource,
        file: &str,
        worker: &mut Option<HashWorker>,
    ) -> Result<ItemResult> {
        let size = source.size().await?;
        let strategy = strategy::select(&self.config, size)?;
        debug!(file = %file, size, strategy = ?strategy, "Hashing strategy selected");

        if strategy == Strategy::Worker && worker.is_none() {
            *worker = Some(HashWorker::spawn()?);
        }

        let mut reader = source.open().await?;
        let ctx = ItemContext {
            hasher: self,
            file,
            size,
        };
        strategy::run(strategy, &mut reader, &ctx, &self.config, worker.as_ref()).await
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HasherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashAlgorithm;
    use std::sync::Mutex;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn small_chunks(native: bool, worker: bool) -> HasherConfig {
        HasherConfig {
            chunk_size: 4,
            native_enabled: native,
            worker_enabled: worker,
            ..HasherConfig::default()
        }
    }

    fn record_all(hasher: &Hasher) -> Arc<Mutex<Vec<HasherEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            EventKind::Start,
            EventKind::Progress,
            EventKind::Result,
            EventKind::Error,
            EventKind::Cancel,
            EventKind::Skip,
        ] {
            let events = events.clone();
            hasher.on(kind, move |e| events.lock().unwrap().push(e.clone()));
        }
        events
    }

    fn kinds_for(events: &[HasherEvent], file: &str) -> Vec<EventKind> {
        events
            .iter()
            .filter(|e| match e {
                HasherEvent::Start { file: f }
                | HasherEvent::Progress { file: f, .. }
                | HasherEvent::Result { file: f, .. }
                | HasherEvent::Error { file: f, .. }
                | HasherEvent::Cancel { file: f }
                | HasherEvent::Skip { file: f } => f == file,
            })
            .map(HasherEvent::kind)
            .filter(|k| *k != EventKind::Progress)
            .collect()
    }

    #[tokio::test]
    async fn test_every_strategy_agrees() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let expected = HashAlgorithm::Sha256.digest_hex(&data);

        for (native, worker) in [(true, true), (false, true), (false, false)] {
            let hasher = Hasher::new(small_chunks(native, worker));
            let first = hasher.hash(ContentSource::bytes("fox", data.clone())).await.unwrap();
            let second = hasher.hash(ContentSource::bytes("fox", data.clone())).await.unwrap();
            assert_eq!(first, expected);
            assert_eq!(first, second);
            assert!(hasher.is_ready());
        }
    }

    #[tokio::test]
    async fn test_empty_content() {
        let hasher = Hasher::new(small_chunks(true, true));
        let events = record_all(&hasher);
        let digest = hasher.hash(ContentSource::bytes("empty", Vec::new())).await.unwrap();
        assert_eq!(digest, EMPTY_SHA256);

        let events = events.lock().unwrap();
        assert!(events.contains(&HasherEvent::Progress {
            progress: 1.0,
            file: "empty".into()
        }));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let hasher = Hasher::new(small_chunks(false, false));
        let events = record_all(&hasher);
        hasher
            .hash(ContentSource::bytes("ten", b"0123456789".to_vec()))
            .await
            .unwrap();

        let progress: Vec<f64> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                HasherEvent::Progress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![0.4, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_list_is_sequential() {
        let hasher = Hasher::new(small_chunks(true, true));
        let events = record_all(&hasher);
        let outcomes = hasher
            .start(vec![
                ContentSource::bytes("a", b"alpha".to_vec()),
                ContentSource::bytes("b", b"bravo".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].digest(), Some(HashAlgorithm::Sha256.digest_hex(b"bravo").as_str()));

        let order: Vec<EventKind> = events
            .lock()
            .unwrap()
            .iter()
            .map(HasherEvent::kind)
            .filter(|k| *k != EventKind::Progress)
            .collect();
        assert_eq!(
            order,
            vec![EventKind::Start, EventKind::Result, EventKind::Start, EventKind::Result]
        );
    }

    #[tokio::test]
    async fn test_skip_advances_to_next_item() {
        for (native, worker) in [(true, true), (false, true), (false, false)] {
            let hasher = Hasher::new(small_chunks(native, worker));
            let events = record_all(&hasher);
            let control = hasher.control();
            let recorder = events.clone();
            hasher.on(EventKind::Progress, move |e| {
                recorder.lock().unwrap().push(e.clone());
                if matches!(e, HasherEvent::Progress { file, .. } if file == "one") {
                    control.skip();
                }
            });

            let outcomes = hasher
                .start(vec![
                    ContentSource::bytes("one", b"first item content".to_vec()),
                    ContentSource::bytes("two", b"second item content".to_vec()),
                ])
                .await
                .unwrap();

            assert!(matches!(outcomes[0], HashOutcome::Skipped { .. }));
            assert_eq!(
                outcomes[1].digest(),
                Some(HashAlgorithm::Sha256.digest_hex(b"second item content").as_str())
            );

            let events = events.lock().unwrap();
            assert_eq!(kinds_for(&events, "one"), vec![EventKind::Start, EventKind::Skip]);
            assert_eq!(kinds_for(&events, "two"), vec![EventKind::Start, EventKind::Result]);
            assert!(hasher.is_ready());
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_the_job() {
        let hasher = Hasher::new(small_chunks(false, true));
        let events = record_all(&hasher);
        let control = hasher.control();
        let recorder = events.clone();
        hasher.on(EventKind::Progress, move |e| {
            recorder.lock().unwrap().push(e.clone());
            control.cancel();
        });

        let outcomes = hasher
            .start(vec![
                ContentSource::bytes("one", b"first item content".to_vec()),
                ContentSource::bytes("two", b"second item content".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], HashOutcome::Cancelled { .. }));

        let events = events.lock().unwrap();
        assert_eq!(kinds_for(&events, "one"), vec![EventKind::Start, EventKind::Cancel]);
        assert!(kinds_for(&events, "two").is_empty());
        assert!(hasher.is_ready());
    }

    #[tokio::test]
    async fn test_cancel_from_result_listener_stops_the_job() {
        for (native, worker) in [(true, true), (false, true), (false, false)] {
            let hasher = Hasher::new(small_chunks(native, worker));
            let events = record_all(&hasher);
            let control = hasher.control();
            let recorder = events.clone();
            hasher.on(EventKind::Result, move |e| {
                recorder.lock().unwrap().push(e.clone());
                assert!(!control.is_ready());
                control.cancel();
            });

            let outcomes = hasher
                .start(vec![
                    ContentSource::bytes("one", b"first item content".to_vec()),
                    ContentSource::bytes("two", b"second item content".to_vec()),
                ])
                .await
                .unwrap();

            assert_eq!(outcomes.len(), 1);
            assert_eq!(
                outcomes[0].digest(),
                Some(HashAlgorithm::Sha256.digest_hex(b"first item content").as_str())
            );
            let events = events.lock().unwrap();
            assert_eq!(kinds_for(&events, "one"), vec![EventKind::Start, EventKind::Result]);
            assert!(kinds_for(&events, "two").is_empty());
            assert!(hasher.is_ready());
        }
    }

    #[tokio::test]
    async fn test_skip_from_result_listener_does_not_leak() {
        let hasher = Hasher::new(small_chunks(true, true));
        let control = hasher.control();
        hasher.on(EventKind::Result, move |_| control.skip());

        let outcomes = hasher
            .start(vec![
                ContentSource::bytes("one", b"first".to_vec()),
                ContentSource::bytes("two", b"second".to_vec()),
            ])
            .await
            .unwrap();
        assert!(outcomes.iter().all(|o| o.digest().is_some()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_not_ready_while_busy() {
        let hasher = Arc::new(Hasher::new(small_chunks(false, false)));
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let release_rx = Mutex::new(release_rx);
        hasher.on(EventKind::Start, move |_| {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv();
        });

        let job = tokio::spawn({
            let hasher = hasher.clone();
            async move { hasher.hash(ContentSource::bytes("busy", b"content".to_vec())).await }
        });
        tokio::task::spawn_blocking(move || started_rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert!(!hasher.is_ready());
        let err = hasher
            .start(vec![ContentSource::bytes("other", b"x".to_vec())])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_ready");

        release_tx.send(()).unwrap();
        let digest = job.await.unwrap().unwrap();
        assert_eq!(digest, HashAlgorithm::Sha256.digest_hex(b"content"));
        assert!(hasher.is_ready());
    }

    #[tokio::test]
    async fn test_errors_without_listener_reject() {
        let config = HasherConfig {
            native_enabled: false,
            worker_enabled: false,
            sync_max_size: 4,
            ..HasherConfig::default()
        };
        let hasher = Hasher::new(config.clone());
        let err = hasher
            .hash(ContentSource::bytes("big", b"too large".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "file_too_big_to_be_hashed_without_worker");
        assert!(hasher.is_ready());

        let hasher = Hasher::new(config);
        let events = record_all(&hasher);
        let outcomes = hasher
            .start(vec![
                ContentSource::bytes("big", b"too large".to_vec()),
                ContentSource::bytes("ok", b"tiny".to_vec()),
            ])
            .await
            .unwrap();
        assert!(matches!(outcomes[0], HashOutcome::Failed { .. }));
        assert_eq!(outcomes[1].digest(), Some(HashAlgorithm::Sha256.digest_hex(b"tiny").as_str()));
        assert!(events.lock().unwrap().iter().any(|e| matches!(
            e,
            HasherEvent::Error { error, .. } if error == "file_too_big_to_be_hashed_without_worker"
        )));
    }

    #[tokio::test]
    async fn test_empty_list_is_invalid() {
        let hasher = Hasher::default();
        let err = hasher.start(Vec::new()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
        assert!(hasher.is_ready());
    }

    #[tokio::test]
    async fn test_listener_replacement() {
        let hasher = Hasher::new(small_chunks(true, true));
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));
        let f = first.clone();
        hasher.on(EventKind::Result, move |_| *f.lock().unwrap() += 1);
        let s = second.clone();
        hasher.on(EventKind::Result, move |_| *s.lock().unwrap() += 1);

        hasher.hash(ContentSource::bytes("x", b"x".to_vec())).await.unwrap();
        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }
}
