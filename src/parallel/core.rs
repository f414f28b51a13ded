use crossbeam::channel::{Receiver, Sender, bounded, select, unbounded};
use std::any::Any;
use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use thiserror::Error;

use super::cancel::CancellationToken;
use crate::pipeline::{Outcome, Pipeline, ProcessingError, WorkItem};

/// Progress callback: (completed, total, worker_id)
pub type ProgressCallback = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;

/// Why a single item failed. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("panicked while processing: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("batch interrupted after {} of {} items", summary.attempted(), summary.total)]
    Interrupted { summary: BatchSummary },

    #[error("worker thread panicked outside item processing")]
    WorkerPanic,
}

/// Per-run aggregate of item outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, result: &Result<Outcome, ItemFailure>) {
        match result {
            Ok(Outcome::Processed { .. }) => self.processed += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

type ItemResult<'a> = (usize, &'a WorkItem, Result<Outcome, ItemFailure>);

/// Drives a [`Pipeline`] over a batch, sequentially or with a bounded pool of
/// scoped worker threads. A failing or panicking item is logged and counted;
/// the rest of the batch still runs.
pub struct TaskExecutor<P> {
    pipeline: P,
    cancellation: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl<P: Pipeline> TaskExecutor<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress<F>(mut self, reporter: F) -> Self
    where
        F: Fn(usize, usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(reporter));
        self
    }

    #[cfg(test)]
    fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Process every item in input order on the calling thread.
    pub fn execute(&self, items: &[WorkItem]) -> Result<BatchSummary, ExecutorError> {
        let mut summary = BatchSummary::new(items.len());
        if items.is_empty() {
            tracing::warn!("No work items to process");
            return Ok(summary);
        }

        for item in items {
            if self.cancellation.is_cancelled() {
                tracing::warn!(
                    "Cancelled after {} of {} items",
                    summary.attempted(),
                    summary.total
                );
                return Err(ExecutorError::Interrupted { summary });
            }
            let result = self.run_item(item);
            self.record(&mut summary, item, &result, 0);
        }

        Ok(summary)
    }

    /// Process items on `min(max(worker_count, 1), items.len())` worker threads.
    ///
    /// Blocks until every item's outcome has been observed, or until the
    /// cancellation token fires. On cancellation no further items are handed
    /// out, in-flight items finish, and all workers are joined before
    /// `ExecutorError::Interrupted` is returned.
    pub fn execute_parallel(
        &self,
        items: &[WorkItem],
        worker_count: usize,
    ) -> Result<BatchSummary, ExecutorError> {
        let total = items.len();
        if items.is_empty() {
            tracing::warn!("No work items to process");
            return Ok(BatchSummary::new(0));
        }

        let workers = worker_count.max(1).min(total);
        tracing::debug!("Processing {} items with {} workers", total, workers);

        let (work_tx, work_rx): (Sender<&WorkItem>, Receiver<&WorkItem>) = bounded(workers * 2);
        let (result_tx, result_rx): (Sender<ItemResult>, Receiver<ItemResult>) = unbounded();
        let cancel_rx = self.cancellation.receiver().clone();

        let collected = crossbeam::thread::scope(|s| {
            for worker_id in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| self.worker_thread(worker_id, work_rx, result_tx));
            }

            // Producer: feed the bounded queue until done or cancelled
            let producer_cancel = cancel_rx.clone();
            s.spawn(move |_| {
                for item in items {
                    select! {
                        send(work_tx, item) -> sent => if sent.is_err() { break },
                        recv(producer_cancel) -> _ => break,
                    }
                }
            });

            drop(work_rx);
            drop(result_tx);

            self.collect_results(&result_rx, &cancel_rx, total)
        })
        .map_err(|_| ExecutorError::WorkerPanic)?;

        let mut summary = collected;
        // Outcomes of items that were in flight when collection stopped
        for (worker_id, item, result) in result_rx.try_iter() {
            self.record(&mut summary, item, &result, worker_id);
        }

        // A cancel that lands after the last result is not an interruption
        if summary.attempted() < total {
            tracing::warn!(
                "Cancelled after {} of {} items",
                summary.attempted(),
                summary.total
            );
            return Err(ExecutorError::Interrupted { summary });
        }
        Ok(summary)
    }

    fn worker_thread<'a>(
        &self,
        worker_id: usize,
        work_rx: Receiver<&'a WorkItem>,
        result_tx: Sender<ItemResult<'a>>,
    ) {
        while let Ok(item) = work_rx.recv() {
            if self.cancellation.is_cancelled() {
                break;
            }
            let result = self.run_item(item);
            if result_tx.send((worker_id, item, result)).is_err() {
                break; // Collector gone
            }
        }
    }

    fn collect_results(
        &self,
        result_rx: &Receiver<ItemResult>,
        cancel_rx: &Receiver<()>,
        total: usize,
    ) -> BatchSummary {
        let mut summary = BatchSummary::new(total);

        while summary.attempted() < total {
            select! {
                recv(result_rx) -> message => match message {
                    Ok((worker_id, item, result)) => {
                        self.record(&mut summary, item, &result, worker_id);
                    }
                    Err(_) => break,
                },
                recv(cancel_rx) -> _ => break,
            }
        }

        summary
    }

    fn run_item(&self, item: &WorkItem) -> Result<Outcome, ItemFailure> {
        match catch_unwind(AssertUnwindSafe(|| self.pipeline.process(item))) {
            Ok(result) => result.map_err(ItemFailure::from),
            Err(payload) => Err(ItemFailure::Panicked(panic_message(payload))),
        }
    }

    fn record(
        &self,
        summary: &mut BatchSummary,
        item: &WorkItem,
        result: &Result<Outcome, ItemFailure>,
        worker_id: usize,
    ) {
        if let Err(failure) = result {
            tracing::error!(
                "Failed to process {}: {}",
                item.source_path().display(),
                error_chain(failure)
            );
        }
        summary.record(result);

        if let Some(reporter) = &self.progress {
            reporter(summary.attempted(), summary.total, worker_id);
        }
    }
}

/// Execution strategy chosen from a precomputed worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn from_worker_count(workers: usize) -> Self {
        if workers <= 1 {
            ExecutionStrategy::Sequential
        } else {
            ExecutionStrategy::Parallel { workers }
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::Parallel { workers } => *workers,
        }
    }

    pub fn run<P: Pipeline>(
        &self,
        executor: &TaskExecutor<P>,
        items: &[WorkItem],
    ) -> Result<BatchSummary, ExecutorError> {
        match self {
            ExecutionStrategy::Sequential => executor.execute(items),
            ExecutionStrategy::Parallel { workers } => executor.execute_parallel(items, *workers),
        }
    }
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records every call and tracks peak concurrency.
    #[derive(Default)]
    struct CountingPipeline {
        calls: Mutex<HashMap<PathBuf, usize>>,
        active: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl CountingPipeline {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    impl Pipeline for CountingPipeline {
        fn process(&self, item: &WorkItem) -> Result<Outcome, ProcessingError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            *self
                .calls
                .lock()
                .unwrap()
                .entry(item.source_path().to_path_buf())
                .or_default() += 1;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let name = item.source_path().to_string_lossy();
            if name.contains("fail") {
                return Err(ProcessingError::SourceRead {
                    path: item.source_path().to_path_buf(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                });
            }
            if name.contains("panic") {
                panic!("boom");
            }
            Ok(Outcome::Processed { produced: Vec::new() })
        }
    }

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|name| WorkItem::new(format!("/in/{name}"), "/out"))
            .collect()
    }

    fn numbered(count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| WorkItem::new(format!("/in/file-{i}"), "/out"))
            .collect()
    }

    #[test]
    fn test_sequential_attempts_each_item_once() {
        let executor = TaskExecutor::new(CountingPipeline::default());
        let batch = numbered(7);

        let summary = executor.execute(&batch).unwrap();
        assert_eq!(summary.processed, 7);
        assert_eq!(executor.pipeline().total_calls(), 7);
        assert!(executor.pipeline().calls.lock().unwrap().values().all(|&c| c == 1));
    }

    #[test]
    fn test_parallel_attempts_each_item_once() {
        for workers in [1, 2, 3, 8, 64] {
            let executor = TaskExecutor::new(CountingPipeline::default());
            let batch = numbered(25);

            let summary = executor.execute_parallel(&batch, workers).unwrap();
            assert_eq!(summary.attempted(), 25);
            let calls = executor.pipeline().calls.lock().unwrap();
            assert_eq!(calls.len(), 25);
            assert!(calls.values().all(|&c| c == 1));
        }
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let executor = TaskExecutor::new(CountingPipeline::default());
        assert_eq!(executor.execute(&[]).unwrap(), BatchSummary::new(0));
        assert_eq!(executor.execute_parallel(&[], 4).unwrap(), BatchSummary::new(0));
        assert_eq!(executor.pipeline().total_calls(), 0);
    }

    #[test]
    fn test_zero_workers_still_processes() {
        let executor = TaskExecutor::new(CountingPipeline::default());
        let summary = executor.execute_parallel(&numbered(3), 0).unwrap();
        assert_eq!(summary.processed, 3);
    }

    #[test]
    fn test_workers_clamped_to_item_count() {
        let executor = TaskExecutor::new(CountingPipeline::with_delay(Duration::from_millis(30)));
        executor.execute_parallel(&numbered(3), 16).unwrap();
        assert!(executor.pipeline().peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_peak_concurrency_bounded_by_workers() {
        let executor = TaskExecutor::new(CountingPipeline::with_delay(Duration::from_millis(5)));
        executor.execute_parallel(&numbered(20), 2).unwrap();
        assert!(executor.pipeline().peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let batch = items(&["a", "fail-b", "c", "d"]);

        let executor = TaskExecutor::new(CountingPipeline::default());
        let summary = executor.execute(&batch).unwrap();
        assert_eq!((summary.processed, summary.failed), (3, 1));

        let executor = TaskExecutor::new(CountingPipeline::default());
        let summary = executor.execute_parallel(&batch, 2).unwrap();
        assert_eq!((summary.processed, summary.failed), (3, 1));
        assert_eq!(executor.pipeline().total_calls(), 4);
    }

    #[test]
    fn test_panic_is_isolated_to_its_item() {
        let batch = items(&["a", "panic-b", "c"]);

        let executor = TaskExecutor::new(CountingPipeline::default());
        let summary = executor.execute(&batch).unwrap();
        assert_eq!((summary.processed, summary.failed), (2, 1));

        let executor = TaskExecutor::new(CountingPipeline::default());
        let summary = executor.execute_parallel(&batch, 3).unwrap();
        assert_eq!((summary.processed, summary.failed), (2, 1));
    }

    #[test]
    fn test_progress_reports_every_outcome() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let executor = TaskExecutor::new(CountingPipeline::default()).with_progress(
            move |completed, total, _worker| {
                assert!(completed <= total);
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        executor.execute_parallel(&numbered(10), 3).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_cancelled_before_start_processes_nothing_sequentially() {
        let token = CancellationToken::new();
        token.cancel();
        let executor = TaskExecutor::new(CountingPipeline::default()).with_cancellation(token);

        let err = executor.execute(&numbered(5)).unwrap_err();
        assert!(matches!(err, ExecutorError::Interrupted { summary } if summary.attempted() == 0));
        assert_eq!(executor.pipeline().total_calls(), 0);
    }

    #[test]
    fn test_cancellation_stops_parallel_batch() {
        let token = CancellationToken::new();
        let executor = TaskExecutor::new(CountingPipeline::with_delay(Duration::from_millis(20)))
            .with_cancellation(token.clone());

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            token.cancel();
        });
        let result = executor.execute_parallel(&numbered(200), 2);
        canceller.join().unwrap();

        let Err(ExecutorError::Interrupted { summary }) = result else {
            panic!("expected interruption");
        };
        assert!(summary.attempted() < 200);
        // Every attempted item was recorded once all workers were joined
        assert_eq!(summary.attempted(), executor.pipeline().total_calls());
    }

    /// Fires the token while processing its item.
    struct CancelDuringProcess(CancellationToken);

    impl Pipeline for CancelDuringProcess {
        fn process(&self, _item: &WorkItem) -> Result<Outcome, ProcessingError> {
            self.0.cancel();
            Ok(Outcome::Processed { produced: Vec::new() })
        }
    }

    #[test]
    fn test_cancel_after_last_item_is_not_an_interruption() {
        for _ in 0..50 {
            let token = CancellationToken::new();
            let executor = TaskExecutor::new(CancelDuringProcess(token.clone()))
                .with_cancellation(token);

            let summary = executor.execute_parallel(&numbered(1), 2).unwrap();
            assert_eq!(summary.processed, 1);
            assert_eq!(summary.attempted(), summary.total);
        }
    }

    #[test]
    fn test_strategy_from_worker_count() {
        assert_eq!(ExecutionStrategy::from_worker_count(0), ExecutionStrategy::Sequential);
        assert_eq!(ExecutionStrategy::from_worker_count(1), ExecutionStrategy::Sequential);
        assert_eq!(
            ExecutionStrategy::from_worker_count(4),
            ExecutionStrategy::Parallel { workers: 4 }
        );
        assert_eq!(ExecutionStrategy::Parallel { workers: 4 }.workers(), 4);
    }
}
