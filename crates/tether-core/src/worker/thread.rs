use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use super::config::{PanicPolicy, WorkerBuilder, WorkerConfig};
use super::state::{StateCell, WorkerState};
use super::stats::{Counters, WorkerStats};
use crate::capsule::{self, Capsule};
use crate::channel::{DispatchChannel, ThreadMsg};
use crate::error::DelegateError;

/// Dedicated OS thread that runs dispatched capsules one at a time, in order.
///
/// - `dispatch` は unbounded queue への push だけなので呼び出し側はブロックしない
/// - `stop()` は Exit を queue の末尾に積む（それ以前の capsule は実行される）
/// - 最後の `Arc<WorkerThread>` が drop されると stop + join する
pub struct WorkerThread {
    name: String,
    tx: mpsc::UnboundedSender<ThreadMsg>,
    shared: Arc<Shared>,
    thread_id: ThreadId,
    join: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    state: StateCell,
    counters: Counters,
}

impl WorkerThread {
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }

    /// Spawns the thread and enters the consume loop.
    pub fn spawn(config: WorkerConfig) -> Result<Arc<Self>, DelegateError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: StateCell::new(WorkerState::Idle),
            counters: Counters::default(),
        });

        let handle = thread::Builder::new()
            .name(config.name.clone())
            .spawn({
                let shared = Arc::clone(&shared);
                let name = config.name.clone();
                let policy = config.panic_policy;
                move || run_loop(&name, rx, &shared, policy)
            })
            .map_err(|source| DelegateError::Spawn {
                name: config.name.clone(),
                source,
            })?;

        tracing::debug!(worker = %config.name, policy = ?config.panic_policy, "worker.spawned");

        Ok(Arc::new(Self {
            name: config.name,
            tx,
            shared,
            thread_id: handle.thread().id(),
            join: Mutex::new(Some(handle)),
        }))
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state.get()
    }

    pub fn stats(&self) -> WorkerStats {
        self.shared.counters.snapshot()
    }

    /// Runs `f` on the worker thread.
    pub fn post<F>(&self, f: F) -> Result<(), DelegateError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(capsule::from_fn(f))
    }

    /// Queues the exit sentinel behind everything already dispatched.
    pub fn stop(&self) {
        // ignore send error: the loop may already be gone
        if self.tx.send(ThreadMsg::Exit).is_err() {
            tracing::debug!(worker = %self.name, "worker.stop_after_exit");
        }
    }

    /// Waits for the thread to end.
    ///
    /// Concurrent callers all wait; only the first one to join sees a
    /// `WorkerPanicked` error. Returns immediately once the thread has been
    /// joined, or when called from the worker thread itself.
    pub fn join(&self) -> Result<(), DelegateError> {
        if thread::current().id() == self.thread_id {
            return Ok(());
        }
        // handle を取り出した後も lock を保持し、後続の join を完了まで待たせる
        let mut slot = self.join.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = slot.take() else {
            return Ok(());
        };
        handle.join().map_err(|payload| DelegateError::WorkerPanicked {
            name: self.name.clone(),
            message: panic_message(&*payload),
        })
    }

    /// `stop` then `join`.
    pub fn shutdown(&self) -> Result<(), DelegateError> {
        self.stop();
        self.join()
    }
}

impl DispatchChannel for WorkerThread {
    fn dispatch(&self, capsule: Box<dyn Capsule>) -> Result<(), DelegateError> {
        let counters = &self.shared.counters;
        Counters::bump(&counters.dispatched);
        if self.tx.send(ThreadMsg::Call(capsule)).is_err() {
            counters.dispatched.fetch_sub(1, Ordering::Relaxed);
            tracing::warn!(worker = %self.name, "worker.dispatch_rejected");
            return Err(DelegateError::ChannelClosed(self.name.clone()));
        }
        tracing::trace!(worker = %self.name, "worker.enqueued");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
        if let Err(err) = self.join() {
            tracing::error!(worker = %self.name, error = %err, "worker.join_failed");
        }
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the worker terminated however the loop is left, unwinding included.
struct TerminateGuard<'a> {
    name: &'a str,
    shared: &'a Shared,
}

impl Drop for TerminateGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            Counters::bump(&self.shared.counters.panicked);
            tracing::error!(worker = %self.name, "worker.terminated_by_panic");
        }
        self.shared.state.set(WorkerState::Terminated);
        tracing::debug!(worker = %self.name, "worker.terminated");
    }
}

fn run_loop(
    name: &str,
    mut rx: mpsc::UnboundedReceiver<ThreadMsg>,
    shared: &Shared,
    policy: PanicPolicy,
) {
    let _guard = TerminateGuard { name, shared };
    shared.state.set(WorkerState::Waiting);
    tracing::debug!(worker = %name, "worker.started");

    // このスレッドは tokio runtime の外なので blocking_recv で待つ
    while let Some(msg) = rx.blocking_recv() {
        let capsule = match msg {
            ThreadMsg::Call(capsule) => capsule,
            ThreadMsg::Exit => {
                tracing::debug!(worker = %name, "worker.exit_requested");
                break;
            }
        };
        shared.state.set(WorkerState::Running);
        run_capsule(name, capsule, shared, policy);
        shared.state.set(WorkerState::Waiting);
    }

    // Exit 以降に積まれた capsule は実行せずに捨てる
    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        tracing::debug!(worker = %name, discarded, "worker.discarded_after_exit");
    }
}

fn run_capsule(name: &str, capsule: Box<dyn Capsule>, shared: &Shared, policy: PanicPolicy) {
    let description = capsule.describe();
    let counters = &shared.counters;

    let result = match policy {
        PanicPolicy::Isolate => {
            match panic::catch_unwind(AssertUnwindSafe(|| capsule.invoke())) {
                Ok(result) => result,
                Err(payload) => {
                    Counters::bump(&counters.panicked);
                    tracing::error!(
                        worker = %name,
                        capsule = %description,
                        panic = %panic_message(&*payload),
                        "worker.capsule_panicked"
                    );
                    return;
                }
            }
        }
        PanicPolicy::Propagate => capsule.invoke(),
    };

    match result {
        Ok(()) => Counters::bump(&counters.completed),
        Err(DelegateError::TargetDropped) => {
            Counters::bump(&counters.target_dropped);
            tracing::warn!(worker = %name, capsule = %description, "worker.target_dropped");
        }
        Err(err) => {
            Counters::bump(&counters.failed);
            tracing::warn!(worker = %name, capsule = %description, error = %err, "worker.capsule_failed");
        }
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_delegate::bind_async;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<(String, u32)>>,
    }

    impl Journal {
        fn note(&self, value: u32) {
            let thread = thread::current().name().unwrap_or("?").to_string();
            self.entries.lock().unwrap().push((thread, value));
        }

        fn values(&self) -> Vec<u32> {
            self.entries.lock().unwrap().iter().map(|(_, v)| *v).collect()
        }
    }

    fn spawn(name: &str, policy: PanicPolicy) -> Arc<WorkerThread> {
        WorkerThread::builder()
            .name(name)
            .panic_policy(policy)
            .spawn()
            .unwrap()
    }

    fn wait_for_state(worker: &WorkerThread, state: WorkerState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.state() != state {
            assert!(Instant::now() < deadline, "worker never reached {state:?}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Parks the worker inside a capsule until the returned barrier is hit.
    fn park(worker: &WorkerThread) -> Arc<Barrier> {
        let release = Arc::new(Barrier::new(2));
        worker
            .post({
                let release = Arc::clone(&release);
                move || {
                    release.wait();
                }
            })
            .unwrap();
        wait_for_state(worker, WorkerState::Running);
        release
    }

    #[test]
    fn calls_run_on_the_worker_thread() {
        let worker = spawn("journal-worker", PanicPolicy::Isolate);
        let journal = Arc::new(Journal::default());
        let d = bind_async::<_, (u32,)>(&journal, Journal::note, worker.clone());

        d.invoke((1,)).unwrap();
        worker.shutdown().unwrap();

        assert_eq!(
            *journal.entries.lock().unwrap(),
            vec![("journal-worker".to_string(), 1)]
        );
    }

    #[test]
    fn invoke_returns_before_the_method_runs() {
        let worker = spawn("barrier-worker", PanicPolicy::Isolate);
        let journal = Arc::new(Journal::default());
        let d = bind_async::<_, (u32,)>(&journal, Journal::note, worker.clone());

        let release = park(&worker);
        d.invoke((42,)).unwrap();
        assert!(journal.values().is_empty());

        release.wait();
        worker.shutdown().unwrap();
        assert_eq!(journal.values(), vec![42]);
    }

    #[test]
    fn calls_are_delivered_in_dispatch_order() {
        let worker = spawn("fifo-worker", PanicPolicy::Isolate);
        let journal = Arc::new(Journal::default());
        let d = bind_async::<_, (u32,)>(&journal, Journal::note, worker.clone());

        for i in 0..200 {
            d.invoke((i,)).unwrap();
        }
        worker.shutdown().unwrap();

        assert_eq!(journal.values(), (0..200).collect::<Vec<_>>());
        let stats = worker.stats();
        assert_eq!(stats.dispatched, 200);
        assert_eq!(stats.completed, 200);
        assert_eq!(stats.pending(), 0);
    }

    #[test]
    fn state_moves_through_running_to_terminated() {
        let worker = spawn("state-worker", PanicPolicy::Isolate);
        wait_for_state(&worker, WorkerState::Waiting);

        let release = park(&worker);
        assert_eq!(worker.state(), WorkerState::Running);
        release.wait();

        worker.shutdown().unwrap();
        assert_eq!(worker.state(), WorkerState::Terminated);
    }

    #[test]
    fn isolated_panic_keeps_the_worker_alive() {
        let worker = spawn("isolate-worker", PanicPolicy::Isolate);
        let hits = Arc::new(AtomicUsize::new(0));

        worker.post(|| panic!("capsule blew up")).unwrap();
        worker
            .post({
                let hits = Arc::clone(&hits);
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        worker.shutdown().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let stats = worker.stats();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn propagated_panic_terminates_the_worker() {
        let worker = spawn("propagate-worker", PanicPolicy::Propagate);

        worker.post(|| panic!("fatal capsule")).unwrap();
        let err = worker.join().unwrap_err();
        assert!(
            matches!(&err, DelegateError::WorkerPanicked { name, message }
                if name == "propagate-worker" && message.contains("fatal capsule"))
        );
        assert_eq!(worker.state(), WorkerState::Terminated);
        assert_eq!(worker.stats().panicked, 1);

        let err = worker.post(|| {}).unwrap_err();
        assert!(matches!(err, DelegateError::ChannelClosed(_)));
    }

    #[test]
    fn dispatch_after_shutdown_is_rejected() {
        let worker = spawn("closed-worker", PanicPolicy::Isolate);
        worker.shutdown().unwrap();

        let err = worker.post(|| {}).unwrap_err();
        assert!(matches!(err, DelegateError::ChannelClosed(name) if name == "closed-worker"));
        assert_eq!(worker.stats().dispatched, 0);
    }

    #[test]
    fn calls_queued_after_exit_never_run() {
        let worker = spawn("exit-worker", PanicPolicy::Isolate);
        let hits = Arc::new(AtomicUsize::new(0));

        let release = park(&worker);
        worker.stop();
        worker
            .post({
                let hits = Arc::clone(&hits);
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        release.wait();
        worker.join().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(worker.stats().pending(), 1);
    }

    #[test]
    fn dropped_target_is_skipped_and_counted() {
        let worker = spawn("dropped-worker", PanicPolicy::Isolate);
        let journal = Arc::new(Journal::default());
        let d = bind_async::<_, (u32,)>(&journal, Journal::note, worker.clone());

        let release = park(&worker);
        d.invoke((1,)).unwrap();
        drop(journal);
        release.wait();
        worker.shutdown().unwrap();

        let stats = worker.stats();
        assert_eq!(stats.target_dropped, 1);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn join_twice_is_fine() {
        let worker = spawn("join-worker", PanicPolicy::Isolate);
        worker.shutdown().unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn concurrent_shutdowns_all_wait_for_the_thread() {
        let worker = spawn("shared-shutdown", PanicPolicy::Isolate);
        let release = park(&worker);

        let joiners: Vec<_> = (0..2)
            .map(|_| {
                let worker = Arc::clone(&worker);
                thread::spawn(move || {
                    worker.shutdown().unwrap();
                    worker.state()
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        release.wait();

        for joiner in joiners {
            assert_eq!(joiner.join().unwrap(), WorkerState::Terminated);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_keep_their_own_order() {
        let worker = spawn("mpsc-worker", PanicPolicy::Isolate);
        let journal = Arc::new(Journal::default());
        let d = bind_async::<_, (u32,)>(&journal, Journal::note, worker.clone());

        let mut producers = Vec::new();
        for producer in 0..4u32 {
            let d = d.clone();
            producers.push(tokio::spawn(async move {
                for seq in 0..50u32 {
                    d.invoke((producer * 1000 + seq,)).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        let joined = Arc::clone(&worker);
        tokio::task::spawn_blocking(move || joined.shutdown())
            .await
            .unwrap()
            .unwrap();

        let values = journal.values();
        assert_eq!(values.len(), 200);
        for producer in 0..4u32 {
            let seen: Vec<u32> = values
                .iter()
                .copied()
                .filter(|v| v / 1000 == producer)
                .collect();
            let expected: Vec<u32> = (0..50).map(|seq| producer * 1000 + seq).collect();
            assert_eq!(seen, expected);
        }
    }
}
