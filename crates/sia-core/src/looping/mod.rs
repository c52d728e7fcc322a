//! Periodic task runner.
//!
//! A [`LoopingCall`] invokes a work function over and over on a tokio task, sleeping `interval` between
//! the end of one invocation and the start of the next. The loop ends in exactly one of three ways:
//! - an external [`LoopingCall::stop`] observed between invocations, resolving to [`Exit::Stopped`];
//! - the work function returning [`Step::Done`], resolving to [`Exit::Done`] with its payload;
//! - the work function returning an error, resolving to [`LoopError::Failed`].
//!
//! Stopping is cooperative: an in-flight invocation always runs to completion and the inter-iteration
//! sleep is never cut short. Invocations of one runner never overlap.
//! Work functions must `.await` (or otherwise yield) around blocking operations, otherwise they stall
//! every other task sharing the worker thread.
mod handle;
mod step;

pub use handle::LoopingCallHandle;
pub use step::{Exit, Step};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::error::{BoxError, LoopError};
use handle::{Outcome, Resolver, completion};

/// Result of one invocation of a work function.
pub type WorkResult<T> = Result<Step<T>, BoxError>;

type WorkFuture<T> = Pin<Box<dyn Future<Output = WorkResult<T>> + Send>>;
type WorkFn<T> = Box<dyn FnMut() -> WorkFuture<T> + Send>;

pub struct LoopingCall<T> {
    name: Arc<str>,
    work: Option<WorkFn<T>>,
    deadline: Option<Duration>,
    running: CancellationToken,
    handle: Option<LoopingCallHandle<T>>,
}

impl<T> LoopingCall<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap an async work function. `name` labels the runner's log records.
    pub fn new<F, Fut>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult<T>> + Send + 'static,
    {
        let work: WorkFn<T> = Box::new(move || -> WorkFuture<T> { Box::pin(f()) });
        Self {
            name: Arc::from(name.into()),
            work: Some(work),
            deadline: None,
            running: CancellationToken::new(),
            handle: None,
        }
    }

    /// Wrap a synchronous work function.
    ///
    /// The function runs on the runtime's worker thread and must return promptly.
    pub fn from_fn<F>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut() -> WorkResult<T> + Send + 'static,
    {
        Self::new(name, move || std::future::ready(f()))
    }

    /// Bound every invocation by `limit`.
    ///
    /// An invocation that outlives the deadline is dropped and the loop fails with
    /// [`LoopError::DeadlineExceeded`]. Without a deadline invocations are never interrupted.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start looping on the current tokio runtime and return immediately.
    ///
    /// With `run_immediately == false` the first invocation is delayed by one `interval`.
    /// A runner can be started once; later calls return [`LoopError::AlreadyStarted`].
    pub fn start(
        &mut self,
        interval: Duration,
        run_immediately: bool,
    ) -> Result<LoopingCallHandle<T>, LoopError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoopError::NoRuntime)?;
        let work = self.work.take().ok_or(LoopError::AlreadyStarted)?;

        let (resolver, handle) = completion(self.running.clone());
        let ctx = LoopContext {
            name: Arc::clone(&self.name),
            running: self.running.clone(),
            deadline: self.deadline,
            interval,
            run_immediately,
        };

        trace!(task = %self.name, ?interval, run_immediately, "starting looping call");
        runtime.spawn(run_loop(ctx, work, resolver));

        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Ask the loop to end before its next invocation. Idempotent.
    pub fn stop(&self) {
        self.running.cancel();
    }

    /// `true` from `start()` until the loop has been told (or decided) to stop.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished()) && !self.running.is_cancelled()
    }

    /// Wait for the loop started by this runner to terminate.
    pub async fn wait(&self) -> Result<Exit<T>, LoopError> {
        match &self.handle {
            Some(handle) => handle.wait().await,
            None => Err(LoopError::NotStarted),
        }
    }

    /// Handle of the started loop, if any.
    pub fn handle(&self) -> Option<&LoopingCallHandle<T>> {
        self.handle.as_ref()
    }
}

struct LoopContext {
    name: Arc<str>,
    running: CancellationToken,
    deadline: Option<Duration>,
    interval: Duration,
    run_immediately: bool,
}

async fn run_loop<T>(ctx: LoopContext, mut work: WorkFn<T>, resolver: Resolver<T>) {
    let outcome = drive(&ctx, &mut work).await;
    ctx.running.cancel();

    match &outcome {
        Ok(Exit::Stopped) => debug!(task = %ctx.name, "looping call stopped"),
        Ok(Exit::Done(_)) => debug!(task = %ctx.name, "looping call finished by its work function"),
        Err(err) => error!(task = %ctx.name, error = %err, "unexpected error in looping call"),
    }
    resolver.resolve(outcome);
}

async fn drive<T>(ctx: &LoopContext, work: &mut WorkFn<T>) -> Outcome<T> {
    if !ctx.run_immediately {
        pause(ctx.interval).await;
    }

    while !ctx.running.is_cancelled() {
        if let Step::Done(value) = ctx.invoke(work).await? {
            return Ok(Exit::Done(value));
        }
        if ctx.running.is_cancelled() {
            break;
        }
        pause(ctx.interval).await;
    }
    Ok(Exit::Stopped)
}

impl LoopContext {
    async fn invoke<T>(&self, work: &mut WorkFn<T>) -> Result<Step<T>, LoopError> {
        let fut = work();
        let result = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| LoopError::DeadlineExceeded(limit))?,
            None => fut.await,
        };
        result.map_err(LoopError::failed)
    }
}

async fn pause(interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn graceful_stop_returns_payload() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let mut call = LoopingCall::new("count-to-three", move || {
            let seen = Arc::clone(&seen);
            async move {
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 3 {
                    return Ok(Step::Done(n));
                }
                Ok(Step::Continue)
            }
        });

        let handle = call.start(Duration::ZERO, true).unwrap();
        assert_eq!(handle.wait().await.unwrap(), Exit::Done(3));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!call.is_running());
    }

    /// Records the message of every `ERROR` event.
    #[derive(Clone, Default)]
    struct ErrorEvents(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::ERROR {
                return;
            }
            let mut message = MessageField::default();
            event.record(&mut message);
            self.0.lock().unwrap().push(message.0);
        }
    }

    #[derive(Default)]
    struct MessageField(String);

    impl tracing::field::Visit for MessageField {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_logged_at_error_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let events = ErrorEvents::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let mut call = LoopingCall::<()>::new("fails-loudly", || async {
            Err(io::Error::other("disk full").into())
        });
        call.start(Duration::from_millis(10), true).unwrap();
        assert!(call.wait().await.is_err());
        tokio::time::sleep(Duration::from_secs(1)).await;

        let logged = events.0.lock().unwrap().clone();
        assert_eq!(logged, vec!["unexpected error in looping call".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_propagated_and_ends_the_loop() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let mut call = LoopingCall::<()>::new("fails-first", move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::new(io::ErrorKind::InvalidData, "bad value").into())
            }
        });

        call.start(Duration::from_millis(10), true).unwrap();
        let err = call.wait().await.unwrap_err();

        let io_err = err.downcast_ref::<io::Error>().expect("io error preserved");
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!call.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_first_invocation_runs_exactly_once() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut call = LoopingCall::<()>::new("stop-early", move || {
            let seen = Arc::clone(&seen);
            let tx = tx.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
                Ok(Step::Continue)
            }
        });

        call.start(Duration::from_secs(5), true).unwrap();
        rx.recv().await.unwrap();
        call.stop();

        assert_eq!(call.wait().await.unwrap(), Exit::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_start_waits_one_interval() {
        let interval = Duration::from_secs(3);
        let started = Instant::now();
        let mut call = LoopingCall::new("delayed", move || async move {
            Ok(Step::Done(Instant::now()))
        });

        call.start(interval, false).unwrap();
        let first = call.wait().await.unwrap().into_value().unwrap();
        assert!(first.duration_since(started) >= interval);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_initial_delay_skips_every_invocation() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let mut call = LoopingCall::<()>::from_fn("never-runs", move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Step::Continue)
        });

        call.start(Duration::from_secs(2), false).unwrap();
        call.stop();

        assert_eq!(call.wait().await.unwrap(), Exit::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invocations_are_spaced_by_interval() {
        let interval = Duration::from_secs(5);
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stamps);
        let mut call = LoopingCall::new("spaced", move || {
            let seen = Arc::clone(&seen);
            async move {
                let mut stamps = seen.lock().unwrap();
                stamps.push(Instant::now());
                if stamps.len() == 4 {
                    return Ok(Step::Done(stamps.len()));
                }
                Ok(Step::Continue)
            }
        });

        call.start(interval, true).unwrap();
        assert_eq!(call.wait().await.unwrap(), Exit::Done(4));

        let stamps = stamps.lock().unwrap();
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn invocations_never_overlap() {
        let busy = Arc::new(AtomicBool::new(false));
        let calls = counter();
        let (busy_w, calls_w) = (Arc::clone(&busy), Arc::clone(&calls));
        let mut call = LoopingCall::new("exclusive", move || {
            let busy = Arc::clone(&busy_w);
            let calls = Arc::clone(&calls_w);
            async move {
                assert!(!busy.swap(true, Ordering::SeqCst), "overlapping invocation");
                tokio::time::sleep(Duration::from_millis(2)).await;
                busy.store(false, Ordering::SeqCst);
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n == 10 { Step::Done(n) } else { Step::Continue })
            }
        });

        call.start(Duration::ZERO, true).unwrap();
        assert_eq!(call.wait().await.unwrap(), Exit::Done(10));
    }

    #[tokio::test(start_paused = true)]
    async fn every_waiter_sees_the_same_failure() {
        let mut call = LoopingCall::<()>::new("shared-failure", || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err("boom".into())
        });
        let handle = call.start(Duration::from_secs(1), true).unwrap();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.wait().await })
            })
            .collect();

        for waiter in waiters {
            let err = waiter.await.unwrap().unwrap_err();
            assert!(matches!(err, LoopError::Failed(_)));
            assert_eq!(err.to_string(), "looping call failed: boom");
        }
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_harmless_after_termination() {
        let mut call = LoopingCall::<u8>::new("done-at-once", || async { Ok(Step::Done(7)) });
        call.start(Duration::from_secs(1), true).unwrap();

        assert_eq!(call.wait().await.unwrap(), Exit::Done(7));
        call.stop();
        call.stop();
        assert_eq!(call.wait().await.unwrap(), Exit::Done(7));
        assert!(!call.is_running());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut call = LoopingCall::<()>::new("once", || async { Ok(Step::Continue) });
        call.start(Duration::from_millis(1), true).unwrap();
        assert!(call.is_running());

        let err = call.start(Duration::from_millis(1), true).unwrap_err();
        assert!(matches!(err, LoopError::AlreadyStarted));

        call.stop();
        assert_eq!(call.wait().await.unwrap(), Exit::Stopped);
    }

    #[tokio::test]
    async fn wait_before_start_reports_not_started() {
        let call = LoopingCall::<()>::new("idle", || async { Ok(Step::Continue) });
        assert!(matches!(call.wait().await, Err(LoopError::NotStarted)));
        assert!(!call.is_running());
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let mut call = LoopingCall::<()>::new("orphan", || async { Ok(Step::Continue) });
        assert!(matches!(
            call.start(Duration::from_secs(1), true),
            Err(LoopError::NoRuntime)
        ));
        assert!(call.handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_a_single_invocation() {
        let mut call = LoopingCall::<()>::new("slow", || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Step::Continue)
        })
        .with_deadline(Duration::from_secs(1));

        call.start(Duration::from_secs(1), true).unwrap();
        let err = call.wait().await.unwrap_err();
        assert!(matches!(err, LoopError::DeadlineExceeded(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn panicking_work_abandons_waiters() {
        let mut call = LoopingCall::<()>::new("panics", || async {
            panic!("work function panicked");
        });
        call.start(Duration::ZERO, true).unwrap();

        assert!(matches!(call.wait().await, Err(LoopError::Abandoned)));
        assert!(!call.is_running());
        assert!(call.handle().is_some_and(|h| h.is_finished()));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_stop_ends_the_loop() {
        let mut call = LoopingCall::<()>::new("via-handle", || async { Ok(Step::Continue) });
        let handle = call.start(Duration::from_secs(1), true).unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.stop();

        assert_eq!(handle.wait().await.unwrap(), Exit::Stopped);
        assert!(!call.is_running());
    }
}
