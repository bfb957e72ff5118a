//! Worker polling loop.
//!
//! Registers once, then asks the source for work until cancelled. A claimed
//! job is run to completion and reported before the next request; the loop
//! only sleeps when the queue was empty or the source errored.
//!
//! A result the source did not accept for a transient reason is held and
//! re-sent on every tick. No new job is claimed while one is held.

use std::sync::Arc;
use std::time::Duration;

use dispatch_core::types::{JobId, WorkerId};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::handler::JobHandler;
use crate::source::WorkSource;

/// Default delay between work requests while idle.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a single work cycle led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Idle,
    Completed,
    Failed,
}

/// The result of a finished job, as sent back to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Complete(JobId),
    Fail { job_id: JobId, reason: String },
}

impl Report {
    pub fn job_id(&self) -> JobId {
        match self {
            Report::Complete(job_id) | Report::Fail { job_id, .. } => *job_id,
        }
    }

    fn outcome(&self) -> Outcome {
        match self {
            Report::Complete(_) => Outcome::Completed,
            Report::Fail { .. } => Outcome::Failed,
        }
    }
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub completed: u64,
    pub failed: u64,
}

pub struct WorkerLoop {
    source: Arc<dyn WorkSource>,
    handler: Arc<dyn JobHandler>,
    name: Option<String>,
    poll_interval: Duration,
}

impl WorkerLoop {
    pub fn new(source: Arc<dyn WorkSource>, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            source,
            handler,
            name: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Register, then process jobs until `cancel` fires.
    ///
    /// Only registration failure ends the loop early; errors while polling
    /// or reporting are logged and retried on the next tick.
    pub async fn run(&self, cancel: CancellationToken) -> Result<LoopStats, WorkerError> {
        let worker_id = self.source.register(self.name.clone()).await?;
        tracing::info!(
            worker_id = %worker_id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker started",
        );

        let mut stats = LoopStats::default();
        let mut unreported: Option<Report> = None;
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if let Some(report) = &unreported {
                        tracing::warn!(
                            worker_id = %worker_id,
                            job_id = %report.job_id(),
                            "Worker stopping with an unreported job result",
                        );
                    }
                    tracing::info!(worker_id = %worker_id, "Worker shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    delay = match self.run_once(&worker_id, &mut unreported).await {
                        Ok(Outcome::Completed) => {
                            stats.completed += 1;
                            Duration::ZERO
                        }
                        Ok(Outcome::Failed) => {
                            stats.failed += 1;
                            Duration::ZERO
                        }
                        Ok(Outcome::Idle) => self.poll_interval,
                        Err(e) => {
                            tracing::error!(worker_id = %worker_id, error = %e, "Work cycle failed");
                            self.poll_interval
                        }
                    };
                }
            }
        }

        Ok(stats)
    }

    /// One cycle: re-send a held result, or request a job, run it and
    /// report it.
    ///
    /// When reporting fails transiently the result is left in `unreported`
    /// for the next cycle. A result the source rejects outright is dropped.
    pub async fn run_once(
        &self,
        worker_id: &WorkerId,
        unreported: &mut Option<Report>,
    ) -> Result<Outcome, WorkerError> {
        let report = match unreported.take() {
            Some(report) => {
                tracing::info!(job_id = %report.job_id(), "Re-sending job result");
                report
            }
            None => {
                let Some(job) = self.source.next_job(worker_id).await? else {
                    return Ok(Outcome::Idle);
                };
                tracing::debug!(job_id = %job.id, worker_id = %worker_id, "Job received");

                match self.handler.handle(&job).await {
                    Ok(()) => Report::Complete(job.id),
                    Err(reason) => Report::Fail {
                        job_id: job.id,
                        reason,
                    },
                }
            }
        };

        match self.deliver(&report).await {
            Ok(()) => Ok(report.outcome()),
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(job_id = %report.job_id(), error = %e, "Job result not delivered, holding it");
                    *unreported = Some(report);
                } else {
                    tracing::error!(job_id = %report.job_id(), error = %e, "Job result rejected, dropping it");
                }
                Err(e)
            }
        }
    }

    async fn deliver(&self, report: &Report) -> Result<(), WorkerError> {
        match report {
            Report::Complete(job_id) => self.source.complete(*job_id).await,
            Report::Fail { job_id, reason } => self.source.fail(*job_id, reason).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use dispatch_core::context::DispatchContext;
    use dispatch_core::error::CoreError;
    use dispatch_core::job::{Job, JobState};
    use serde_json::json;

    use super::*;
    use crate::handler::CommandHandler;

    /// Completes jobs whose payload is `true`, fails everything else.
    struct FlagHandler;

    #[async_trait]
    impl JobHandler for FlagHandler {
        async fn handle(&self, job: &Job) -> Result<(), String> {
            if job.payload == json!(true) {
                Ok(())
            } else {
                Err("flag not set".to_string())
            }
        }
    }

    /// In-process source whose first `complete` calls hit a storage outage.
    struct FlakySource {
        ctx: DispatchContext,
        complete_failures: AtomicU32,
    }

    impl FlakySource {
        fn new(ctx: &DispatchContext, complete_failures: u32) -> Self {
            Self {
                ctx: ctx.clone(),
                complete_failures: AtomicU32::new(complete_failures),
            }
        }
    }

    #[async_trait]
    impl WorkSource for FlakySource {
        async fn register(&self, name: Option<String>) -> Result<WorkerId, WorkerError> {
            self.ctx.register(name).await
        }

        async fn next_job(&self, worker_id: &str) -> Result<Option<Job>, WorkerError> {
            self.ctx.next_job(worker_id).await
        }

        async fn complete(&self, job_id: JobId) -> Result<(), WorkerError> {
            let outage = self
                .complete_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if outage {
                return Err(CoreError::Storage("connection reset".into()).into());
            }
            self.ctx.complete(job_id).await
        }

        async fn fail(&self, job_id: JobId, reason: &str) -> Result<(), WorkerError> {
            self.ctx.fail(job_id, reason).await
        }
    }

    fn worker_loop(ctx: &DispatchContext) -> WorkerLoop {
        WorkerLoop::new(Arc::new(ctx.clone()), Arc::new(FlagHandler))
            .with_poll_interval(Duration::from_millis(10))
    }

    async fn state_of(ctx: &DispatchContext, job_id: JobId) -> JobState {
        ctx.jobs.find(job_id).await.unwrap().unwrap().state
    }

    #[tokio::test]
    async fn run_once_idle_without_work() {
        let ctx = DispatchContext::in_memory();
        let runner = worker_loop(&ctx);
        let worker_id = ctx.register(None).await.unwrap();
        let mut unreported = None;
        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Idle
        );
    }

    #[tokio::test]
    async fn run_once_reports_completion_and_failure() {
        let ctx = DispatchContext::in_memory();
        let ok = ctx.dispatcher.submit(json!(true)).await.unwrap();
        let bad = ctx.dispatcher.submit(json!(false)).await.unwrap();
        let runner = worker_loop(&ctx);
        let worker_id = ctx.register(None).await.unwrap();
        let mut unreported = None;

        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Completed
        );
        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Failed
        );

        let ok = ctx.jobs.find(ok).await.unwrap().unwrap();
        assert_eq!(ok.state, JobState::Done);
        assert_eq!(ok.assigned_worker.as_deref(), Some(worker_id.as_str()));

        let bad = ctx.jobs.find(bad).await.unwrap().unwrap();
        assert_eq!(bad.state, JobState::Failed);
        assert_eq!(bad.failure_reason.as_deref(), Some("flag not set"));
    }

    #[tokio::test]
    async fn undelivered_result_is_resent_before_new_work() {
        let ctx = DispatchContext::in_memory();
        let a = ctx.dispatcher.submit(json!(true)).await.unwrap();
        let b = ctx.dispatcher.submit(json!(true)).await.unwrap();
        let runner = WorkerLoop::new(Arc::new(FlakySource::new(&ctx, 1)), Arc::new(FlagHandler));
        let worker_id = ctx.register(None).await.unwrap();
        let mut unreported = None;

        assert_matches!(
            runner.run_once(&worker_id, &mut unreported).await,
            Err(WorkerError::Core(CoreError::Storage(_)))
        );
        assert_eq!(unreported, Some(Report::Complete(a)));
        assert_eq!(state_of(&ctx, a).await, JobState::Running);
        assert_eq!(state_of(&ctx, b).await, JobState::Pending);

        // The held result goes out first; b is not claimed on this cycle.
        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Completed
        );
        assert_eq!(unreported, None);
        assert_eq!(state_of(&ctx, a).await, JobState::Done);
        assert_eq!(state_of(&ctx, b).await, JobState::Pending);

        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Completed
        );
        assert_eq!(state_of(&ctx, b).await, JobState::Done);
    }

    #[tokio::test]
    async fn rejected_result_is_dropped() {
        let ctx = DispatchContext::in_memory();
        let job_id = ctx.dispatcher.submit(json!(true)).await.unwrap();
        let runner = worker_loop(&ctx);
        let worker_id = ctx.register(None).await.unwrap();

        // A completion for a job that was never claimed cannot succeed later.
        let mut unreported = Some(Report::Complete(job_id));
        assert_matches!(
            runner.run_once(&worker_id, &mut unreported).await,
            Err(WorkerError::Core(CoreError::InvalidTransition { .. }))
        );
        assert_eq!(unreported, None);

        assert_eq!(
            runner.run_once(&worker_id, &mut unreported).await.unwrap(),
            Outcome::Completed
        );
        assert_eq!(state_of(&ctx, job_id).await, JobState::Done);
    }

    #[tokio::test]
    async fn run_drains_queue_until_cancelled() {
        let ctx = DispatchContext::in_memory();
        for flag in [true, true, false] {
            ctx.dispatcher.submit(json!(flag)).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let runner = worker_loop(&ctx).with_name(Some("test-runner".to_string()));
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { runner.run(cancel).await }
        });

        wait_until_finished(&ctx, 3).await;
        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, LoopStats { completed: 2, failed: 1 });

        let workers = ctx.registry.list().await.unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].name.as_deref(), Some("test-runner"));
    }

    #[tokio::test]
    async fn run_recovers_from_reporting_outage() {
        let ctx = DispatchContext::in_memory();
        for _ in 0..3 {
            ctx.dispatcher.submit(json!(true)).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let runner = WorkerLoop::new(Arc::new(FlakySource::new(&ctx, 2)), Arc::new(FlagHandler))
            .with_poll_interval(Duration::from_millis(10));
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { runner.run(cancel).await }
        });

        wait_until_finished(&ctx, 3).await;
        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, LoopStats { completed: 3, failed: 0 });
        assert_eq!(ctx.jobs.counts().await.unwrap().running, 0);
    }

    async fn wait_until_finished(ctx: &DispatchContext, jobs: i64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let counts = ctx.jobs.counts().await.unwrap();
                if counts.done + counts.failed == jobs {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn cancelled_before_start_only_registers() {
        let ctx = DispatchContext::in_memory();
        ctx.dispatcher.submit(json!(true)).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = worker_loop(&ctx).run(cancel).await.unwrap();
        assert_eq!(stats, LoopStats::default());
        assert_eq!(ctx.jobs.counts().await.unwrap().pending, 1);
    }

    #[tokio::test]
    async fn command_jobs_run_through_shell() {
        let ctx = DispatchContext::in_memory();
        let ok = ctx
            .dispatcher
            .submit(json!({"command": "exit 0"}))
            .await
            .unwrap();
        let bad = ctx
            .dispatcher
            .submit(json!({"command": "echo nope >&2; exit 1"}))
            .await
            .unwrap();

        let runner = WorkerLoop::new(
            Arc::new(ctx.clone()),
            Arc::new(CommandHandler::new(Duration::from_secs(10))),
        );
        let worker_id = ctx.register(None).await.unwrap();
        let mut unreported = None;
        runner.run_once(&worker_id, &mut unreported).await.unwrap();
        runner.run_once(&worker_id, &mut unreported).await.unwrap();

        assert_eq!(state_of(&ctx, ok).await, JobState::Done);
        let bad = ctx.jobs.find(bad).await.unwrap().unwrap();
        assert_eq!(bad.state, JobState::Failed);
        assert_eq!(bad.failure_reason.as_deref(), Some("nope"));
    }
}
