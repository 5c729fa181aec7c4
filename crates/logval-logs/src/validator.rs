use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logval_source::Resource;
use logval_types::{AssertRequest, AssertResponse, ValidationInfo};

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::matcher::match_pass;
use crate::state::LogTypeState;
use crate::store::ArcLogRecord;

type SleepFn = dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync;

/// The wait between attempts, swappable so tests need not sleep for real
#[derive(Clone)]
pub struct Sleeper(Arc<SleepFn>);

impl Sleeper {
    /// Sleep on the tokio timer
    pub fn tokio() -> Self {
        Self::from_fn(|duration| Box::pin(tokio::time::sleep(duration)))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub async fn sleep(&self, duration: Duration) {
        (self.0)(duration).await
    }
}

impl Default for Sleeper {
    fn default() -> Self {
        Self::tokio()
    }
}

impl std::fmt::Debug for Sleeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sleeper")
    }
}

/// Drives the tail -> decode -> match loop of an Assert call
#[derive(Clone)]
pub struct Validator {
    resource: Arc<dyn Resource>,
    sleeper: Sleeper,
    config: Arc<ValidatorConfig>,
}

impl Validator {
    pub fn new(resource: Arc<dyn Resource>, sleeper: Sleeper, config: ValidatorConfig) -> Self {
        Self {
            resource,
            sleeper,
            config: Arc::new(config),
        }
    }

    /// Grow, snapshot and match until every expectation passes, the retries
    /// run out, or `cancel` fires. The outcomes of the last pass are returned
    /// in every case; only source and decode failures are errors.
    pub async fn run(
        &self,
        states: &HashMap<String, Arc<LogTypeState>>,
        request: &AssertRequest,
        cancel: &CancellationToken,
    ) -> Result<AssertResponse> {
        let wait = Duration::from_millis(request.log_wait_time_ms);
        let mut attempt: u32 = 0;
        debug!(
            types = states.len(),
            expected = request.expected_count(),
            retries = request.log_wait_retry_count,
            "assert started"
        );

        loop {
            self.grow_all(states).await?;

            let snapshots: HashMap<String, Vec<ArcLogRecord>> = states
                .iter()
                .map(|(name, state)| (name.clone(), state.snapshot()))
                .collect();
            let outcomes = match_pass(&request.expected_log_records, &snapshots);
            let failed = outcomes.iter().filter(|o| o.has_failed()).count();

            if failed == 0 {
                info!(attempt, expected = outcomes.len(), "all expected records found");
                return Ok(response(outcomes));
            }
            if attempt >= request.log_wait_retry_count {
                info!(attempt, failed, expected = outcomes.len(), "retries exhausted");
                return Ok(response(outcomes));
            }

            debug!(attempt, failed, wait_ms = request.log_wait_time_ms, "waiting for records");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(attempt, failed, "assert cancelled");
                    return Ok(response(outcomes));
                }
                _ = self.sleeper.sleep(wait) => {}
            }
            attempt += 1;
        }
    }

    /// Poll every log type on the blocking pool; types never share a lock
    async fn grow_all(&self, states: &HashMap<String, Arc<LogTypeState>>) -> Result<usize> {
        let tasks = states.values().map(|state| {
            let state = Arc::clone(state);
            let resource = Arc::clone(&self.resource);
            let config = Arc::clone(&self.config);
            let task = tokio::task::spawn_blocking(move || state.grow(resource.as_ref(), &config));
            async move { task.await.map_err(|e| Error::Internal(e.to_string()))? }
        });

        let appended = futures::future::try_join_all(tasks).await?;
        Ok(appended.into_iter().sum())
    }
}

fn response(validation_info: Vec<ValidationInfo>) -> AssertResponse {
    AssertResponse { validation_info }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .finish()
    }
}
