//! Submit builds and wait for them to reach a terminal state.

use std::time::Duration;

use metrics::{counter, histogram};
use reportobello_api_types::{BuildRequestBody, JSON_CONTENT_TYPE};
use serde_json::{Map, Value};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use crate::application::api::ApiClient;
use crate::application::artifact::ArtifactHandle;
use crate::application::error::{BuildError, Rejection, RejectionKind};
use crate::config::PollSettings;
use crate::domain::build::{BuildOptions, BuildResult, JobToken};
use crate::domain::template::Template;

const METRIC_BUILD_TOTAL: &str = "reportobello_build_total";
const METRIC_BUILD_POLLS_TOTAL: &str = "reportobello_build_polls_total";
const METRIC_BUILD_WAIT_MS: &str = "reportobello_build_wait_ms";
/// Deadline used when `started_at + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Bounded exponential backoff between status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_delay)
    }

    /// How long to wait before the next query, given the service's hint.
    fn wait_for(&self, backoff: Duration, hint: Option<Duration>) -> Duration {
        hint.map_or(backoff, |hint| hint.min(self.max_delay))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            initial_delay: settings.initial_delay,
            max_delay: settings.max_delay,
            multiplier: settings.multiplier,
            timeout: settings.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    api: ApiClient,
    policy: PollPolicy,
}

impl BuildOrchestrator {
    pub fn new(api: ApiClient, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Validate `variables` locally, submit, and poll until the build is done.
    ///
    /// Input that fails the template's schema is reported without contacting
    /// the service.
    pub async fn submit(
        &self,
        template: &Template,
        variables: Map<String, Value>,
        options: BuildOptions,
    ) -> Result<ArtifactHandle, BuildError> {
        template.validate()?;
        let data = template.variables().check(&variables)?;

        let body = BuildRequestBody {
            data,
            content_type: JSON_CONTENT_TYPE.to_string(),
            format: options.format.map(|format| format.as_str().to_string()),
            options: options.options,
        };
        let name = template.name();
        let budget = options.timeout.unwrap_or(self.policy.timeout);
        let started_at = Instant::now();
        let deadline = deadline_after(started_at, budget);

        info!(
            target = "application::build",
            op = "build::submit",
            template = %name,
            format = body.format.as_deref().unwrap_or("default"),
            timeout_ms = budget.as_millis() as u64,
            "submitting build"
        );

        let result = match self.api.submit_build(name, &body).await {
            Ok(first) => {
                self.drive(name, first, None, started_at, deadline)
                    .await
            }
            Err(err) => Err(err.into()),
        };
        self.finish(name, started_at, result)
    }

    /// Keep waiting on a job that an earlier call gave up on.
    pub async fn resume(
        &self,
        template: &str,
        job: JobToken,
        timeout: Option<Duration>,
    ) -> Result<ArtifactHandle, BuildError> {
        let started_at = Instant::now();
        let deadline = deadline_after(started_at, timeout.unwrap_or(self.policy.timeout));

        info!(
            target = "application::build",
            op = "build::resume",
            template = %template,
            job = %job,
            "resuming build"
        );

        let result = match self.poll_once(&job, started_at, deadline).await {
            Ok(state) => {
                self.drive(template, state, Some(job), started_at, deadline)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish(template, started_at, result)
    }

    async fn drive(
        &self,
        template: &str,
        mut state: BuildResult,
        mut last_job: Option<JobToken>,
        started_at: Instant,
        deadline: Instant,
    ) -> Result<ArtifactHandle, BuildError> {
        let mut backoff = self.policy.initial_delay;

        loop {
            match state {
                BuildResult::Ready(reference) => {
                    return Ok(ArtifactHandle::new(
                        self.api.clone(),
                        reference,
                        template,
                        last_job,
                    ));
                }
                BuildResult::ValidationError(details) => {
                    return Err(rejected(RejectionKind::Validation, template, details));
                }
                BuildResult::RenderError(details) => {
                    return Err(rejected(RejectionKind::Render, template, details));
                }
                BuildResult::Pending { job, retry_after } => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(BuildError::Timeout {
                            job,
                            elapsed: now - started_at,
                        });
                    }

                    let wait = self
                        .policy
                        .wait_for(backoff, retry_after)
                        .min(deadline - now);
                    debug!(
                        target = "application::build",
                        op = "build::wait",
                        template = %template,
                        job = %job,
                        wait_ms = wait.as_millis() as u64,
                        "build pending"
                    );
                    sleep(wait).await;
                    backoff = self.policy.next_delay(backoff);

                    state = self.poll_once(&job, started_at, deadline).await?;
                    last_job = Some(job);
                }
            }
        }
    }

    /// One status query, abandoned if still in flight at the deadline.
    async fn poll_once(
        &self,
        job: &JobToken,
        started_at: Instant,
        deadline: Instant,
    ) -> Result<BuildResult, BuildError> {
        counter!(METRIC_BUILD_POLLS_TOTAL).increment(1);
        match timeout_at(deadline, self.api.poll_build(job)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BuildError::Timeout {
                job: job.clone(),
                elapsed: started_at.elapsed(),
            }),
        }
    }

    fn finish(
        &self,
        template: &str,
        started_at: Instant,
        result: Result<ArtifactHandle, BuildError>,
    ) -> Result<ArtifactHandle, BuildError> {
        let elapsed = started_at.elapsed();
        let label = result_label(&result);

        counter!(METRIC_BUILD_TOTAL, "result" => label).increment(1);
        histogram!(METRIC_BUILD_WAIT_MS).record(elapsed.as_secs_f64() * 1000.0);

        match &result {
            Ok(handle) => info!(
                target = "application::build",
                op = "build::finish",
                result = label,
                template = %template,
                url = %handle.url(),
                elapsed_ms = elapsed.as_millis() as u64,
                "build ready"
            ),
            Err(err) => warn!(
                target = "application::build",
                op = "build::finish",
                result = label,
                template = %template,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "build did not produce an artifact"
            ),
        }

        result
    }
}

fn deadline_after(started_at: Instant, budget: Duration) -> Instant {
    started_at
        .checked_add(budget)
        .unwrap_or_else(|| started_at + FAR_FUTURE)
}

fn rejected(kind: RejectionKind, template: &str, details: String) -> BuildError {
    BuildError::Rejected(Rejection {
        kind,
        template: template.to_string(),
        details,
    })
}

fn result_label(result: &Result<ArtifactHandle, BuildError>) -> &'static str {
    match result {
        Ok(_) => "ready",
        Err(BuildError::Rejected(rejection)) => match rejection.kind {
            RejectionKind::Validation => "validation_error",
            RejectionKind::Render => "render_error",
        },
        Err(BuildError::Timeout { .. }) => "timeout",
        Err(BuildError::Schema(_) | BuildError::InvalidInput(_)) => "invalid_input",
        Err(BuildError::Api(_)) => "api_error",
    }
}
