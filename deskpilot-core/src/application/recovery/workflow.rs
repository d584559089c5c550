//! Dependency-ordered execution of multi-step tool workflows.
//!
//! A [`Workflow`] is a set of [`WorkflowTask`]s, each one tool call gated on
//! the completion of the tasks it depends on. The [`WorkflowExecutor`] runs
//! ready tasks in parallel up to a bound, retries failures with exponential
//! backoff, cancels tasks that can no longer run, and on a permission failure
//! rolls back completed tasks through their compensating calls.

use super::classify::{ErrorCategory, classify_failure};
use crate::application::tooling::ToolDispatch;
use crate::domain::types::{ToolInvocationRequest, ToolInvocationResult};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_PARALLEL: usize = 5;
pub const DEFAULT_TASK_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_BACKOFF: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Retrying,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    fn is_unfinished(self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Retrying
        )
    }
}

/// Compensating call run when a workflow is rolled back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compensation {
    pub tool: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTask {
    pub id: String,
    pub tool: String,
    pub arguments: Value,
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub compensation: Option<Compensation>,
    pub result: Option<ToolInvocationResult>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowTask {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            arguments,
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_TASK_RETRIES,
            compensation: None,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_compensation(mut self, tool: impl Into<String>, arguments: Value) -> Self {
        self.compensation = Some(Compensation {
            tool: tool.into(),
            arguments,
        });
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        let elapsed = self.completed_at? - self.started_at?;
        elapsed.to_std().ok()
    }

    fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
    RolledBack,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub tasks: Vec<WorkflowTask>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub workflow_id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    pub total_tasks: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub is_complete: bool,
    pub has_failures: bool,
    pub duration_ms: i64,
}

impl Workflow {
    pub fn new(name: impl Into<String>, tasks: Vec<WorkflowTask>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tasks,
            status: WorkflowStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn task(&self, id: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Every task either completed or was cancelled.
    pub fn is_complete(&self) -> bool {
        self.tasks
            .iter()
            .all(|task| matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled))
    }

    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(|task| task.status == TaskStatus::Failed)
    }

    pub fn summary(&self) -> WorkflowSummary {
        let mut status_counts = BTreeMap::new();
        for task in &self.tasks {
            *status_counts.entry(task.status.as_str().to_string()).or_default() += 1;
        }
        let end = self.completed_at.unwrap_or_else(Utc::now);
        WorkflowSummary {
            workflow_id: self.id,
            name: self.name.clone(),
            status: self.status,
            total_tasks: self.tasks.len(),
            status_counts,
            is_complete: self.is_complete(),
            has_failures: self.has_failures(),
            duration_ms: (end - self.created_at).num_milliseconds(),
        }
    }
}

pub struct WorkflowExecutor {
    dispatcher: Arc<dyn ToolDispatch>,
    max_parallel: usize,
    retry_delay: Duration,
    retry_backoff: f64,
    timeout: Option<Duration>,
}

type TaskFuture = BoxFuture<'static, (usize, ToolInvocationResult)>;

impl WorkflowExecutor {
    pub fn new(dispatcher: Arc<dyn ToolDispatch>) -> Self {
        Self {
            dispatcher,
            max_parallel: DEFAULT_MAX_PARALLEL,
            retry_delay: DEFAULT_RETRY_DELAY,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            timeout: None,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_retry(mut self, delay: Duration, backoff: f64) -> Self {
        self.retry_delay = delay;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn retry_delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = (self.retry_delay.as_millis() as f64 * self.retry_backoff.powi(exponent))
            .clamp(0.0, u64::MAX as f64);
        // NaN casts to zero.
        Duration::from_millis(millis as u64)
    }

    pub async fn execute(&self, workflow: &mut Workflow) -> WorkflowStatus {
        info!(
            workflow = %workflow.id,
            name = %workflow.name,
            tasks = workflow.tasks.len(),
            "Starting workflow"
        );
        workflow.status = WorkflowStatus::Running;

        let index: HashMap<String, usize> = workflow
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| (task.id.clone(), i))
            .collect();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let mut running: FuturesUnordered<TaskFuture> = FuturesUnordered::new();
        let mut completion_order: Vec<usize> = Vec::new();
        let mut aborted = false;
        let mut timed_out = false;

        loop {
            cancel_blocked(workflow, &index);

            for position in 0..workflow.tasks.len() {
                let task = &workflow.tasks[position];
                if task.status != TaskStatus::Pending || !dependencies_met(workflow, task, &index) {
                    continue;
                }
                let task = &mut workflow.tasks[position];
                task.status = TaskStatus::Running;
                task.started_at = Some(Utc::now());
                running.push(self.spawn_attempt(position, task, Duration::ZERO, &semaphore));
            }

            if running.is_empty() {
                break;
            }

            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, running.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => running.next().await,
            };
            let Some((position, result)) = next else {
                break;
            };

            let task = &mut workflow.tasks[position];
            if result.is_success() {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                debug!(
                    task = %task.id,
                    tool = %task.tool,
                    elapsed_ms = task.duration().map(|d| d.as_millis() as u64).unwrap_or_default(),
                    "Workflow task completed"
                );
                task.error = None;
                task.result = Some(result);
                completion_order.push(position);
                continue;
            }

            let message = result.failure_message().unwrap_or_default().to_string();
            let category = classify_failure(result.failure_kind(), &message);
            task.error = Some(message);
            task.result = Some(result);

            if category == ErrorCategory::Permission {
                warn!(task = %task.id, tool = %task.tool, "Workflow task aborted");
                task.status = TaskStatus::Failed;
                task.completed_at = Some(Utc::now());
                aborted = true;
                break;
            }

            if task.can_retry() {
                task.retry_count += 1;
                task.status = TaskStatus::Retrying;
                let delay = self.retry_delay_for(task.retry_count);
                info!(
                    task = %task.id,
                    attempt = task.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying workflow task"
                );
                running.push(self.spawn_attempt(position, task, delay, &semaphore));
            } else {
                warn!(task = %task.id, tool = %task.tool, "Workflow task failed");
                task.status = TaskStatus::Failed;
                task.completed_at = Some(Utc::now());
            }
        }

        drop(running);
        for task in workflow.tasks.iter_mut() {
            if task.status.is_unfinished() {
                task.status = TaskStatus::Cancelled;
            }
        }

        workflow.status = if aborted {
            self.roll_back(workflow, &completion_order).await;
            WorkflowStatus::RolledBack
        } else if timed_out {
            WorkflowStatus::TimedOut
        } else if workflow.is_complete() && !workflow.has_failures() && !any_cancelled(workflow) {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };
        workflow.completed_at = Some(Utc::now());
        info!(workflow = %workflow.id, status = ?workflow.status, "Workflow finished");
        workflow.status
    }

    fn spawn_attempt(
        &self,
        position: usize,
        task: &WorkflowTask,
        delay: Duration,
        semaphore: &Arc<Semaphore>,
    ) -> TaskFuture {
        let dispatcher = Arc::clone(&self.dispatcher);
        let semaphore = Arc::clone(semaphore);
        let request = ToolInvocationRequest::new(
            format!("{}#{}", task.id, task.retry_count),
            task.tool.clone(),
            task.arguments.clone(),
        );
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _permit = semaphore.acquire_owned().await.ok();
            (position, dispatcher.dispatch(request).await)
        })
    }

    async fn roll_back(&self, workflow: &mut Workflow, completion_order: &[usize]) {
        for &position in completion_order.iter().rev() {
            let task = &workflow.tasks[position];
            let Some(compensation) = &task.compensation else {
                continue;
            };
            info!(task = %task.id, tool = %compensation.tool, "Rolling back workflow task");
            let request = ToolInvocationRequest::new(
                format!("rollback-{}", task.id),
                compensation.tool.clone(),
                compensation.arguments.clone(),
            );
            let result = self.dispatcher.dispatch(request).await;
            if let Some(message) = result.failure_message() {
                warn!(task = %task.id, error = %message, "Compensating call failed");
            }
        }
    }
}

fn dependencies_met(workflow: &Workflow, task: &WorkflowTask, index: &HashMap<String, usize>) -> bool {
    task.dependencies.iter().all(|dep| {
        index
            .get(dep)
            .is_some_and(|&i| workflow.tasks[i].status == TaskStatus::Completed)
    })
}

/// Cancels pending tasks whose dependencies failed, were cancelled, or do not
/// exist. Repeats until no more tasks change.
fn cancel_blocked(workflow: &mut Workflow, index: &HashMap<String, usize>) {
    loop {
        let blocked: Vec<usize> = workflow
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.status == TaskStatus::Pending)
            .filter(|(_, task)| {
                task.dependencies.iter().any(|dep| match index.get(dep) {
                    Some(&i) => matches!(
                        workflow.tasks[i].status,
                        TaskStatus::Failed | TaskStatus::Cancelled
                    ),
                    None => true,
                })
            })
            .map(|(i, _)| i)
            .collect();
        if blocked.is_empty() {
            return;
        }
        for i in blocked {
            debug!(task = %workflow.tasks[i].id, "Cancelling task with unreachable dependencies");
            workflow.tasks[i].status = TaskStatus::Cancelled;
        }
    }
}

fn any_cancelled(workflow: &Workflow) -> bool {
    workflow
        .tasks
        .iter()
        .any(|task| task.status == TaskStatus::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FailureKind, ToolPayload};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingDispatch {
        failures: Mutex<HashMap<String, VecDeque<String>>>,
        hang: Vec<String>,
        log: Mutex<Vec<String>>,
    }

    impl RecordingDispatch {
        fn failing(tool: &str, messages: &[&str]) -> Self {
            let mut failures = HashMap::new();
            failures.insert(
                tool.to_string(),
                messages.iter().map(|m| m.to_string()).collect(),
            );
            Self {
                failures: Mutex::new(failures),
                ..Self::default()
            }
        }

        async fn log(&self) -> Vec<String> {
            self.log.lock().await.clone()
        }
    }

    #[async_trait]
    impl ToolDispatch for RecordingDispatch {
        async fn dispatch(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
            self.log.lock().await.push(request.tool.clone());
            if self.hang.contains(&request.tool) {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            let failure = self
                .failures
                .lock()
                .await
                .get_mut(&request.tool)
                .and_then(VecDeque::pop_front);
            match failure {
                Some(message) => ToolInvocationResult::failure(
                    request.call_id,
                    request.tool,
                    FailureKind::Execution,
                    message,
                    true,
                ),
                None => ToolInvocationResult::success(
                    request.call_id,
                    request.tool,
                    ToolPayload::Text("done".into()),
                ),
            }
        }
    }

    #[test]
    fn retry_delay_survives_degenerate_backoff() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let delay = Duration::from_millis(100);

        let negative = WorkflowExecutor::new(dispatch.clone()).with_retry(delay, -2.0);
        assert_eq!(negative.retry_delay_for(1), delay);
        assert_eq!(negative.retry_delay_for(2), Duration::ZERO);

        let nan = WorkflowExecutor::new(dispatch.clone()).with_retry(delay, f64::NAN);
        assert_eq!(nan.retry_delay_for(3), Duration::ZERO);

        let huge = WorkflowExecutor::new(dispatch).with_retry(delay, f64::MAX);
        assert_eq!(huge.retry_delay_for(40), Duration::from_millis(u64::MAX));

        let doubling = WorkflowExecutor::new(Arc::new(RecordingDispatch::default()))
            .with_retry(delay, 2.0);
        assert_eq!(doubling.retry_delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_tasks_in_dependency_order() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let executor = WorkflowExecutor::new(dispatch.clone());
        let mut workflow = Workflow::new(
            "open-report",
            vec![
                WorkflowTask::new("save", "save", json!({})).depends_on(["type"]),
                WorkflowTask::new("open", "open", json!({})),
                WorkflowTask::new("type", "type", json!({})).depends_on(["open"]),
            ],
        );

        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::Completed);
        assert_eq!(dispatch.log().await, vec!["open", "type", "save"]);
        let summary = workflow.summary();
        assert!(summary.is_complete);
        assert_eq!(summary.status_counts.get("completed"), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_backoff_then_fails_and_cancels_dependents() {
        let dispatch = Arc::new(RecordingDispatch::failing(
            "click",
            &["glitch", "glitch", "glitch"],
        ));
        let executor = WorkflowExecutor::new(dispatch.clone())
            .with_retry(Duration::from_millis(100), 2.0);
        let mut workflow = Workflow::new(
            "flaky",
            vec![
                WorkflowTask::new("click", "click", json!({})).with_max_retries(2),
                WorkflowTask::new("after", "type", json!({})).depends_on(["click"]),
            ],
        );

        let started = tokio::time::Instant::now();
        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::Failed);
        assert_eq!(dispatch.log().await, vec!["click", "click", "click"]);
        assert!(started.elapsed() >= Duration::from_millis(300));
        let click = workflow.task("click").expect("click task");
        assert_eq!(click.status, TaskStatus::Failed);
        assert_eq!(click.retry_count, 2);
        assert_eq!(workflow.task("after").map(|t| t.status), Some(TaskStatus::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn permission_failure_is_not_retried_and_rolls_back() {
        let dispatch = Arc::new(RecordingDispatch::failing("install", &["Access denied"]));
        let executor = WorkflowExecutor::new(dispatch.clone());
        let mut workflow = Workflow::new(
            "setup",
            vec![
                WorkflowTask::new("mkdir", "mkdir", json!({"path": "C:/tmp/x"}))
                    .with_compensation("rmdir", json!({"path": "C:/tmp/x"})),
                WorkflowTask::new("copy", "copy", json!({}))
                    .depends_on(["mkdir"])
                    .with_compensation("delete", json!({})),
                WorkflowTask::new("install", "install", json!({})).depends_on(["copy"]),
            ],
        );

        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::RolledBack);
        let log = dispatch.log().await;
        assert_eq!(log.iter().filter(|t| *t == "install").count(), 1);
        assert_eq!(log, vec!["mkdir", "copy", "install", "delete", "rmdir"]);
        assert_eq!(workflow.task("install").map(|t| t.retry_count), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_unfinished_tasks() {
        let dispatch = Arc::new(RecordingDispatch {
            hang: vec!["wait".to_string()],
            ..RecordingDispatch::default()
        });
        let executor = WorkflowExecutor::new(dispatch).with_timeout(Duration::from_secs(5));
        let mut workflow = Workflow::new(
            "stuck",
            vec![
                WorkflowTask::new("quick", "snapshot", json!({})),
                WorkflowTask::new("wait", "wait", json!({})),
                WorkflowTask::new("later", "click", json!({})).depends_on(["wait"]),
            ],
        );

        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::TimedOut);
        assert_eq!(workflow.task("quick").map(|t| t.status), Some(TaskStatus::Completed));
        assert_eq!(workflow.task("wait").map(|t| t.status), Some(TaskStatus::Cancelled));
        assert_eq!(workflow.task("later").map(|t| t.status), Some(TaskStatus::Cancelled));
    }

    #[tokio::test]
    async fn unknown_dependencies_and_cycles_are_cancelled() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let executor = WorkflowExecutor::new(dispatch.clone());
        let mut workflow = Workflow::new(
            "broken",
            vec![
                WorkflowTask::new("orphan", "click", json!({})).depends_on(["missing"]),
                WorkflowTask::new("a", "a", json!({})).depends_on(["b"]),
                WorkflowTask::new("b", "b", json!({})).depends_on(["a"]),
            ],
        );

        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::Failed);
        assert!(dispatch.log().await.is_empty());
        assert!(workflow.tasks.iter().all(|t| t.status == TaskStatus::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn parallelism_is_bounded() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let executor = WorkflowExecutor::new(dispatch.clone()).with_max_parallel(2);
        let tasks = (0..6)
            .map(|i| WorkflowTask::new(format!("t{i}"), "snapshot", json!({})))
            .collect();
        let mut workflow = Workflow::new("wide", tasks);

        let started = tokio::time::Instant::now();
        let status = executor.execute(&mut workflow).await;

        assert_eq!(status, WorkflowStatus::Completed);
        // six 10ms calls, two at a time
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
