// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! The external services a deployment talks to.
//!
//! A deployment reads its artifact from S3, drives one task through ECS, and
//! reports the job outcome to CodePipeline. Each service sits behind a trait
//! so that one invocation can be wired either to the AWS clients in
//! [`crate::aws`] or to in-memory fakes.

use crate::error::Result;
use crate::event::{ArtifactCredentials, S3Location};
use crate::taskdef::{TaskDefinitionRegistration, TaskDefinitionTemplate};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// The ECS status of a task that has stopped.
pub const TASK_STOPPED: &str = "STOPPED";

/// The object storage holding pipeline artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Downloads the object at `location` into the file at `dest`, with the
    /// job-scoped `credentials`.
    async fn download(
        &self,
        credentials: &ArtifactCredentials,
        location: &S3Location,
        dest: &Path,
    ) -> Result<()>;
}

/// The container orchestration service.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Returns the latest active revision of a task definition family.
    async fn describe_task_definition(&self, family: &str) -> Result<TaskDefinitionTemplate>;

    /// Registers a new task definition revision and returns its revision
    /// number.
    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<i64>;

    /// Starts one task.
    async fn run_task(&self, request: &LaunchRequest) -> Result<LaunchOutcome>;

    /// Returns the current status of a task.
    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<TaskStatus>;

    /// Stops a task.
    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()>;
}

/// The pipeline control plane.
#[async_trait]
pub trait JobReporter: Send + Sync {
    /// Marks the job as succeeded.
    async fn put_job_success_result(&self, job_id: &str) -> Result<()>;

    /// Marks the job as failed.
    async fn put_job_failure_result(
        &self,
        job_id: &str,
        message: &str,
        failure_type: &str,
    ) -> Result<()>;
}

/// The content of a `RunTask` request.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub cluster:               String,
    /// The `family:revision` to run.
    pub task_definition:       String,
    pub launch_type:           String,
    pub network_configuration: Value,
    pub overrides:             Value,
}

/// The answer of a `RunTask` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOutcome {
    /// The ARN of the started task, if any.
    pub task_arn: Option<String>,
    /// One entry per failure record.
    pub failures: Vec<String>,
}

/// The last known state of a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatus {
    pub task_arn:    String,
    pub last_status: Option<String>,
    pub containers:  Vec<ContainerStatus>,
}

/// The state of one container of a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStatus {
    pub name:      Option<String>,
    /// Unset while the container runs, or when it never started.
    pub exit_code: Option<i64>,
}

/// Where a task stands from the point of view of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// The task has not stopped yet.
    Running,
    /// The task stopped and every container exited with 0.
    Succeeded,
    /// The task stopped and a container exited with another code, or without
    /// one.
    Failed,
}

impl TaskStatus {
    /// Returns the phase of the task.
    pub fn phase(&self) -> TaskPhase {
        if self.last_status.as_deref() != Some(TASK_STOPPED) {
            TaskPhase::Running
        } else if self.containers.iter().all(|c| c.exit_code == Some(0)) {
            TaskPhase::Succeeded
        } else {
            TaskPhase::Failed
        }
    }
}

/// The services of one invocation.
///
/// Built once per invocation, never shared across invocations.
#[derive(Clone)]
pub struct DeployServices {
    pub artifacts: Arc<dyn ArtifactStore>,
    pub tasks:     Arc<dyn TaskService>,
    pub reporter:  Arc<dyn JobReporter>,
}
