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

//! Deploys a container image to an ECS task on behalf of a CodePipeline job.
//!
//! A deployment goes through the following steps, in order:
//!
//! 1. resolve the [`DeploymentPlan`] from the job's user parameters;
//! 2. read the image detail from the input artifact;
//! 3. respin the task definition family with the new image;
//! 4. run one task from the new revision;
//! 5. poll the task until it stops or the timeout elapses.
//!
//! Whatever happens, the job is reported to CodePipeline exactly once. When a
//! step fails after the task was started, the task is stopped on a
//! best-effort basis before the failure is reported.

use crate::artifact::{self, ImageDetail};
use crate::configs::*;
use crate::error::{DeployError, Result};
use crate::event::{Job, JobData};
use crate::params::DeploymentPlan;
use crate::services::{DeployServices, LaunchRequest, TaskPhase};
use crate::taskdef;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The outcome of a job, as reported to CodePipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Succeeded,
    Failed {
        /// The message shown on the failed pipeline action.
        message: String,
    },
}

/// The value returned by the Lambda function.
///
/// CodePipeline ignores it: the job outcome only travels through the
/// success or failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body:        String,
}

impl From<&JobResult> for InvocationResponse {
    fn from(result: &JobResult) -> Self {
        let (status_code, body) = match result {
            JobResult::Succeeded => (200, "\"OK!\""),
            JobResult::Failed { .. } => (500, "\"NG!\""),
        };
        InvocationResponse {
            status_code,
            body: body.to_string(),
        }
    }
}

/// A task started by a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchedTask {
    pub cluster:  String,
    pub task_arn: String,
    /// The number of polls left to the task to stop.
    pub timeout:  u64,
}

/// Runs the deployment of one job.
pub struct DeploymentOrchestrator {
    services:      DeployServices,
    poll_interval: Duration,
}

impl DeploymentOrchestrator {
    /// Creates an orchestrator that polls tasks at the configured interval.
    pub fn new(services: DeployServices) -> Self {
        Self {
            services,
            poll_interval: *DEPLOY_POLL_INTERVAL,
        }
    }

    /// Sets the interval between two task status polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Deploys the job and reports its outcome.
    ///
    /// Every deployment error ends up in a failure report. Only an error of
    /// the report itself is returned.
    pub async fn handle(&self, job: &Job) -> Result<InvocationResponse> {
        info!(
            "actionConfiguration: {}",
            serde_json::to_string(&job.data.action_configuration)?
        );
        info!(
            "inputArtifacts: {}",
            serde_json::to_string(&job.data.input_artifacts)?
        );
        info!(
            "outputArtifacts: {}",
            serde_json::to_string(&job.data.output_artifacts)?
        );

        let outcome = match self.launch(&job.data).await {
            Ok(task) => self
                .wait_for_completion(&task)
                .await
                .map_err(|e| (e, Some(task))),
            Err(e) => Err((e, None)),
        };

        let result = match outcome {
            Ok(()) => JobResult::Succeeded,
            Err((e, task)) => {
                error!("Job {} failed with a {} error: {}", job.id, e.category(), e);
                if let Some(task) = task {
                    self.stop_quietly(&task).await;
                }
                JobResult::Failed {
                    message: e.to_string(),
                }
            }
        };

        self.report(&job.id, &result).await?;
        Ok(InvocationResponse::from(&result))
    }

    /// Registers the new task definition revision and starts one task from
    /// it.
    async fn launch(&self, data: &JobData) -> Result<LaunchedTask> {
        let plan = DeploymentPlan::resolve(data)?;

        let content = artifact::read_artifact_file(
            self.services.artifacts.as_ref(),
            data,
            &plan.artifact,
            &plan.file,
        )
        .await?;
        let image = ImageDetail::from_slice(&content)?;
        info!("Deploying image {}", image.image_uri);

        let template = self
            .services
            .tasks
            .describe_task_definition(&plan.task_definition_family)
            .await?;
        let registration = taskdef::respin(
            &plan.task_definition_family,
            template,
            &plan.container_name,
            &image.image_uri,
        );
        let revision = self
            .services
            .tasks
            .register_task_definition(&registration)
            .await?;
        let task_definition = format!("{}:{}", plan.task_definition_family, revision);

        let outcome = self
            .services
            .tasks
            .run_task(&LaunchRequest {
                cluster:               plan.cluster.clone(),
                task_definition:       task_definition.clone(),
                launch_type:           plan.launch_type.clone(),
                network_configuration: plan.network_configuration.clone(),
                overrides:             plan.overrides.clone(),
            })
            .await?;
        if !outcome.failures.is_empty() {
            return Err(DeployError::Task(format!(
                "Failed to run a task: {}",
                outcome.failures.join(", ")
            )));
        }
        let task_arn = outcome
            .task_arn
            .ok_or_else(|| DeployError::AWS("No task started!".to_string()))?;
        info!("Started task {} from {}", task_arn, task_definition);

        Ok(LaunchedTask {
            cluster: plan.cluster,
            task_arn,
            timeout: plan.timeout,
        })
    }

    /// Polls the task once per interval until it stops or runs out of polls.
    async fn wait_for_completion(&self, task: &LaunchedTask) -> Result<()> {
        for _ in 0..task.timeout {
            let status = self
                .services
                .tasks
                .describe_task(&task.cluster, &task.task_arn)
                .await?;

            match status.phase() {
                TaskPhase::Succeeded => {
                    info!("Task {} stopped successfully", task.task_arn);
                    return Ok(());
                }
                TaskPhase::Failed => return Err(DeployError::Task("Task failed".to_string())),
                TaskPhase::Running => {
                    info!(
                        "Task {} is {}",
                        task.task_arn,
                        status.last_status.as_deref().unwrap_or("UNKNOWN")
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        Err(DeployError::Task("Timeout!".to_string()))
    }

    /// Stops a task, logging instead of returning any error.
    async fn stop_quietly(&self, task: &LaunchedTask) {
        if let Err(e) = self
            .services
            .tasks
            .stop_task(&task.cluster, &task.task_arn, &DEPLOY_STOP_REASON)
            .await
        {
            error!("Failed to stop the task {}: {}", task.task_arn, e);
        }
    }

    async fn report(&self, job_id: &str, result: &JobResult) -> Result<()> {
        match result {
            JobResult::Succeeded => {
                self.services
                    .reporter
                    .put_job_success_result(job_id)
                    .await?
            }
            JobResult::Failed { message } => {
                self.services
                    .reporter
                    .put_job_failure_result(job_id, message, &DEPLOY_FAILURE_TYPE)
                    .await?
            }
        }
        info!("Reported job {} as {:?}", job_id, result);
        Ok(())
    }
}
