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

//! This module contains all wrapped functions of the Amazon ECS service.
//!
//! Task definitions are described and registered as raw JSON documents keyed
//! by the ECS wire names. The typed rusoto shapes predate fields such as
//! `runtimePlatform` and would drop them on the way through, so those two
//! calls are signed and dispatched by hand. Tasks are run, described and
//! stopped through the typed [`EcsClient`].

use crate::error::{DeployError, Result};
use crate::services::{ContainerStatus, LaunchOutcome, LaunchRequest, TaskService, TaskStatus};
use crate::taskdef::{TaskDefinitionRegistration, TaskDefinitionTemplate};
use async_trait::async_trait;
use log::info;
use rusoto_core::signature::SignedRequest;
use rusoto_core::{Client, Region, RusotoError};
use rusoto_ecs::{
    DescribeTasksRequest, Ecs, EcsClient, Failure, NetworkConfiguration, RunTaskRequest,
    StopTaskRequest, TaskOverride,
};
use serde_json::{json, Value};
use std::convert::Infallible;

/// The `x-amz-target` prefix of the ECS JSON protocol.
const ECS_TARGET_PREFIX: &str = "AmazonEC2ContainerServiceV20141113";

/// Describes a run-task failure record.
fn describe_failure(failure: &Failure) -> String {
    format!(
        "{} (arn: {}, detail: {})",
        failure.reason.as_deref().unwrap_or("unknown reason"),
        failure.arn.as_deref().unwrap_or("-"),
        failure.detail.as_deref().unwrap_or("-"),
    )
}

/// Formats an ECS error document such as
/// `{"__type": "ClientException", "message": "..."}`.
fn service_error(action: &str, status: impl std::fmt::Display, body: &[u8]) -> DeployError {
    let document = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
    let kind = document["__type"].as_str().unwrap_or("UnknownError");
    let message = document["message"]
        .as_str()
        .or_else(|| document["Message"].as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    DeployError::AWS(format!("{} failed ({}): {}: {}", action, status, kind, message))
}

/// Returns the body of a `DescribeTaskDefinition` request that also asks for
/// the tags of the definition.
fn describe_task_definition_request(family: &str) -> Value {
    json!({
        "taskDefinition": family,
        "include": ["TAGS"],
    })
}

/// Splits a `DescribeTaskDefinition` response into the definition and its
/// tags, leaving every field as ECS sent it.
fn template_from_response(family: &str, mut response: Value) -> Result<TaskDefinitionTemplate> {
    let definition = match response.get_mut("taskDefinition").map(Value::take) {
        Some(Value::Object(definition)) => definition,
        _ => {
            return Err(DeployError::AWS(format!(
                "No task definition described for {}",
                family
            )))
        }
    };
    let tags = match response.get_mut("tags").map(Value::take) {
        Some(Value::Array(tags)) => tags,
        _ => vec![],
    };

    Ok(TaskDefinitionTemplate { definition, tags })
}

/// Reads the revision out of a `RegisterTaskDefinition` response.
fn revision_from_response(response: &Value) -> Result<i64> {
    response
        .pointer("/taskDefinition/revision")
        .and_then(Value::as_i64)
        .ok_or_else(|| DeployError::AWS("No task definition revision!".to_string()))
}

/// Builds the typed `RunTask` request of a launch.
fn run_task_request(request: &LaunchRequest) -> Result<RunTaskRequest> {
    let network_configuration: NetworkConfiguration =
        serde_json::from_value(request.network_configuration.clone())?;
    let overrides: TaskOverride = serde_json::from_value(request.overrides.clone())?;

    Ok(RunTaskRequest {
        cluster: Some(request.cluster.clone()),
        task_definition: request.task_definition.clone(),
        launch_type: Some(request.launch_type.clone()),
        network_configuration: Some(network_configuration),
        overrides: Some(overrides),
        ..Default::default()
    })
}

/// Drives ECS tasks through an [`EcsClient`].
pub struct EcsTaskService {
    client: EcsClient,
    /// Signs the JSON documents of the task definition calls.
    signer: Client,
    region: Region,
}

impl EcsTaskService {
    /// Creates a service whose clients are bound to `region`.
    pub fn new(region: Region) -> Self {
        let signer = Client::shared();
        Self {
            client: EcsClient::new_with_client(signer.clone(), region.clone()),
            signer,
            region,
        }
    }

    /// Sends `body` as the JSON payload of the ECS action `action` and
    /// returns the JSON document of the answer.
    async fn call(&self, action: &str, body: &Value) -> Result<Value> {
        let mut request = SignedRequest::new("POST", "ecs", &self.region, "/");
        request.set_content_type("application/x-amz-json-1.1".to_owned());
        request.add_header(
            "x-amz-target",
            &format!("{}.{}", ECS_TARGET_PREFIX, action),
        );
        request.set_payload(Some(serde_json::to_vec(body)?));

        let mut response = self
            .signer
            .sign_and_dispatch(request)
            .await
            .map_err(|e| DeployError::AWS(RusotoError::<Infallible>::from(e).to_string()))?;
        let response = response
            .buffer()
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))?;
        if !response.status.is_success() {
            return Err(service_error(action, response.status, &response.body));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[async_trait]
impl TaskService for EcsTaskService {
    async fn describe_task_definition(&self, family: &str) -> Result<TaskDefinitionTemplate> {
        let response = self
            .call(
                "DescribeTaskDefinition",
                &describe_task_definition_request(family),
            )
            .await?;
        info!("Described task definition: {}", response);

        template_from_response(family, response)
    }

    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<i64> {
        let response = self
            .call("RegisterTaskDefinition", &registration.to_request())
            .await?;
        info!("Registered task definition: {}", response);

        revision_from_response(&response)
    }

    async fn run_task(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        let response = self
            .client
            .run_task(run_task_request(request)?)
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))?;

        Ok(LaunchOutcome {
            task_arn: response
                .tasks
                .unwrap_or_default()
                .into_iter()
                .next()
                .and_then(|task| task.task_arn),
            failures: response
                .failures
                .unwrap_or_default()
                .iter()
                .map(describe_failure)
                .collect(),
        })
    }

    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<TaskStatus> {
        let response = self
            .client
            .describe_tasks(DescribeTasksRequest {
                cluster: Some(cluster.to_owned()),
                tasks: vec![task_arn.to_owned()],
                ..Default::default()
            })
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))?;
        info!("Described task: {}", serde_json::to_string(&response)?);

        let task = response
            .tasks
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::AWS(format!("No task described for {}", task_arn)))?;

        Ok(TaskStatus {
            task_arn:    task.task_arn.unwrap_or_else(|| task_arn.to_owned()),
            last_status: task.last_status,
            containers:  task
                .containers
                .unwrap_or_default()
                .into_iter()
                .map(|container| ContainerStatus {
                    name:      container.name,
                    exit_code: container.exit_code,
                })
                .collect(),
        })
    }

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()> {
        self.client
            .stop_task(StopTaskRequest {
                cluster: Some(cluster.to_owned()),
                task: task_arn.to_owned(),
                reason: Some(reason.to_owned()),
                ..Default::default()
            })
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))
            .map(|_| ())
    }
}
