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

//! User parameters of the deploy action and the plan resolved from them.

use crate::configs::*;
use crate::error::{DeployError, Result};
use crate::event::JobData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The decoded `UserParameters` of the action configuration.
///
/// Every key is optional at decoding time. Required keys are checked when a
/// [`DeploymentPlan`] is resolved, and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParameters {
    /// The ECS cluster that runs the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster:                Option<String>,
    /// The task definition family to respin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_definition_family: Option<String>,
    /// The container whose image is replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name:         Option<String>,
    /// The `networkConfiguration` of the RunTask request, as is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration:  Option<Value>,
    /// The `overrides` of the RunTask request, as is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides:              Option<Value>,
    /// The input artifact holding the image detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact:               Option<String>,
    /// The archive entry holding the image detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file:                   Option<String>,
    /// The number of one-interval polls before the deployment times out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout:                Option<Timeout>,
    /// The ECS launch type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_type:            Option<String>,
}

/// A timeout given either as a JSON number or as a numeric string.
///
/// Any other JSON value still decodes, so that a bad timeout is reported as
/// such when the plan is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timeout {
    Seconds(u64),
    Negative(i64),
    Fraction(f64),
    Text(String),
    Invalid(Value),
}

impl Timeout {
    /// Returns the timeout as a number of poll iterations.
    ///
    /// Fractions are truncated toward zero and negative values time out
    /// immediately.
    pub fn iterations(&self) -> Result<u64> {
        let invalid = || DeployError::Validation(format!("invalid timeout parameter: {}", self));
        match self {
            Timeout::Seconds(n) => Ok(*n),
            Timeout::Negative(_) => Ok(0),
            Timeout::Fraction(f) => Ok(f.max(0.0) as u64),
            Timeout::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| n.max(0) as u64)
                .map_err(|_| invalid()),
            Timeout::Invalid(_) => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeout::Seconds(n) => write!(f, "{}", n),
            Timeout::Negative(n) => write!(f, "{}", n),
            Timeout::Fraction(n) => write!(f, "{}", n),
            Timeout::Text(s) => write!(f, "{:?}", s),
            Timeout::Invalid(v) => write!(f, "{}", v),
        }
    }
}

impl UserParameters {
    /// Decodes the user parameters of a job.
    pub fn from_job(data: &JobData) -> Result<Self> {
        let raw = data
            .action_configuration
            .configuration
            .user_parameters
            .as_deref()
            .unwrap_or_default();
        serde_json::from_str(raw).map_err(|_| {
            DeployError::Validation("UserParameters could not be decoded as JSON".to_string())
        })
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| DeployError::Validation(format!("missing required parameter: {}", key)))
}

fn object_or_empty(value: &Option<Value>) -> Value {
    value
        .clone()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Everything a deployment needs, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    pub cluster:                String,
    pub task_definition_family: String,
    pub container_name:         String,
    pub network_configuration:  Value,
    pub overrides:              Value,
    pub artifact:               String,
    pub file:                   String,
    pub timeout:                u64,
    pub launch_type:            String,
}

impl DeploymentPlan {
    /// Resolves the plan of a job.
    ///
    /// Fails when the job has no input artifact, when the user parameters do
    /// not decode, when the job carries no artifact credentials, or when a
    /// required parameter is missing. The artifact
    /// defaults to the first input artifact of the job.
    pub fn resolve(data: &JobData) -> Result<Self> {
        let first_artifact = data
            .input_artifacts
            .first()
            .ok_or_else(|| DeployError::Validation("inputArtifacts is required".to_string()))?;

        let params = UserParameters::from_job(data)?;
        data.credentials()?;

        Ok(DeploymentPlan {
            cluster:                required(&params.cluster, "cluster")?.to_string(),
            task_definition_family: required(
                &params.task_definition_family,
                "taskDefinitionFamily",
            )?
            .to_string(),
            container_name:         required(&params.container_name, "containerName")?
                .to_string(),
            network_configuration:  object_or_empty(&params.network_configuration),
            overrides:              object_or_empty(&params.overrides),
            artifact:               params
                .artifact
                .clone()
                .unwrap_or_else(|| first_artifact.name.clone()),
            file:                   params
                .file
                .clone()
                .unwrap_or_else(|| DEPLOY_IMAGE_FILE.clone()),
            timeout:                match &params.timeout {
                Some(timeout) => timeout.iterations()?,
                None => *DEPLOY_TIMEOUT,
            },
            launch_type:            params
                .launch_type
                .clone()
                .unwrap_or_else(|| DEPLOY_LAUNCH_TYPE.clone()),
        })
    }
}
