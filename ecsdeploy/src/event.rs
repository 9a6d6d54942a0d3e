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

//! The CodePipeline job event that invokes the deployer.
//!
//! When a pipeline reaches a Lambda invoke action, CodePipeline calls the
//! function asynchronously with a job description. The job carries the user
//! parameters of the action, the artifacts produced by earlier stages, and a
//! set of temporary credentials that grant read access to those artifacts.
//!
//! More details: <https://docs.aws.amazon.com/codepipeline/latest/userguide/actions-invoke-lambda-function.html>

use crate::error::{DeployError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The payload of a CodePipeline Lambda invoke action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePipelineEvent {
    /// The job to process.
    #[serde(rename = "CodePipeline.job")]
    pub job: Job,
}

/// A CodePipeline job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// The unique job id, used to report the outcome.
    pub id:         String,
    /// The account that owns the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// The job details.
    #[serde(default)]
    pub data:       JobData,
}

/// The details of a CodePipeline job.
///
/// Everything but the job id may be missing, so that a malformed job still
/// reaches the handler and gets a failure report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
    #[serde(default)]
    pub input_artifacts:      Vec<Artifact>,
    #[serde(default)]
    pub output_artifacts:     Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_credentials: Option<ArtifactCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token:   Option<String>,
}

/// The action configuration of the job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: Configuration,
}

/// The configuration entries of a Lambda invoke action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "FunctionName", default, skip_serializing_if = "Option::is_none")]
    pub function_name:   Option<String>,
    /// The raw JSON string decoded into [`crate::params::UserParameters`].
    #[serde(rename = "UserParameters", default, skip_serializing_if = "Option::is_none")]
    pub user_parameters: Option<String>,
}

/// An input or output artifact of the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name:     String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub location: ArtifactLocation,
}

/// Where an artifact is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(rename = "s3Location")]
    pub s3_location:   S3Location,
}

/// The S3 object holding the zipped artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket_name: String,
    pub object_key:  String,
}

/// Temporary credentials scoped to the artifacts of one job.
///
/// The secret parts never show up in `Debug` output, so the job can be
/// logged as a whole.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCredentials {
    pub access_key_id:     String,
    pub secret_access_key: String,
    pub session_token:     String,
}

impl fmt::Debug for ArtifactCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

impl JobData {
    /// Returns the credentials granting access to the artifacts of the job.
    pub fn credentials(&self) -> Result<&ArtifactCredentials> {
        self.artifact_credentials
            .as_ref()
            .ok_or_else(|| DeployError::Validation("artifactCredentials is required".to_string()))
    }

    /// Returns the input artifact with the given name.
    pub fn find_input_artifact(&self, name: &str) -> Result<&Artifact> {
        self.input_artifacts
            .iter()
            .find(|artifact| artifact.name == name)
            .ok_or_else(|| {
                DeployError::Validation(format!(
                    "Input artifact named \"{}\" not found in event",
                    name
                ))
            })
    }
}
