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

//! Deployment error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;

/// Result type for operations that could result in a [DeployError]
pub type Result<T> = result::Result<T, DeployError>;

/// Deployment error
#[derive(Debug)]
pub enum DeployError {
    /// Error returned when the job input is unusable: undecodable user
    /// parameters, a missing required parameter, an artifact that is not in
    /// the event, or a file that is not in the artifact.
    Validation(String),
    /// Error returned when accessing the AWS services fails.
    AWS(String),
    /// Error returned when the deployed task does not complete successfully:
    /// a run-task failure record, a non-zero exit code or a polling timeout.
    Task(String),
    /// Error associated to Lambda runtime execution.
    LambdaError(Box<dyn std::error::Error + Send + Sync>),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when the artifact archive cannot be read.
    Zip(zip::result::ZipError),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned as a consequence of an invariant broken inside the
    /// deployer. This error should not happen in normal usage.
    Internal(String),
}

impl DeployError {
    /// Returns the failure class of the error, used when logging the outcome
    /// of a job.
    pub fn category(&self) -> &'static str {
        match self {
            DeployError::Validation(_) | DeployError::Zip(_) | DeployError::SerdeJson(_) => {
                "validation"
            }
            DeployError::AWS(_) | DeployError::LambdaError(_) => "external call",
            DeployError::Task(_) => "task",
            DeployError::IoError(_) | DeployError::Internal(_) => "internal",
        }
    }
}

impl From<io::Error> for DeployError {
    fn from(e: io::Error) -> Self {
        DeployError::IoError(e)
    }
}

impl From<zip::result::ZipError> for DeployError {
    fn from(e: zip::result::ZipError) -> Self {
        DeployError::Zip(e)
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(e: serde_json::Error) -> Self {
        DeployError::SerdeJson(e)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for DeployError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        DeployError::LambdaError(e)
    }
}

impl From<&str> for DeployError {
    fn from(e: &str) -> Self {
        DeployError::Internal(e.to_string())
    }
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            DeployError::Validation(ref desc) => write!(f, "{}", desc),
            DeployError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
            DeployError::Task(ref desc) => write!(f, "{}", desc),
            DeployError::LambdaError(ref desc) => write!(f, "Lambda error: {}", desc),
            DeployError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            DeployError::Zip(ref desc) => write!(f, "Zip error: {}", desc),
            DeployError::SerdeJson(ref desc) => write!(f, "serde_json error: {}", desc),
            DeployError::Internal(ref desc) => write!(f, "Internal error: {}", desc),
        }
    }
}

impl error::Error for DeployError {}
