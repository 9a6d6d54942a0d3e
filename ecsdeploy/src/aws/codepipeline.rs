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

//! Reports job outcomes to AWS CodePipeline.

use crate::error::{DeployError, Result};
use crate::services::JobReporter;
use async_trait::async_trait;
use rusoto_codepipeline::{
    CodePipeline, CodePipelineClient, FailureDetails, PutJobFailureResultInput,
    PutJobSuccessResultInput,
};
use rusoto_core::Region;

/// Reports job outcomes through a [`CodePipelineClient`].
pub struct CodePipelineReporter {
    client: CodePipelineClient,
}

impl CodePipelineReporter {
    /// Creates a reporter whose client is bound to `region`.
    pub fn new(region: Region) -> Self {
        Self {
            client: CodePipelineClient::new(region),
        }
    }
}

#[async_trait]
impl JobReporter for CodePipelineReporter {
    async fn put_job_success_result(&self, job_id: &str) -> Result<()> {
        self.client
            .put_job_success_result(PutJobSuccessResultInput {
                job_id: job_id.to_owned(),
                ..Default::default()
            })
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))
    }

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        message: &str,
        failure_type: &str,
    ) -> Result<()> {
        self.client
            .put_job_failure_result(PutJobFailureResultInput {
                job_id:          job_id.to_owned(),
                failure_details: FailureDetails {
                    external_execution_id: None,
                    message:               message.to_owned(),
                    type_:                 failure_type.to_owned(),
                },
            })
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))
    }
}
