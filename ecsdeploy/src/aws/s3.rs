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

//! Reads pipeline artifacts from AWS S3.

use crate::error::{DeployError, Result};
use crate::event::{ArtifactCredentials, S3Location};
use crate::services::ArtifactStore;
use async_trait::async_trait;
use rusoto_core::credential::StaticProvider;
use rusoto_core::{HttpClient, Region};
use rusoto_s3::{GetObjectRequest, S3Client, S3};
use std::fs::File;
use std::path::Path;

/// Downloads artifacts with the credentials CodePipeline hands to each job.
///
/// No client is kept between two downloads: the credentials only cover the
/// artifacts of one job, so each download builds its own client.
pub struct S3ArtifactStore {
    region: Region,
}

impl S3ArtifactStore {
    /// Creates a store whose clients are bound to `region`.
    pub fn new(region: Region) -> Self {
        Self { region }
    }

    /// Builds an S3 client signed with the job credentials.
    fn client(&self, credentials: &ArtifactCredentials) -> Result<S3Client> {
        let provider = StaticProvider::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
        );
        let dispatcher = HttpClient::new().map_err(|e| DeployError::AWS(e.to_string()))?;
        Ok(S3Client::new_with(dispatcher, provider, self.region.clone()))
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn download(
        &self,
        credentials: &ArtifactCredentials,
        location: &S3Location,
        dest: &Path,
    ) -> Result<()> {
        let body = self
            .client(credentials)?
            .get_object(GetObjectRequest {
                bucket: location.bucket_name.clone(),
                key: location.object_key.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| DeployError::AWS(e.to_string()))?
            .body
            .ok_or_else(|| {
                DeployError::AWS(format!(
                    "s3://{}/{} has no body",
                    location.bucket_name, location.object_key
                ))
            })?;

        let mut file = File::create(dest)?;
        tokio::task::spawn_blocking(move || std::io::copy(&mut body.into_blocking_read(), &mut file))
            .await
            .map_err(|e| DeployError::Internal(e.to_string()))??;
        Ok(())
    }
}
