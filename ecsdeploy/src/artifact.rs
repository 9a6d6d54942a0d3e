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

//! Reads the image detail out of a zipped pipeline artifact.

use crate::error::{DeployError, Result};
use crate::event::JobData;
use crate::services::ArtifactStore;
use log::info;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// The image detail file written by the build stage, e.g. `imageDetail.json`
/// from an ECR source action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetail {
    #[serde(rename = "ImageURI")]
    pub image_uri: String,
}

impl ImageDetail {
    /// Decodes an image detail file.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            DeployError::Validation(format!("invalid image detail, expected an ImageURI: {}", e))
        })
    }
}

/// Returns the content of the entry `file` of the input artifact named
/// `artifact`.
///
/// The archive is downloaded into a temporary file, which is removed when
/// this function returns, whatever the outcome.
pub async fn read_artifact_file(
    store: &dyn ArtifactStore,
    data: &JobData,
    artifact: &str,
    file: &str,
) -> Result<Vec<u8>> {
    let artifact = data.find_input_artifact(artifact)?;
    let location = &artifact.location.s3_location;
    let credentials = data.credentials()?;

    let archive = NamedTempFile::new()?;
    store
        .download(credentials, location, archive.path())
        .await?;
    info!(
        "Downloaded artifact {} from s3://{}/{}",
        artifact.name, location.bucket_name, location.object_key
    );

    extract_entry(archive.reopen()?, file)
}

/// Reads one named entry of a zip archive.
pub fn extract_entry<R: Read + Seek>(reader: R, name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entry = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => {
            DeployError::Validation(format!("There is no item named '{}' in the archive", name))
        }
        e => DeployError::Zip(e),
    })?;

    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}
