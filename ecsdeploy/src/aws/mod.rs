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

//! The AWS implementations of the deployment services.

pub mod codepipeline;
pub mod ecs;
pub mod s3;

pub use codepipeline::CodePipelineReporter;
pub use ecs::EcsTaskService;
pub use s3::S3ArtifactStore;

use crate::services::DeployServices;
use rusoto_core::Region;
use std::sync::Arc;

/// Wires the services of one invocation to AWS, every client bound to
/// `region`.
pub fn services(region: Region) -> DeployServices {
    DeployServices {
        artifacts: Arc::new(S3ArtifactStore::new(region.clone())),
        tasks:     Arc::new(EcsTaskService::new(region.clone())),
        reporter:  Arc::new(CodePipelineReporter::new(region)),
    }
}
