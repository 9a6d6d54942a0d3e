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

//! The main entry point for the deploy lambda function.

use ecsdeploy::aws;
use ecsdeploy::prelude::*;
use lambda_runtime::{service_fn, LambdaEvent};
use log::info;

#[cfg(feature = "snmalloc")]
#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

async fn handler(event: LambdaEvent<CodePipelineEvent>) -> Result<InvocationResponse> {
    let job = event.payload.job;
    let region = invocation_region();
    info!(
        "Handling CodePipeline job {} in {} (request {})",
        job.id,
        region.name(),
        event.context.request_id
    );

    DeploymentOrchestrator::new(aws::services(region))
        .handle(&job)
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    lambda_runtime::run(service_fn(handler)).await?;
    Ok(())
}
