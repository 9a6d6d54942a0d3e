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

#![warn(clippy::needless_borrow)]
// Clippy lints, some should be disabled incrementally
#![allow(
    clippy::module_inception,
    clippy::new_without_default,
    clippy::upper_case_acronyms
)]

//! `ecsdeploy` deploys a container image to an Amazon ECS task from an AWS
//! CodePipeline Lambda invoke action.
//!
//! The image URI comes from a file of the job's input artifact. The deployer
//! registers a new revision of a task definition family with that image, runs
//! one task from it, waits for the task to stop, and reports the job outcome
//! back to the pipeline.

pub mod artifact;
pub mod aws;
pub mod configs;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod params;
pub mod prelude;
pub mod services;
pub mod taskdef;

#[cfg(test)]
mod tests;
