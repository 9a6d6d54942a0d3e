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

//! This module provides the default settings of the deployer.

use humantime::parse_duration;
use ini::Ini;
use lazy_static::lazy_static;
use rusoto_core::Region;
use std::str::FromStr;
use std::time::Duration;

lazy_static! {
    /// Global settings.
    pub static ref DEPLOY_CONF: Ini = Ini::load_from_str(include_str!("./deployer.toml")).unwrap();

    /// Interval between two task status polls.
    pub static ref DEPLOY_POLL_INTERVAL: Duration = parse_duration(&DEPLOY_CONF["deployer"]["poll_interval"]).unwrap();
    /// Default number of poll iterations before a deployment times out.
    pub static ref DEPLOY_TIMEOUT: u64 = DEPLOY_CONF["deployer"]["timeout"].parse::<u64>().unwrap();
    /// Default file name read from the artifact archive.
    pub static ref DEPLOY_IMAGE_FILE: String = DEPLOY_CONF["deployer"]["file"].to_string();

    /// Default ECS launch type.
    pub static ref DEPLOY_LAUNCH_TYPE: String = DEPLOY_CONF["ecs"]["launch_type"].to_string();
    /// Reason attached to the best-effort stop of a failed task.
    pub static ref DEPLOY_STOP_REASON: String = DEPLOY_CONF["ecs"]["stop_reason"].to_string();

    /// Failure type reported to CodePipeline.
    pub static ref DEPLOY_FAILURE_TYPE: String = DEPLOY_CONF["codepipeline"]["failure_type"].to_string();
}

/// The environment variable holding the region of the invocation.
pub const AWS_REGION_ENV: &str = "AWS_REGION";

/// Returns the region every client of the current invocation is bound to.
///
/// The variable is read on each call, so every invocation picks up its own
/// region. Falls back to rusoto's default region resolution when the variable
/// is unset or does not name a region.
pub fn invocation_region() -> Region {
    std::env::var(AWS_REGION_ENV)
        .ok()
        .and_then(|name| Region::from_str(&name).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_shows() {
        let conf = Ini::load_from_str(include_str!("./deployer.toml")).unwrap();

        for (sec, prop) in &conf {
            println!("Section: {:?}", sec);
            for (key, value) in prop.iter() {
                println!("{:?}:{:?}", key, value);
            }
        }

        assert_eq!(Duration::from_secs(1), *DEPLOY_POLL_INTERVAL);
        assert_eq!(300, *DEPLOY_TIMEOUT);
        assert_eq!("imageDetail.json", DEPLOY_IMAGE_FILE.as_str());
        assert_eq!("FARGATE", DEPLOY_LAUNCH_TYPE.as_str());
        assert_eq!("Timeout exceeded", DEPLOY_STOP_REASON.as_str());
        assert_eq!("JobFailed", DEPLOY_FAILURE_TYPE.as_str());
    }

    #[test]
    fn region_from_environment() {
        std::env::set_var(AWS_REGION_ENV, "eu-west-1");
        assert_eq!(Region::EuWest1, invocation_region());
    }
}
