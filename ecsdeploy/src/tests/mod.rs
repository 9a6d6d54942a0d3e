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

//! Common unit test utility methods: a sample job event, zip fixtures, and
//! in-memory services that record every call they receive.


use crate::error::{DeployError, Result};
use crate::event::{ArtifactCredentials, CodePipelineEvent, JobData, S3Location};
use crate::services::*;
use crate::taskdef::{TaskDefinitionRegistration, TaskDefinitionTemplate};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::write::FileOptions;
use zip::ZipWriter;

/// The CodePipeline event of the end-to-end scenario.
pub(crate) const EVENT: &str = include_str!("./fixtures/event.json");

/// The image of the end-to-end scenario.
pub(crate) const IMAGE_URI: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/app:latest";

/// Returns the parsed sample event.
pub(crate) fn event() -> CodePipelineEvent {
    serde_json::from_str(EVENT).unwrap()
}

/// Returns the job data of the sample event.
pub(crate) fn job_data() -> JobData {
    event().job.data
}

/// Builds a zip archive in memory.
pub(crate) fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// An artifact store serving objects from memory.
#[derive(Default)]
pub(crate) struct FakeArtifactStore {
    objects:   HashMap<(String, String), Vec<u8>>,
    downloads: Mutex<Vec<PathBuf>>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, body: Vec<u8>) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), body);
        self
    }

    /// The destination files of the downloads so far.
    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn download(
        &self,
        credentials: &ArtifactCredentials,
        location: &S3Location,
        dest: &Path,
    ) -> Result<()> {
        assert!(!credentials.session_token.is_empty());
        self.downloads.lock().unwrap().push(dest.to_path_buf());
        let body = self
            .objects
            .get(&(location.bucket_name.clone(), location.object_key.clone()))
            .ok_or_else(|| DeployError::AWS("NoSuchKey".to_string()))?;
        std::fs::write(dest, body)?;
        Ok(())
    }
}

/// An ECS stand-in that replays a scripted sequence of task statuses.
///
/// The last status repeats once the script runs out.
pub(crate) struct FakeTaskService {
    template:      TaskDefinitionTemplate,
    run_failures:  Vec<String>,
    fail_stop:     bool,
    statuses:      Mutex<VecDeque<TaskStatus>>,
    calls:         Mutex<Vec<String>>,
    registrations: Mutex<Vec<TaskDefinitionRegistration>>,
    launches:      Mutex<Vec<LaunchRequest>>,
    stops:         Mutex<Vec<(String, String, String)>>,
}

pub(crate) const TASK_ARN: &str =
    "arn:aws:ecs:us-east-1:123456789012:task/app-cluster/0123456789abcdef0123456789abcdef";

/// A task status with one container per exit code.
pub(crate) fn task_status(last_status: &str, exit_codes: &[Option<i64>]) -> TaskStatus {
    TaskStatus {
        task_arn:    TASK_ARN.to_string(),
        last_status: Some(last_status.to_string()),
        containers:  exit_codes
            .iter()
            .map(|code| ContainerStatus {
                name:      Some("hello_world".to_string()),
                exit_code: *code,
            })
            .collect(),
    }
}

impl FakeTaskService {
    /// A service holding the `app-db-migration` family, whose task stops with
    /// the given statuses.
    pub fn new(statuses: Vec<TaskStatus>) -> Self {
        let definition = json!({
            "taskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/app-db-migration:1",
            "family": "app-db-migration",
            "revision": 1,
            "status": "ACTIVE",
            "requiresCompatibilities": ["FARGATE"],
            "containerDefinitions": [
                {"name": "hello_world", "image": "hello-world:latest", "cpu": 256, "memory": 400}
            ]
        });
        Self {
            template:      TaskDefinitionTemplate {
                definition: definition.as_object().unwrap().clone(),
                tags:       vec![],
            },
            run_failures:  vec![],
            fail_stop:     false,
            statuses:      Mutex::new(statuses.into()),
            calls:         Mutex::new(vec![]),
            registrations: Mutex::new(vec![]),
            launches:      Mutex::new(vec![]),
            stops:         Mutex::new(vec![]),
        }
    }

    pub fn with_run_failures(mut self, failures: Vec<String>) -> Self {
        self.run_failures = failures;
        self
    }

    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// The names of the calls received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<TaskDefinitionRegistration> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.launches.lock().unwrap().clone()
    }

    pub fn stops(&self) -> Vec<(String, String, String)> {
        self.stops.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl TaskService for FakeTaskService {
    async fn describe_task_definition(&self, family: &str) -> Result<TaskDefinitionTemplate> {
        self.record("describe_task_definition");
        if family != "app-db-migration" {
            return Err(DeployError::AWS(format!("Unable to describe {}", family)));
        }
        Ok(self.template.clone())
    }

    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<i64> {
        self.record("register_task_definition");
        self.registrations
            .lock()
            .unwrap()
            .push(registration.clone());
        Ok(2)
    }

    async fn run_task(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        self.record("run_task");
        self.launches.lock().unwrap().push(request.clone());
        if !self.run_failures.is_empty() {
            return Ok(LaunchOutcome {
                task_arn: None,
                failures: self.run_failures.clone(),
            });
        }
        Ok(LaunchOutcome {
            task_arn: Some(TASK_ARN.to_string()),
            failures: vec![],
        })
    }

    async fn describe_task(&self, _cluster: &str, task_arn: &str) -> Result<TaskStatus> {
        self.record("describe_task");
        assert_eq!(TASK_ARN, task_arn);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            statuses
                .front()
                .cloned()
                .ok_or_else(|| DeployError::AWS("No task described".to_string()))
        }
    }

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()> {
        self.record("stop_task");
        self.stops.lock().unwrap().push((
            cluster.to_string(),
            task_arn.to_string(),
            reason.to_string(),
        ));
        if self.fail_stop {
            return Err(DeployError::AWS("AccessDenied".to_string()));
        }
        Ok(())
    }
}

/// A report received by [`FakeJobReporter`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Report {
    Success(String),
    Failure {
        job_id:       String,
        message:      String,
        failure_type: String,
    },
}

/// A CodePipeline stand-in recording the reports.
#[derive(Default)]
pub(crate) struct FakeJobReporter {
    fail:    bool,
    reports: Mutex<Vec<Report>>,
}

impl FakeJobReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter whose every report fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    fn record(&self, report: Report) -> Result<()> {
        self.reports.lock().unwrap().push(report);
        if self.fail {
            return Err(DeployError::AWS("JobNotFoundException".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobReporter for FakeJobReporter {
    async fn put_job_success_result(&self, job_id: &str) -> Result<()> {
        self.record(Report::Success(job_id.to_string()))
    }

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        message: &str,
        failure_type: &str,
    ) -> Result<()> {
        self.record(Report::Failure {
            job_id:       job_id.to_string(),
            message:      message.to_string(),
            failure_type: failure_type.to_string(),
        })
    }
}

/// Wires the fakes into the services of one invocation.
pub(crate) fn services(
    artifacts: &Arc<FakeArtifactStore>,
    tasks: &Arc<FakeTaskService>,
    reporter: &Arc<FakeJobReporter>,
) -> DeployServices {
    DeployServices {
        artifacts: artifacts.clone(),
        tasks:     tasks.clone(),
        reporter:  reporter.clone(),
    }
}
