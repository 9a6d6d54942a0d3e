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

//! Respins a task definition with a new container image.
//!
//! `DescribeTaskDefinition` returns many fields that `RegisterTaskDefinition`
//! refuses, such as the revision, the status or the registration date. Only
//! the fields below are carried over to the new revision.

use log::warn;
use serde_json::{Map, Value};

/// The task definition fields copied into a new revision.
pub const REGISTERED_FIELDS: [&str; 15] = [
    "containerDefinitions",
    "volumes",
    "taskRoleArn",
    "executionRoleArn",
    "networkMode",
    "placementConstraints",
    "requiresCompatibilities",
    "cpu",
    "memory",
    "pidMode",
    "ipcMode",
    "proxyConfiguration",
    "inferenceAccelerators",
    "ephemeralStorage",
    "runtimePlatform",
];

/// The latest active revision of a task definition family, as described by
/// ECS, with its tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDefinitionTemplate {
    /// The `taskDefinition` object of the describe response.
    pub definition: Map<String, Value>,
    /// The `tags` of the describe response.
    pub tags:       Vec<Value>,
}

/// The content of a `RegisterTaskDefinition` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDefinitionRegistration {
    pub family: String,
    /// The allow-listed fields of the template, keyed by their wire names.
    pub fields: Map<String, Value>,
    pub tags:   Vec<Value>,
}

impl TaskDefinitionRegistration {
    /// Returns the registration as the JSON body of a
    /// `RegisterTaskDefinition` request. Tags are only sent when there are
    /// some.
    pub fn to_request(&self) -> Value {
        let mut request = self.fields.clone();
        request.insert("family".to_string(), Value::String(self.family.clone()));
        if !self.tags.is_empty() {
            request.insert("tags".to_string(), Value::Array(self.tags.clone()));
        }
        Value::Object(request)
    }
}

/// Sets the image of the container named `container_name`.
///
/// Only the first container with that name is updated. Returns whether a
/// container was found.
pub fn replace_image(definition: &mut Map<String, Value>, container_name: &str, image: &str) -> bool {
    let container = definition
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
        .and_then(|containers| {
            containers
                .iter_mut()
                .find(|c| c.get("name").and_then(Value::as_str) == Some(container_name))
        })
        .and_then(Value::as_object_mut);

    match container {
        Some(container) => {
            container.insert("image".to_string(), Value::String(image.to_string()));
            true
        }
        None => false,
    }
}

/// Builds the registration of a new revision of `family` from its current
/// template, with `image` as the image of `container_name`.
///
/// When no container has that name, the template is registered unchanged.
pub fn respin(
    family: &str,
    mut template: TaskDefinitionTemplate,
    container_name: &str,
    image: &str,
) -> TaskDefinitionRegistration {
    if !replace_image(&mut template.definition, container_name, image) {
        warn!(
            "Container {} is not defined in task definition {}, registering it unchanged.",
            container_name,
            family
        );
    }

    let fields = template
        .definition
        .into_iter()
        .filter(|(key, value)| REGISTERED_FIELDS.contains(&key.as_str()) && !value.is_null())
        .collect();

    TaskDefinitionRegistration {
        family: family.to_string(),
        fields,
        tags: template.tags,
    }
}
