//! Partial typed view of an ECS task-definition document
//!
//! Only the fields the assembler rewrites are typed. Every other field is
//! carried through untouched so registering the result sends exactly what the
//! template said.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// A task-definition document (the `RegisterTaskDefinition` request body)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_definitions: Option<Vec<TemplateContainer>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDefinitionDocument {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Compact JSON, as emitted in `ECS_TASK_DEFINITION`
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn containers(&self) -> &[TemplateContainer] {
        self.container_definitions.as_deref().unwrap_or_default()
    }

    pub fn container(&self, name: &str) -> Option<&TemplateContainer> {
        self.containers().iter().find(|c| c.name == name)
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut TemplateContainer> {
        self.container_definitions
            .as_mut()?
            .iter_mut()
            .find(|c| c.name == name)
    }
}

/// One entry of `containerDefinitions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContainer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<KeyValuePair>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<Secret>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateContainer {
    pub fn environment(&self) -> &[KeyValuePair] {
        self.environment.as_deref().unwrap_or_default()
    }

    pub fn secrets(&self) -> &[Secret] {
        self.secrets.as_deref().unwrap_or_default()
    }
}

/// `{ "name": ..., "value": ... }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "crate::schema::scalar_string")]
    pub value: String,
}

impl KeyValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `{ "name": ..., "valueFrom": ... }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value_from: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, value_from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_from: value_from.into(),
        }
    }
}
