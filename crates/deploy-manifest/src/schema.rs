//! Typed view of the `ecs-deploy` config section
//!
//! ```yaml
//! ecs-deploy:
//!   accountId: "111111111111"
//!   region: us-east-1
//!   build:
//!     - name: web
//!       repoName: svc
//!       dockerfile: Dockerfile
//!   taskDefinition:
//!     target: web
//!     template: templates/web.json
//!     containerDefinitions:
//!       - name: app
//!         image: web
//!         secrets:
//!           DB_PASS: db/password
//! ```

use std::collections::BTreeMap;

use deploy_config::ConfigTree;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Key of the deploy section inside a stage
pub const DEPLOY_SECTION: &str = "ecs-deploy";

/// Deploy configuration for one stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default, deserialize_with = "optional_string")]
    pub account_id: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub task_family: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub service_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub cluster_name: Option<String>,

    /// Images this project builds
    #[serde(default)]
    pub build: Vec<BuildItem>,

    /// A single task definition or a list of them
    #[serde(default, deserialize_with = "one_or_many")]
    pub task_definition: Vec<TaskDefinitionConfig>,
}

impl DeployConfig {
    /// Deserialize from a config tree (usually [`deploy_config::LoadedConfig::section`]).
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        serde_json::from_value(tree.to_json()).map_err(|e| Error::InvalidConfig {
            section: DEPLOY_SECTION.to_string(),
            message: e.to_string(),
        })
    }

    pub fn find_build_item(&self, name: &str) -> Option<&BuildItem> {
        self.build.iter().find(|item| item.name == name)
    }

    /// Task definition whose `name` or `target` equals `target`
    pub fn find_task_definition(&self, target: &str) -> Result<&TaskDefinitionConfig> {
        self.task_definition
            .iter()
            .find(|td| td.matches_target(target))
            .ok_or_else(|| Error::TaskDefinitionNotFoundForTarget {
                target: target.to_string(),
            })
    }
}

/// An image build configuration mapped to an ECR repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildItem {
    pub name: String,

    #[serde(default, deserialize_with = "optional_string")]
    pub account_id: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub repo_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub dockerfile: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub platform: Option<String>,

    #[serde(default, deserialize_with = "string_map")]
    pub build_args: BTreeMap<String, String>,
}

impl BuildItem {
    pub fn repo_name(&self) -> Result<&str> {
        self.repo_name
            .as_deref()
            .ok_or_else(|| Error::missing("repoName", format!("build item {}", self.name)))
    }
}

/// One deployable task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionConfig {
    #[serde(default, deserialize_with = "optional_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub target: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub task_family: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub service_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub cluster_name: Option<String>,

    pub template: TemplateRef,

    #[serde(default)]
    pub container_definitions: Vec<ContainerConfig>,
}

impl TaskDefinitionConfig {
    pub fn matches_target(&self, target: &str) -> bool {
        self.name.as_deref() == Some(target) || self.target.as_deref() == Some(target)
    }

    /// Name used in diagnostics
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.target.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// Where the task-definition template comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateRef {
    /// A local path or `<scheme>://` identifier
    Location(String),
    /// The template written inline in the config
    Inline(Map<String, Value>),
}

impl TemplateRef {
    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TemplateRef::Location(location) => location.clone(),
            TemplateRef::Inline(_) => "<inline template>".to_string(),
        }
    }
}

/// Config-side overrides for one container of the template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    pub name: String,

    /// Build item name or a literal image reference
    #[serde(default, deserialize_with = "optional_string")]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "string_map")]
    pub environment: BTreeMap<String, String>,

    /// Dotenv files applied on top of `environment`
    #[serde(default)]
    pub env_files: Vec<String>,

    /// Secret name to SSM parameter name or ARN
    #[serde(default, deserialize_with = "string_map")]
    pub secrets: BTreeMap<String, String>,
}

/// Scalars that YAML may type as numbers or booleans but that are strings here
#[derive(Deserialize)]
#[serde(untagged)]
enum Stringish {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<Stringish> for String {
    fn from(value: Stringish) -> Self {
        match value {
            Stringish::String(s) => s,
            Stringish::Unsigned(n) => n.to_string(),
            Stringish::Signed(n) => n.to_string(),
            Stringish::Float(n) => n.to_string(),
            Stringish::Bool(b) => b.to_string(),
        }
    }
}

fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Stringish>::deserialize(deserializer)?.map(String::from))
}

/// Scalar as a string; a missing or null value becomes empty
pub(crate) fn scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(optional_string(deserializer)?.unwrap_or_default())
}

fn string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, Stringish>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, String::from(value)))
        .collect())
}

fn one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<TaskDefinitionConfig>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<TaskDefinitionConfig>),
        One(Box<TaskDefinitionConfig>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(list)) => list,
        Some(OneOrMany::One(single)) => vec![*single],
    })
}
