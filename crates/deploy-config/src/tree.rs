//! Configuration tree model
//!
//! A stage's configuration is held as a [`ConfigTree`] of [`ConfigNode`]s.
//! Nodes are a closed set of variants, so every structural decision made
//! while merging environment overrides is an exhaustive `match`.
//!
//! # Example
//!
//! ```
//! use deploy_config::tree::{ConfigNode, ConfigTree, Scalar};
//!
//! let tree = ConfigTree::from_yaml_str("db:\n  host: localhost\n  port: 5432\n").unwrap();
//! assert_eq!(tree.lookup(&["db", "host"]).and_then(ConfigNode::as_str), Some("localhost"));
//! assert_eq!(
//!     tree.lookup(&["db", "port"]),
//!     Some(&ConfigNode::Leaf(Scalar::Number(5432_i64.into())))
//! );
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::{self, Entry};
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::{Error, Result};

/// A leaf value. YAML typing is preserved so inline documents survive the
/// trip to JSON unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// Render the scalar the way it would appear in an environment variable.
    pub fn to_env_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Null => JsonValue::Null,
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Number(n) => JsonValue::Number(n.clone()),
            Scalar::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_env_string())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

/// One node of the configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Leaf(Scalar),
    Branch(ConfigTree),
    List(Vec<ConfigNode>),
}

impl ConfigNode {
    /// String leaves only
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Leaf(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&ConfigTree> {
        match self {
            ConfigNode::Branch(tree) => Some(tree),
            _ => None,
        }
    }

    /// Short human name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigNode::Leaf(_) => "scalar",
            ConfigNode::Branch(_) => "mapping",
            ConfigNode::List(_) => "sequence",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ConfigNode::Leaf(scalar) => scalar.to_json(),
            ConfigNode::Branch(tree) => tree.to_json(),
            ConfigNode::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    fn from_yaml(value: YamlValue, location: &str) -> Result<Self> {
        let node = match value {
            YamlValue::Null => ConfigNode::Leaf(Scalar::Null),
            YamlValue::Bool(b) => ConfigNode::Leaf(Scalar::Bool(b)),
            YamlValue::Number(n) => ConfigNode::Leaf(Scalar::Number(yaml_number(&n, location)?)),
            YamlValue::String(s) => ConfigNode::Leaf(Scalar::String(s)),
            YamlValue::Sequence(items) => ConfigNode::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| Self::from_yaml(item, &format!("{location}[{idx}]")))
                    .collect::<Result<_>>()?,
            ),
            YamlValue::Mapping(mapping) => {
                let mut tree = ConfigTree::new();
                for (key, item) in mapping {
                    let key = yaml_key(key, location)?;
                    let child_location = join_location(location, &key);
                    tree.insert(key, Self::from_yaml(item, &child_location)?);
                }
                ConfigNode::Branch(tree)
            }
            YamlValue::Tagged(tagged) => Self::from_yaml(tagged.value, location)?,
        };
        Ok(node)
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ConfigNode::Leaf(Scalar::Null) => serializer.serialize_unit(),
            ConfigNode::Leaf(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            ConfigNode::Leaf(Scalar::Number(n)) => n.serialize(serializer),
            ConfigNode::Leaf(Scalar::String(s)) => serializer.serialize_str(s),
            ConfigNode::Branch(tree) => tree.serialize(serializer),
            ConfigNode::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// A mapping level of the configuration. Keys are unique; ordering is not
/// significant and iteration is sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    entries: BTreeMap<String, ConfigNode>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML mapping (merge keys are expanded) into a tree.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let mut value: YamlValue =
            serde_yaml::from_str(source).map_err(|e| Error::UnsupportedValue {
                location: "<inline>".to_string(),
                reason: e.to_string(),
            })?;
        value.apply_merge().map_err(|e| Error::UnsupportedValue {
            location: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(value, "")
    }

    /// Convert an already-parsed YAML value. `null` is an empty tree;
    /// anything other than a mapping is rejected.
    pub fn from_yaml(value: YamlValue, location: &str) -> Result<Self> {
        match ConfigNode::from_yaml(value, location)? {
            ConfigNode::Branch(tree) => Ok(tree),
            ConfigNode::Leaf(Scalar::Null) => Ok(Self::new()),
            other => Err(Error::UnsupportedValue {
                location: display_location(location),
                reason: format!("expected a mapping, found a {}", other.kind()),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.get(key)
    }

    /// Follow `path` through nested branches.
    pub fn lookup(&self, path: &[&str]) -> Option<&ConfigNode> {
        let (first, rest) = path.split_first()?;
        let node = self.entries.get(*first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_branch()?.lookup(rest)
    }

    pub fn insert(&mut self, key: impl Into<String>, node: ConfigNode) -> Option<ConfigNode> {
        self.entries.insert(key.into(), node)
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigNode> {
        self.entries.remove(key)
    }

    pub fn entry(&mut self, key: String) -> Entry<'_, String, ConfigNode> {
        self.entries.entry(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ConfigNode> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(key, node)| (key.clone(), node.to_json()))
                .collect(),
        )
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a ConfigTree {
    type Item = (&'a String, &'a ConfigNode);
    type IntoIter = btree_map::Iter<'a, String, ConfigNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, ConfigNode)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, ConfigNode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number, location: &str) -> Result<serde_json::Number> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    n.as_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| Error::UnsupportedValue {
            location: display_location(location),
            reason: format!("number {n} cannot be represented"),
        })
}

fn yaml_key(key: YamlValue, location: &str) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => yaml_key(tagged.value, location),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Err(Error::UnsupportedValue {
            location: display_location(location),
            reason: "mapping keys must be scalars".to_string(),
        }),
    }
}

fn join_location(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_location(location: &str) -> String {
    if location.is_empty() {
        "<root>".to_string()
    } else {
        location.to_string()
    }
}
