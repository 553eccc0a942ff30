//! Literal placeholder substitution
//!
//! A fixed set of computed values can be referenced as `${NAME}` in templates,
//! build arguments and container environment overrides. Unknown names are
//! left as written.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

pub const AWS_REGION: &str = "AWS_REGION";
pub const RELEASE: &str = "RELEASE";
pub const STAGE: &str = "STAGE";
pub const PWD: &str = "PWD";
pub const ACCOUNT_ID: &str = "ACCOUNT_ID";
pub const IMAGE_URL: &str = "IMAGE_URL";

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z][A-Z0-9_]*)\}").unwrap());

/// Values available for substitution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<&'static str, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn region(self, region: impl Into<String>) -> Self {
        self.set(AWS_REGION, region)
    }

    pub fn release(self, release: impl Into<String>) -> Self {
        self.set(RELEASE, release)
    }

    pub fn stage(self, stage: impl Into<String>) -> Self {
        self.set(STAGE, stage)
    }

    pub fn working_dir(self, dir: impl Into<String>) -> Self {
        self.set(PWD, dir)
    }

    pub fn account_id(self, account_id: impl Into<String>) -> Self {
        self.set(ACCOUNT_ID, account_id)
    }

    pub fn image_url(self, image_url: impl Into<String>) -> Self {
        self.set(IMAGE_URL, image_url)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every known `${NAME}` in `input`.
    pub fn apply(&self, input: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(input, |caps: &Captures<'_>| match self.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Apply [`Self::apply`] to every string inside `value`. Object keys are
    /// not touched.
    pub fn apply_json(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                let replaced = self.apply(s);
                *s = replaced;
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.apply_json(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.apply_json(item)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
