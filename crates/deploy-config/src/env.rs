//! Flat environment dictionaries and their layering
//!
//! The environment for an invocation is assembled from three sources. With
//! the default [`Precedence`] they apply lowest first:
//!
//! 1. the stage's `environment` block
//! 2. every file listed in `env_files`, in order
//! 3. the process environment
//!
//! A later source overwrites an earlier one key for key.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Flat `KEY -> value` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentDict {
    vars: BTreeMap<String, String>,
}

impl EnvironmentDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Entries whose key or value is not valid Unicode are left out.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Overlay `other` on top of `self`; `other` wins on collisions.
    pub fn overlay(&mut self, other: &EnvironmentDict) {
        for (key, value) in &other.vars {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.vars.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EnvironmentDict {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl IntoIterator for EnvironmentDict {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

/// A source contributing to the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvSource {
    /// The stage's `environment` block
    Embedded,
    /// Files listed in `env_files`
    Files,
    /// The process environment
    Process,
}

/// Order in which sources are applied, lowest precedence first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedence {
    order: Vec<EnvSource>,
}

impl Default for Precedence {
    /// process env > file env > config-embedded env
    fn default() -> Self {
        Self {
            order: vec![EnvSource::Embedded, EnvSource::Files, EnvSource::Process],
        }
    }
}

impl Precedence {
    /// Build an order from lowest to highest precedence. Sources left out do
    /// not contribute.
    pub fn lowest_first(order: impl IntoIterator<Item = EnvSource>) -> Self {
        let mut seen = Vec::new();
        for source in order {
            if !seen.contains(&source) {
                seen.push(source);
            }
        }
        Self { order: seen }
    }

    pub fn order(&self) -> &[EnvSource] {
        &self.order
    }
}

/// The raw contents of each environment source before layering
#[derive(Debug, Clone, Default)]
pub struct EnvLayers {
    pub embedded: EnvironmentDict,
    /// Each env file with its contents, in listed order
    pub files: Vec<(PathBuf, EnvironmentDict)>,
    pub process: EnvironmentDict,
}

impl EnvLayers {
    /// Combine the layers according to `precedence`.
    pub fn resolve(&self, precedence: &Precedence) -> EnvironmentDict {
        let mut resolved = EnvironmentDict::new();
        for source in precedence.order() {
            match source {
                EnvSource::Embedded => resolved.overlay(&self.embedded),
                EnvSource::Files => {
                    for (path, contents) in &self.files {
                        tracing::debug!(path = %path.display(), vars = contents.len(), "Applying env file");
                        resolved.overlay(contents);
                    }
                }
                EnvSource::Process => resolved.overlay(&self.process),
            }
        }
        resolved
    }
}

/// Read a dotenv file relative to `root`.
///
/// Values are taken literally: `$VAR` and `${VAR}` are neither expanded nor
/// looked up in the process environment, so placeholders survive for later
/// substitution.
pub fn read_env_file(root: &Path, name: &str) -> Result<EnvironmentDict> {
    let path = root.join(name);
    if !path.is_file() {
        return Err(Error::ConfigFileNotFound { path });
    }

    let source = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let entries = dotenv_parser::parse_dotenv(&source).map_err(|e| Error::DotenvParse {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(entries.into_iter().collect())
}

/// Copy every entry of `env` into the process environment whose key is not
/// already set there. Returns the keys that were written.
///
/// Existing process values always win. This is the only place the engine
/// writes the process environment; call it once, early, before any other
/// threads are started.
pub fn export_missing(env: &EnvironmentDict) -> Vec<String> {
    let mut exported = Vec::new();
    for (key, value) in env {
        if !is_exportable(key, value) || std::env::var_os(key).is_some() {
            continue;
        }
        // SAFETY: called during single-threaded start-up, before the async
        // runtime or any worker thread exists.
        unsafe { std::env::set_var(key, value) };
        exported.push(key.clone());
    }
    tracing::debug!(count = exported.len(), "Exported missing variables to process environment");
    exported
}

fn is_exportable(key: &str, value: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0']) && !value.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn dict(pairs: &[(&str, &str)]) -> EnvironmentDict {
        pairs.iter().copied().collect()
    }

    fn layers() -> EnvLayers {
        EnvLayers {
            embedded: dict(&[("A", "embedded"), ("B", "embedded"), ("C", "embedded")]),
            files: vec![
                (PathBuf::from(".env"), dict(&[("B", "file1"), ("C", "file1")])),
                (PathBuf::from(".env.local"), dict(&[("C", "file2")])),
            ],
            process: dict(&[("C", "process"), ("D", "process")]),
        }
    }

    #[test]
    fn default_precedence_is_process_over_files_over_embedded() {
        let resolved = layers().resolve(&Precedence::default());
        assert_eq!(resolved.get("A"), Some("embedded"));
        assert_eq!(resolved.get("B"), Some("file1"));
        assert_eq!(resolved.get("C"), Some("process"));
        assert_eq!(resolved.get("D"), Some("process"));
    }

    #[test]
    fn later_files_override_earlier_files() {
        let resolved = layers().resolve(&Precedence::lowest_first([
            EnvSource::Embedded,
            EnvSource::Files,
        ]));
        assert_eq!(resolved.get("C"), Some("file2"));
        assert_eq!(resolved.get("D"), None);
    }

    #[test]
    fn custom_precedence_can_put_files_on_top() {
        let resolved = layers().resolve(&Precedence::lowest_first([
            EnvSource::Process,
            EnvSource::Embedded,
            EnvSource::Files,
        ]));
        assert_eq!(resolved.get("C"), Some("file2"));
        assert_eq!(resolved.get("A"), Some("embedded"));
    }

    #[test]
    fn duplicate_sources_are_ignored() {
        let precedence = Precedence::lowest_first([EnvSource::Files, EnvSource::Files]);
        assert_eq!(precedence.order(), &[EnvSource::Files]);
    }

    #[test]
    fn reads_dotenv_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".env"),
            "# comment\nFOO=bar\nQUOTED=\"hello world\"\n",
        )
        .unwrap();

        let env = read_env_file(temp.path(), ".env").unwrap();
        assert_eq!(env.get("FOO"), Some("bar"));
        assert_eq!(env.get("QUOTED"), Some("hello world"));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn dotenv_values_are_not_expanded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".env"),
            "TAG=${RELEASE}\nHOME_DIR=${HOME}\nBARE=$PATH\nMSG=two words\n",
        )
        .unwrap();

        let env = read_env_file(temp.path(), ".env").unwrap();
        assert_eq!(env.get("TAG"), Some("${RELEASE}"));
        assert_eq!(env.get("HOME_DIR"), Some("${HOME}"));
        assert_eq!(env.get("BARE"), Some("$PATH"));
        assert_eq!(env.get("MSG"), Some("two words"));
    }

    #[test]
    fn missing_dotenv_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = read_env_file(temp.path(), ".env.missing").unwrap_err();
        assert!(matches!(err, Error::ConfigFileNotFound { .. }));
    }

    #[test]
    fn export_keeps_existing_process_values() {
        const PRESET: &str = "DEPLOY_CONFIG_EXPORT_TEST_PRESET";
        const UNSET: &str = "DEPLOY_CONFIG_EXPORT_TEST_UNSET";
        // SAFETY: both names are unique to this test.
        unsafe {
            std::env::set_var(PRESET, "process");
            std::env::remove_var(UNSET);
        }

        let exported = export_missing(&dict(&[(PRESET, "config"), (UNSET, "config")]));

        assert_eq!(exported, vec![UNSET.to_string()]);
        assert_eq!(std::env::var(PRESET).as_deref(), Ok("process"));
        assert_eq!(std::env::var(UNSET).as_deref(), Ok("config"));
    }

    #[test]
    fn invalid_keys_are_not_exportable() {
        assert!(is_exportable("FOO", "bar"));
        assert!(!is_exportable("", "bar"));
        assert!(!is_exportable("A=B", "bar"));
        assert!(!is_exportable("FOO", "a\0b"));
    }
}
