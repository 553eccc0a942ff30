//! Template resolution
//!
//! A task-definition template is referenced in one of three ways:
//!
//! - inline, as a mapping inside the config
//! - a local path (optionally `file://`), relative to the working directory
//! - a remote identifier such as `s3://bucket/key`, handed to a
//!   [`RemoteFetcher`]
//!
//! Placeholders are substituted in the reference before reading, and in the
//! string values of the document after parsing, so substituted text never
//! needs JSON or YAML escaping.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::schema::TemplateRef;
use crate::substitute::Substitutions;
use crate::{Error, Result};

/// Fetches remote template text. Credentials, retries and timeouts are the
/// implementor's concern.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Return the raw document stored at `uri`.
    async fn fetch(&self, uri: &str) -> Result<String>;
}

/// Resolves [`TemplateRef`]s into JSON documents
pub struct ResourceResolver {
    working_dir: PathBuf,
    fetcher: Option<Box<dyn RemoteFetcher>>,
}

impl std::fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("working_dir", &self.working_dir)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl ResourceResolver {
    /// Resolver for local and inline templates only
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            fetcher: None,
        }
    }

    /// Enable remote references
    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve `reference` into a document.
    pub async fn resolve(&self, reference: &TemplateRef, subs: &Substitutions) -> Result<Value> {
        match reference {
            TemplateRef::Inline(map) => {
                let mut value = Value::Object(map.clone());
                subs.apply_json(&mut value);
                Ok(value)
            }
            TemplateRef::Location(location) => {
                let location = subs.apply(location);
                let text = self.read(&location).await?;
                let mut value = parse_document(&location, &text)?;
                subs.apply_json(&mut value);
                Ok(value)
            }
        }
    }

    async fn read(&self, location: &str) -> Result<String> {
        match classify(location) {
            Location::Local(path) => {
                let path = if path.is_absolute() {
                    path
                } else {
                    self.working_dir.join(path)
                };
                tracing::debug!(path = %path.display(), "Reading template file");
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| Error::template(location, format!("{}: {e}", path.display())))
            }
            Location::Remote { scheme } => {
                let Some(fetcher) = &self.fetcher else {
                    return Err(Error::template(
                        location,
                        format!("no fetcher configured for {scheme}:// references"),
                    ));
                };
                tracing::debug!(uri = location, "Fetching remote template");
                fetcher.fetch(location).await
            }
        }
    }
}

enum Location<'a> {
    Local(PathBuf),
    Remote { scheme: &'a str },
}

fn classify(location: &str) -> Location<'_> {
    if let Some(path) = location.strip_prefix("file://") {
        return Location::Local(PathBuf::from(path));
    }
    match location.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => Location::Remote { scheme },
        _ => Location::Local(PathBuf::from(location)),
    }
}

/// Parse template text. `.json` references are strict JSON, everything else
/// goes through YAML, which also accepts JSON.
fn parse_document(location: &str, text: &str) -> Result<Value> {
    let is_json = Path::new(location)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return serde_json::from_str(text).map_err(|e| Error::template(location, e.to_string()));
    }

    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| Error::template(location, e.to_string()))?;
    yaml.apply_merge()
        .map_err(|e| Error::template(location, e.to_string()))?;
    serde_json::to_value(yaml).map_err(|e| Error::template(location, e.to_string()))
}
