//! Error types for deploy-manifest

/// Result type for deploy-manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling a deployment
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// accountId, region or repoName could not be resolved
    #[error("{field} not defined ({scope})")]
    MissingRequiredField { field: &'static str, scope: String },

    /// A configured container has no counterpart in the template
    #[error("Container {container} not found in template for target {target}")]
    ContainerNotFoundInTemplate { container: String, target: String },

    /// No task definition is configured for the requested target
    #[error("Task definition not found for target {target}")]
    TaskDefinitionNotFoundForTarget { target: String },

    /// A container's environment pins a different stage
    #[error("Stage mismatch in container {container} - tried to deploy {found} to {requested}")]
    StageMismatch {
        container: String,
        requested: String,
        found: String,
    },

    /// The template reference could not be located or parsed
    #[error("Failed to resolve template {reference}: {message}")]
    TemplateResolution { reference: String, message: String },

    /// The deploy section does not match the expected schema
    #[error("Invalid {section} config: {message}")]
    InvalidConfig { section: String, message: String },

    /// Error from deploy-config
    #[error(transparent)]
    Config(#[from] deploy_config::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn missing(field: &'static str, scope: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field,
            scope: scope.into(),
        }
    }

    pub fn template(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateResolution {
            reference: reference.into(),
            message: message.into(),
        }
    }
}
