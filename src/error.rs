use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArmatureError>;

/// Errors raised while building the object graph.
///
/// Every variant is fatal to the graph build: no partially constructed
/// application is ever started.
#[derive(Debug, Error)]
pub enum ArmatureError {
    #[error("a provider for {type_name} is already registered")]
    DuplicateProvider { type_name: &'static str },

    #[error("no provider registered for {type_name}, required by {}", .required_by.as_deref().unwrap_or("the application"))]
    UnknownType {
        type_name: &'static str,
        required_by: Option<String>,
    },

    #[error("cyclic dependency detected: {cycle}")]
    CyclicDependency { cycle: String },

    #[error("constructor {constructor} failed: {source}")]
    Construction {
        constructor: String,
        source: anyhow::Error,
    },
}
