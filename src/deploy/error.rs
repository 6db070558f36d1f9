// ABOUTME: Error types for template validation, resolution, and deployment runs.
// ABOUTME: Every run failure ends up as the message of a terminal Failed snapshot.

use crate::api::ApiError;

/// Errors raised while preparing or running a one-click deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Template written for a schema version this orchestrator does not implement.
    #[error("template schema version is \"{found}\", only version \"{expected}\" is supported")]
    SchemaVersionMismatch { found: String, expected: String },

    /// Variable id is not a `$$identifier` token.
    #[error("invalid variable id \"{0}\": expected `$$` followed by letters, digits, or underscores")]
    InvalidVariableId(String),

    /// Two declarations share an id.
    #[error("variable {0} is declared more than once")]
    DuplicateVariable(String),

    /// Required variable with neither a supplied value nor a default.
    #[error("missing value for required variable {0}")]
    MissingRequiredVariable(String),

    /// Value does not match the declared pattern.
    #[error("invalid value \"{value}\" for variable {id}: must match {pattern}")]
    InvalidVariableValue {
        id: String,
        value: String,
        pattern: String,
    },

    /// Declared pattern does not compile.
    #[error("variable {id} has an invalid validation pattern {pattern}: {reason}")]
    InvalidPattern {
        id: String,
        pattern: String,
        reason: String,
    },

    /// Template references a variable nobody declared.
    #[error("service {service}: {field} references undeclared variable {token}")]
    UnresolvedPlaceholder {
        service: String,
        field: String,
        token: String,
    },

    /// Resolved service name is not a valid platform app name.
    #[error("service {service}: \"{name}\" is not a valid app name: {reason}")]
    InvalidServiceName {
        service: String,
        name: String,
        reason: String,
    },

    /// Two services resolve to the same app name.
    #[error("more than one service resolves to app name {0}")]
    DuplicateServiceName(String),

    /// Resolved field value cannot be used by the platform.
    #[error("service {service}: invalid {field} \"{value}\": {reason}")]
    InvalidServiceField {
        service: String,
        field: String,
        value: String,
        reason: String,
    },

    /// The application-management API refused or failed a service.
    #[error("failed to deploy service {service}: {source}")]
    ServiceDeploymentFailed {
        service: String,
        #[source]
        source: ApiError,
    },

    /// Deployment state asked to make a transition it does not allow.
    #[error("invalid deployment state transition: {0}")]
    InvalidTransition(String),

    /// A run is already active on this orchestrator.
    #[error("a deployment is already in progress")]
    AlreadyRunning,

    /// Restart requested before any run was started.
    #[error("no previous deployment to restart")]
    NothingToRestart,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    SchemaVersionMismatch,
    InvalidVariableId,
    DuplicateVariable,
    MissingRequiredVariable,
    InvalidVariableValue,
    InvalidPattern,
    UnresolvedPlaceholder,
    InvalidServiceName,
    DuplicateServiceName,
    InvalidServiceField,
    ServiceDeploymentFailed,
    InvalidTransition,
    AlreadyRunning,
    NothingToRestart,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::SchemaVersionMismatch { .. } => DeployErrorKind::SchemaVersionMismatch,
            DeployError::InvalidVariableId(_) => DeployErrorKind::InvalidVariableId,
            DeployError::DuplicateVariable(_) => DeployErrorKind::DuplicateVariable,
            DeployError::MissingRequiredVariable(_) => DeployErrorKind::MissingRequiredVariable,
            DeployError::InvalidVariableValue { .. } => DeployErrorKind::InvalidVariableValue,
            DeployError::InvalidPattern { .. } => DeployErrorKind::InvalidPattern,
            DeployError::UnresolvedPlaceholder { .. } => DeployErrorKind::UnresolvedPlaceholder,
            DeployError::InvalidServiceName { .. } => DeployErrorKind::InvalidServiceName,
            DeployError::DuplicateServiceName(_) => DeployErrorKind::DuplicateServiceName,
            DeployError::InvalidServiceField { .. } => DeployErrorKind::InvalidServiceField,
            DeployError::ServiceDeploymentFailed { .. } => DeployErrorKind::ServiceDeploymentFailed,
            DeployError::InvalidTransition(_) => DeployErrorKind::InvalidTransition,
            DeployError::AlreadyRunning => DeployErrorKind::AlreadyRunning,
            DeployError::NothingToRestart => DeployErrorKind::NothingToRestart,
        }
    }

    /// Whether this error was raised before anything was sent to the platform.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self.kind(),
            DeployErrorKind::ServiceDeploymentFailed
                | DeployErrorKind::InvalidTransition
                | DeployErrorKind::AlreadyRunning
                | DeployErrorKind::NothingToRestart
        )
    }

    /// Returns the underlying API error if a service failed to deploy.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DeployError::ServiceDeploymentFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
