//! Error taxonomy for configuration, graph resolution, artifact access and runs.
//!
//! These are carried inside [`anyhow::Error`] through the rest of the crate and
//! can be recovered with `downcast_ref`.

/// A problem with the deployment configuration. A human must fix the config table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A primitive has no price aggregator.
    #[error("missing aggregator for {symbol}")]
    MissingAggregator { symbol: String },
    /// The config was read before any config step persisted it.
    #[error("no deployment config has been persisted for network {network}")]
    NotPersisted { network: String },
    /// The config was written twice in one run.
    #[error("deployment config for network {network} was already persisted in this run")]
    AlreadyPersisted { network: String },
    /// The persisted config does not deserialize.
    #[error("deployment config is malformed: {0}")]
    Malformed(String),
    /// A config entry carries the zero address.
    #[error("{field} has a zero address")]
    ZeroAddress { field: String },
}

/// A problem with the declared step graph, detected before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("step {0} is registered twice")]
    DuplicateStep(String),
    #[error("step {step} depends on {dependency}, which is neither a step nor a tag")]
    UnknownDependency { step: String, dependency: String },
    #[error("step {step} depends on {dependency}, which only runs at the end")]
    DependsOnEndStep { step: String, dependency: String },
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// An invalid read of another step's artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("step {step} reads {name} without declaring it as a dependency")]
    UndeclaredDependency { step: String, name: String },
    #[error("step {step} requires {name}, which was skipped on this network")]
    SkippedDependency { step: String, name: String },
    #[error("step {step} requires {name}, which has no deployment")]
    MissingArtifact { step: String, name: String },
}

/// A failure of the run itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("step {step} writes {name}, which {owner} already wrote in this run")]
    DuplicateWrite {
        step: String,
        name: String,
        owner: String,
    },
    #[error("step {0} failed")]
    StepFailed(String),
}
