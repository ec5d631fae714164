use std::any::Any;

/// Error type produced by plugin factories, spec factories and `Plugin::load`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Entry point '{entry}' in '{group}' references unknown object '{value}'")]
    UnknownReference {
        group: String,
        entry: String,
        value: String,
    },

    #[error("Invalid entry point reference '{value}': {reason}")]
    InvalidReference { value: String, reason: String },

    #[error("Discovery source unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Cannot resolve plugin specification from {description}")]
    Unrecognized { description: String },

    #[error("Spec factory '{factory}' failed: {error}")]
    SpecFactory {
        factory: String,
        #[source]
        error: BoxError,
    },

    #[error("Invalid plugin specification: {reason}")]
    InvalidSpec { reason: String },

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to instantiate plugin '{plugin}': {source}")]
pub struct InstantiationError {
    /// Qualified `namespace:name` of the plugin.
    pub plugin: String,
    pub source: BoxError,
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to load plugin '{plugin}': {source}")]
pub struct LoadError {
    /// Qualified `namespace:name` of the plugin.
    pub plugin: String,
    pub source: BoxError,
}

/// A lifecycle listener callback panicked. Only ever logged.
#[derive(Debug, thiserror::Error)]
#[error("Listener callback '{callback}' failed: {message}")]
pub struct ListenerError {
    pub callback: &'static str,
    pub message: String,
}

/// Raised when a plugin factory, `load` body or spec factory panics.
#[derive(Debug, thiserror::Error)]
#[error("panicked: {message}")]
pub struct PanicError {
    pub message: String,
}

impl PanicError {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }
}

/// Runs `f`, turning both a returned error and a panic into a [`BoxError`].
pub(crate) fn catch<R>(f: impl FnOnce() -> Result<R, BoxError>) -> Result<R, BoxError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Box::new(PanicError::from_payload(payload.as_ref()))),
    }
}
