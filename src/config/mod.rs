//! Pluggable configuration provider system.
//!
//! ```rust,no_run
//! use plugin_lifecycle::config::{ConfigBuilder, ConfigProviderExt};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigBuilder::new()
//!     .env_with_prefix("PLUGIN_LIFECYCLE_")
//!     .file("plugins.json")
//!     .build();
//! let strict: bool = config.get_or("strict", false)?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod file;
pub mod memory;
pub mod provider;
pub mod services;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};
pub use services::{SERVICES_KEY, ServicesConfig};

use thiserror::Error;

/// Errors that can occur in configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Key not found
    #[error("Key not found: {key}")]
    NotFound {
        /// The key that was not found
        key: String,
    },

    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Provider error
    #[error("Provider error: {message}")]
    Provider {
        /// Error message
        message: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration builder for fluent API. Providers added first take priority.
pub struct ConfigBuilder {
    composite: CompositeConfigProvider,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            composite: CompositeConfigProvider::new(),
        }
    }

    /// Add environment variable provider
    pub fn env(mut self) -> Self {
        self.composite = self.composite.provider(EnvConfigProvider::new());
        self
    }

    /// Add environment variable provider with prefix
    pub fn env_with_prefix(mut self, prefix: &str) -> Self {
        self.composite = self
            .composite
            .provider(EnvConfigProvider::with_prefix(prefix));
        self
    }

    /// Add file provider
    pub fn file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.composite = self
            .composite
            .provider(FileConfigProvider::new(path.as_ref().to_path_buf()));
        self
    }

    /// Add memory provider
    pub fn memory(mut self, provider: MemoryConfigProvider) -> Self {
        self.composite = self.composite.provider(provider);
        self
    }

    /// Add a custom provider
    pub fn provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.composite = self.composite.provider(provider);
        self
    }

    /// Build the composite configuration
    pub fn build(self) -> CompositeConfigProvider {
        self.composite
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
