//! Services activated from configuration.
//!
//! A [`ServicePlugin`] provides one named service and only activates when the
//! shared [`ServicesConfig`](crate::config::ServicesConfig) enables it. A
//! [`ServiceRegistry`] hands out running services by name.

mod plugin;
mod registry;

pub use plugin::ServicePlugin;
pub use registry::{SERVICES_NAMESPACE, ServiceRegistry};
