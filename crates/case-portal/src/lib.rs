pub mod backend;
pub mod config;
pub mod http;
pub mod provider;

pub use backend::{PortalBackend, PortalResult, PortalSubmission};
pub use config::PortalConfig;
pub use http::HttpPortalBackend;
pub use provider::PortalProvider;
