pub mod dispatch;
pub mod error;
pub mod health;
pub mod log;
pub mod provider;
pub mod registry;

pub use dispatch::{OutboundMessage, SendOutcome};
pub use error::ProviderError;
pub use log::LogProvider;
pub use provider::{DynProvider, Provider};
pub use registry::ProviderRegistry;

// Outbound W3C Trace Context injection for HTTP-based providers (portal adapter).
#[cfg(feature = "trace-context")]
pub mod trace_context;
#[cfg(feature = "trace-context")]
pub use trace_context::inject_trace_context;
