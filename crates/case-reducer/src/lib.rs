pub mod context;
pub mod error;
pub mod reduce;
pub mod safety_net;

pub use context::ReducerContext;
pub use error::ReducerError;
pub use reduce::reduce;
