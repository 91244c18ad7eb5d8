// Application layer - use cases and orchestration over the storage port

pub mod config;
pub mod error;
pub mod records;
pub mod service;

pub use config::*;
pub use error::*;
pub use records::*;
pub use service::*;
