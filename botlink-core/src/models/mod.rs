//! Data models for botlink

pub mod configuration;
pub mod credentials;
pub mod envelope;
pub mod options;
pub mod trigger;

pub use configuration::*;
pub use credentials::*;
pub use envelope::*;
pub use options::*;
pub use trigger::*;
