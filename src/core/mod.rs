pub mod catalog;
pub mod defaults;
pub mod error;
pub mod jobs;
pub mod logs;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod scaffolding;
pub mod ssh;
pub mod stages;

pub use error::{Error, ErrorCode, Result};
