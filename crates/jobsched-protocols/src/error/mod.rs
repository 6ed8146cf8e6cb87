//! Error types for jobsched protocols.

mod cache;
mod job;

pub use cache::CacheError;
pub use job::JobError;
