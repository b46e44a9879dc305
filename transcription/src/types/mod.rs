//! Types shared across the transcription core.

pub mod job;
pub mod raw;
pub mod request;
pub mod result;
pub mod segment;
