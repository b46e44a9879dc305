//! Provider seam for transcription backends.

pub mod provider;
