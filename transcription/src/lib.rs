//! Provider-agnostic speech-to-text core.
//!
//! This crate turns a single audio source into a canonical, reconciled transcript:
//! - `Provider` implementations submit audio and report job progress
//! - `JobDriver` polls each job to a terminal state under a per-job deadline
//! - the reconciler merges overlapping segments into disjoint timelines
//! - the assembler produces the `CanonicalResult` returned to callers
//!
//! Provider adapters live outside this crate, so applications can swap between
//! backends (AssemblyAI, OpenAI Whisper, etc.) without changing call sites.

pub mod assembler;
pub mod backoff;
pub mod engine;
pub mod error;
pub mod poller;
pub mod reconciler;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use backoff::PollingPolicy;
pub use engine::{RunningJob, TranscriptionEngine};
pub use error::{Error, ErrorKind, InputErrorKind};
pub use traits::provider::{check_payload, Limits, Provider};
pub use types::job::{JobHandle, PollOutcome, RemoteStatus, Status, Submission};
pub use types::raw::RawResult;
pub use types::request::{AudioBlob, AudioSource, Feature, LanguageCode, SubmitRequest};
pub use types::result::CanonicalResult;
pub use types::segment::{EntitySpan, Segment, SegmentKind, Sentiment, SentimentSpan};
