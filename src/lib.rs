//! Tuberip Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod duration;
pub mod navigation;
pub mod ripper;
pub mod save;
pub mod session;
pub mod subject;
pub mod tagging;

// Re-export commonly used types for convenience
pub use codec::Codec;
pub use session::{SessionEngine, SessionEvent, SessionSettings};
pub use subject::{Subject, SubjectKind};
pub use tagging::TagPatch;
