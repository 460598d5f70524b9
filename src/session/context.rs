//! Session-wide inspection context.

use crate::codec::Codec;

/// Expected number of records for the current subject.
///
/// `Failed` marks an inspection whose subject could not be resolved at all.
/// It renders as "no results" without being mistaken for a real count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedTotal {
    Count(u64),
    Failed,
}

impl ExpectedTotal {
    pub fn count(&self) -> Option<u64> {
        match self {
            ExpectedTotal::Count(n) => Some(*n),
            ExpectedTotal::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExpectedTotal::Failed)
    }
}

/// Mutable state shared by one inspection session.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// The raw subject string as last requested.
    pub subject: String,
    /// Format given to newly normalized records.
    pub format: Codec,
    /// Expected record count, `None` until the subject resolves.
    pub total: Option<ExpectedTotal>,
    /// False while the engine is checking the catalog service at startup.
    pub ready: bool,
    /// True while at least one download job is registered.
    pub downloading: bool,
}

impl Context {
    pub fn new(default_format: Codec) -> Self {
        Self {
            subject: String::new(),
            format: default_format,
            total: None,
            ready: true,
            downloading: false,
        }
    }

    /// Fresh context for a new inspection. Everything except the subject
    /// goes back to its initial value, including the format.
    pub fn for_subject(subject: &str, default_format: Codec) -> Self {
        Self {
            subject: subject.to_string(),
            ..Self::new(default_format)
        }
    }
}
