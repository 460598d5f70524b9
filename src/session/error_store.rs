//! Scope-keyed store for user-facing failure records.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Which part of the session an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// Subject inspection and catalog lookups.
    Context,
    /// Individual record downloads.
    Videos,
}

impl ErrorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorScope::Context => "context",
            ErrorScope::Videos => "videos",
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub scope: ErrorScope,
    pub message: String,
    /// A fatal error means its scope produced nothing useful. Non-fatal
    /// ones sit alongside whatever did arrive.
    pub fatal: bool,
    pub raised_at: DateTime<Utc>,
}

/// Append-only per-scope error collection, cleared wholesale.
#[derive(Debug, Default)]
pub struct ErrorStore {
    records: RwLock<HashMap<ErrorScope, Vec<ErrorRecord>>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends messages under a scope. Duplicates are kept and order is
    /// preserved. Returns how many records were added.
    pub async fn include<I>(&self, scope: ErrorScope, messages: I, fatal: bool) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let bucket = records.entry(scope).or_default();
        let before = bucket.len();
        bucket.extend(messages.into_iter().map(|message| ErrorRecord {
            scope,
            message,
            fatal,
            raised_at: now,
        }));
        bucket.len() - before
    }

    /// Drops every record in `scope`, or the whole store when `scope` is
    /// `None`.
    pub async fn clear(&self, scope: Option<ErrorScope>) {
        let mut records = self.records.write().await;
        match scope {
            Some(scope) => {
                records.remove(&scope);
            }
            None => records.clear(),
        }
    }

    pub async fn for_scope(&self, scope: ErrorScope) -> Vec<ErrorRecord> {
        self.records
            .read()
            .await
            .get(&scope)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn has_fatal(&self, scope: ErrorScope) -> bool {
        self.records
            .read()
            .await
            .get(&scope)
            .map(|bucket| bucket.iter().any(|record| record.fatal))
            .unwrap_or(false)
    }

    pub async fn is_empty(&self) -> bool {
        self.records
            .read()
            .await
            .values()
            .all(|bucket| bucket.is_empty())
    }

    /// Every record across scopes, oldest first.
    pub async fn snapshot(&self) -> Vec<ErrorRecord> {
        let records = self.records.read().await;
        let mut all: Vec<ErrorRecord> = records.values().flatten().cloned().collect();
        all.sort_by_key(|record| record.raised_at);
        all
    }
}
