//! Subject parsing: turning whatever the user pasted into a video or
//! playlist reference.
//!
//! Accepted forms are the short prefixed ids used in navigation paths
//! ("v<id>" / "p<id>") and the usual catalog URL shapes (watch, playlist,
//! youtu.be).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// What kind of catalog entry a subject points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Video,
    Playlist,
}

impl SubjectKind {
    /// Single-letter prefix used in navigation paths.
    pub fn prefix(&self) -> char {
        match self {
            SubjectKind::Video => 'v',
            SubjectKind::Playlist => 'p',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Video => "video",
            SubjectKind::Playlist => "playlist",
        }
    }
}

/// A parsed inspection subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubjectError {
    #[error("empty subject")]
    Empty,
    #[error("unknown subject kind `{0}` (v for video, p for playlist)")]
    UnknownKind(char),
    #[error("subject `{0}` is missing an id")]
    MissingId(String),
    #[error("unsupported subject url: {0}")]
    UnsupportedUrl(String),
}

impl Subject {
    pub fn video(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Video,
            id: id.into(),
        }
    }

    pub fn playlist(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Playlist,
            id: id.into(),
        }
    }

    /// Canonical navigation path, e.g. "vdQw4w9WgXcQ".
    pub fn path(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.id)
    }

    /// Full catalog URL for this subject.
    pub fn canonical_url(&self) -> String {
        match self.kind {
            SubjectKind::Video => format!("https://www.youtube.com/watch?v={}", self.id),
            SubjectKind::Playlist => {
                format!("https://www.youtube.com/playlist?list={}", self.id)
            }
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id)
    }
}

impl FromStr for Subject {
    type Err = SubjectError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SubjectError::Empty);
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return parse_url(raw);
        }
        let prefix = match raw.chars().next() {
            Some(c) => c,
            None => return Err(SubjectError::Empty),
        };
        let kind = match prefix {
            'v' => SubjectKind::Video,
            'p' => SubjectKind::Playlist,
            other => return Err(SubjectError::UnknownKind(other)),
        };
        let id = &raw[prefix.len_utf8()..];
        if id.is_empty() {
            return Err(SubjectError::MissingId(raw.to_string()));
        }
        Ok(Subject {
            kind,
            id: id.to_string(),
        })
    }
}

fn parse_url(raw: &str) -> Result<Subject, SubjectError> {
    let url = Url::parse(raw).map_err(|_| SubjectError::UnsupportedUrl(raw.to_string()))?;
    let host = url.host_str().unwrap_or_default();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);
    match host {
        "youtu.be" => {
            let id = url.path().trim_matches('/');
            if id.is_empty() {
                Err(SubjectError::MissingId(raw.to_string()))
            } else {
                Ok(Subject::video(id))
            }
        }
        "youtube.com" => match url.path() {
            "/watch" => query_param(&url, "v")
                .map(Subject::video)
                .ok_or_else(|| SubjectError::MissingId(raw.to_string())),
            "/playlist" => query_param(&url, "list")
                .map(Subject::playlist)
                .ok_or_else(|| SubjectError::MissingId(raw.to_string())),
            _ => Err(SubjectError::UnsupportedUrl(raw.to_string())),
        },
        _ => Err(SubjectError::UnsupportedUrl(raw.to_string())),
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
