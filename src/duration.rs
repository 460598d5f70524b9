//! ISO 8601 duration rendering for catalog metadata.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ISO_DURATION: Regex =
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.\d+)?S)?)?$").unwrap();
}

/// Renders an ISO 8601 duration ("PT4M13S") as a clock string ("4:13").
///
/// Durations of an hour or more come out as "H:MM:SS", shorter ones as
/// "M:SS". Returns `None` for anything that does not parse as a duration.
pub fn humanize(raw: &str) -> Option<String> {
    let caps = ISO_DURATION.captures(raw.trim())?;
    if (1..=4).all(|i| caps.get(i).is_none()) {
        // "P" or "PT" with no components
        return None;
    }
    let days = capture_u64(&caps, 1);
    let hours = capture_u64(&caps, 2);
    let minutes = capture_u64(&caps, 3);
    let seconds = capture_u64(&caps, 4);

    let total = ((days * 24 + hours) * 60 + minutes) * 60 + seconds;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        Some(format!("{}:{:02}:{:02}", hours, minutes, seconds))
    } else {
        Some(format!("{}:{:02}", minutes, seconds))
    }
}

fn capture_u64(caps: &Captures, index: usize) -> u64 {
    caps.get(index)
        .map(|m| m.as_str().parse().unwrap_or(0))
        .unwrap_or(0)
}
