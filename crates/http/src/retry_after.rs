//! Server-suggested poll delays.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header::RETRY_AFTER;

/// Millisecond headers, checked in order before `Retry-After`.
const MILLISECOND_HEADERS: [&str; 2] = ["retry-after-ms", "x-ms-retry-after-ms"];

/// Delay requested by the service, if any.
///
/// `retry-after-ms` and `x-ms-retry-after-ms` carry milliseconds;
/// `Retry-After` carries either seconds or an HTTP-date. Dates in the past
/// and unparsable values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    retry_after_at(headers, Utc::now())
}

/// [`retry_after`] with an explicit clock for HTTP-date values.
pub fn retry_after_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    for name in MILLISECOND_HEADERS {
        if let Some(millis) = header_str(headers, name).and_then(|v| v.parse::<u64>().ok()) {
            return Some(Duration::from_millis(millis));
        }
    }

    let raw = header_str(headers, RETRY_AFTER.as_str())?;
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?;
    (at.with_timezone(&Utc) - now).to_std().ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}
