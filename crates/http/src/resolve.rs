//! Resolution of service-supplied URLs.

use url::{ParseError, Url};

use crate::error::{Result, StrategyError};

/// Resolve a URL taken from a header or body.
///
/// Absolute URLs pass through unchanged. Relative ones are joined onto
/// `endpoint`; without an endpoint they are rejected.
pub fn resolve_url(endpoint: Option<&Url>, raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StrategyError::invalid_argument("url is empty"));
    }

    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let Some(endpoint) = endpoint else {
                return Err(StrategyError::invalid_argument(format!(
                    "relative url '{raw}' cannot be resolved without an endpoint"
                )));
            };
            endpoint.join(raw).map_err(|e| {
                StrategyError::invalid_argument(format!(
                    "cannot join '{raw}' onto '{endpoint}': {e}"
                ))
            })
        }
        Err(e) => Err(StrategyError::invalid_argument(format!(
            "invalid url '{raw}': {e}"
        ))),
    }
}
