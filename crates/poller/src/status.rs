//! Operation status tokens.
//!
//! An [`OperationStatus`] is a named token plus a terminal flag. The set of
//! names is open: services may report states the client has never seen, so
//! besides the well-known constants any name can be turned into a token.
//! Equality and hashing ignore ASCII case, so `"Running"` and `"RUNNING"`
//! are the same status.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::error::{PollerError, Result};

/// Custom statuses registered through [`OperationStatus::from_name`],
/// keyed by lower-cased name.
static REGISTRY: LazyLock<RwLock<HashMap<String, OperationStatus>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Status of a long-running operation as observed by one poll.
#[derive(Debug, Clone)]
pub struct OperationStatus {
    name: Cow<'static, str>,
    complete: bool,
}

impl OperationStatus {
    /// The operation has been accepted but has not started yet.
    pub const NOT_STARTED: Self = Self::well_known("NOT_STARTED", false);
    /// The operation is running.
    pub const IN_PROGRESS: Self = Self::well_known("IN_PROGRESS", false);
    /// The operation finished successfully.
    pub const SUCCESSFULLY_COMPLETED: Self = Self::well_known("SUCCESSFULLY_COMPLETED", true);
    /// The operation finished with a failure.
    pub const FAILED: Self = Self::well_known("FAILED", true);
    /// The operation was cancelled by the user.
    pub const USER_CANCELLED: Self = Self::well_known("USER_CANCELLED", true);

    const fn well_known(name: &'static str, complete: bool) -> Self {
        Self {
            name: Cow::Borrowed(name),
            complete,
        }
    }

    /// Shorthand for [`Self::IN_PROGRESS`].
    #[must_use]
    pub const fn in_progress() -> Self {
        Self::IN_PROGRESS
    }

    /// Shorthand for [`Self::SUCCESSFULLY_COMPLETED`].
    #[must_use]
    pub const fn succeeded() -> Self {
        Self::SUCCESSFULLY_COMPLETED
    }

    /// Shorthand for [`Self::FAILED`].
    #[must_use]
    pub const fn failed() -> Self {
        Self::FAILED
    }

    /// Shorthand for [`Self::USER_CANCELLED`].
    #[must_use]
    pub const fn cancelled() -> Self {
        Self::USER_CANCELLED
    }

    /// Create or look up a status by name.
    ///
    /// Well-known names resolve to their constant. Any other name is
    /// registered for the lifetime of the process on first use, so every
    /// later call with the same name (in any case) yields the same token.
    ///
    /// # Errors
    ///
    /// Returns [`PollerError::InvalidArgument`] when the name is blank, or
    /// when it is already known with a different `is_complete` flag.
    pub fn from_name(name: impl Into<String>, is_complete: bool) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PollerError::invalid_argument(
                "operation status name must not be empty",
            ));
        }

        if let Some(known) = Self::lookup_well_known(&name) {
            return known.expect_complete(is_complete);
        }

        let key = name.to_ascii_lowercase();
        if let Some(existing) = REGISTRY.read().get(&key) {
            return existing.clone().expect_complete(is_complete);
        }

        let status = REGISTRY
            .write()
            .entry(key)
            .or_insert_with(|| Self {
                name: Cow::Owned(name),
                complete: is_complete,
            })
            .clone();
        status.expect_complete(is_complete)
    }

    /// Resolve a name reported by a service without registering it.
    ///
    /// Well-known and previously registered names resolve to their token;
    /// anything else becomes a non-terminal custom status.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if let Some(known) = Self::lookup_well_known(name) {
            return known;
        }
        if let Some(registered) = REGISTRY.read().get(&name.to_ascii_lowercase()) {
            return registered.clone();
        }
        Self {
            name: Cow::Owned(name.to_owned()),
            complete: false,
        }
    }

    /// Canonical name of the status.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the status is terminal. No polling happens after a terminal
    /// status has been observed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    fn lookup_well_known(name: &str) -> Option<Self> {
        [
            Self::NOT_STARTED,
            Self::IN_PROGRESS,
            Self::SUCCESSFULLY_COMPLETED,
            Self::FAILED,
            Self::USER_CANCELLED,
        ]
        .into_iter()
        .find(|status| status.name.eq_ignore_ascii_case(name))
    }

    fn expect_complete(self, is_complete: bool) -> Result<Self> {
        if self.complete == is_complete {
            Ok(self)
        } else {
            Err(PollerError::invalid_argument(format!(
                "operation status '{}' is already defined with is_complete = {}",
                self.name, self.complete
            )))
        }
    }
}

impl PartialEq for OperationStatus {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for OperationStatus {}

impl Hash for OperationStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
