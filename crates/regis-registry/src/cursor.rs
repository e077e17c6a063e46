//! Translation of opaque resource version tokens into store watch cursors.

use crate::error::{RegistryError, RegistryResult};

/// Position in the store's change history a watch starts from.
///
/// A resume token names the last version the caller has already seen, while
/// the store delivers changes *at or after* its cursor, so a token `N`
/// becomes the cursor `N + 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchCursor(u64);

impl WatchCursor {
    /// Start from the current state, with no history.
    pub const NOW: Self = Self(0);

    /// Parse a resource version token for a watch on `kind`.
    ///
    /// `""` and `"0"` mean "from now". Anything else must be a base-10
    /// unsigned 64-bit integer.
    pub fn parse(token: &str, kind: &'static str) -> RegistryResult<Self> {
        if token.is_empty() || token == "0" {
            return Ok(Self::NOW);
        }
        let invalid = |reason: String| RegistryError::InvalidResourceVersion {
            kind,
            version: token.to_string(),
            reason,
        };
        // `u64::from_str` also accepts a leading '+'.
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a non-negative decimal integer".to_string()));
        }
        let seen: u64 = token.parse().map_err(|e| invalid(format!("{e}")))?;
        Ok(Self(seen.saturating_add(1)))
    }

    /// The store-native `since` value.
    pub fn since(self) -> u64 {
        self.0
    }

    pub fn is_now(self) -> bool {
        self.0 == 0
    }
}

/// Parse `token` into the store `since` value for a watch on `kind`.
pub fn parse_watch_resource_version(token: &str, kind: &'static str) -> RegistryResult<u64> {
    WatchCursor::parse(token, kind).map(WatchCursor::since)
}
