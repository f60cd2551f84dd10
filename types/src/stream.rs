//! Stream keys naming independent ordering domains.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an ordering domain.
///
/// Work launched under the same key is serialized; different keys never wait on
/// each other. Launches that name no stream share a separate domain that no key
/// can address, so every string is a usable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StreamKey(Cow<'static, str>);

impl StreamKey {
    /// Key for a stream named by a string literal; no allocation.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StreamKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for StreamKey {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<StreamKey> for String {
    fn from(value: StreamKey) -> Self {
        value.0.into_owned()
    }
}

impl AsRef<str> for StreamKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
