//! The content identifier type used by pinion.
//!
//! Identifiers are kept in the canonical text form the storage daemon's
//! control plane speaks (e.g. `Qm…` or `bafy…`). Pinion never inspects
//! their internal structure; it only requires them to be non-empty,
//! whitespace-free tokens so they can be used as registry keys and URL
//! query arguments.

use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// An opaque content address in text form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize)]
#[cbor(transparent)]
#[serde(transparent)]
pub struct ContentId(#[n(0)] String);

impl ContentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentId").field(&self.0).finish()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentId {
    type Err = InvalidContentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(InvalidContentId(s.to_owned()));
        }
        Ok(ContentId(s.to_owned()))
    }
}

/// The string was empty or contained characters that can never appear in a
/// content address.
#[derive(Debug, thiserror::Error)]
#[error("invalid content identifier: {0:?}")]
pub struct InvalidContentId(String);
