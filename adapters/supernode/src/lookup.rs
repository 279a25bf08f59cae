//! Interpretation of the supernode's pin-list responses.
//!
//! The pin-check endpoint answers in several shapes depending on version
//! and proxy configuration. Rather than guessing, every response is first
//! classified into one of the named cases below, and each case resolves to
//! a boolean by a fixed rule. The policy is deliberately conservative:
//! anything that does not positively confirm presence counts as "not
//! pinned". A false negative merely repeats an idempotent migration; a
//! false positive would strand unreplicated content.

use pinion_core::ContentId;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Marker in plain-text responses that negates presence.
const NOT_PINNED_MARKER: &str = "not pinned";

/// Classified shape of a pin-list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinLookup {
    /// Success with a keyed result set; the identifier exists iff it is one
    /// of the keys.
    Listed(BTreeSet<String>),
    /// Any non-success status code. Does not exist, regardless of the body
    /// (including permission errors).
    Refused(u16),
    /// Success, but the JSON carried an error or status message instead of
    /// a keyed result (or some other keyless shape). Does not exist.
    ErrorBody(String),
    /// Success with a non-JSON body. Exists unless the text contains the
    /// negative-result marker.
    Text(String),
}

impl PinLookup {
    pub fn classify(status: u16, body: &str) -> Self {
        if !(200..300).contains(&status) {
            return PinLookup::Refused(status);
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return PinLookup::Text(body.to_owned());
        };
        match serde_json::from_value::<LookupBody>(value) {
            Ok(LookupBody { keys: Some(keys), .. }) => {
                PinLookup::Listed(keys.into_iter().map(|(key, _)| key).collect())
            }
            Ok(LookupBody { message, error, .. }) => {
                PinLookup::ErrorBody(message.or(error).unwrap_or_else(|| body.to_owned()))
            }
            // Valid JSON of some other shape (array, scalar): keyless, so
            // presence is unconfirmed.
            Err(_) => PinLookup::ErrorBody(body.to_owned()),
        }
    }

    pub fn is_pinned(&self, id: &ContentId) -> bool {
        match self {
            PinLookup::Listed(keys) => keys.contains(id.as_str()),
            PinLookup::Refused(_) => false,
            PinLookup::ErrorBody(_) => false,
            PinLookup::Text(body) => !body.contains(NOT_PINNED_MARKER),
        }
    }
}

#[derive(Deserialize)]
struct LookupBody {
    #[serde(rename = "Keys")]
    keys: Option<std::collections::BTreeMap<String, serde_json::Value>>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}
