//! Verification identifier codec.
//!
//! The identifier is the standard, padded base64 encoding of the user id's
//! decimal form. It is not a secret: anyone who knows the public id can derive
//! it. What it binds is the *clicking* user's own id to the pending entry that
//! was registered at join time, so a verify action is only accepted when the
//! identifier stored on the entry equals a fresh derivation from the id the
//! platform reports for the click.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UserId;

/// Opaque token derived from a platform user id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Derive the identifier for `user`. Pure and deterministic.
    pub fn derive(user: UserId) -> Self {
        Self(STANDARD.encode(user.as_i64().to_string()))
    }

    /// Whether this identifier was derived from `user`.
    pub fn matches(&self, user: UserId) -> bool {
        *self == Self::derive(user)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
