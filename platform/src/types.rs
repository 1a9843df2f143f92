//! Platform-neutral event and UI types.

use antibot_types::{JoinEvent, VerifyAction};

/// Callback payload carried by the verify button.
pub const VERIFY_ACTION: &str = "verification";

/// A single inline button attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    /// Opaque payload the platform hands back when the button is pressed.
    pub action: String,
}

impl InlineButton {
    /// The "Verify" button attached to welcome prompts.
    pub fn verify() -> Self {
        Self {
            text: "Verify".to_string(),
            action: VERIFY_ACTION.to_string(),
        }
    }
}

/// Inbound events relevant to the gatekeeper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformEvent {
    MembersJoined(JoinEvent),
    VerifyPressed(VerifyAction),
}
