//! Long-polling update source.

use tracing::{debug, warn};

use super::wire::{into_event, GetUpdates, Update};
use super::TelegramClient;
use crate::{PlatformError, PlatformEvent};

/// Update kinds requested from `getUpdates`.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Pulls updates with `getUpdates` and tracks the confirmation offset.
///
/// Each successful [`poll`](Self::poll) moves the offset past the returned
/// updates; the server only forgets them once a later request carries that
/// offset, which [`acknowledge`](Self::acknowledge) does on shutdown.
pub struct UpdatePoller {
    client: TelegramClient,
    offset: i64,
}

impl UpdatePoller {
    pub fn new(client: TelegramClient) -> Self {
        Self { client, offset: 0 }
    }

    /// Offset the next request will confirm.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Wait up to the configured long-poll timeout for new updates.
    pub async fn poll(&mut self) -> Result<Vec<PlatformEvent>, PlatformError> {
        let updates: Vec<Update> = self
            .client
            .call(
                "getUpdates",
                &GetUpdates {
                    offset: self.offset,
                    timeout: self.client.poll_timeout().as_secs(),
                    limit: None,
                    allowed_updates: ALLOWED_UPDATES,
                },
            )
            .await?;
        Ok(self.absorb(updates))
    }

    /// Confirm every update handed out so far without waiting for new ones.
    pub async fn acknowledge(&self) -> Result<(), PlatformError> {
        if self.offset == 0 {
            return Ok(());
        }
        let _: Vec<Update> = self
            .client
            .call(
                "getUpdates",
                &GetUpdates {
                    offset: self.offset,
                    timeout: 0,
                    limit: Some(1),
                    allowed_updates: ALLOWED_UPDATES,
                },
            )
            .await?;
        debug!(offset = self.offset, "update offset acknowledged");
        Ok(())
    }

    fn absorb(&mut self, updates: Vec<Update>) -> Vec<PlatformEvent> {
        let mut events = Vec::new();
        for update in updates {
            if update.update_id < self.offset {
                warn!(update_id = update.update_id, "skipping already-confirmed update");
                continue;
            }
            self.offset = update.update_id + 1;
            if let Some(event) = into_event(update) {
                events.push(event);
            }
        }
        events
    }
}
