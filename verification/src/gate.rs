//! The verification state machine.

use std::sync::Arc;

use antibot_platform::{ChatPlatform, PlatformError};
use antibot_registry::{PendingUser, Registry, RegistryError};
use antibot_store::{RegistryStore, StoreError};
use antibot_types::{
    ChatId, Clock, JoinEvent, JoiningUser, MessageId, Timestamp, VerifyAction,
};
use tracing::{debug, error, info, warn};

use crate::{
    EventBus, ExpireOutcome, ExpiryScheduler, ExpiryTick, GateConfig, GateError, GateEvent,
    JoinDecline, JoinOutcome, Notifier, SkipReason, VerifyOutcome,
};

/// Owns the registry and applies join, verify and expire transitions to it.
///
/// Every mutation is flushed to the store before the transition returns. A
/// failed flush does not roll back memory: the transition completes its
/// platform effects, emits [`GateEvent::PersistenceFailed`] and reports
/// [`GateError::Persistence`]; the next successful flush catches disk up.
///
/// The gatekeeper is not shared. Callers serialize transitions through
/// [`crate::TransitionProcessor`].
pub struct Gatekeeper {
    registry: Registry,
    config: GateConfig,
    store: Arc<dyn RegistryStore>,
    platform: Arc<dyn ChatPlatform>,
    notifier: Notifier,
    scheduler: Arc<dyn ExpiryScheduler>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl Gatekeeper {
    /// Load the persisted registry and build a gatekeeper around it.
    ///
    /// A registry that exists but cannot be decoded is fatal: starting empty
    /// would forget every pending challenge and overwrite the document.
    pub fn open(
        config: GateConfig,
        store: Arc<dyn RegistryStore>,
        platform: Arc<dyn ChatPlatform>,
        scheduler: Arc<dyn ExpiryScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GateError> {
        let registry = store.load()?;
        info!(
            chats = registry.chat_count(),
            pending = registry.pending_count(),
            "registry loaded"
        );
        let notifier = Notifier::new(platform.clone(), config.expiry_window, config.removal);
        Ok(Self {
            registry,
            config,
            store,
            platform,
            notifier,
            scheduler,
            clock,
            events: EventBus::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GateEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Arm an expiry timer for every pending user loaded from disk, for the
    /// remainder of their window. Overdue users expire immediately.
    /// Returns the number of timers armed.
    pub fn restore(&mut self) -> usize {
        let now = self.clock.now();
        let mut armed = 0;
        for (chat, pending) in self.registry.pending_users_mut() {
            let tick = ExpiryTick {
                chat,
                user: pending.id,
                deadline: pending.deadline,
            };
            let remaining = pending.deadline.remaining_from(now);
            pending.arm(self.scheduler.arm(tick, remaining));
            debug!(%chat, user = %pending.id, remaining_secs = remaining.as_secs(), "expiry re-armed");
            armed += 1;
        }
        if armed > 0 {
            info!(armed, "restored pending verifications");
        }
        armed
    }

    /// Handle users joining a chat.
    pub async fn on_join(&mut self, event: JoinEvent) -> Result<JoinOutcome, GateError> {
        let chat = event.chat;
        if !self.config.manages(chat) {
            debug!(%chat, "join in unmanaged chat ignored");
            return Ok(self.decline(chat, JoinDecline::ChatNotManaged));
        }

        match self.platform.member_status(chat, self.platform.bot_id()).await {
            Ok(status) if status.is_elevated() => {}
            Ok(status) => {
                warn!(%chat, status = status.as_str(), "bot is not an administrator, join ignored");
                return Ok(self.decline(chat, JoinDecline::BotNotAdmin));
            }
            Err(e) => {
                self.platform_failed("getChatMember", &e);
                return Ok(self.decline(chat, JoinDecline::BotStatusUnknown));
            }
        }

        let mut failure = None;
        let registered = self.registry.find_chat(chat).is_none();
        if registered {
            self.registry.add_chat(chat, MessageId::ZERO)?;
            info!(%chat, "chat registered");
            self.events.emit(&GateEvent::ChatRegistered { chat });
        }

        let record = self
            .registry
            .find_chat(chat)
            .ok_or(RegistryError::ChatNotFound(chat))?;
        if record.has_processed(event.message_id) {
            let watermark = record.latest_message_id();
            debug!(%chat, message = %event.message_id, %watermark, "join event already processed");
            if registered {
                self.flush(&mut failure).await;
            }
            let outcome = self.decline(chat, JoinDecline::Replay { watermark });
            return settle(outcome, failure);
        }

        let deadline = self.clock.now().after(self.config.expiry_window);
        let mut admitted = Vec::new();
        let mut skipped = Vec::new();
        for user in event.users {
            if let Some(reason) = self.screen(chat, &user).await {
                debug!(%chat, user = %user.id, ?reason, "joining user not challenged");
                self.events.emit(&GateEvent::UserSkipped {
                    chat,
                    user: user.id,
                    reason: reason.clone(),
                });
                skipped.push((user.id, reason));
                continue;
            }
            let id = user.id;
            self.admit(chat, user, deadline, &mut failure).await?;
            admitted.push(id);
        }

        if let Some(record) = self.registry.find_chat_mut(chat) {
            record.advance_watermark(event.message_id);
        }
        self.flush(&mut failure).await;

        settle(JoinOutcome::Processed { admitted, skipped }, failure)
    }

    /// Handle a press of the verify button.
    ///
    /// Only the pending user the challenge belongs to can resolve it; anyone
    /// else gets an alert and nothing changes.
    pub async fn on_verify(&mut self, action: VerifyAction) -> Result<VerifyOutcome, GateError> {
        let chat = action.chat;
        let user = action.from;
        let claimed = match self.registry.find_chat_mut(chat) {
            Some(record)
                if record
                    .find_user(user)
                    .is_some_and(|pending| pending.identifier().matches(user)) =>
            {
                record.remove_user(user)
            }
            _ => None,
        };

        let Some(pending) = claimed else {
            debug!(%chat, %user, "verify pressed without a matching challenge");
            self.events.emit(&GateEvent::VerifyRejected { chat, user });
            if let Err(e) = self.notifier.reject_press(&action.action_id).await {
                self.platform_failed("answerCallbackQuery", &e);
            }
            return Ok(VerifyOutcome::Rejected);
        };

        let mut failure = None;
        self.flush(&mut failure).await;
        info!(%chat, %user, "user verified");
        self.events.emit(&GateEvent::UserVerified { chat, user });

        if let Err(e) = self.notifier.acknowledge_press(&action.action_id).await {
            self.platform_failed("answerCallbackQuery", &e);
        }
        self.clear_prompt(chat, &pending).await;
        if let Err(e) = self
            .notifier
            .announce_verified(chat, user, pending.display_name.as_deref())
            .await
        {
            self.platform_failed("sendMessage", &e);
        }

        settle(VerifyOutcome::Verified, failure)
    }

    /// Handle a verification window closing.
    ///
    /// The challenge is claimed (removed and flushed) before any platform
    /// call, so a verify press queued behind this tick finds nothing to
    /// resolve and vice versa.
    pub async fn on_expire(&mut self, tick: ExpiryTick) -> Result<ExpireOutcome, GateError> {
        let ExpiryTick { chat, user, .. } = tick;
        let claimed = match self.registry.find_chat_mut(chat) {
            Some(record)
                if record
                    .find_user(user)
                    .is_some_and(|pending| pending.deadline == tick.deadline) =>
            {
                record.remove_user(user)
            }
            _ => None,
        };
        let Some(pending) = claimed else {
            debug!(%chat, %user, "stale expiry ignored");
            return Ok(ExpireOutcome::Stale);
        };

        let mut failure = None;
        self.flush(&mut failure).await;
        self.clear_prompt(chat, &pending).await;

        let outcome = match self.platform.member_status(chat, user).await {
            Ok(status) if !status.is_removable() => {
                info!(%chat, %user, status = status.as_str(), "unverified user no longer removable");
                ExpireOutcome::Spared(status)
            }
            status => {
                if let Err(e) = status {
                    // Status unknown: attempt the removal anyway.
                    self.platform_failed("getChatMember", &e);
                }
                match self.notifier.remove_member(chat, user).await {
                    Ok(()) => {
                        info!(%chat, %user, mode = self.config.removal.verb(), "unverified user removed");
                        if let Err(e) = self
                            .notifier
                            .announce_not_verified(chat, user, pending.display_name.as_deref())
                            .await
                        {
                            self.platform_failed("sendMessage", &e);
                        }
                        ExpireOutcome::Removed
                    }
                    Err(e) => {
                        self.platform_failed("banChatMember", &e);
                        ExpireOutcome::RemovalFailed
                    }
                }
            }
        };

        self.events.emit(&GateEvent::ChallengeExpired {
            chat,
            user,
            outcome: outcome.clone(),
        });
        settle(outcome, failure)
    }

    /// Cancel every live timer and write the registry one last time.
    pub async fn close(&mut self) -> Result<(), GateError> {
        self.registry.cancel_all_timers();
        self.store.save(&self.registry).await?;
        info!(
            chats = self.registry.chat_count(),
            pending = self.registry.pending_count(),
            "registry saved on shutdown"
        );
        Ok(())
    }

    async fn screen(&self, chat: ChatId, user: &JoiningUser) -> Option<SkipReason> {
        if user.is_bot {
            return Some(SkipReason::Bot);
        }
        let already_pending = self
            .registry
            .find_chat(chat)
            .is_some_and(|record| record.find_user(user.id).is_some());
        if already_pending {
            return Some(SkipReason::AlreadyPending);
        }
        match self.platform.member_status(chat, user.id).await {
            Ok(status) if status.is_elevated() => Some(SkipReason::Elevated),
            Ok(status) if !status.is_ordinary_member() => Some(SkipReason::NotMember(status)),
            Ok(_) => None,
            Err(e) => {
                self.platform_failed("getChatMember", &e);
                Some(SkipReason::StatusUnknown)
            }
        }
    }

    /// Register `user` and send the welcome prompt. The entry is flushed
    /// before the prompt goes out; the prompt id rides on the caller's
    /// closing flush.
    async fn admit(
        &mut self,
        chat: ChatId,
        user: JoiningUser,
        deadline: Timestamp,
        failure: &mut Option<StoreError>,
    ) -> Result<(), GateError> {
        let tick = ExpiryTick {
            chat,
            user: user.id,
            deadline,
        };
        let record = self
            .registry
            .find_chat_mut(chat)
            .ok_or(RegistryError::ChatNotFound(chat))?;
        let pending = record.add_user(PendingUser::new(user.id, user.display_name.clone(), deadline))?;
        pending.arm(self.scheduler.arm(tick, self.config.expiry_window));
        info!(%chat, user = %user.id, %deadline, "user admitted for verification");
        self.events.emit(&GateEvent::UserAdmitted { chat, user: user.id });
        self.flush(failure).await;

        match self
            .notifier
            .send_welcome(chat, user.id, user.display_name.as_deref())
            .await
        {
            Ok(prompt) => {
                if let Some(pending) = self
                    .registry
                    .find_chat_mut(chat)
                    .and_then(|record| record.find_user_mut(user.id))
                {
                    pending.prompt_message_id = Some(prompt);
                }
            }
            Err(e) => self.platform_failed("sendMessage", &e),
        }
        Ok(())
    }

    async fn clear_prompt(&self, chat: ChatId, pending: &PendingUser) {
        if let Some(prompt) = pending.prompt_message_id {
            if let Err(e) = self.notifier.delete_prompt(chat, prompt).await {
                self.platform_failed("deleteMessage", &e);
            }
        }
    }

    fn decline(&self, chat: ChatId, reason: JoinDecline) -> JoinOutcome {
        self.events.emit(&GateEvent::JoinDeclined {
            chat,
            reason: reason.clone(),
        });
        JoinOutcome::Declined(reason)
    }

    fn platform_failed(&self, call: &'static str, e: &PlatformError) {
        warn!(call, error = %e, "platform call failed");
        self.events.emit(&GateEvent::PlatformCallFailed { call });
    }

    /// Save the registry, remembering the first failure in `failure`.
    async fn flush(&self, failure: &mut Option<StoreError>) {
        if let Err(e) = self.store.save(&self.registry).await {
            error!(error = %e, "failed to persist registry");
            self.events.emit(&GateEvent::PersistenceFailed);
            if failure.is_none() {
                *failure = Some(e);
            }
        }
    }
}

fn settle<T>(outcome: T, failure: Option<StoreError>) -> Result<T, GateError> {
    match failure {
        Some(e) => Err(GateError::Persistence(e)),
        None => Ok(outcome),
    }
}
