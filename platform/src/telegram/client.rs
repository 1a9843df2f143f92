//! HTTP client for the Telegram Bot API.

use std::time::Duration;

use antibot_types::{ChatId, MemberStatus, MessageId, UserId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::wire::{
    AnswerCallbackQuery, ApiResponse, BanChatMember, ChatMember, DeleteMessage, GetChatMember,
    InlineKeyboardMarkup, SendMessage, SentMessage, UnbanChatMember, User,
};
use crate::{ChatPlatform, InlineButton, PlatformError};

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack added on top of the long-poll timeout for the HTTP request timeout.
const POLL_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// How long the platform may cache a rejected-press alert for the same user.
const ALERT_CACHE_SECS: u32 = 1800;

/// Connection settings for [`TelegramClient`].
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    /// Base URL of the Bot API, without trailing `/bot<token>`.
    pub api_url: String,
    pub token: String,
    /// Server-side long-poll timeout for `getUpdates`.
    pub poll_timeout: Duration,
}

/// Bot API client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`. Contains the token; never log it.
    base_url: String,
    poll_timeout: Duration,
    bot_id: UserId,
}

impl TelegramClient {
    /// Build the client and resolve the bot's own identity with `getMe`.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.poll_timeout + POLL_TIMEOUT_SLACK)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(PlatformError::from_reqwest)?;
        let base_url = format!(
            "{}/bot{}",
            config.api_url.trim_end_matches('/'),
            config.token
        );

        let mut client = Self {
            http,
            base_url,
            poll_timeout: config.poll_timeout,
            bot_id: UserId::new(0),
        };
        let me: User = client.call("getMe", &serde_json::json!({})).await?;
        client.bot_id = UserId::new(me.id);
        debug!(bot_id = me.id, "connected to Bot API");
        Ok(client)
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// A client pointed at `base_url` without the `getMe` round trip.
    #[cfg(test)]
    pub(crate) fn unconnected(base_url: &str, poll_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            poll_timeout,
            bot_id: UserId::new(1),
        }
    }

    /// POST `params` as JSON to `method` and unwrap the `ok`/`result` envelope.
    pub(crate) async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, PlatformError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(PlatformError::from_reqwest)?;

        let status = response.status();
        let envelope: ApiResponse<R> = response.json().await.map_err(|e| {
            if status.is_success() {
                PlatformError::InvalidResponse(format!(
                    "failed to parse {method} response: {}",
                    e.without_url()
                ))
            } else {
                PlatformError::RequestFailed(format!("{method} returned HTTP {status}"))
            }
        })?;

        if !envelope.ok {
            return Err(PlatformError::Api {
                method: method.to_string(),
                code: envelope
                    .error_code
                    .unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope.result.ok_or_else(|| {
            PlatformError::InvalidResponse(format!("{method} response has no result"))
        })
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn member_status(
        &self,
        chat: ChatId,
        user: UserId,
    ) -> Result<MemberStatus, PlatformError> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                &GetChatMember {
                    chat_id: chat.as_i64(),
                    user_id: user.as_i64(),
                },
            )
            .await?;
        Ok(member.status)
    }

    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        button: Option<&InlineButton>,
    ) -> Result<MessageId, PlatformError> {
        let sent: SentMessage = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id: chat.as_i64(),
                    text,
                    parse_mode: "MarkdownV2",
                    reply_markup: button.map(InlineKeyboardMarkup::single),
                },
            )
            .await?;
        Ok(MessageId::new(sent.message_id))
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &DeleteMessage {
                    chat_id: chat.as_i64(),
                    message_id: message.as_i64(),
                },
            )
            .await?;
        Ok(())
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "banChatMember",
                &BanChatMember {
                    chat_id: chat.as_i64(),
                    user_id: user.as_i64(),
                },
            )
            .await?;
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "unbanChatMember",
                &UnbanChatMember {
                    chat_id: chat.as_i64(),
                    user_id: user.as_i64(),
                    only_if_banned: true,
                },
            )
            .await?;
        Ok(())
    }

    async fn answer_action(
        &self,
        action_id: &str,
        alert: Option<&str>,
    ) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery {
                    callback_query_id: action_id,
                    text: alert,
                    show_alert: alert.is_some(),
                    cache_time: alert.map(|_| ALERT_CACHE_SECS),
                },
            )
            .await?;
        Ok(())
    }
}
