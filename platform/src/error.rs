use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    RequestFailed(String),

    #[error("platform unreachable: {0}")]
    Unreachable(String),

    #[error("platform rejected {method} ({code}): {description}")]
    Api {
        method: String,
        code: i64,
        description: String,
    },

    #[error("invalid response from platform: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// The platform understood the request and refused it (HTTP 400), e.g.
    /// unparsable message entities. Retrying the same request will not help.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Api { code: 400, .. })
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        // The request URL embeds the bot token; never let it reach the logs.
        let e = e.without_url();
        if e.is_timeout() {
            Self::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Unreachable(format!("connection failed: {e}"))
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}
