use reqwest::StatusCode;

/// Convenience result type used across the compositor.
pub type OutfitResult<T> = Result<T, OutfitError>;

/// Top-level error taxonomy used by resolution, rendering and request handling.
#[derive(thiserror::Error, Debug)]
pub enum OutfitError {
    /// Invalid client input (URL shape, size, missing parameter) or malformed appearance data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced outfit or appearance does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure or non-success status while fetching a layer asset.
    #[error("fetch error for '{url}': {message}")]
    Fetch {
        /// URL that was being fetched.
        url: String,
        /// Human-readable cause.
        message: String,
    },

    /// Asset bytes could not be decoded into pixels.
    #[error("decode error: {0}")]
    Decode(String),

    /// A render attempt failed or timed out.
    #[error("render error: {0}")]
    Render(String),

    /// Every layer of a composite failed to resolve.
    #[error("all layers failed to resolve: {}", urls.join(", "))]
    AllLayersFailed {
        /// Every URL that was attempted, in draw order.
        urls: Vec<String>,
    },

    /// The bounded worker pool had no capacity before the acquire timeout.
    #[error("server busy: {0}")]
    Busy(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OutfitError {
    /// Build a [`OutfitError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`OutfitError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`OutfitError::Fetch`] value.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Build a [`OutfitError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`OutfitError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`OutfitError::Busy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// HTTP status this error maps to at the request boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Fetch { .. }
            | Self::Decode(_)
            | Self::Render(_)
            | Self::AllLayersFailed { .. }
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Copy this error for another waiter on the same in-flight render.
    ///
    /// `Other` keeps its rendered message chain but loses the original source value.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Fetch { url, message } => Self::Fetch {
                url: url.clone(),
                message: message.clone(),
            },
            Self::Decode(m) => Self::Decode(m.clone()),
            Self::Render(m) => Self::Render(m.clone()),
            Self::AllLayersFailed { urls } => Self::AllLayersFailed { urls: urls.clone() },
            Self::Busy(m) => Self::Busy(m.clone()),
            Self::Other(e) => Self::Other(anyhow::anyhow!("{e:#}")),
        }
    }

    /// Whether a client may reasonably retry the same request shortly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
