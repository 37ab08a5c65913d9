use {std::path::PathBuf, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    /// An operation that needs an authenticated session was called without one.
    /// Front-ends route this back to the login step.
    #[error("not connected to Telegram — log in first")]
    NotConnected,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chat id is not among the account's dialogs.
    #[error("chat {0} is not in this account's chat list")]
    UnknownChat(i64),

    /// Stored configuration that cannot be parsed is fatal; the user has to
    /// fix or delete the file.
    #[error("configuration file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A failure inside the messaging provider's client library.
    #[error("{context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn provider(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means the session is missing or unauthenticated.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_keeps_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = Error::provider("forward message 42", io);
        assert_eq!(err.to_string(), "forward message 42: timed out");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_connected_is_typed() {
        assert!(Error::NotConnected.is_not_connected());
        assert!(!Error::message("boom").is_not_connected());
    }
}
