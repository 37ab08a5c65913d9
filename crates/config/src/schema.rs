use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    telefwd_common::{Error, Result},
};

/// Environment variables consulted for API credentials before any
/// interactive prompt.
pub const ENV_API_ID: &str = "TELEGRAM_API_ID";
pub const ENV_API_HASH: &str = "TELEGRAM_API_HASH";

/// The flat configuration record persisted as JSON.
///
/// `counter` and the chat selection are rewritten after every mutation that
/// must survive a restart; everything else changes only on user edits.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Prefix for generated captions in custom caption mode.
    pub caption_prefix: String,

    /// Running caption counter. Invariant: >= 1.
    pub counter: u64,

    /// Selected source chat, if any.
    pub source_chat_id: Option<i64>,

    /// Selected destination chat, if any. Never equal to the source once
    /// both are set.
    pub destination_chat_id: Option<i64>,

    /// Display name of the source chat at selection time.
    pub source_name: String,

    /// Display name of the destination chat at selection time.
    pub destination_name: String,

    /// API identifier from my.telegram.org.
    pub api_id: Option<i32>,

    /// API secret from my.telegram.org.
    #[serde(serialize_with = "serialize_secret_opt")]
    pub api_hash: Option<Secret<String>>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            caption_prefix: "Caption".into(),
            counter: 1,
            source_chat_id: None,
            destination_chat_id: None,
            source_name: "Not Set".into(),
            destination_name: "Not Set".into(),
            api_id: None,
            api_hash: None,
        }
    }
}

impl std::fmt::Debug for ForwarderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwarderConfig")
            .field("caption_prefix", &self.caption_prefix)
            .field("counter", &self.counter)
            .field("source_chat_id", &self.source_chat_id)
            .field("destination_chat_id", &self.destination_chat_id)
            .field("api_id", &self.api_id)
            .field("api_hash", &self.api_hash.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ForwarderConfig {
    /// The caption the next media message gets in custom caption mode:
    /// `"<prefix> <counter>"`.
    #[must_use]
    pub fn next_caption(&self) -> String {
        format!("{} {}", self.caption_prefix, self.counter)
    }

    /// Stored API credentials, if both halves are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(i32, String)> {
        let id = self.api_id?;
        let hash = self.api_hash.as_ref()?;
        Some((id, hash.expose_secret().clone()))
    }

    /// Validate invariants after loading from disk.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.counter == 0 {
            return Err(Error::InvalidConfig("counter must be >= 1".into()));
        }
        if let (Some(src), Some(dst)) = (self.source_chat_id, self.destination_chat_id)
            && src == dst
        {
            return Err(Error::InvalidConfig(
                "source and destination chat must differ".into(),
            ));
        }
        Ok(())
    }
}

/// API credentials from the environment, consulted before prompting.
///
/// A set but non-numeric `TELEGRAM_API_ID` is a fatal setup error, matching
/// the interactive path.
pub fn env_credentials() -> Result<Option<(i32, String)>> {
    let (Ok(id), Ok(hash)) = (std::env::var(ENV_API_ID), std::env::var(ENV_API_HASH)) else {
        return Ok(None);
    };
    let id: i32 = id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{ENV_API_ID} must be an integer")))?;
    Ok(Some((id, hash)))
}

fn serialize_secret_opt<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record() {
        let cfg = ForwarderConfig::default();
        assert_eq!(cfg.caption_prefix, "Caption");
        assert_eq!(cfg.counter, 1);
        assert_eq!(cfg.source_name, "Not Set");
        assert!(cfg.source_chat_id.is_none());
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn next_caption_joins_prefix_and_counter() {
        let cfg = ForwarderConfig {
            caption_prefix: "Lesson".into(),
            counter: 5,
            ..Default::default()
        };
        assert_eq!(cfg.next_caption(), "Lesson 5");
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{
            "caption_prefix": "Lecture",
            "counter": 12,
            "source_chat_id": -100123,
            "source_name": "Maths",
            "api_id": 54321,
            "api_hash": "abcdef"
        }"#;
        let cfg: ForwarderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.caption_prefix, "Lecture");
        assert_eq!(cfg.counter, 12);
        assert_eq!(cfg.source_chat_id, Some(-100123));
        // defaults for unspecified fields
        assert!(cfg.destination_chat_id.is_none());
        assert_eq!(cfg.destination_name, "Not Set");
        assert_eq!(cfg.credentials(), Some((54321, "abcdef".into())));
    }

    #[test]
    fn serialize_roundtrip_keeps_secret() {
        let cfg = ForwarderConfig {
            api_id: Some(7),
            api_hash: Some(Secret::new("hash".into())),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ForwarderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.credentials(), Some((7, "hash".into())));
    }

    #[test]
    fn debug_redacts_api_hash() {
        let cfg = ForwarderConfig {
            api_hash: Some(Secret::new("topsecret".into())),
            ..Default::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn zero_counter_is_invalid() {
        let cfg = ForwarderConfig {
            counter: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn same_source_and_destination_is_invalid() {
        let cfg = ForwarderConfig {
            source_chat_id: Some(42),
            destination_chat_id: Some(42),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
