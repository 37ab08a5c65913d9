//! Domain types shared by the client, forwarder, and front-ends.
//!
//! No provider library types here — the gateway adapter maps into these.

use serde::{Deserialize, Serialize};

/// Classification of a chat as shown in the chat picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// Broadcast channel.
    Channel,
    /// Group chat (including supergroups).
    Group,
    /// One-on-one chat with a user.
    Direct,
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Channel => "Channel",
            Self::Group => "Group",
            Self::Direct => "User",
        };
        f.write_str(label)
    }
}

/// A chat visible to the authenticated account. Snapshot per session; only
/// the selected source/destination id and name are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDescriptor {
    pub id: i64,
    pub display_name: String,
    pub kind: ChatKind,
}

/// The minimal view of a provider message the forwarding engine needs:
/// its id and whether it carries media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub id: i32,
    pub has_media: bool,
}

impl MessageRef {
    #[must_use]
    pub fn text(id: i32) -> Self {
        Self {
            id,
            has_media: false,
        }
    }

    #[must_use]
    pub fn media(id: i32) -> Self {
        Self {
            id,
            has_media: true,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ChatKind::Channel).unwrap();
        assert_eq!(json, "\"channel\"");
        let back: ChatKind = serde_json::from_str("\"direct\"").unwrap();
        assert_eq!(back, ChatKind::Direct);
    }

    #[test]
    fn chat_kind_display_matches_picker_labels() {
        assert_eq!(ChatKind::Direct.to_string(), "User");
        assert_eq!(ChatKind::Group.to_string(), "Group");
    }

    #[test]
    fn descriptor_roundtrip() {
        let chat = ChatDescriptor {
            id: -1001234,
            display_name: "Study Notes".into(),
            kind: ChatKind::Channel,
        };
        let json = serde_json::to_string(&chat).unwrap();
        let back: ChatDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, chat.id);
        assert_eq!(back.kind, ChatKind::Channel);
    }
}
