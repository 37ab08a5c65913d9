//! Pure input parsing for the wizard steps. No I/O, fully unit-tested.

use {telefwd_common::ChatDescriptor, telefwd_forwarder::ForwardMode};

/// `1` selects original caption mode, `2` custom caption mode.
pub fn parse_mode(input: &str) -> Option<ForwardMode> {
    match input.trim() {
        "1" => Some(ForwardMode::Original),
        "2" => Some(ForwardMode::Custom),
        _ => None,
    }
}

pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChoiceError {
    NotANumber,
    NotInList,
    SameAsSource,
}

impl std::fmt::Display for ChatChoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotANumber => "Invalid ID. It must be a number.",
            Self::NotInList => "ID not found in your accessible chats. Please copy it exactly.",
            Self::SameAsSource => "Destination chat cannot be the same as the source chat.",
        };
        f.write_str(text)
    }
}

/// Resolve a typed chat id against the fetched chat list. `exclude` rejects
/// picking the source chat again as the destination.
pub fn choose_chat<'a>(
    chats: &'a [ChatDescriptor],
    input: &str,
    exclude: Option<i64>,
) -> Result<&'a ChatDescriptor, ChatChoiceError> {
    let id: i64 = input
        .trim()
        .parse()
        .map_err(|_| ChatChoiceError::NotANumber)?;
    if exclude == Some(id) {
        return Err(ChatChoiceError::SameAsSource);
    }
    chats
        .iter()
        .find(|c| c.id == id)
        .ok_or(ChatChoiceError::NotInList)
}
