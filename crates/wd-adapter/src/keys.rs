//! Key resolution and key-action sequences.
//!
//! Named keys resolve to the W3C private-use codepoints the wire protocol
//! expects; anything outside the closed enumeration is dispatched as a
//! literal character.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed enumeration of named platform keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Key {
    Null,
    Cancel,
    Help,
    Backspace,
    Tab,
    Clear,
    Return,
    Enter,
    Shift,
    Control,
    Alt,
    Pause,
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Insert,
    Delete,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    /// Meta / Command. Dispatched as the platform "command" modifier.
    Meta,
}

impl Key {
    /// W3C keyboard codepoint for this key.
    pub fn code(&self) -> char {
        match self {
            Key::Null => '\u{e000}',
            Key::Cancel => '\u{e001}',
            Key::Help => '\u{e002}',
            Key::Backspace => '\u{e003}',
            Key::Tab => '\u{e004}',
            Key::Clear => '\u{e005}',
            Key::Return => '\u{e006}',
            Key::Enter => '\u{e007}',
            Key::Shift => '\u{e008}',
            Key::Control => '\u{e009}',
            Key::Alt => '\u{e00a}',
            Key::Pause => '\u{e00b}',
            Key::Escape => '\u{e00c}',
            Key::Space => '\u{e00d}',
            Key::PageUp => '\u{e00e}',
            Key::PageDown => '\u{e00f}',
            Key::End => '\u{e010}',
            Key::Home => '\u{e011}',
            Key::ArrowLeft => '\u{e012}',
            Key::ArrowUp => '\u{e013}',
            Key::ArrowRight => '\u{e014}',
            Key::ArrowDown => '\u{e015}',
            Key::Insert => '\u{e016}',
            Key::Delete => '\u{e017}',
            Key::F1 => '\u{e031}',
            Key::F2 => '\u{e032}',
            Key::F3 => '\u{e033}',
            Key::F4 => '\u{e034}',
            Key::F5 => '\u{e035}',
            Key::F6 => '\u{e036}',
            Key::F7 => '\u{e037}',
            Key::F8 => '\u{e038}',
            Key::F9 => '\u{e039}',
            Key::F10 => '\u{e03a}',
            Key::F11 => '\u{e03b}',
            Key::F12 => '\u{e03c}',
            Key::Meta => '\u{e03d}',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Key::Null => "NULL",
            Key::Cancel => "CANCEL",
            Key::Help => "HELP",
            Key::Backspace => "BACKSPACE",
            Key::Tab => "TAB",
            Key::Clear => "CLEAR",
            Key::Return => "RETURN",
            Key::Enter => "ENTER",
            Key::Shift => "SHIFT",
            Key::Control => "CONTROL",
            Key::Alt => "ALT",
            Key::Pause => "PAUSE",
            Key::Escape => "ESCAPE",
            Key::Space => "SPACE",
            Key::PageUp => "PAGE_UP",
            Key::PageDown => "PAGE_DOWN",
            Key::End => "END",
            Key::Home => "HOME",
            Key::ArrowLeft => "ARROW_LEFT",
            Key::ArrowUp => "ARROW_UP",
            Key::ArrowRight => "ARROW_RIGHT",
            Key::ArrowDown => "ARROW_DOWN",
            Key::Insert => "INSERT",
            Key::Delete => "DELETE",
            Key::F1 => "F1",
            Key::F2 => "F2",
            Key::F3 => "F3",
            Key::F4 => "F4",
            Key::F5 => "F5",
            Key::F6 => "F6",
            Key::F7 => "F7",
            Key::F8 => "F8",
            Key::F9 => "F9",
            Key::F10 => "F10",
            Key::F11 => "F11",
            Key::F12 => "F12",
            Key::Meta => "META",
        }
    }

    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Shift | Key::Control | Key::Alt | Key::Meta)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown key name: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_uppercase();
        let key = match normalized.as_str() {
            "NULL" => Key::Null,
            "CANCEL" => Key::Cancel,
            "HELP" => Key::Help,
            "BACKSPACE" | "BACKSPC" => Key::Backspace,
            "TAB" => Key::Tab,
            "CLEAR" => Key::Clear,
            "RETURN" => Key::Return,
            "ENTER" => Key::Enter,
            "SHIFT" => Key::Shift,
            "CONTROL" | "CTRL" => Key::Control,
            "ALT" => Key::Alt,
            "PAUSE" => Key::Pause,
            "ESCAPE" | "ESC" => Key::Escape,
            "SPACE" => Key::Space,
            "PAGEUP" => Key::PageUp,
            "PAGEDOWN" => Key::PageDown,
            "END" => Key::End,
            "HOME" => Key::Home,
            "ARROWLEFT" | "LEFT" => Key::ArrowLeft,
            "ARROWUP" | "UP" => Key::ArrowUp,
            "ARROWRIGHT" | "RIGHT" => Key::ArrowRight,
            "ARROWDOWN" | "DOWN" => Key::ArrowDown,
            "INSERT" => Key::Insert,
            "DELETE" | "DEL" => Key::Delete,
            "F1" => Key::F1,
            "F2" => Key::F2,
            "F3" => Key::F3,
            "F4" => Key::F4,
            "F5" => Key::F5,
            "F6" => Key::F6,
            "F7" => Key::F7,
            "F8" => Key::F8,
            "F9" => Key::F9,
            "F10" => Key::F10,
            "F11" => Key::F11,
            "F12" => Key::F12,
            "META" | "COMMAND" | "CMD" => Key::Meta,
            _ => return Err(UnknownKey(s.to_string())),
        };
        Ok(key)
    }
}

/// A single logical key: named, or a literal character.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum KeyInput {
    Named(Key),
    Char(char),
}

impl KeyInput {
    /// Resolve a requested key: a name from the closed enumeration wins,
    /// otherwise a single character is taken literally.
    pub fn resolve(requested: &str) -> Option<KeyInput> {
        if let Ok(key) = requested.parse::<Key>() {
            return Some(KeyInput::Named(key));
        }
        let mut chars = requested.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeyInput::Char(c)),
            _ => None,
        }
    }

    /// Character dispatched on the wire for this input.
    pub fn code(&self) -> char {
        match self {
            KeyInput::Named(key) => key.code(),
            KeyInput::Char(c) => *c,
        }
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyInput::Named(key) => f.write_str(key.name()),
            KeyInput::Char(c) => write!(f, "{c:?}"),
        }
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        KeyInput::Named(key)
    }
}

/// One key transition on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyPulse {
    Down(char),
    Up(char),
}

/// An ordered key-action sequence, dispatched atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySequence {
    pulses: Vec<KeyPulse>,
    label: String,
}

impl KeySequence {
    /// Press and release a single key.
    pub fn tap(input: KeyInput) -> Self {
        let code = input.code();
        Self {
            pulses: vec![KeyPulse::Down(code), KeyPulse::Up(code)],
            label: input.to_string(),
        }
    }

    /// Chord: modifier down, key press, modifier up, as one sequence.
    pub fn chord(modifier: Key, input: KeyInput) -> Self {
        let m = modifier.code();
        let k = input.code();
        Self {
            pulses: vec![
                KeyPulse::Down(m),
                KeyPulse::Down(k),
                KeyPulse::Up(k),
                KeyPulse::Up(m),
            ],
            label: format!("{modifier}+{input}"),
        }
    }

    /// Literal text as a run of per-character presses.
    pub fn text(text: &str) -> Self {
        let mut pulses = Vec::with_capacity(text.chars().count() * 2);
        for c in text.chars() {
            pulses.push(KeyPulse::Down(c));
            pulses.push(KeyPulse::Up(c));
        }
        Self {
            pulses,
            label: format!("text({} chars)", text.chars().count()),
        }
    }

    pub fn pulses(&self) -> &[KeyPulse] {
        &self.pulses
    }

    /// Human-readable label for logs and dispatch-failure errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_resolve_to_platform_codes() {
        assert_eq!(Key::Enter.code(), '\u{e007}');
        assert_eq!(Key::Tab.code(), '\u{e004}');
        assert_eq!(Key::Meta.code(), '\u{e03d}');
    }

    #[test]
    fn resolution_prefers_names_over_literals() {
        assert_eq!(KeyInput::resolve("ENTER"), Some(KeyInput::Named(Key::Enter)));
        assert_eq!(
            KeyInput::resolve("COMMAND"),
            Some(KeyInput::Named(Key::Meta))
        );
        assert_eq!(
            KeyInput::resolve("ARROW_DOWN"),
            Some(KeyInput::Named(Key::ArrowDown))
        );
        assert_eq!(KeyInput::resolve("a"), Some(KeyInput::Char('a')));
        assert_eq!(KeyInput::resolve("not-a-key-name"), None);
    }

    #[test]
    fn literal_characters_pass_through_unchanged() {
        assert_eq!(KeyInput::Char('x').code(), 'x');
        assert_eq!(KeyInput::Char('7').code(), '7');
    }

    #[test]
    fn tap_emits_down_then_up() {
        let seq = KeySequence::tap(KeyInput::Named(Key::Tab));
        assert_eq!(
            seq.pulses(),
            &[KeyPulse::Down('\u{e004}'), KeyPulse::Up('\u{e004}')]
        );
    }

    #[test]
    fn chord_wraps_key_in_modifier() {
        let seq = KeySequence::chord(Key::Meta, KeyInput::Named(Key::Enter));
        assert_eq!(
            seq.pulses(),
            &[
                KeyPulse::Down('\u{e03d}'),
                KeyPulse::Down('\u{e007}'),
                KeyPulse::Up('\u{e007}'),
                KeyPulse::Up('\u{e03d}'),
            ]
        );
        assert_eq!(seq.label(), "META+ENTER");
    }

    #[test]
    fn text_sequence_is_per_character() {
        let seq = KeySequence::text("ok");
        assert_eq!(seq.pulses().len(), 4);
    }
}
