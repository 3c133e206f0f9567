//! Server descriptions: [chat components](https://wiki.vg/Text_formatting)
//! and legacy `§`-coded strings.
//!
//! Both shapes render to plain text, where only the content is kept, and to
//! ANSI-colored text for terminals.

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, SeqAccess, Visitor},
};
use tracing::warn;

use crate::color::{Color, NamedColor, Palette, RESET};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const STRIKETHROUGH: &str = "\x1b[9m";

/// A piece of formatted text as found in a status response.
///
/// Servers send either a bare string, which may contain legacy `§` codes, or
/// a JSON chat component. The same two shapes appear again inside a
/// component's `extra` list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chat {
    /// A plain string, possibly containing `§` formatting codes.
    Legacy(String),
    /// A structured chat component.
    Component(Component),
}

/// A chat component: some text, how to color it, and child components that
/// follow it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Component {
    pub text: String,
    /// Unrecognized colors are dropped while parsing.
    #[serde(deserialize_with = "lenient_color")]
    pub color: Option<Color>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
    pub strikethrough: Option<bool>,
    /// Rendered after `text`, in order, inheriting this component's style.
    pub extra: Vec<Chat>,
}

impl Chat {
    /// The text content with every color and style removed.
    ///
    /// Legacy strings are kept as sent, `§` codes included.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            Self::Legacy(text) => out.push_str(text),
            Self::Component(component) => {
                out.push_str(&component.text);
                for child in &component.extra {
                    child.write_plain(out);
                }
            }
        }
    }

    /// The text with ANSI escape sequences for colors and styles.
    ///
    /// The result always ends with a reset sequence, so nothing printed
    /// afterwards picks up the description's formatting.
    #[must_use]
    pub fn colored_text(&self, palette: Palette) -> String {
        let mut out = String::new();
        match self {
            Self::Legacy(text) => {
                write_legacy(&mut out, text);
                out.push_str(RESET);
            }
            Self::Component(component) => {
                component.write_colored(&mut out, Style::default(), palette);
            }
        }
        out
    }
}

impl fmt::Display for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain_text())
    }
}

impl From<&str> for Chat {
    fn from(text: &str) -> Self {
        Self::Legacy(text.to_owned())
    }
}

impl From<Component> for Chat {
    fn from(component: Component) -> Self {
        Self::Component(component)
    }
}

impl Component {
    fn write_colored(&self, out: &mut String, inherited: Style, palette: Palette) {
        let style = inherited.apply(self);
        if style.clears(inherited) {
            // terminals have no "bold off" that works everywhere
            out.push_str(RESET);
            style.write_ansi(out, palette);
        } else {
            self.own_style().write_ansi(out, palette);
        }

        let mut dirty = write_legacy(out, &self.text);
        for child in &self.extra {
            if dirty {
                restore(out, style, palette);
            }
            dirty = match child {
                Chat::Legacy(text) => write_legacy(out, text),
                Chat::Component(component) => {
                    component.write_colored(out, style, palette);
                    true
                }
            };
        }
        out.push_str(RESET);
    }

    fn own_style(&self) -> Style {
        Style {
            color: self.color,
            bold: self.bold == Some(true),
            italic: self.italic == Some(true),
            underlined: self.underlined == Some(true),
            strikethrough: self.strikethrough == Some(true),
        }
    }
}

/// The formatting in effect while rendering a component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Style {
    color: Option<Color>,
    bold: bool,
    italic: bool,
    underlined: bool,
    strikethrough: bool,
}

impl Style {
    fn apply(self, component: &Component) -> Self {
        Self {
            color: component.color.or(self.color),
            bold: component.bold.unwrap_or(self.bold),
            italic: component.italic.unwrap_or(self.italic),
            underlined: component.underlined.unwrap_or(self.underlined),
            strikethrough: component.strikethrough.unwrap_or(self.strikethrough),
        }
    }

    /// Whether going from `parent` to `self` turns a style off.
    const fn clears(self, parent: Self) -> bool {
        (parent.bold && !self.bold)
            || (parent.italic && !self.italic)
            || (parent.underlined && !self.underlined)
            || (parent.strikethrough && !self.strikethrough)
    }

    fn write_ansi(self, out: &mut String, palette: Palette) {
        if let Some(color) = self.color {
            color.write_ansi(out, palette);
        }
        for (on, escape) in [
            (self.bold, BOLD),
            (self.italic, ITALIC),
            (self.underlined, UNDERLINE),
            (self.strikethrough, STRIKETHROUGH),
        ] {
            if on {
                out.push_str(escape);
            }
        }
    }
}

/// Puts the terminal back into `style` after a child changed it.
fn restore(out: &mut String, style: Style, palette: Palette) {
    if !out.ends_with(RESET) {
        out.push_str(RESET);
    }
    style.write_ansi(out, palette);
}

/// The escape sequence for a legacy formatting code, if `code` is one.
fn legacy_escape(code: char) -> Option<&'static str> {
    match code {
        'l' => Some(BOLD),
        'o' => Some(ITALIC),
        'n' => Some(UNDERLINE),
        'm' => Some(STRIKETHROUGH),
        'r' => Some(RESET),
        _ => NamedColor::from_code(code).map(NamedColor::ansi),
    }
}

/// Copies `text` to `out`, replacing `§` codes with escape sequences.
///
/// A `§` that is not followed by a known code is copied as is. Returns whether
/// any escape sequence was written.
fn write_legacy(out: &mut String, text: &str) -> bool {
    let mut wrote_escape = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '§' {
            if let Some(escape) = chars.peek().copied().and_then(legacy_escape) {
                chars.next();
                out.push_str(escape);
                wrote_escape = true;
                continue;
            }
        }
        out.push(c);
    }
    wrote_escape
}

fn lenient_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Color>, D::Error> {
    let Some(value) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match value.parse() {
        Ok(color) => Ok(Some(color)),
        Err(_) => {
            warn!(color = %value, "ignoring unrecognized chat color");
            Ok(None)
        }
    }
}

impl<'de> Deserialize<'de> for Chat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ChatVisitor)
    }
}

struct ChatVisitor;

impl<'de> Visitor<'de> for ChatVisitor {
    type Value = Chat;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, a chat component or a list of chat components")
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
        Ok(Chat::Legacy(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Self::Value, E> {
        Ok(Chat::Legacy(s))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        Component::deserialize(de::value::MapAccessDeserializer::new(map)).map(Chat::Component)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut extra = Vec::new();
        while let Some(chat) = seq.next_element()? {
            extra.push(chat);
        }
        Ok(Chat::Component(Component {
            extra,
            ..Component::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD: &str = "\x1b[33m";
    const GREEN: &str = "\x1b[92m";
    const RED: &str = "\x1b[91m";
    const BLUE: &str = "\x1b[94m";

    fn chat(json: &str) -> Chat {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_both_shapes() {
        assert_eq!(chat(r#""hello""#), Chat::Legacy("hello".into()));
        assert_eq!(
            chat(r#"{"text":"a","color":"red","extra":["b",{"text":"c"}]}"#),
            Chat::Component(Component {
                text: "a".into(),
                color: Some(NamedColor::Red.into()),
                extra: vec![
                    Chat::Legacy("b".into()),
                    Chat::Component(Component {
                        text: "c".into(),
                        ..Component::default()
                    }),
                ],
                ..Component::default()
            })
        );
    }

    #[test]
    fn rejects_other_values() {
        assert!(serde_json::from_str::<Chat>("42").is_err());
        assert!(serde_json::from_str::<Chat>("null").is_err());
        assert!(serde_json::from_str::<Chat>(r#"{"text":7}"#).is_err());
    }

    #[test]
    fn unknown_color_is_ignored() {
        let Chat::Component(component) = chat(r##"{"text":"x","color":"#12345"}"##) else {
            panic!("expected a component");
        };
        assert_eq!(component.color, None);
        assert_eq!(
            chat(r#"{"text":"x","color":"mauve"}"#).colored_text(Palette::TrueColor),
            "x\x1b[0m"
        );
    }

    #[test]
    fn plain_text_ignores_formatting() {
        let description = chat(r#"{"text":"A","color":"red","extra":[{"text":"B"}]}"#);
        assert_eq!(description.plain_text(), "AB");
        assert_eq!(description.to_string(), "AB");
    }

    #[test]
    fn plain_text_keeps_document_order() {
        let description = chat(
            r#"{"text":"1","extra":[{"text":"2","extra":["3",{"text":"4"}]},"5",{"extra":["6"]}]}"#,
        );
        assert_eq!(description.plain_text(), "123456");
    }

    #[test]
    fn plain_legacy_is_verbatim() {
        assert_eq!(chat(r#""§aHello§r""#).plain_text(), "§aHello§r");
    }

    #[test]
    fn legacy_codes() {
        assert_eq!(
            chat(r#""§aHello§r""#).colored_text(Palette::TrueColor),
            format!("{GREEN}Hello{RESET}{RESET}")
        );
        assert_eq!(
            Chat::from("§l§nX").colored_text(Palette::TrueColor),
            format!("{BOLD}{UNDERLINE}X{RESET}")
        );
    }

    #[test]
    fn unknown_legacy_codes_pass_through() {
        assert_eq!(
            Chat::from("§zX").colored_text(Palette::TrueColor),
            format!("§zX{RESET}")
        );
        assert_eq!(
            Chat::from("50§").colored_text(Palette::TrueColor),
            format!("50§{RESET}")
        );
        assert_eq!(
            Chat::from("§§a!").colored_text(Palette::TrueColor),
            format!("§{GREEN}!{RESET}")
        );
        assert_eq!(
            Chat::from("§A").colored_text(Palette::TrueColor),
            format!("§A{RESET}")
        );
    }

    #[test]
    fn colored_component() {
        let description = chat(r#"{"text":"Welcome","color":"gold","extra":[" to the server"]}"#);
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("{GOLD}Welcome to the server{RESET}")
        );
    }

    #[test]
    fn children_are_reset_and_parent_restored() {
        let description =
            chat(r#"{"text":"a","color":"red","extra":[{"text":"b","color":"blue"},"c"]}"#);
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("{RED}a{BLUE}b{RESET}{RED}c{RESET}")
        );
    }

    #[test]
    fn legacy_child_does_not_leak() {
        let description = chat(r#"{"text":"","color":"red","extra":["§lloud","quiet"]}"#);
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("{RED}{BOLD}loud{RESET}{RED}quiet{RESET}")
        );
    }

    #[test]
    fn styles_are_inherited_and_cleared() {
        let description =
            chat(r#"{"text":"x","bold":true,"extra":[{"text":"y"},{"text":"z","bold":false}]}"#);
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("{BOLD}xy{RESET}{BOLD}{RESET}z{RESET}{RESET}")
        );
    }

    #[test]
    fn hex_colors() {
        let description = chat(r##"{"text":"hot","color":"#FF0000"}"##);
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("\x1b[38;2;255;0;0mhot{RESET}")
        );
        assert_eq!(
            description.colored_text(Palette::Ansi16),
            format!("{RED}hot{RESET}")
        );
        assert_eq!(
            description.colored_text(Palette::Ansi16),
            description.colored_text(Palette::Ansi16)
        );
    }

    #[test]
    fn arrays_are_components() {
        let description = chat(r#"["a",{"text":"b","color":"green"}]"#);
        assert_eq!(description.plain_text(), "ab");
        assert_eq!(
            description.colored_text(Palette::TrueColor),
            format!("a{GREEN}b{RESET}{RESET}")
        );
    }

    #[test]
    fn always_ends_with_reset() {
        for json in [
            r#""""#,
            r#"{}"#,
            r#"{"text":"x","extra":[{"text":"y","color":"aqua"}]}"#,
        ] {
            assert!(chat(json).colored_text(Palette::Ansi16).ends_with(RESET));
        }
    }
}
