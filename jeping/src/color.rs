//! Minecraft text colors and their terminal escape sequences.

use std::str::FromStr;

use thiserror::Error;

/// Escape sequence that clears every color and style.
pub const RESET: &str = "\x1b[0m";

/// Escape sequence that restores the terminal's default foreground color.
pub const DEFAULT_FOREGROUND: &str = "\x1b[39m";

/// Text color of a chat component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// The `reset` color: whatever the context's default is.
    Reset,
    /// One of the 16 named Minecraft colors.
    Named(NamedColor),
    /// A `#rrggbb` color.
    Rgb(RgbColor),
}

/// RGB color
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named Minecraft color, in legacy code order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum NamedColor {
    /// Code: `0`, name: `black`
    Black = 0,
    /// Code: `1`, name: `dark_blue`
    DarkBlue,
    /// Code: `2`, name: `dark_green`
    DarkGreen,
    /// Code: `3`, name: `dark_aqua`
    DarkAqua,
    /// Code: `4`, name: `dark_red`
    DarkRed,
    /// Code: `5`, name: `dark_purple`
    DarkPurple,
    /// Code: `6`, name: `gold`
    Gold,
    /// Code: `7`, name: `gray`
    Gray,
    /// Code: `8`, name: `dark_gray`
    DarkGray,
    /// Code: `9`, name: `blue`
    Blue,
    /// Code: `a`, name: `green`
    Green,
    /// Code: `b`, name: `aqua`
    Aqua,
    /// Code: `c`, name: `red`
    Red,
    /// Code: `d`, name: `light_purple`
    LightPurple,
    /// Code: `e`, name: `yellow`
    Yellow,
    /// Code: `f`, name: `white`
    White,
}

/// How hex colors are written to the terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Palette {
    /// 24-bit `ESC[38;2;r;g;bm` sequences.
    #[default]
    TrueColor,
    /// The nearest of the 16 named colors, for terminals without true color.
    Ansi16,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy, Hash)]
#[error("invalid color name or hex code")]
pub struct ColorError;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy, Hash)]
#[error("unknown palette, expected `truecolor` or `16`")]
pub struct PaletteError;

impl NamedColor {
    /// All named colors, in legacy code order.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::DarkBlue,
        Self::DarkGreen,
        Self::DarkAqua,
        Self::DarkRed,
        Self::DarkPurple,
        Self::Gold,
        Self::Gray,
        Self::DarkGray,
        Self::Blue,
        Self::Green,
        Self::Aqua,
        Self::Red,
        Self::LightPurple,
        Self::Yellow,
        Self::White,
    ];

    const NAMES: [&'static str; 16] = [
        "black",
        "dark_blue",
        "dark_green",
        "dark_aqua",
        "dark_red",
        "dark_purple",
        "gold",
        "gray",
        "dark_gray",
        "blue",
        "green",
        "aqua",
        "red",
        "light_purple",
        "yellow",
        "white",
    ];

    const ANSI: [&'static str; 16] = [
        "\x1b[30m", "\x1b[34m", "\x1b[32m", "\x1b[36m", "\x1b[31m", "\x1b[35m", "\x1b[33m",
        "\x1b[37m", "\x1b[90m", "\x1b[94m", "\x1b[92m", "\x1b[96m", "\x1b[91m", "\x1b[95m",
        "\x1b[93m", "\x1b[97m",
    ];

    /// Returns the identifier of the color.
    #[must_use]
    pub const fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Looks up a color by its legacy formatting code character.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        let index = code.to_digit(16)?;
        // uppercase hex digits are not color codes
        if code.is_ascii_uppercase() {
            return None;
        }
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }

    /// Returns the 16-color terminal escape sequence for this color.
    #[must_use]
    pub const fn ansi(self) -> &'static str {
        Self::ANSI[self as usize]
    }

    /// The color a terminal shows for [`Self::ansi`], using the xterm
    /// default palette.
    #[must_use]
    pub const fn terminal_rgb(self) -> RgbColor {
        match self {
            Self::Black => RgbColor::new(0, 0, 0),
            Self::DarkBlue => RgbColor::new(0, 0, 238),
            Self::DarkGreen => RgbColor::new(0, 205, 0),
            Self::DarkAqua => RgbColor::new(0, 205, 205),
            Self::DarkRed => RgbColor::new(205, 0, 0),
            Self::DarkPurple => RgbColor::new(205, 0, 205),
            Self::Gold => RgbColor::new(205, 205, 0),
            Self::Gray => RgbColor::new(229, 229, 229),
            Self::DarkGray => RgbColor::new(127, 127, 127),
            Self::Blue => RgbColor::new(92, 92, 255),
            Self::Green => RgbColor::new(0, 255, 0),
            Self::Aqua => RgbColor::new(0, 255, 255),
            Self::Red => RgbColor::new(255, 0, 0),
            Self::LightPurple => RgbColor::new(255, 0, 255),
            Self::Yellow => RgbColor::new(255, 255, 0),
            Self::White => RgbColor::new(255, 255, 255),
        }
    }
}

impl RgbColor {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts the RGB color to the [`NamedColor`] whose 16-color escape
    /// looks closest on a terminal (lossy).
    ///
    /// Distances are measured against [`NamedColor::terminal_rgb`]. On a tie
    /// the color with the lowest legacy code wins.
    #[must_use]
    pub fn to_named_lossy(self) -> NamedColor {
        fn squared_distance(c1: RgbColor, c2: RgbColor) -> i32 {
            (i32::from(c1.r) - i32::from(c2.r)).pow(2)
                + (i32::from(c1.g) - i32::from(c2.g)).pow(2)
                + (i32::from(c1.b) - i32::from(c2.b)).pow(2)
        }

        let mut best = NamedColor::Black;
        let mut best_distance = i32::MAX;
        for named in NamedColor::ALL {
            let distance = squared_distance(named.terminal_rgb(), self);
            if distance < best_distance {
                best = named;
                best_distance = distance;
            }
        }
        best
    }
}

impl Color {
    /// Appends the escape sequence selecting this color to `out`.
    pub fn write_ansi(self, out: &mut String, palette: Palette) {
        match (self, palette) {
            (Self::Reset, _) => out.push_str(DEFAULT_FOREGROUND),
            (Self::Named(named), _) => out.push_str(named.ansi()),
            (Self::Rgb(rgb), Palette::Ansi16) => out.push_str(rgb.to_named_lossy().ansi()),
            (Self::Rgb(RgbColor { r, g, b }), Palette::TrueColor) => {
                out.push_str(&format!("\x1b[38;2;{r};{g};{b}m"));
            }
        }
    }
}

impl From<NamedColor> for Color {
    fn from(value: NamedColor) -> Self {
        Self::Named(value)
    }
}

impl From<RgbColor> for Color {
    fn from(value: RgbColor) -> Self {
        Self::Rgb(value)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.starts_with('#') {
            return value.parse().map(Self::Rgb);
        }
        if value == "reset" {
            return Ok(Self::Reset);
        }
        value.parse().map(Self::Named)
    }
}

impl FromStr for NamedColor {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .position(|&name| name == value)
            .map(|index| Self::ALL[index])
            .ok_or(ColorError)
    }
}

impl FromStr for RgbColor {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let to_num = |d: u8| match d {
            b'0'..=b'9' => Ok(d - b'0'),
            b'a'..=b'f' => Ok(d - b'a' + 0xa),
            b'A'..=b'F' => Ok(d - b'A' + 0xa),
            _ => Err(ColorError),
        };

        if let &[b'#', r0, r1, g0, g1, b0, b1] = value.as_bytes() {
            Ok(Self {
                r: to_num(r0)? << 4 | to_num(r1)?,
                g: to_num(g0)? << 4 | to_num(g1)?,
                b: to_num(b0)? << 4 | to_num(b1)?,
            })
        } else {
            Err(ColorError)
        }
    }
}

impl FromStr for Palette {
    type Err = PaletteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "truecolor" | "24bit" => Ok(Self::TrueColor),
            "16" | "ansi16" => Ok(Self::Ansi16),
            _ => Err(PaletteError),
        }
    }
}
