use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use palette::Srgb;
use serde::{Deserialize, Serialize};

/// An sRGB color, written as `#rrggbb` in definitions and configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub Srgb<u8>);

impl Color {
    /// Neutral gray used when a metric has no value to categorize yet.
    pub const PLACEHOLDER: Self = Self::new(0x9e, 0x9e, 0x9e);

    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self(Srgb::new(red, green, blue))
    }

    #[must_use]
    pub const fn red(self) -> u8 {
        self.0.red
    }

    #[must_use]
    pub const fn green(self) -> u8 {
        self.0.green
    }

    #[must_use]
    pub const fn blue(self) -> u8 {
        self.0.blue
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red(), self.green(), self.blue())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let digits = hex.strip_prefix('#').unwrap_or(hex);

        // palette also takes `#rgb` shorthand and slices by byte offset
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(format!("invalid color '{s}', expected '#rrggbb'"));
        }

        hex.parse::<Srgb<u8>>().map(Self).map_err(|e| format!("invalid color '{s}': {e}"))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_hex())
    }
}
