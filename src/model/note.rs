use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use time::OffsetDateTime;

use super::NoteId;

pub const DEFAULT_NOTE_WIDTH: f64 = 300.0;
pub const DEFAULT_NOTE_HEIGHT: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Swatch {
    Yellow,
    Pink,
    Blue,
    Green,
    Purple,
    Orange,
}

impl Swatch {
    pub fn hex(self) -> &'static str {
        match self {
            Swatch::Yellow => "#FFF9C4",
            Swatch::Pink => "#F8BBD0",
            Swatch::Blue => "#BBDEFB",
            Swatch::Green => "#C8E6C9",
            Swatch::Purple => "#E1BEE7",
            Swatch::Orange => "#FFE0B2",
        }
    }

    fn from_hex(token: &str) -> Option<Self> {
        Swatch::iter().find(|swatch| swatch.hex().eq_ignore_ascii_case(token))
    }
}

/// Either one of the palette swatches or an arbitrary color token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteColor {
    Swatch(Swatch),
    Custom(String),
}

impl NoteColor {
    pub fn token(&self) -> &str {
        match self {
            NoteColor::Swatch(swatch) => swatch.hex(),
            NoteColor::Custom(token) => token,
        }
    }
}

impl Default for NoteColor {
    fn default() -> Self {
        NoteColor::Swatch(Swatch::Yellow)
    }
}

impl FromStr for NoteColor {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if let Some(swatch) = Swatch::from_hex(token) {
            return Ok(NoteColor::Swatch(swatch));
        }
        match Swatch::from_str(token) {
            Ok(swatch) => Ok(NoteColor::Swatch(swatch)),
            Err(_) => Ok(NoteColor::Custom(token.to_string())),
        }
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteColor::Swatch(swatch) => write!(f, "{swatch} ({})", swatch.hex()),
            NoteColor::Custom(token) => f.write_str(token),
        }
    }
}

impl Serialize for NoteColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for NoteColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .parse::<NoteColor>()
            .unwrap_or_else(|never| match never {}))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: NoteColor,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Transient "Saving..." / "Saved ✓" text shown by the view.
    #[serde(skip)]
    pub save_status: String,
}

fn default_width() -> f64 {
    DEFAULT_NOTE_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_NOTE_HEIGHT
}

impl Note {
    pub fn new() -> Self {
        Self {
            id: NoteId::new(),
            content: String::new(),
            color: NoteColor::default(),
            position_x: 0.0,
            position_y: 0.0,
            width: DEFAULT_NOTE_WIDTH,
            height: DEFAULT_NOTE_HEIGHT,
            created_at: OffsetDateTime::now_utc(),
            save_status: String::new(),
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}
