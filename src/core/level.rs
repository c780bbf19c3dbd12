//! Log level definitions
//!
//! Levels are ranked: a lower `id` means a more severe level. Ordering and
//! equality only look at the rank, so application-defined levels created
//! with [`Level::custom`] compare correctly against the built-in ones.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Color hint for rendering a level label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    NoColor,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    #[cfg(feature = "console")]
    pub fn to_colored(self) -> Option<colored::Color> {
        use colored::Color::*;
        match self {
            Color::NoColor => None,
            Color::Red => Some(Red),
            Color::Green => Some(Green),
            Color::Yellow => Some(Yellow),
            Color::Blue => Some(Blue),
            Color::Magenta => Some(Magenta),
            Color::Cyan => Some(Cyan),
            Color::White => Some(White),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Level {
    pub id: u8,
    pub name: &'static str,
    pub display_name: &'static str,
    pub color: Color,
}

impl Level {
    /// Highest severity.
    pub const PANIC: Level = Level::custom(0, "panic", "PNC", Color::Red);
    /// Catastrophic error.
    pub const FATAL: Level = Level::custom(1, "fatal", "FTL", Color::Red);
    /// Serious but possibly recoverable error.
    pub const ERROR: Level = Level::custom(2, "error", "ERR", Color::Red);
    /// Non-critical error.
    pub const WARN: Level = Level::custom(3, "warn", "WRN", Color::Red);
    /// Application events.
    pub const INFO: Level = Level::custom(4, "info", "INF", Color::Green);
    /// Verbose information used for debugging.
    pub const DEBUG: Level = Level::custom(5, "debug", "DBG", Color::Yellow);
    /// Highest verbosity.
    pub const TRACE: Level = Level::custom(6, "trace", "TRC", Color::Magenta);

    pub const ALL: [Level; 7] = [
        Level::PANIC,
        Level::FATAL,
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
    ];

    /// Define an application level with an arbitrary rank.
    pub const fn custom(
        id: u8,
        name: &'static str,
        display_name: &'static str,
        color: Color,
    ) -> Self {
        Self {
            id,
            name,
            display_name,
            color,
        }
    }

    /// The built-in level sharing this rank, or `self` when the rank is not
    /// one of the built-in ones.
    pub fn canonical(self) -> Level {
        Level::ALL
            .iter()
            .copied()
            .find(|lvl| lvl.id == self.id)
            .unwrap_or(self)
    }

    /// True when `self` is as severe as `other` or more.
    #[inline]
    pub fn is_at_least(&self, other: Level) -> bool {
        self.id <= other.id
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if lower == "warning" {
            return Ok(Level::WARN);
        }
        Level::ALL
            .iter()
            .copied()
            .find(|lvl| lvl.name == lower || lvl.display_name.eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid log level: '{}'", s))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
