//! Target size presets

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Default largest dimension for photos, logos and gallery pictures
pub const PHOTO_MAX_DIMENSION: u32 = 800;

/// Default largest dimension for favicons
pub const ICON_MAX_DIMENSION: u32 = 128;

/// Which bound an upload is scaled to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    /// Member photos, logos, gallery pictures
    Photo,
    /// Favicons
    Icon,
}

impl SizePreset {
    /// Stable tag mixed into cache keys
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            SizePreset::Photo => 0,
            SizePreset::Icon => 1,
        }
    }
}

impl Display for SizePreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SizePreset::Photo => f.write_str("photo"),
            SizePreset::Icon => f.write_str("icon"),
        }
    }
}

impl FromStr for SizePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "photo" | "logo" => Ok(SizePreset::Photo),
            "icon" | "favicon" => Ok(SizePreset::Icon),
            other => Err(format!("unknown size preset '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("logo".parse::<SizePreset>().unwrap(), SizePreset::Photo);
        assert_eq!("FAVICON".parse::<SizePreset>().unwrap(), SizePreset::Icon);
        assert!("poster".parse::<SizePreset>().is_err());
    }

    #[test]
    fn tags_differ() {
        assert_ne!(SizePreset::Photo.tag(), SizePreset::Icon.tag());
    }
}
