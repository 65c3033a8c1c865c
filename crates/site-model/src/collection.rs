//! Logical collections of the remote store

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Remote collections the core reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollectionId {
    /// Main committee roster
    MainRoster,
    /// Secondary (Balavedhi) committee roster
    SecondaryRoster,
    /// Event gallery
    Gallery,
    /// Holds the settings singleton document
    Settings,
    /// Contact form submissions (write-only)
    Messages,
}

impl CollectionId {
    /// Collections kept in a local mirror
    pub const MIRRORED: [CollectionId; 4] = [
        CollectionId::MainRoster,
        CollectionId::SecondaryRoster,
        CollectionId::Gallery,
        CollectionId::Settings,
    ];

    /// Collection path in the remote store
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CollectionId::MainRoster => "mainCommittee",
            CollectionId::SecondaryRoster => "balavedhiCommittee",
            CollectionId::Gallery => "galleryImages",
            CollectionId::Settings => "settings",
            CollectionId::Messages => "messages",
        }
    }
}

impl Display for CollectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which of the two committee rosters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Roster {
    /// Main committee
    Main,
    /// Secondary committee
    Secondary,
}

impl Roster {
    /// Backing collection
    #[inline]
    #[must_use]
    pub const fn collection(self) -> CollectionId {
        match self {
            Roster::Main => CollectionId::MainRoster,
            Roster::Secondary => CollectionId::SecondaryRoster,
        }
    }
}

impl Display for Roster {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Roster::Main => f.write_str("main"),
            Roster::Secondary => f.write_str("secondary"),
        }
    }
}

impl FromStr for Roster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Roster::Main),
            "secondary" | "balavedhi" => Ok(Roster::Secondary),
            other => Err(format!("unknown roster '{other}'")),
        }
    }
}
