//! Insertion anchors and message roles.

use serde::{Deserialize, Serialize};

/// Where an activated entry is spliced into the prompt.
///
/// Unrecognized names are carried as [`Position::Other`] so that a round trip
/// through the importer does not lose them; the engine places them with
/// [`Position::AfterChar`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Position {
    BeforeChar,
    #[default]
    AfterChar,
    BeforeExample,
    AfterExample,
    BeforeAn,
    AfterAn,
    AtDepth,
    Other(String),
}

impl Position {
    /// Canonical snake_case name.
    pub fn as_str(&self) -> &str {
        match self {
            Position::BeforeChar => "before_char",
            Position::AfterChar => "after_char",
            Position::BeforeExample => "before_example",
            Position::AfterExample => "after_example",
            Position::BeforeAn => "before_an",
            Position::AfterAn => "after_an",
            Position::AtDepth => "at_depth",
            Position::Other(name) => name,
        }
    }

    /// Parse a canonical name. Anything else becomes [`Position::Other`].
    pub fn from_canonical(name: &str) -> Self {
        match name {
            "before_char" => Position::BeforeChar,
            "after_char" => Position::AfterChar,
            "before_example" => Position::BeforeExample,
            "after_example" => Position::AfterExample,
            "before_an" => Position::BeforeAn,
            "after_an" => Position::AfterAn,
            "at_depth" => Position::AtDepth,
            other => Position::Other(other.to_string()),
        }
    }

    /// The position the engine actually uses for slotting.
    pub fn resolved(&self) -> Position {
        match self {
            Position::Other(_) => Position::AfterChar,
            known => known.clone(),
        }
    }

    /// Slot ordering rank: `before_an < before_char < before_example <
    /// at_depth < after_example < after_char < after_an`.
    pub fn rank(&self) -> u8 {
        match self.resolved() {
            Position::BeforeAn => 0,
            Position::BeforeChar => 1,
            Position::BeforeExample => 2,
            Position::AtDepth => 3,
            Position::AfterExample => 4,
            Position::AfterChar => 5,
            Position::AfterAn => 6,
            Position::Other(_) => 5,
        }
    }
}

impl From<String> for Position {
    fn from(name: String) -> Self {
        Position::from_canonical(&name)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chat role attached to `at_depth` insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Ordering among slots at the same depth: `system < user < other`.
    pub fn rank(&self) -> u8 {
        match self {
            Role::System => 0,
            Role::User => 1,
            Role::Assistant => 2,
        }
    }
}
