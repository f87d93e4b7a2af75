//! Closed-set enums shared by every component.

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the closed-set enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// One of the two fixed identities using the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// The non-admin user; default sender for legacy messages.
    #[default]
    Libertad,
    /// The admin user.
    Admin,
}

impl UserRole {
    /// The other participant of the conversation.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Libertad => Self::Admin,
            Self::Admin => Self::Libertad,
        }
    }

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Libertad => "libertad",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "libertad" => Ok(Self::Libertad),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("user role", s)),
        }
    }
}

/// Persistence status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// A remote fetch or save is pending.
    Syncing,
    /// The last remote operation succeeded.
    Saved,
    /// The last remote operation failed; local copy is unsynced.
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Saved => write!(f, "saved"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Wishlist category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistCategory {
    Plans,
    Flowers,
    Restaurants,
    Products,
}

impl WishlistCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Plans, Self::Flowers, Self::Restaurants, Self::Products];
}

impl std::fmt::Display for WishlistCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plans => write!(f, "plans"),
            Self::Flowers => write!(f, "flowers"),
            Self::Restaurants => write!(f, "restaurants"),
            Self::Products => write!(f, "products"),
        }
    }
}

impl std::str::FromStr for WishlistCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plans" => Ok(Self::Plans),
            "flowers" => Ok(Self::Flowers),
            "restaurants" => Ok(Self::Restaurants),
            "products" => Ok(Self::Products),
            _ => Err(ParseEnumError::new("wishlist category", s)),
        }
    }
}

/// Cosmetic product category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CosmeticCategory {
    Face,
    Eyes,
    Lips,
    Skincare,
}

impl std::fmt::Display for CosmeticCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Face => write!(f, "face"),
            Self::Eyes => write!(f, "eyes"),
            Self::Lips => write!(f, "lips"),
            Self::Skincare => write!(f, "skincare"),
        }
    }
}

impl std::str::FromStr for CosmeticCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" => Ok(Self::Face),
            "eyes" => Ok(Self::Eyes),
            "lips" => Ok(Self::Lips),
            "skincare" => Ok(Self::Skincare),
            _ => Err(ParseEnumError::new("cosmetic category", s)),
        }
    }
}
