//! Wishlist entries.

use serde::{Deserialize, Serialize};

use super::{WishlistCategory, WishlistItemId};

/// A wishlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub category_id: WishlistCategory,
    #[serde(default)]
    pub title: String,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    /// Creation time, milliseconds since the epoch.
    #[serde(default, deserialize_with = "super::lenient::millis")]
    pub created_at: i64,
}

impl WishlistItem {
    /// Create a new, not yet completed entry with a fresh identifier.
    ///
    /// A blank description is stored as absent.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        category_id: WishlistCategory,
        created_at: i64,
    ) -> Self {
        Self {
            id: WishlistItemId::generate(),
            category_id,
            title: title.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            is_completed: false,
            created_at,
        }
    }

    /// Flip the completion flag.
    pub const fn toggle(&mut self) {
        self.is_completed = !self.is_completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wishlist_item_wire_format() {
        let mut item = WishlistItem::new("Picnic", None, WishlistCategory::Plans, 1_700_000_000_000);
        item.id = WishlistItemId::new("w1");

        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["categoryId"], "plans");
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["createdAt"], 1_700_000_000_000_i64);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let item = WishlistItem::new(
            "Peonies",
            Some("   ".to_string()),
            WishlistCategory::Flowers,
            0,
        );
        assert_eq!(item.description, None);
    }

    #[test]
    fn test_toggle_flips_completion() {
        let mut item = WishlistItem::new("Sushi", None, WishlistCategory::Restaurants, 0);
        item.toggle();
        assert!(item.is_completed);
        item.toggle();
        assert!(!item.is_completed);
    }
}
