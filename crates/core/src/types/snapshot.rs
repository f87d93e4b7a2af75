//! The persisted aggregate and its legacy-field migration.
//!
//! A [`Snapshot`] is the unit of persistence and synchronization: it is always
//! written and transmitted whole. Deserialization is lenient field by field:
//! a missing or malformed collection reads as empty, and a record that cannot
//! be decoded is skipped without taking its neighbours down with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::{decode_records, millis_from_value};
use super::{CosmeticProduct, Message, UserRole, WishlistItem};

/// Current time in milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Full persisted state of the hub.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, deserialize_with = "super::lenient::records")]
    pub wishlist: Vec<WishlistItem>,
    #[serde(default, deserialize_with = "super::lenient::records")]
    pub makeup: Vec<CosmeticProduct>,
    #[serde(default, deserialize_with = "super::lenient::records")]
    pub mailbox: Vec<Message>,
    /// When this snapshot was produced, milliseconds since the epoch.
    #[serde(default, deserialize_with = "super::lenient::millis")]
    pub last_updated: i64,
}

/// A stored document after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnapshot {
    pub snapshot: Snapshot,
    /// Messages given the default sender.
    pub patched: usize,
    /// Records skipped because they could not be decoded.
    pub dropped: usize,
}

/// Collection sizes, for logs and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotCounts {
    pub wishlist: usize,
    pub makeup: usize,
    pub mailbox: usize,
}

impl std::fmt::Display for SnapshotCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} wishlist, {} makeup, {} messages",
            self.wishlist, self.makeup, self.mailbox
        )
    }
}

impl Snapshot {
    /// An all-empty snapshot stamped with `last_updated`.
    #[must_use]
    pub const fn empty(last_updated: i64) -> Self {
        Self {
            wishlist: Vec::new(),
            makeup: Vec::new(),
            mailbox: Vec::new(),
            last_updated,
        }
    }

    /// Whether all three collections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wishlist.is_empty() && self.makeup.is_empty() && self.mailbox.is_empty()
    }

    /// Compare collection contents, ignoring `last_updated`.
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.wishlist == other.wishlist
            && self.makeup == other.makeup
            && self.mailbox == other.mailbox
    }

    #[must_use]
    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            wishlist: self.wishlist.len(),
            makeup: self.makeup.len(),
            mailbox: self.mailbox.len(),
        }
    }

    /// Unread messages addressed to `role`.
    #[must_use]
    pub fn unread_for(&self, role: UserRole) -> usize {
        self.mailbox
            .iter()
            .filter(|m| m.is_incoming_for(role) && !m.is_read())
            .count()
    }

    /// Decode a stored document, applying [`migrate_legacy_messages`] first.
    ///
    /// Each record is decoded on its own; undecodable ones are skipped and
    /// counted in [`DecodedSnapshot::dropped`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the document is not a JSON object.
    pub fn from_stored_value(mut value: Value) -> Result<DecodedSnapshot, serde_json::Error> {
        let patched = migrate_legacy_messages(&mut value);
        let Value::Object(mut fields) = value else {
            return Err(serde::de::Error::custom("snapshot is not a JSON object"));
        };

        let (wishlist, dropped_wishlist) = decode_records(fields.remove("wishlist"));
        let (makeup, dropped_makeup) = decode_records(fields.remove("makeup"));
        let (mailbox, dropped_mailbox) = decode_records(fields.remove("mailbox"));
        let last_updated = fields.get("lastUpdated").map_or(0, millis_from_value);

        Ok(DecodedSnapshot {
            snapshot: Self {
                wishlist,
                makeup,
                mailbox,
                last_updated,
            },
            patched,
            dropped: dropped_wishlist + dropped_makeup + dropped_mailbox,
        })
    }
}

/// Give every stored message without a sender the non-admin identity.
///
/// This is the only schema migration: documents written before messages had
/// a `sender` field. Missing and `null` senders are both patched. Returns the
/// number of patched messages.
pub fn migrate_legacy_messages(document: &mut Value) -> usize {
    let Some(mailbox) = document.get_mut("mailbox").and_then(Value::as_array_mut) else {
        return 0;
    };

    let mut patched = 0;
    for message in mailbox.iter_mut().filter_map(Value::as_object_mut) {
        if message.get("sender").is_none_or(Value::is_null) {
            message.insert(
                "sender".to_string(),
                Value::String(UserRole::Libertad.as_str().to_string()),
            );
            patched += 1;
        }
    }
    patched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    #[test]
    fn test_missing_collections_default_to_empty() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"wishlist": null}"#).expect("deserialize");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.last_updated, 0);

        let snapshot: Snapshot = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(Snapshot::empty(5)).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"wishlist": [], "makeup": [], "mailbox": [], "lastUpdated": 5})
        );
    }

    #[test]
    fn test_legacy_messages_get_default_sender() {
        let doc = serde_json::json!({
            "mailbox": [
                {"id": "m1", "text": "old", "date": 1, "read": true},
                {"id": "m2", "text": "null", "date": 2, "read": false, "sender": null},
                {"id": "m3", "text": "new", "date": 3, "read": false, "sender": "admin"}
            ]
        });

        let DecodedSnapshot {
            snapshot, patched, ..
        } = Snapshot::from_stored_value(doc).expect("decode");
        assert_eq!(patched, 2);
        assert_eq!(snapshot.mailbox[0].sender(), UserRole::Libertad);
        assert_eq!(snapshot.mailbox[1].sender(), UserRole::Libertad);
        assert_eq!(snapshot.mailbox[2].sender(), UserRole::Admin);
        assert!(snapshot.mailbox[0].is_read());
    }

    #[test]
    fn test_one_bad_record_keeps_the_rest() {
        let doc = serde_json::json!({
            "wishlist": [
                {"id": "w1", "categoryId": "plans", "title": "Keep me", "createdAt": 1},
                {"id": "w2", "categoryId": "cars", "title": "Unknown category"},
                {"categoryId": "plans", "title": "No id"}
            ],
            "makeup": [
                {"id": "p1", "brand": "B", "name": "Fractional", "category": "eyes",
                 "paoMonths": 1.5, "dateOpened": 1700000000000.0},
                {"id": "p2", "brand": "B", "name": "Negative", "category": "lips",
                 "paoMonths": -1, "dateOpened": null}
            ],
            "mailbox": [{"id": "m1", "text": "hola", "date": 3}, "garbage"],
            "lastUpdated": 9.0
        });

        let decoded = Snapshot::from_stored_value(doc.clone()).expect("decode");
        let snapshot = &decoded.snapshot;
        assert_eq!(decoded.dropped, 3);
        assert_eq!(decoded.patched, 1);
        assert_eq!(snapshot.wishlist.len(), 1);
        assert_eq!(snapshot.wishlist[0].title, "Keep me");
        assert_eq!(snapshot.makeup.len(), 2);
        assert!((snapshot.makeup[0].pao_months - 1.5).abs() < f64::EPSILON);
        assert_eq!(snapshot.makeup[0].date_opened, 1_700_000_000_000);
        assert_eq!(snapshot.makeup[1].date_opened, 0);
        assert_eq!(snapshot.mailbox.len(), 1);
        assert_eq!(snapshot.last_updated, 9);

        // Plain deserialization is just as forgiving.
        let direct: Snapshot = serde_json::from_value(doc).expect("deserialize");
        assert_eq!(direct.wishlist.len(), 1);
        assert_eq!(direct.makeup.len(), 2);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(Snapshot::from_stored_value(serde_json::json!([1, 2])).is_err());
        assert!(Snapshot::from_stored_value(serde_json::json!("snapshot")).is_err());
    }

    #[test]
    fn test_migration_ignores_documents_without_mailbox() {
        let mut doc = serde_json::json!({"wishlist": []});
        assert_eq!(migrate_legacy_messages(&mut doc), 0);

        let mut not_an_object = serde_json::json!([1, 2, 3]);
        assert_eq!(migrate_legacy_messages(&mut not_an_object), 0);
    }

    #[test]
    fn test_same_contents_ignores_timestamp() {
        let mut a = Snapshot::empty(1);
        a.mailbox
            .push(Message::new(MessageId::new("m1"), "hi", 1, UserRole::Admin));
        let mut b = a.clone();
        b.last_updated = 99;
        assert!(a.same_contents(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_unread_for_counts_only_incoming() {
        let mut snapshot = Snapshot::default();
        snapshot
            .mailbox
            .push(Message::new(MessageId::new("a"), "from admin", 1, UserRole::Admin));
        snapshot
            .mailbox
            .push(Message::new(MessageId::new("b"), "from libertad", 2, UserRole::Libertad));

        assert_eq!(snapshot.unread_for(UserRole::Libertad), 1);
        assert_eq!(snapshot.unread_for(UserRole::Admin), 1);

        snapshot.mailbox[0].mark_read();
        assert_eq!(snapshot.unread_for(UserRole::Libertad), 0);
    }
}
