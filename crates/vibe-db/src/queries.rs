use crate::Database;
use crate::models::{FeedRow, MessageRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

/// Nickname normalization rule shared by the resolver and the lookup
/// endpoints: surrounding whitespace is dropped, the unique key is the
/// lower-cased form.
pub fn normalize_nickname(raw: &str) -> (String, String) {
    let display = raw.trim().to_string();
    let key = display.to_lowercase();
    (key, display)
}

/// Listing limits are clamped to [1, 100] regardless of what the
/// caller asked for.
fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, 100)
}

impl Database {
    // -- Users --

    /// Find-or-create the user behind a raw nickname, keeping the
    /// most-recently-submitted casing as the display name.
    ///
    /// A UNIQUE violation on insert means another writer created the
    /// row between our read and write; the existing row is re-read and
    /// returned as if it had been found in the first place.
    pub fn resolve_user(&self, raw_nickname: &str) -> Result<UserRow> {
        let (key, display) = normalize_nickname(raw_nickname);

        self.with_conn(|conn| {
            if let Some(user) = query_user_by_nickname(conn, &key)? {
                if user.display_name.as_deref() != Some(display.as_str()) {
                    conn.execute(
                        "UPDATE users SET display_name = ?1 WHERE id = ?2",
                        rusqlite::params![display, user.id],
                    )?;
                    return Ok(UserRow {
                        display_name: Some(display),
                        ..user
                    });
                }
                return Ok(user);
            }

            match conn.execute(
                "INSERT INTO users (nickname, display_name) VALUES (?1, ?2)",
                rusqlite::params![key, display],
            ) {
                Ok(_) => {}
                // Lost a concurrent first-insert race: the unique index
                // already holds this nickname. Fall through to the re-read.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation => {}
                Err(e) => return Err(e.into()),
            }

            query_user_by_nickname(conn, &key)?
                .ok_or_else(|| anyhow!("user missing after insert: {}", key))
        })
    }

    pub fn get_user_by_nickname(&self, key: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_nickname(conn, key))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nickname, display_name, created_at FROM users WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_user_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nickname, display_name, created_at FROM users ORDER BY nickname",
            )?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message with sentiment fields unset and read the full
    /// row back, so the caller gets the assigned id and timestamp.
    pub fn insert_message(&self, user_id: i64, user_display: &str, text: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_display, user_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_display, user_id, text],
            )?;
            let id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "SELECT id, user_id, user_display, text, sentiment_label, sentiment_score, created_at
                 FROM messages WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_message_row)?;
            Ok(row)
        })
    }

    /// The single post-analysis update. Either field may be NULL when
    /// the provider's response did not normalize.
    pub fn set_message_sentiment(
        &self,
        message_id: i64,
        label: Option<&str>,
        score: Option<f64>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET sentiment_label = ?1, sentiment_score = ?2 WHERE id = ?3",
                rusqlite::params![label, score, message_id],
            )?;
            Ok(())
        })
    }

    /// Global feed: the newest `limit` messages, re-ordered oldest-first
    /// for display. The user column prefers the owner's current display
    /// name over the name captured at submit time.
    pub fn list_recent_messages(&self, limit: u32) -> Result<Vec<FeedRow>> {
        let limit = clamp_limit(limit);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, display_name, user_display, sentiment_label, sentiment_score, created_at
                 FROM (
                     SELECT m.id AS id, m.text AS text, u.display_name AS display_name,
                            m.user_display AS user_display, m.sentiment_label AS sentiment_label,
                            m.sentiment_score AS sentiment_score, m.created_at AS created_at
                     FROM messages m
                     LEFT JOIN users u ON m.user_id = u.id
                     ORDER BY m.id DESC
                     LIMIT ?1
                 )
                 ORDER BY created_at ASC, id ASC",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    let user_display: String = row.get(3)?;
                    Ok(FeedRow {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        user: row.get::<_, Option<String>>(2)?.unwrap_or(user_display),
                        sentiment_label: row.get(4)?,
                        sentiment_score: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Messages of one user, newest first.
    pub fn list_messages_by_user(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        let limit = clamp_limit(limit);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, user_display, text, sentiment_label, sentiment_score, created_at
                 FROM messages WHERE user_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        nickname: row.get(1)?,
        display_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_display: row.get(2)?,
        text: row.get(3)?,
        sentiment_label: row.get(4)?,
        sentiment_score: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_user_by_nickname(conn: &Connection, key: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn
        .prepare("SELECT id, nickname, display_name, created_at FROM users WHERE nickname = ?1")?;

    let row = stmt.query_row([key], map_user_row).optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn resolver_is_case_insensitive() {
        let db = db();

        let first = db.resolve_user("Alice").unwrap();
        let second = db.resolve_user("  ALICE  ").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.nickname, "alice");
        // Last-submitted casing wins.
        assert_eq!(second.display_name.as_deref(), Some("ALICE"));

        let reread = db.get_user_by_nickname("alice").unwrap().unwrap();
        assert_eq!(reread.display_name.as_deref(), Some("ALICE"));
    }

    #[test]
    fn resolver_keeps_display_when_unchanged() {
        let db = db();

        db.resolve_user("Bob").unwrap();
        let again = db.resolve_user("Bob").unwrap();
        assert_eq!(again.display_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn limit_clamping() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(500), 100);
        assert_eq!(clamp_limit(37), 37);
    }

    #[test]
    fn message_starts_without_sentiment_and_updates_once() {
        let db = db();
        let user = db.resolve_user("carol").unwrap();

        let msg = db.insert_message(user.id, "carol", "what a day").unwrap();
        assert!(msg.sentiment_label.is_none());
        assert!(msg.sentiment_score.is_none());

        db.set_message_sentiment(msg.id, Some("positive"), Some(0.92)).unwrap();

        let rows = db.list_messages_by_user(user.id, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sentiment_label.as_deref(), Some("positive"));
        assert_eq!(rows[0].sentiment_score, Some(0.92));
    }

    #[test]
    fn feed_takes_newest_then_orders_chronologically() {
        let db = db();
        let user = db.resolve_user("dave").unwrap();

        let m1 = db.insert_message(user.id, "dave", "one").unwrap();
        let m2 = db.insert_message(user.id, "dave", "two").unwrap();
        let m3 = db.insert_message(user.id, "dave", "three").unwrap();

        // Newest two are m2/m3; displayed oldest-first.
        let feed = db.list_recent_messages(2).unwrap();
        assert_eq!(feed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![m2.id, m3.id]);
        let _ = m1;
    }

    #[test]
    fn feed_prefers_current_display_name() {
        let db = db();
        let user = db.resolve_user("Eve").unwrap();
        db.insert_message(user.id, "Eve", "hello").unwrap();

        // The user re-registers with different casing after posting.
        db.resolve_user("EVE").unwrap();

        let feed = db.list_recent_messages(10).unwrap();
        assert_eq!(feed[0].user, "EVE");
    }

    #[test]
    fn by_user_listing_is_newest_first() {
        let db = db();
        let user = db.resolve_user("frank").unwrap();
        let other = db.resolve_user("grace").unwrap();

        db.insert_message(user.id, "frank", "a").unwrap();
        let m2 = db.insert_message(user.id, "frank", "b").unwrap();
        db.insert_message(other.id, "grace", "c").unwrap();

        let rows = db.list_messages_by_user(user.id, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, m2.id);
    }

    #[test]
    fn deleting_user_cascades_messages() {
        let db = db();
        let user = db.resolve_user("hank").unwrap();
        db.insert_message(user.id, "hank", "bye").unwrap();

        db.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [user.id])?;
            Ok(())
        })
        .unwrap();

        let rows = db.list_messages_by_user(user.id, 10).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_nickname_resolves_to_none() {
        let db = db();
        assert!(db.get_user_by_nickname("nobody").unwrap().is_none());
        assert!(db.get_user_by_id(42).unwrap().is_none());
    }

    #[test]
    fn users_listing_is_ordered_by_nickname() {
        let db = db();
        db.resolve_user("zoe").unwrap();
        db.resolve_user("Adam").unwrap();

        let users = db.list_users().unwrap();
        let names: Vec<_> = users.iter().map(|u| u.nickname.as_str()).collect();
        assert_eq!(names, vec!["adam", "zoe"]);
    }
}
