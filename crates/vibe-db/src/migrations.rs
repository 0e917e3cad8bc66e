use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            nickname      TEXT NOT NULL UNIQUE,
            display_name  TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_display     TEXT NOT NULL,
            user_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text             TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now')),
            sentiment_label  TEXT,
            sentiment_score  REAL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
