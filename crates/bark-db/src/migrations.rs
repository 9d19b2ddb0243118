use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            picture     TEXT NOT NULL DEFAULT '/user-picture.png',
            roles       TEXT NOT NULL DEFAULT 'User',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS barks (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            creator_id  TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_barks_creator
            ON barks(creator_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            creator_id  TEXT NOT NULL REFERENCES users(id),
            bark_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reports (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            bark_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_bark
            ON reports(bark_id);

        -- Reference lists: each row is one entry in an owner's id array.
        -- Not foreign-keyed to the referenced entity; cleanup is explicit
        -- in the delete paths, and a missed cleanup leaves a dangling
        -- reference behind.
        CREATE TABLE IF NOT EXISTS user_barks (
            user_id     TEXT NOT NULL,
            bark_id     TEXT NOT NULL,
            PRIMARY KEY (user_id, bark_id)
        );

        CREATE TABLE IF NOT EXISTS bark_comments (
            bark_id     TEXT NOT NULL,
            comment_id  TEXT NOT NULL,
            PRIMARY KEY (bark_id, comment_id)
        );

        CREATE TABLE IF NOT EXISTS following (
            user_id     TEXT NOT NULL,
            target_id   TEXT NOT NULL,
            PRIMARY KEY (user_id, target_id)
        );

        -- Inbound edges kept separately from `following` so the two
        -- directions can disagree; the follow toggle treats a mixed
        -- state as a no-op instead of repairing it.
        CREATE TABLE IF NOT EXISTS followers (
            user_id     TEXT NOT NULL,
            follower_id TEXT NOT NULL,
            PRIMARY KEY (user_id, follower_id)
        );

        CREATE TABLE IF NOT EXISTS liked_barks (
            user_id     TEXT NOT NULL,
            bark_id     TEXT NOT NULL,
            PRIMARY KEY (user_id, bark_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
