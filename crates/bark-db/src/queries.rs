use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{BarkRow, CommentRow, ReportRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        username: &str,
        password_hash: &str,
        picture: &str,
        roles: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, password, picture, roles)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, email, username, password_hash, picture, roles),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// All users in insertion order. The suggestion algorithm depends on
    /// this order being stable within a process.
    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, username, password, picture, roles, created_at
                 FROM users ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    // -- Follow graph --
    //
    // Outbound and inbound edges live in separate tables, one row per
    // entry in what the document model kept as per-user id arrays. The
    // two directions are written independently and can disagree.

    pub fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_id_list(
            conn,
            "SELECT target_id FROM following WHERE user_id = ?1 ORDER BY rowid",
            user_id,
        ))
    }

    pub fn follower_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_id_list(
            conn,
            "SELECT follower_id FROM followers WHERE user_id = ?1 ORDER BY rowid",
            user_id,
        ))
    }

    pub fn is_following(&self, user_id: &str, target_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM following WHERE user_id = ?1 AND target_id = ?2",
                (user_id, target_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn is_follower(&self, user_id: &str, follower_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM followers WHERE user_id = ?1 AND follower_id = ?2",
                (user_id, follower_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn add_following(&self, user_id: &str, target_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO following (user_id, target_id) VALUES (?1, ?2)",
                (user_id, target_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_following(&self, user_id: &str, target_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM following WHERE user_id = ?1 AND target_id = ?2",
                (user_id, target_id),
            )?;
            Ok(())
        })
    }

    pub fn add_follower(&self, user_id: &str, follower_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO followers (user_id, follower_id) VALUES (?1, ?2)",
                (user_id, follower_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_follower(&self, user_id: &str, follower_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM followers WHERE user_id = ?1 AND follower_id = ?2",
                (user_id, follower_id),
            )?;
            Ok(())
        })
    }

    // -- Liked set --

    pub fn liked_bark_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_id_list(
            conn,
            "SELECT bark_id FROM liked_barks WHERE user_id = ?1 ORDER BY rowid",
            user_id,
        ))
    }

    pub fn has_liked(&self, user_id: &str, bark_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM liked_barks WHERE user_id = ?1 AND bark_id = ?2",
                (user_id, bark_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn add_liked(&self, user_id: &str, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO liked_barks (user_id, bark_id) VALUES (?1, ?2)",
                (user_id, bark_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_liked(&self, user_id: &str, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM liked_barks WHERE user_id = ?1 AND bark_id = ?2",
                (user_id, bark_id),
            )?;
            Ok(())
        })
    }

    /// Adjust the denormalized like counter. Kept separate from the
    /// liked-set write; the two are not one transaction.
    pub fn bump_likes(&self, bark_id: &str, delta: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE barks SET likes = likes + ?1 WHERE id = ?2",
                (delta, bark_id),
            )?;
            Ok(())
        })
    }

    // -- Barks --

    pub fn insert_bark(&self, id: &str, content: &str, creator_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO barks (id, content, creator_id) VALUES (?1, ?2, ?3)",
                (id, content, creator_id),
            )?;
            Ok(())
        })
    }

    pub fn get_bark(&self, id: &str) -> Result<Option<BarkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.content, b.likes, b.creator_id, u.username, b.created_at
                 FROM barks b
                 LEFT JOIN users u ON b.creator_id = u.id
                 WHERE b.id = ?1",
            )?;
            let row = stmt.query_row([id], map_bark).optional()?;
            Ok(row)
        })
    }

    /// Returns whether a row was actually deleted.
    pub fn delete_bark(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM barks WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Feed query: barks by any of the given creators, newest first, with
    /// the creator username joined in a single query (eliminates N+1).
    pub fn barks_by_creators(&self, creator_ids: &[String]) -> Result<Vec<BarkRow>> {
        if creator_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=creator_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT b.id, b.content, b.likes, b.creator_id, u.username, b.created_at
                 FROM barks b
                 LEFT JOIN users u ON b.creator_id = u.id
                 WHERE b.creator_id IN ({})
                 ORDER BY b.created_at DESC, b.rowid DESC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = creator_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_bark)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch barks by id, preserving the order of `ids`. Ids with
    /// no backing row (dangling references) are silently skipped.
    pub fn barks_by_ids(&self, ids: &[String]) -> Result<Vec<BarkRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT b.id, b.content, b.likes, b.creator_id, u.username, b.created_at
                 FROM barks b
                 LEFT JOIN users u ON b.creator_id = u.id
                 WHERE b.id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), map_bark)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut by_id: HashMap<String, BarkRow> =
                rows.into_iter().map(|r| (r.id.clone(), r)).collect();
            Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
        })
    }

    pub fn user_bark_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_id_list(
            conn,
            "SELECT bark_id FROM user_barks WHERE user_id = ?1 ORDER BY rowid",
            user_id,
        ))
    }

    pub fn add_user_bark(&self, user_id: &str, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_barks (user_id, bark_id) VALUES (?1, ?2)",
                (user_id, bark_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_user_bark(&self, user_id: &str, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM user_barks WHERE user_id = ?1 AND bark_id = ?2",
                (user_id, bark_id),
            )?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        content: &str,
        creator_id: &str,
        bark_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, content, creator_id, bark_id) VALUES (?1, ?2, ?3, ?4)",
                (id, content, creator_id, bark_id),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.content, c.creator_id, u.username, c.bark_id, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.creator_id = u.id
                 WHERE c.id = ?1",
            )?;
            let row = stmt.query_row([id], map_comment).optional()?;
            Ok(row)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Batch-fetch comments by id, preserving list order and skipping
    /// dangling references.
    pub fn comments_by_ids(&self, ids: &[String]) -> Result<Vec<CommentRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT c.id, c.content, c.creator_id, u.username, c.bark_id, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.creator_id = u.id
                 WHERE c.id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut by_id: HashMap<String, CommentRow> =
                rows.into_iter().map(|r| (r.id.clone(), r)).collect();
            Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
        })
    }

    pub fn bark_comment_ids(&self, bark_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_id_list(
            conn,
            "SELECT comment_id FROM bark_comments WHERE bark_id = ?1 ORDER BY rowid",
            bark_id,
        ))
    }

    pub fn add_bark_comment(&self, bark_id: &str, comment_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO bark_comments (bark_id, comment_id) VALUES (?1, ?2)",
                (bark_id, comment_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_bark_comment(&self, bark_id: &str, comment_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM bark_comments WHERE bark_id = ?1 AND comment_id = ?2",
                (bark_id, comment_id),
            )?;
            Ok(())
        })
    }

    pub fn clear_bark_comments(&self, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM bark_comments WHERE bark_id = ?1", [bark_id])?;
            Ok(())
        })
    }

    // -- Reports --

    pub fn insert_report(&self, id: &str, content: &str, bark_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO reports (id, content, bark_id) VALUES (?1, ?2, ?3)",
                (id, content, bark_id),
            )?;
            Ok(())
        })
    }

    pub fn list_reports(&self) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, bark_id, created_at FROM reports ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReportRow {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        bark_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_reports_for_bark(&self, bark_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM reports WHERE bark_id = ?1", [bark_id])?;
            Ok(changed)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a literal from the callers above, never user input.
    let sql = format!(
        "SELECT id, email, username, password, picture, roles, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn query_id_list(conn: &Connection, sql: &str, key: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([key], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        picture: row.get(4)?,
        roles: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_bark(row: &rusqlite::Row<'_>) -> rusqlite::Result<BarkRow> {
    Ok(BarkRow {
        id: row.get(0)?,
        content: row.get(1)?,
        likes: row.get(2)?,
        creator_id: row.get(3)?,
        creator_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(5)?,
    })
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        content: row.get(1)?,
        creator_id: row.get(2)?,
        creator_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        bark_id: row.get(4)?,
        created_at: row.get(5)?,
    })
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
    use crate::Database;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(
            &id,
            &format!("{}@bark.dev", name),
            name,
            "$argon2id$fake",
            "/user-picture.png",
            "User",
        )
        .unwrap();
        id
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        seed_user(&db, "rex");

        let id = uuid::Uuid::new_v4().to_string();
        let err = db.create_user(&id, "rex@bark.dev", "other", "h", "/p.png", "User");
        assert!(err.is_err());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = db();
        seed_user(&db, "rex");

        let id = uuid::Uuid::new_v4().to_string();
        let err = db.create_user(&id, "other@bark.dev", "rex", "h", "/p.png", "User");
        assert!(err.is_err());
    }

    #[test]
    fn follow_edge_directions_are_independent() {
        let db = db();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");

        db.add_following(&a, &b).unwrap();
        assert!(db.is_following(&a, &b).unwrap());
        // Inbound side untouched until written explicitly.
        assert!(!db.is_follower(&b, &a).unwrap());

        db.add_follower(&b, &a).unwrap();
        assert!(db.is_follower(&b, &a).unwrap());
        assert_eq!(db.follower_ids(&b).unwrap(), vec![a.clone()]);
        assert_eq!(db.following_ids(&a).unwrap(), vec![b.clone()]);

        db.remove_following(&a, &b).unwrap();
        db.remove_follower(&b, &a).unwrap();
        assert!(db.following_ids(&a).unwrap().is_empty());
        assert!(db.follower_ids(&b).unwrap().is_empty());
    }

    #[test]
    fn liked_set_and_counter_are_separate_writes() {
        let db = db();
        let u = seed_user(&db, "u");
        let bark = uuid::Uuid::new_v4().to_string();
        db.insert_bark(&bark, "woof", &u).unwrap();

        assert!(!db.has_liked(&u, &bark).unwrap());
        db.add_liked(&u, &bark).unwrap();
        db.bump_likes(&bark, 1).unwrap();
        assert!(db.has_liked(&u, &bark).unwrap());
        assert_eq!(db.get_bark(&bark).unwrap().unwrap().likes, 1);

        db.remove_liked(&u, &bark).unwrap();
        db.bump_likes(&bark, -1).unwrap();
        assert!(!db.has_liked(&u, &bark).unwrap());
        assert_eq!(db.get_bark(&bark).unwrap().unwrap().likes, 0);
    }

    #[test]
    fn bark_round_trip_and_delete() {
        let db = db();
        let u = seed_user(&db, "u");
        let bark = uuid::Uuid::new_v4().to_string();
        db.insert_bark(&bark, "first bark", &u).unwrap();

        let row = db.get_bark(&bark).unwrap().unwrap();
        assert_eq!(row.content, "first bark");
        assert_eq!(row.creator_username, "u");
        assert_eq!(row.likes, 0);

        assert!(db.delete_bark(&bark).unwrap());
        assert!(db.get_bark(&bark).unwrap().is_none());
        assert!(!db.delete_bark(&bark).unwrap());
    }

    #[test]
    fn comment_list_preserves_insertion_order() {
        let db = db();
        let u = seed_user(&db, "u");
        let bark = uuid::Uuid::new_v4().to_string();
        db.insert_bark(&bark, "woof", &u).unwrap();

        let mut ids = vec![];
        for text in ["one", "two", "three"] {
            let cid = uuid::Uuid::new_v4().to_string();
            db.insert_comment(&cid, text, &u, &bark).unwrap();
            db.add_bark_comment(&bark, &cid).unwrap();
            ids.push(cid);
        }

        assert_eq!(db.bark_comment_ids(&bark).unwrap(), ids);

        let rows = db.comments_by_ids(&ids).unwrap();
        let contents: Vec<_> = rows.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn dangling_comment_references_are_skipped() {
        let db = db();
        let u = seed_user(&db, "u");
        let bark = uuid::Uuid::new_v4().to_string();
        db.insert_bark(&bark, "woof", &u).unwrap();

        let cid = uuid::Uuid::new_v4().to_string();
        db.insert_comment(&cid, "real", &u, &bark).unwrap();
        db.add_bark_comment(&bark, &cid).unwrap();
        // Reference with no backing row.
        db.add_bark_comment(&bark, "gone").unwrap();

        let ids = db.bark_comment_ids(&bark).unwrap();
        assert_eq!(ids.len(), 2);
        let rows = db.comments_by_ids(&ids).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "real");
    }

    #[test]
    fn reports_list_and_cascade_delete() {
        let db = db();
        let u = seed_user(&db, "u");
        let bark = uuid::Uuid::new_v4().to_string();
        db.insert_bark(&bark, "woof", &u).unwrap();

        for _ in 0..2 {
            let rid = uuid::Uuid::new_v4().to_string();
            db.insert_report(&rid, "this bark is misleading", &bark).unwrap();
        }

        assert_eq!(db.list_reports().unwrap().len(), 2);
        assert_eq!(db.delete_reports_for_bark(&bark).unwrap(), 2);
        assert!(db.list_reports().unwrap().is_empty());
    }
}
