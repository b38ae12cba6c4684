use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::Result;
use crate::models::{CardRow, NewUser, UserRow};

const USER_COLUMNS: &str = "id, name, about, avatar, email, password, created_at";
const CARD_COLUMNS: &str = "id, name, link, owner_id, created_at";

/// Fixed-width UTC timestamp so lexical order matches time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    /// Inserts a user. A taken email surfaces as `StoreError::Duplicate`.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, about, avatar, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.about,
                    user.avatar,
                    user.email,
                    user.password_hash,
                    now_timestamp(),
                ],
            )?;
            query_user(conn, "id", user.id)?.ok_or(crate::StoreError::MissingReference)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Single-row update of name and about. `None` if the user is gone.
    pub fn update_user_profile(&self, id: &str, name: &str, about: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?1, about = ?2 WHERE id = ?3",
                (name, about, id),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, "id", id)
        })
    }

    pub fn update_user_avatar(&self, id: &str, avatar: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE users SET avatar = ?1 WHERE id = ?2", (avatar, id))?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, "id", id)
        })
    }

    // -- Cards --

    /// Inserts a card. An owner id with no user row surfaces as
    /// `StoreError::MissingReference`.
    pub fn create_card(&self, id: &str, name: &str, link: &str, owner_id: &str) -> Result<CardRow> {
        self.with_conn(|conn| {
            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO cards (id, name, link, owner_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, name, link, owner_id, &created_at),
            )?;
            Ok(CardRow {
                id: id.to_string(),
                name: name.to_string(),
                link: link.to_string(),
                owner_id: owner_id.to_string(),
                created_at,
                likes: vec![],
            })
        })
    }

    /// All cards, newest first, each with its likes.
    pub fn list_cards(&self) -> Result<Vec<CardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at DESC, rowid DESC"
            ))?;
            let mut cards = stmt
                .query_map([], card_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over likes instead of a query per card
            let mut likes: HashMap<String, Vec<String>> = HashMap::new();
            let mut stmt = conn.prepare("SELECT card_id, user_id FROM card_likes ORDER BY rowid")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;
            for row in rows {
                let (card_id, user_id) = row?;
                likes.entry(card_id).or_default().push(user_id);
            }

            for card in &mut cards {
                if let Some(ids) = likes.remove(&card.id) {
                    card.likes = ids;
                }
            }
            Ok(cards)
        })
    }

    pub fn get_card(&self, id: &str) -> Result<Option<CardRow>> {
        self.with_conn(|conn| query_card(conn, id))
    }

    /// Deletes a card and, through the cascade, its likes. Returns whether
    /// a row was removed.
    pub fn delete_card(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM cards WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Adds `user_id` to the card's likes. Liking twice leaves one like.
    /// `None` if the card does not exist.
    pub fn add_like(&self, card_id: &str, user_id: &str) -> Result<Option<CardRow>> {
        self.with_tx(|tx| {
            if !card_exists(tx, card_id)? {
                return Ok(None);
            }
            tx.execute(
                "INSERT OR IGNORE INTO card_likes (card_id, user_id) VALUES (?1, ?2)",
                (card_id, user_id),
            )?;
            query_card(tx, card_id)
        })
    }

    /// Removes `user_id` from the card's likes. Unliking a card that was
    /// never liked leaves it unchanged. `None` if the card does not exist.
    pub fn remove_like(&self, card_id: &str, user_id: &str) -> Result<Option<CardRow>> {
        self.with_tx(|tx| {
            if !card_exists(tx, card_id)? {
                return Ok(None);
            }
            tx.execute(
                "DELETE FROM card_likes WHERE card_id = ?1 AND user_id = ?2",
                (card_id, user_id),
            )?;
            query_card(tx, card_id)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        about: row.get(2)?,
        avatar: row.get(3)?,
        email: row.get(4)?,
        password: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        id: row.get(0)?,
        name: row.get(1)?,
        link: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
        likes: vec![],
    })
}

/// `column` is one of the fixed lookup keys above, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn card_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM cards WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_card(conn: &Connection, id: &str) -> Result<Option<CardRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"))?;
    let Some(mut card) = stmt.query_row([id], card_from_row).optional()? else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT user_id FROM card_likes WHERE card_id = ?1 ORDER BY rowid")?;
    card.likes = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(Some(card))
}
