//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the yatube-types models so the schema can drift without
//! touching the wire shapes.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use yatube_types::models::{Comment, GroupRef, Post, User};

use crate::{DbError, DbResult};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str = "id, username, password, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn user_id(&self) -> DbResult<Uuid> {
        parse_uuid(&self.id)
    }
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> DbResult<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            created_at: parse_timestamp(&row.created_at)?,
            username: row.username,
        })
    }
}

pub struct PostRow {
    pub id: i64,
    pub text: String,
    pub author_id: String,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
}

impl PostRow {
    /// Select list matching [`PostRow::from_row`]; expects `posts p`,
    /// `users u` and a LEFT JOIN on `post_groups g`.
    pub(crate) const COLUMNS: &'static str = "p.id, p.text, p.author_id, u.username, \
         p.group_id, g.title, g.slug, p.image, p.created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            author_id: row.get(2)?,
            author_username: row.get(3)?,
            group_id: row.get(4)?,
            group_title: row.get(5)?,
            group_slug: row.get(6)?,
            image: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<PostRow> for Post {
    type Error = DbError;

    fn try_from(row: PostRow) -> DbResult<Self> {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
            _ => None,
        };

        Ok(Post {
            id: row.id,
            author_id: parse_uuid(&row.author_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            text: row.text,
            author_username: row.author_username,
            group,
            image: row.image.filter(|s| !s.is_empty()),
        })
    }
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DbError;

    fn try_from(row: CommentRow) -> DbResult<Self> {
        Ok(Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: parse_uuid(&row.author_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            author_username: row.author_username,
            text: row.text,
        })
    }
}

pub(crate) fn parse_uuid(raw: &str) -> DbResult<Uuid> {
    raw.parse()
        .map_err(|e| DbError::Corrupt(format!("bad uuid '{raw}': {e}")))
}

/// Accepts RFC 3339 as written by the schema defaults, and SQLite's bare
/// `YYYY-MM-DD HH:MM:SS` for rows inserted by hand.
pub(crate) fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .map_err(|e| DbError::Corrupt(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_shapes() {
        let a = parse_timestamp("2024-03-01T10:20:30.123Z").unwrap();
        let b = parse_timestamp("2024-03-01 10:20:30").unwrap();
        assert_eq!(a.timestamp(), b.timestamp());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
