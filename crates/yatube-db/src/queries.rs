use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use yatube_types::models::{Comment, Group, Post};

use crate::models::{CommentRow, PostRow, UserRow};
use crate::{Database, DbError, DbResult};

/// Editable columns of a post. `created_at` and the author are fixed at
/// insert time and never touched by updates.
#[derive(Debug, Clone, Copy)]
pub struct PostFields<'a> {
    pub text: &'a str,
    pub group_id: Option<i64>,
    pub image: Option<&'a str>,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: Uuid, username: &str, password_hash: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                params![id.to_string(), username, password_hash],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    /// Removes the user together with their posts, comments and follow
    /// edges in both directions (ON DELETE CASCADE).
    pub fn delete_user(&self, id: Uuid) -> DbResult<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            if n == 0 {
                return Err(DbError::NotFound(format!("user {id}")));
            }
            info!("Deleted user {}", id);
            Ok(())
        })
    }

    // -- Groups --

    pub fn create_group(&self, title: &str, slug: &str, description: &str) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
                params![title, slug, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_group_by_slug(&self, slug: &str) -> DbResult<Option<Group>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
                [slug],
                group_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn list_groups(&self) -> DbResult<Vec<Group>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title, id")?;
            let groups = stmt
                .query_map([], group_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(groups)
        })
    }

    /// Posts filed under the group survive with their group cleared.
    pub fn delete_group(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM post_groups WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(DbError::NotFound(format!("group {id}")));
            }
            info!("Deleted group {}", id);
            Ok(())
        })
    }

    // -- Posts --

    pub fn create_post(&self, author_id: Uuid, fields: PostFields<'_>) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (text, author_id, group_id, image) VALUES (?1, ?2, ?3, ?4)",
                params![fields.text, author_id.to_string(), fields.group_id, fields.image],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> DbResult<Option<Post>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM posts p
                 JOIN users u ON u.id = p.author_id
                 LEFT JOIN post_groups g ON g.id = p.group_id
                 WHERE p.id = ?1",
                PostRow::COLUMNS
            );
            conn.query_row(&sql, [id], PostRow::from_row)
                .optional()?
                .map(Post::try_from)
                .transpose()
        })
    }

    pub fn update_post(&self, id: i64, fields: PostFields<'_>) -> DbResult<()> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE posts SET text = ?1, group_id = ?2, image = ?3 WHERE id = ?4",
                params![fields.text, fields.group_id, fields.image, id],
            )?;
            if n == 0 {
                return Err(DbError::NotFound(format!("post {id}")));
            }
            Ok(())
        })
    }

    pub fn delete_post(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(DbError::NotFound(format!("post {id}")));
            }
            Ok(())
        })
    }

    pub fn count_posts(&self) -> DbResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    pub fn count_posts_by_author(&self, author_id: Uuid) -> DbResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                [author_id.to_string()],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, post_id: i64, author_id: Uuid, text: &str) -> DbResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
                params![post_id, author_id.to_string(), text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Comments on a post, oldest first.
    pub fn get_comments(&self, post_id: i64) -> DbResult<Vec<Comment>> {
        self.with_conn(|conn| {
            // JOIN users to fetch author_username in a single query
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created_at
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.id",
            )?;

            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        text: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(Comment::try_from).collect()
        })
    }

    pub fn count_comments(&self) -> DbResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> DbResult<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {column} = ?1", UserRow::COLUMNS);
    let row = conn.query_row(&sql, [value], UserRow::from_row).optional()?;
    Ok(row)
}

fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}
