//! Query/feed builder: every post listing goes through [`FeedKind`] so that
//! all views share one ordering (newest first, ties broken by id descending).

use rusqlite::{Connection, params_from_iter, types::Value};
use uuid::Uuid;

use yatube_types::api::Page;
use yatube_types::models::Post;

use crate::models::PostRow;
use crate::paginator::Paginator;
use crate::{Database, DbResult};

/// Deterministic feed order shared by every view.
const FEED_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

/// Which posts a feed shows. Callers resolve slugs and usernames to ids
/// first, so an unknown group or author is reported before any feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Every post.
    All,
    /// Posts filed under one group.
    Group(i64),
    /// Posts written by one author.
    Author(Uuid),
    /// Posts by every author the given user follows.
    Following(Uuid),
}

impl FeedKind {
    fn filter(&self) -> (&'static str, Vec<Value>) {
        match self {
            FeedKind::All => ("", vec![]),
            FeedKind::Group(id) => ("WHERE p.group_id = ?1", vec![Value::Integer(*id)]),
            FeedKind::Author(id) => ("WHERE p.author_id = ?1", vec![Value::Text(id.to_string())]),
            FeedKind::Following(id) => (
                "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?1)",
                vec![Value::Text(id.to_string())],
            ),
        }
    }
}

impl Database {
    /// One page of a feed. Count and slice are read under the same lock so
    /// the page metadata matches the items.
    pub fn feed_page(
        &self,
        kind: FeedKind,
        paginator: Paginator,
        requested: Option<&str>,
    ) -> DbResult<Page<Post>> {
        self.with_conn(|conn| {
            let count = count_posts(conn, kind)?;
            let window = paginator.window(requested, count);
            let items = select_posts(conn, kind, window.limit(), window.offset())?;
            Ok(window.into_page(items))
        })
    }
}

fn count_posts(conn: &Connection, kind: FeedKind) -> DbResult<u64> {
    let (filter, args) = kind.filter();
    let sql = format!("SELECT COUNT(*) FROM posts p {filter}");
    let n: i64 = conn.query_row(&sql, params_from_iter(args), |r| r.get(0))?;
    Ok(n as u64)
}

fn select_posts(conn: &Connection, kind: FeedKind, limit: u32, offset: u64) -> DbResult<Vec<Post>> {
    let (filter, mut args) = kind.filter();
    let n = args.len();
    let sql = format!(
        "SELECT {} FROM posts p
         JOIN users u ON u.id = p.author_id
         LEFT JOIN post_groups g ON g.id = p.group_id
         {filter} {FEED_ORDER} LIMIT ?{} OFFSET ?{}",
        PostRow::COLUMNS,
        n + 1,
        n + 2
    );
    args.push(Value::Integer(i64::from(limit)));
    args.push(Value::Integer(offset as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), PostRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(Post::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FollowPolicy;
    use crate::queries::tests::{post, user};

    /// Every post of the feed on one page.
    fn whole(db: &Database, kind: FeedKind) -> Vec<Post> {
        db.feed_page(kind, Paginator::new(1000), None).unwrap().items
    }

    fn count(db: &Database, kind: FeedKind) -> u64 {
        db.feed_page(kind, Paginator::new(1), None).unwrap().count
    }

    fn texts(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn global_feed_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let leo = user(&db, "leo");
        for i in 0..5 {
            post(&db, leo, &format!("post {i}"), None);
        }

        let feed = whole(&db, FeedKind::All);
        assert_eq!(texts(&feed), ["post 4", "post 3", "post 2", "post 1", "post 0"]);
    }

    #[test]
    fn timestamp_beats_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let leo = user(&db, "leo");
        let late = post(&db, leo, "written later", None);
        post(&db, leo, "written earlier", None);
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET created_at = '2100-01-01T00:00:00.000Z' WHERE id = ?1",
                [late],
            )?;
            Ok(())
        })
        .unwrap();

        let feed = whole(&db, FeedKind::All);
        assert_eq!(feed[0].id, late);
    }

    #[test]
    fn group_feed_only_holds_group_posts() {
        let db = Database::open_in_memory().unwrap();
        let leo = user(&db, "leo");
        let cats = db.create_group("Cats", "cats", "").unwrap();
        let dogs = db.create_group("Dogs", "dogs", "").unwrap();
        for i in 0..12 {
            post(&db, leo, &format!("cat {i}"), Some(cats));
        }
        for i in 12..14 {
            post(&db, leo, &format!("dog {i}"), Some(dogs));
        }
        post(&db, leo, "no group", None);

        let feed = whole(&db, FeedKind::Group(dogs));
        assert_eq!(texts(&feed), ["dog 13", "dog 12"]);
        assert_eq!(count(&db, FeedKind::Group(cats)), 12);
        assert_eq!(count(&db, FeedKind::All), 15);
    }

    #[test]
    fn author_feed_only_holds_author_posts() {
        let db = Database::open_in_memory().unwrap();
        let leo = user(&db, "leo");
        let ann = user(&db, "ann");
        post(&db, leo, "leo 1", None);
        post(&db, ann, "ann 1", None);
        post(&db, leo, "leo 2", None);

        let feed = whole(&db, FeedKind::Author(leo));
        assert_eq!(texts(&feed), ["leo 2", "leo 1"]);
        assert!(feed.iter().all(|p| p.author_id == leo));
    }

    #[test]
    fn follow_feed_tracks_follow_set() {
        let db = Database::open_in_memory().unwrap();
        let reader = user(&db, "reader");
        let writer = user(&db, "writer");
        let other = user(&db, "other");
        post(&db, writer, "followed post", None);
        post(&db, other, "unrelated post", None);

        assert!(whole(&db, FeedKind::Following(reader)).is_empty());

        db.follow(reader, writer, FollowPolicy::Exclusive).unwrap();
        let feed = whole(&db, FeedKind::Following(reader));
        assert_eq!(texts(&feed), ["followed post"]);

        // The writer follows nobody
        assert!(whole(&db, FeedKind::Following(writer)).is_empty());

        db.unfollow(reader, writer).unwrap();
        assert!(whole(&db, FeedKind::Following(reader)).is_empty());
    }

    #[test]
    fn pages_slice_the_feed() {
        let db = Database::open_in_memory().unwrap();
        let leo = user(&db, "leo");
        for i in 0..14 {
            post(&db, leo, &format!("post {i}"), None);
        }
        let paginator = Paginator::new(10);

        let first = db.feed_page(FeedKind::All, paginator, None).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].text, "post 13");
        assert!(first.has_next);

        let second = db.feed_page(FeedKind::All, paginator, Some("2")).unwrap();
        assert_eq!(second.items.len(), 4);
        assert_eq!(second.items[3].text, "post 0");
        assert_eq!(second.count, 14);

        let clamped = db.feed_page(FeedKind::All, paginator, Some("7")).unwrap();
        assert_eq!(clamped.number, 2);
        assert_eq!(texts(&clamped.items), texts(&second.items));
    }
}
