//! Follow graph: directed (follower -> author) edges.

use std::fmt;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::info;
use uuid::Uuid;

use crate::{Database, DbError, DbResult};

/// How many edges a user may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FollowPolicy {
    /// A follower holds at most one edge, and an author already followed by
    /// someone accepts no new followers.
    #[default]
    Exclusive,
    /// Any number of edges; only self-follows and duplicates are refused.
    Multi,
}

impl FromStr for FollowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" => Ok(FollowPolicy::Exclusive),
            "multi" => Ok(FollowPolicy::Multi),
            other => Err(format!("unknown follow policy '{other}' (expected exclusive or multi)")),
        }
    }
}

impl fmt::Display for FollowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowPolicy::Exclusive => f.write_str("exclusive"),
            FollowPolicy::Multi => f.write_str("multi"),
        }
    }
}

/// Result of a follow request. Only `Created` writes an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    SelfFollow,
    AlreadyFollowing,
    /// Refused by [`FollowPolicy::Exclusive`].
    LimitReached,
}

impl Database {
    /// Creates the edge `follower -> author` unless the policy refuses it.
    /// The checks and the insert share one IMMEDIATE transaction.
    pub fn follow(
        &self,
        follower: Uuid,
        author: Uuid,
        policy: FollowPolicy,
    ) -> DbResult<FollowOutcome> {
        if follower == author {
            return Ok(FollowOutcome::SelfFollow);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let follower_id = follower.to_string();
            let author_id = author.to_string();

            if edge_id(&tx, &follower_id, &author_id)?.is_some() {
                return Ok(FollowOutcome::AlreadyFollowing);
            }

            if policy == FollowPolicy::Exclusive {
                let held = count_where(&tx, "user_id", &follower_id)?;
                let followers = count_where(&tx, "author_id", &author_id)?;
                if held > 0 || followers > 0 {
                    return Ok(FollowOutcome::LimitReached);
                }
            }

            tx.execute(
                "INSERT INTO follows (user_id, author_id) VALUES (?1, ?2)",
                params![follower_id, author_id],
            )?;
            tx.commit()?;

            info!("{} now follows {}", follower, author);
            Ok(FollowOutcome::Created)
        })
    }

    /// Removes the edge. A missing edge is [`DbError::NotFound`], not a no-op.
    pub fn unfollow(&self, follower: Uuid, author: Uuid) -> DbResult<()> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
                params![follower.to_string(), author.to_string()],
            )?;
            if n == 0 {
                return Err(DbError::NotFound(format!("follow {follower} -> {author}")));
            }
            info!("{} unfollowed {}", follower, author);
            Ok(())
        })
    }

    pub fn is_following(&self, follower: Uuid, author: Uuid) -> DbResult<bool> {
        self.with_conn(|conn| {
            Ok(edge_id(conn, &follower.to_string(), &author.to_string())?.is_some())
        })
    }
}

fn edge_id(conn: &Connection, follower: &str, author: &str) -> DbResult<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM follows WHERE user_id = ?1 AND author_id = ?2",
            params![follower, author],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn count_where(conn: &Connection, column: &str, value: &str) -> DbResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM follows WHERE {column} = ?1");
    let n: i64 = conn.query_row(&sql, [value], |r| r.get(0))?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::user;

    fn followers(db: &Database, author: Uuid) -> u64 {
        db.with_conn(|conn| count_where(conn, "author_id", &author.to_string()))
            .unwrap()
    }

    #[test]
    fn follow_then_unfollow() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "reader");
        let a = user(&db, "writer");

        assert!(!db.is_following(u, a).unwrap());
        assert_eq!(db.follow(u, a, FollowPolicy::Exclusive).unwrap(), FollowOutcome::Created);
        assert!(db.is_following(u, a).unwrap());
        assert!(!db.is_following(a, u).unwrap());
        assert_eq!(followers(&db, a), 1);

        db.unfollow(u, a).unwrap();
        assert!(!db.is_following(u, a).unwrap());
        assert_eq!(followers(&db, a), 0);
    }

    #[test]
    fn self_follow_never_creates_an_edge() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "narcissus");
        for policy in [FollowPolicy::Exclusive, FollowPolicy::Multi] {
            assert_eq!(db.follow(u, u, policy).unwrap(), FollowOutcome::SelfFollow);
        }
        assert!(!db.is_following(u, u).unwrap());
    }

    #[test]
    fn duplicate_follow_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "reader");
        let a = user(&db, "writer");
        for policy in [FollowPolicy::Exclusive, FollowPolicy::Multi] {
            db.follow(u, a, policy).unwrap();
            assert_eq!(db.follow(u, a, policy).unwrap(), FollowOutcome::AlreadyFollowing);
        }
        assert_eq!(followers(&db, a), 1);
    }

    #[test]
    fn exclusive_allows_one_followee_per_follower() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "reader");
        let a = user(&db, "first");
        let b = user(&db, "second");

        db.follow(u, a, FollowPolicy::Exclusive).unwrap();
        assert_eq!(db.follow(u, b, FollowPolicy::Exclusive).unwrap(), FollowOutcome::LimitReached);
        assert!(!db.is_following(u, b).unwrap());

        // Once the first edge is gone the second follow goes through
        db.unfollow(u, a).unwrap();
        assert_eq!(db.follow(u, b, FollowPolicy::Exclusive).unwrap(), FollowOutcome::Created);
    }

    #[test]
    fn exclusive_refuses_an_already_followed_author() {
        let db = Database::open_in_memory().unwrap();
        let first = user(&db, "first-fan");
        let second = user(&db, "second-fan");
        let a = user(&db, "writer");

        db.follow(first, a, FollowPolicy::Exclusive).unwrap();
        assert_eq!(
            db.follow(second, a, FollowPolicy::Exclusive).unwrap(),
            FollowOutcome::LimitReached
        );
        assert_eq!(db.follow(second, a, FollowPolicy::Multi).unwrap(), FollowOutcome::Created);
    }

    #[test]
    fn multi_allows_many_followees() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "reader");
        let a = user(&db, "first");
        let b = user(&db, "second");

        db.follow(u, a, FollowPolicy::Multi).unwrap();
        assert_eq!(db.follow(u, b, FollowPolicy::Multi).unwrap(), FollowOutcome::Created);
        assert!(db.is_following(u, a).unwrap());
        assert!(db.is_following(u, b).unwrap());
    }

    #[test]
    fn unfollow_without_edge_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "reader");
        let a = user(&db, "writer");
        assert!(matches!(db.unfollow(u, a), Err(DbError::NotFound(_))));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("exclusive".parse::<FollowPolicy>().unwrap(), FollowPolicy::Exclusive);
        assert_eq!(" Multi ".parse::<FollowPolicy>().unwrap(), FollowPolicy::Multi);
        assert!("sometimes".parse::<FollowPolicy>().is_err());
        assert_eq!(FollowPolicy::default().to_string(), "exclusive");
    }
}
