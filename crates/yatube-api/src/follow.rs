use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use tracing::{info, warn};

use yatube_db::{DbError, FeedKind, FollowOutcome};
use yatube_types::api::{Claims, FollowContext, PageQuery};

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::posts::profile_url;

const FOLLOW_TITLE: &str = "Posts from authors you follow";

/// GET /follow/: posts by everyone the viewer follows. Following nobody
/// gives an empty feed.
pub async fn follow_index(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FollowContext>, AppError> {
    let paginator = state.config.paginator();
    let viewer = claims.sub;
    let page_obj = db_call(&state, move |db| {
        db.feed_page(FeedKind::Following(viewer), paginator, query.page.as_deref())
    })
    .await?;

    Ok(Json(FollowContext {
        title: FOLLOW_TITLE,
        page_obj,
    }))
}

/// POST /profile/{username}/follow/: refused follows are logged and still
/// land on the profile.
pub async fn profile_follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let follower = claims.sub;
    let policy = state.config.follow_policy;
    let target = username.clone();
    let outcome = db_call(&state, move |db| {
        let author = db
            .get_user_by_username(&target)?
            .ok_or_else(|| DbError::NotFound(format!("user {target}")))?;
        db.follow(follower, author.user_id()?, policy)
    })
    .await?;

    match outcome {
        FollowOutcome::Created => info!("{} followed {}", claims.username, username),
        refused => warn!(
            "{} may not follow {}: {:?} ({} policy)",
            claims.username, username, refused, policy
        ),
    }
    Ok(Redirect::to(&profile_url(&username)))
}

/// POST /profile/{username}/unfollow/: a missing edge is a 404.
pub async fn profile_unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let follower = claims.sub;
    let target = username.clone();
    db_call(&state, move |db| {
        let author = db
            .get_user_by_username(&target)?
            .ok_or_else(|| DbError::NotFound(format!("user {target}")))?;
        db.unfollow(follower, author.user_id()?)
    })
    .await?;

    info!("{} unfollowed {}", claims.username, username);
    Ok(Redirect::to(&profile_url(&username)))
}
