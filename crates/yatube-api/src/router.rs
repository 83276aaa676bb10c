use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{attach_viewer, require_auth};
use crate::{about, error, follow, posts};

/// Assembles every route. The viewer middleware wraps everything; the auth
/// gate only wraps the routes that need a signed-in user.
pub fn build(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/profile/{username}/", get(posts::profile))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route("/about/author/", get(about::author))
        .route("/about/tech/", get(about::tech))
        .route("/auth/signup/", post(auth::signup))
        .route("/auth/login/", get(auth::login_page).post(auth::login))
        .route("/auth/logout/", post(auth::logout));

    let protected_routes = Router::new()
        .route("/create/", get(posts::create_form).post(posts::post_create))
        .route("/posts/{post_id}/edit/", get(posts::edit_form).post(posts::post_edit))
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .route("/follow/", get(follow::follow_index))
        .route("/profile/{username}/follow/", post(follow::profile_follow))
        .route("/profile/{username}/unfollow/", post(follow::profile_unfollow))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(error::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), attach_viewer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
