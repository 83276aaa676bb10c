use axum::{
    Extension, Form, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};

use yatube_db::queries::PostFields;
use yatube_db::{DbError, FeedKind};
use yatube_types::api::{
    Claims, CommentForm, CommentFormState, FormErrors, GroupContext, IndexContext, PageQuery,
    PostDetailContext, PostForm, PostFormContext, PostFormState, ProfileContext,
};
use yatube_types::models::{Group, User};

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::middleware::Viewer;

const INDEX_TITLE: &str = "Latest updates on the site";
const CREATE_TITLE: &str = "Add post";
const EDIT_TITLE: &str = "Edit post";
/// Characters of post text shown as the detail page title.
const DETAIL_TITLE_CHARS: usize = 30;
const MAX_IMAGE_REF_LEN: usize = 255;

pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn detail_url(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

/// GET /: global feed. The rendered body is served from the index page
/// cache while it is fresh, whatever `?page=` asks for.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let render_state = state.clone();
    let body = state
        .index_cache
        .get_or_render(|| async move {
            let paginator = render_state.config.paginator();
            let requested = query.page;
            let page_obj = db_call(&render_state, move |db| {
                db.feed_page(FeedKind::All, paginator, requested.as_deref())
            })
            .await?;
            render_json(&IndexContext {
                title: INDEX_TITLE,
                page_obj,
            })
        })
        .await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /group/{slug}/
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupContext>, AppError> {
    let paginator = state.config.paginator();
    let ctx = db_call(&state, move |db| {
        let group = db
            .get_group_by_slug(&slug)?
            .ok_or_else(|| DbError::NotFound(format!("group {slug}")))?;
        let page_obj = db.feed_page(FeedKind::Group(group.id), paginator, query.page.as_deref())?;
        Ok(GroupContext { group, page_obj })
    })
    .await?;

    Ok(Json(ctx))
}

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Viewer(viewer): Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileContext>, AppError> {
    let paginator = state.config.paginator();
    let ctx = db_call(&state, move |db| {
        let author: User = db
            .get_user_by_username(&username)?
            .ok_or_else(|| DbError::NotFound(format!("user {username}")))?
            .try_into()?;
        let following = match viewer {
            Some(claims) => db.is_following(claims.sub, author.id)?,
            None => false,
        };
        let page_obj = db.feed_page(FeedKind::Author(author.id), paginator, query.page.as_deref())?;
        Ok(ProfileContext {
            post_count: page_obj.count,
            author,
            following,
            page_obj,
        })
    })
    .await?;

    Ok(Json(ctx))
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostDetailContext>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let ctx = db_call(&state, move |db| {
        let post = db
            .get_post(post_id)?
            .ok_or_else(|| DbError::NotFound(format!("post {post_id}")))?;
        let comments = db.get_comments(post_id)?;
        let author_post_count = db.count_posts_by_author(post.author_id)?;
        Ok(PostDetailContext {
            post_title: post.excerpt(DETAIL_TITLE_CHARS).to_string(),
            post,
            author_post_count,
            comments,
            form: CommentFormState {
                text: String::new(),
            },
        })
    })
    .await?;

    Ok(Json(ctx))
}

/// GET /create/
pub async fn create_form(State(state): State<AppState>) -> Result<Json<PostFormContext>, AppError> {
    let groups = db_call(&state, |db| db.list_groups()).await?;
    Ok(Json(PostFormContext {
        title: CREATE_TITLE,
        is_edit: false,
        form: form_state(&PostForm::default(), groups, FormErrors::new()),
    }))
}

/// POST /create/: on success redirects to the author's profile.
pub async fn post_create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let author = claims.sub;
    let outcome = db_call(&state, move |db| {
        let groups = db.list_groups()?;
        match validate_post(&form, &groups) {
            Ok(valid) => db.create_post(author, valid.fields()).map(Ok),
            Err(errors) => Ok(Err(form_state(&form, groups, errors))),
        }
    })
    .await?;

    match outcome {
        Ok(post_id) => {
            info!("{} created post {}", claims.username, post_id);
            Ok(Redirect::to(&profile_url(&claims.username)).into_response())
        }
        Err(form) => {
            warn!("Rejected post form from {}", claims.username);
            Ok(invalid_form(CREATE_TITLE, false, form))
        }
    }
}

/// GET /posts/{post_id}/edit/: only the author sees the form; anyone else
/// is sent back to the post.
pub async fn edit_form(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let editor = claims.sub;
    let ctx = db_call(&state, move |db| {
        let post = db
            .get_post(post_id)?
            .ok_or_else(|| DbError::NotFound(format!("post {post_id}")))?;
        if post.author_id != editor {
            return Ok(None);
        }
        let initial = PostForm {
            text: post.text,
            group: post.group.map(|g| g.id.to_string()),
            image: post.image,
        };
        let groups = db.list_groups()?;
        Ok(Some(form_state(&initial, groups, FormErrors::new())))
    })
    .await?;

    match ctx {
        Some(form) => Ok(Json(PostFormContext {
            title: EDIT_TITLE,
            is_edit: true,
            form,
        })
        .into_response()),
        None => Ok(Redirect::to(&detail_url(post_id)).into_response()),
    }
}

enum EditOutcome {
    Saved,
    NotAuthor,
    Invalid(PostFormState),
}

/// POST /posts/{post_id}/edit/: fields missing from the submission keep
/// their stored values; an empty `group` or `image` clears it.
pub async fn post_edit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Form(mut form): Form<PostForm>,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let editor = claims.sub;
    let outcome = db_call(&state, move |db| {
        let post = db
            .get_post(post_id)?
            .ok_or_else(|| DbError::NotFound(format!("post {post_id}")))?;
        if post.author_id != editor {
            return Ok(EditOutcome::NotAuthor);
        }

        if form.group.is_none() {
            form.group = post.group.map(|g| g.id.to_string());
        }
        if form.image.is_none() {
            form.image = post.image;
        }

        let groups = db.list_groups()?;
        match validate_post(&form, &groups) {
            Ok(valid) => {
                db.update_post(post_id, valid.fields())?;
                Ok(EditOutcome::Saved)
            }
            Err(errors) => Ok(EditOutcome::Invalid(form_state(&form, groups, errors))),
        }
    })
    .await?;

    match outcome {
        EditOutcome::Saved => {
            info!("{} edited post {}", claims.username, post_id);
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        EditOutcome::NotAuthor => {
            warn!("{} tried to edit post {} they do not own", claims.username, post_id);
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        EditOutcome::Invalid(form) => {
            warn!("Rejected edit of post {} from {}", post_id, claims.username);
            Ok(invalid_form(EDIT_TITLE, true, form))
        }
    }
}

/// POST /posts/{post_id}/comment/: always lands back on the post; an empty
/// comment is dropped without a write.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let author = claims.sub;
    let created = db_call(&state, move |db| {
        if db.get_post(post_id)?.is_none() {
            return Err(DbError::NotFound(format!("post {post_id}")));
        }
        let text = form.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        db.create_comment(post_id, author, text).map(Some)
    })
    .await?;

    match created {
        Some(id) => info!("{} commented on post {} ({})", claims.username, post_id, id),
        None => warn!("Dropped empty comment from {} on post {}", claims.username, post_id),
    }
    Ok(Redirect::to(&detail_url(post_id)))
}

/// Validated post form, ready to write.
#[derive(Debug)]
struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<String>,
}

impl ValidPost {
    fn fields(&self) -> PostFields<'_> {
        PostFields {
            text: &self.text,
            group_id: self.group_id,
            image: self.image.as_deref(),
        }
    }
}

fn validate_post(form: &PostForm, groups: &[Group]) -> Result<ValidPost, FormErrors> {
    let mut errors = FormErrors::new();

    let text = form.text.trim();
    if text.is_empty() {
        errors.entry("text").or_default().push("This field is required.".into());
    }

    let group_id = match form.group.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
            _ => {
                errors
                    .entry("group")
                    .or_default()
                    .push("Select a valid choice.".into());
                None
            }
        },
    };

    let image = form
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if image.is_some_and(|s| s.chars().count() > MAX_IMAGE_REF_LEN) {
        errors
            .entry("image")
            .or_default()
            .push(format!("Ensure this value has at most {MAX_IMAGE_REF_LEN} characters."));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidPost {
        text: text.to_string(),
        group_id,
        image: image.map(str::to_string),
    })
}

fn form_state(form: &PostForm, group_choices: Vec<Group>, errors: FormErrors) -> PostFormState {
    PostFormState {
        text: form.text.clone(),
        group: form.group.as_deref().and_then(|g| g.trim().parse().ok()),
        image: form.image.clone().filter(|s| !s.trim().is_empty()),
        group_choices,
        errors,
    }
}

fn invalid_form(title: &'static str, is_edit: bool, form: PostFormState) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(PostFormContext {
            title,
            is_edit,
            form,
        }),
    )
        .into_response()
}

/// Non-numeric ids never name a post.
fn parse_post_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("post {raw}")))
}

fn render_json<T: Serialize>(ctx: &T) -> Result<Bytes, AppError> {
    serde_json::to_vec(ctx).map(Bytes::from).map_err(|e| {
        error!("Failed to render page: {}", e);
        AppError::Internal("render failure".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Group> {
        vec![Group {
            id: 7,
            title: "Cats".into(),
            slug: "cats".into(),
            description: String::new(),
        }]
    }

    fn form(text: &str, group: Option<&str>) -> PostForm {
        PostForm {
            text: text.into(),
            group: group.map(str::to_string),
            image: None,
        }
    }

    #[test]
    fn valid_form_is_trimmed() {
        let v = validate_post(&form("  hello  ", Some("7")), &groups()).unwrap();
        assert_eq!(v.text, "hello");
        assert_eq!(v.group_id, Some(7));
    }

    #[test]
    fn empty_group_means_none() {
        let v = validate_post(&form("hello", Some("")), &groups()).unwrap();
        assert_eq!(v.group_id, None);
    }

    #[test]
    fn blank_text_and_unknown_group_are_reported() {
        let errors = validate_post(&form("   ", Some("99")), &groups()).unwrap_err();
        assert!(errors.contains_key("text"));
        assert!(errors.contains_key("group"));

        let errors = validate_post(&form("ok", Some("cats")), &groups()).unwrap_err();
        assert_eq!(errors.keys().copied().collect::<Vec<_>>(), ["group"]);
    }

    #[test]
    fn overlong_image_reference_is_rejected() {
        let mut f = form("ok", None);
        f.image = Some("x".repeat(MAX_IMAGE_REF_LEN + 1));
        let errors = validate_post(&f, &groups()).unwrap_err();
        assert!(errors.contains_key("image"));
    }

    #[test]
    fn post_ids_must_be_numeric() {
        assert_eq!(parse_post_id("13").unwrap(), 13);
        assert!(matches!(parse_post_id("abc"), Err(AppError::NotFound(_))));
    }
}
