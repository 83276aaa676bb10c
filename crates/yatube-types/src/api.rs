use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Group, Post, User};

// -- JWT Claims --

/// Session token claims. Issued by the auth handlers and decoded by the
/// viewer middleware on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPageContext {
    pub title: &'static str,
    pub fields: [&'static str; 2],
}

// -- Pagination --

/// Raw `?page=` value. Kept as a string so that garbage falls back to the
/// first page instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// One page of an ordered result set plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub per_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

// -- Forms --

/// Submitted post form. `group` is the raw select value; empty means none.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Field name -> messages.
pub type FormErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Serialize)]
pub struct PostFormState {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<String>,
    pub group_choices: Vec<Group>,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct CommentFormState {
    pub text: String,
}

// -- Page contexts --

#[derive(Debug, Serialize)]
pub struct IndexContext {
    pub title: &'static str,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct GroupContext {
    pub group: Group,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub author: User,
    pub following: bool,
    pub post_count: u64,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub post: Post,
    pub post_title: String,
    pub author_post_count: u64,
    pub comments: Vec<Comment>,
    pub form: CommentFormState,
}

#[derive(Debug, Serialize)]
pub struct PostFormContext {
    pub title: &'static str,
    pub is_edit: bool,
    pub form: PostFormState,
}

#[derive(Debug, Serialize)]
pub struct FollowContext {
    pub title: &'static str,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct StaticPageContext {
    pub title: &'static str,
    pub template: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}
