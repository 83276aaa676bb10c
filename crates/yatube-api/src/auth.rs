use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};
use uuid::Uuid;

use yatube_db::{Database, DbResult};
use yatube_types::api::{AuthResponse, Claims, LoginForm, LoginPageContext, SignupForm};

use crate::cache::PageCache;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::SESSION_COOKIE;

/// Fixed key of the index page cache entry.
pub const INDEX_CACHE_KEY: &str = "index_page";

const TOKEN_TTL_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub index_cache: PageCache,
}

impl AppStateInner {
    pub fn new(db: Database, config: Config) -> AppState {
        let index_cache = PageCache::new(INDEX_CACHE_KEY, config.index_cache_ttl);
        Arc::new(Self {
            db,
            config,
            index_cache,
        })
    }
}

/// Runs a blocking DB closure off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal("worker failure".into())
        })?
        .map_err(AppError::from)
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<SignupForm>,
) -> Result<impl IntoResponse, AppError> {
    validate_username(&req.username)?;
    if req.password.chars().count() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let username = req.username.clone();
    let taken = db_call(&state, move |db| db.get_user_by_username(&username))
        .await?
        .is_some();
    if taken {
        return Err(AppError::Conflict(format!("username {} is taken", req.username)));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            AppError::Internal("password hashing failed".into())
        })?
        .to_string();

    let user_id = Uuid::new_v4();
    let username = req.username.clone();
    // A signup racing this one can still take the name between the check and
    // the insert; the UNIQUE constraint decides.
    let created = db_call(&state, move |db| {
        match db.create_user(user_id, &username, &password_hash) {
            Ok(()) => Ok(true),
            Err(e) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e),
        }
    })
    .await?;
    if !created {
        return Err(AppError::Conflict(format!("username {} is taken", req.username)));
    }
    info!("Registered user {} ({})", req.username, user_id);

    let token = issue_token(&state.config.jwt_secret, user_id, &req.username)?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            user_id,
            username: req.username,
            token,
        }),
    ))
}

pub async fn login_page() -> Json<LoginPageContext> {
    Json(LoginPageContext {
        title: "Sign in",
        fields: ["username", "password"],
    })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.clone();
    let user = db_call(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("Stored hash for {} is unreadable: {}", user.username, e);
        AppError::Internal("corrupt credentials".into())
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for {}", user.username);
            AppError::InvalidCredentials
        })?;

    let user_id = user.user_id()?;
    let token = issue_token(&state.config.jwt_secret, user_id, &user.username)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            user_id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

pub fn issue_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Token encoding failed: {}", e);
        AppError::Internal("token encoding failed".into())
    })
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// ASCII letters, ASCII digits and `@.+-_`, 3 to 150 characters.
fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=150).contains(&len) {
        return Err(AppError::Validation(
            "username must be 3 to 150 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "username may only contain ASCII letters, digits and @/./+/-/_".into(),
        ));
    }
    Ok(())
}
