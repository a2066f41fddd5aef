//! Staff accounts and bearer-token sessions.
//!
//! Every controller function receives the calling [`Actor`] explicitly; the
//! auth middleware builds it from the bearer token with [`resolve_token`].

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::api::error::{required, required_text, ApiError};
use crate::crypto;
use crate::db::repository;
use crate::models::dates::now_timestamp;
use crate::models::enums::Role;
use crate::models::User;

/// Identity and role of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role '{}' is not permitted for this operation",
                self.role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Admin])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_at: NaiveDateTime,
}

/// Create the first account as admin. Refused once any user exists.
pub fn init_admin(conn: &Connection, req: RegisterRequest) -> Result<User, ApiError> {
    let username = required_text(req.username, "username")?;
    let password = required(req.password.filter(|p| !p.is_empty()), "password")?;
    let full_name = required_text(req.full_name, "full_name")?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if repository::count_users(&tx)? > 0 {
        return Err(ApiError::BadRequest(
            "Users already exist; init-admin is only available on first run".into(),
        ));
    }
    let user = create_user(&tx, username, &password, full_name, req.email, Role::Admin)?;
    tx.commit()?;

    tracing::info!(user_id = user.id, "Initial admin account created");
    Ok(user)
}

/// Admin-only staff registration.
pub fn register(conn: &Connection, actor: &Actor, req: RegisterRequest) -> Result<User, ApiError> {
    actor.require_admin()?;

    let username = required_text(req.username, "username")?;
    let password = required(req.password.filter(|p| !p.is_empty()), "password")?;
    let full_name = required_text(req.full_name, "full_name")?;
    let role: Role = required_text(req.role, "role")?
        .parse()
        .map_err(|_| ApiError::BadRequest("role must be one of admin, doctor, user".into()))?;

    if repository::get_user_by_username(conn, &username)?.is_some() {
        return Err(ApiError::Conflict(format!("Username '{username}' is already taken")));
    }
    let user = create_user(conn, username, &password, full_name, req.email, role)?;

    tracing::info!(user_id = user.id, role = %user.role, by = actor.user_id, "User registered");
    Ok(user)
}

/// Verify credentials and issue a bearer token.
pub fn login(conn: &Connection, req: LoginRequest, ttl_hours: i64) -> Result<LoginResponse, ApiError> {
    let username = required_text(req.username, "username")?;
    let password = required(req.password.filter(|p| !p.is_empty()), "password")?;

    let Some(user) = repository::get_user_by_username(conn, &username)? else {
        tracing::debug!(%username, "Login for unknown user");
        return Err(ApiError::Unauthorized);
    };
    if !crypto::verify_password(&password, &user.password_hash) {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let now = now_timestamp();
    let expires_at = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ApiError::Internal(format!("Token lifetime of {ttl_hours}h is out of range")))?;
    let token = crypto::generate_token();
    repository::delete_expired_sessions(conn, now)?;
    repository::insert_session(conn, &crypto::hash_token(&token), user.id, now, expires_at)?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(LoginResponse {
        user,
        token,
        expires_at,
    })
}

pub fn profile(conn: &Connection, actor: &Actor) -> Result<User, ApiError> {
    repository::get_user(conn, actor.user_id)?
        .ok_or_else(|| ApiError::not_found("User", actor.user_id))
}

/// Map a bearer token to its caller.
pub fn resolve_token(conn: &Connection, token: &str) -> Result<Actor, ApiError> {
    let (user, expires_at) = repository::get_session_user(conn, &crypto::hash_token(token))?
        .ok_or(ApiError::Unauthorized)?;
    if expires_at <= now_timestamp() {
        return Err(ApiError::TokenExpired);
    }
    Ok(Actor::from_user(&user))
}

fn create_user(
    conn: &Connection,
    username: String,
    password: &str,
    full_name: String,
    email: Option<String>,
    role: Role,
) -> Result<User, ApiError> {
    let now = now_timestamp();
    let id = repository::insert_user(
        conn,
        &User {
            id: 0,
            username,
            password_hash: crypto::hash_password(password),
            full_name,
            email: email.filter(|e| !e.trim().is_empty()),
            role,
            created_at: now,
            updated_at: now,
        },
    )?;
    repository::get_user(conn, id)?.ok_or_else(|| ApiError::not_found("User", id))
}
