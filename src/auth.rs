//! Registration, password login and stateless session tokens.
//!
//! Sessions are HS256 JWTs carried in the `token` cookie. Nothing is stored
//! server-side, so logging out only clears the cookie: a token copied before
//! logout stays valid until its expiry.

use std::sync::LazyLock;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    model::{LoginOutcome, Profile, User},
    tasks::count_owned,
};

pub const TOKEN_COOKIE: &str = "token";
pub const SESSION_TTL_DAYS: i64 = 7;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@(gmail\.com|[a-zA-Z0-9-]+\.in)$")
        .expect("email pattern compiles")
});

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

pub fn is_allowed_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens with the server secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: &str, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Any decoding failure (malformed, expired, bad signature) is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|err| {
                tracing::debug!(error = %err, "session token rejected");
                AppError::Unauthorized
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    signer: TokenSigner,
    bcrypt_cost: u32,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            signer: TokenSigner::new(&config.jwt_secret),
            bcrypt_cost: config.bcrypt_cost,
            secure_cookies: config.production,
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Creates the account. Does not log the user in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }
        if !is_allowed_email(email) {
            return Err(AppError::InvalidEmail);
        }

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = ? OR username = ?")
                .bind(email)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateUser);
        }

        let password_hash = hash_password(password.to_string(), self.bcrypt_cost).await?;

        // The unique constraints still catch a concurrent registration
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// `identifier` is treated as an email when it contains `@`, otherwise as
    /// a username.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let identifier = identifier.trim();
        let lookup = if identifier.contains('@') {
            "email"
        } else {
            "username"
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {lookup} = ?"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.signer.issue(&user.id, Utc::now())?;
        let is_new_user = count_owned(&self.pool, &user.id).await? == 0;

        tracing::info!(user_id = %user.id, is_new_user, "user logged in");
        Ok(LoginOutcome { token, is_new_user })
    }

    /// Resolves the caller from the `token` cookie.
    pub fn verify_caller(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let jar = CookieJar::from_headers(headers);
        let token = jar.get(TOKEN_COOKIE).ok_or(AppError::Unauthorized)?;
        self.signer.verify(token.value())
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("user"))?;

        Ok(Profile {
            user_id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(TOKEN_COOKIE, token)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure_cookies)
            .path("/")
            .finish()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.session_cookie(String::new());
        cookie.make_removal();
        cookie
    }
}
