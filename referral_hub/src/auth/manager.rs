//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{
        AdminSignupRequest, DefaultAdmin, LoginRequest, NewUser, Principal, Role, Session,
        SessionClaims, User,
    },
    password::PepperedHasher,
};
use crate::db::{Repositories, UserRepository};
use crate::referral::{CodeGenerator, allocate_referral_code, default_generator};
use crate::utils::{normalize_email, sanitize_input, validate_email};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;

/// Minimum administrator name length
pub const MIN_NAME_LEN: usize = 2;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    hasher: PepperedHasher,
    jwt_secret: String,
    session_duration: Duration,
    code_generator: CodeGenerator,
}

impl Principal {
    /// Gate for administrator-only operations
    pub fn require_admin(&self) -> AuthResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `repos` - Repository handles
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(repos: &Repositories, pepper: String, jwt_secret: String) -> Self {
        Self {
            users: repos.users.clone(),
            hasher: PepperedHasher::new(pepper),
            jwt_secret,
            session_duration: Duration::hours(12),
            code_generator: default_generator(),
        }
    }

    /// Replace the referral-code source
    pub fn with_code_generator(mut self, generator: CodeGenerator) -> Self {
        self.code_generator = generator;
        self
    }

    /// Hasher sharing this manager's pepper
    pub fn hasher(&self) -> &PepperedHasher {
        &self.hasher
    }

    /// Login any account by email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<Session> {
        let email = normalize_email(&request.email);

        let Some(credentials) = self.users.find_credentials(&email).await? else {
            log::warn!("Login attempt for unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        self.hasher
            .verify(&request.password, &credentials.password_hash)
            .await?;

        log::info!(
            "User {} logged in as {}",
            credentials.user.id,
            credentials.user.role
        );
        self.issue_session(&credentials.user)
    }

    /// Verify a session token
    ///
    /// # Returns
    ///
    /// * `AuthResult<Principal>` - The caller the token was issued to
    pub fn verify_token(&self, token: &str) -> AuthResult<Principal> {
        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims.into())
    }

    /// Create a verified administrator account
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidName` - Name shorter than `MIN_NAME_LEN`
    /// * `AuthError::InvalidEmail` - Malformed email
    /// * `AuthError::WeakPassword` - Password shorter than `MIN_PASSWORD_LEN`
    /// * `AuthError::EmailTaken` - Email already registered
    pub async fn register_admin(&self, request: AdminSignupRequest) -> AuthResult<User> {
        let name = sanitize_input(&request.name);
        if name.chars().count() < MIN_NAME_LEN {
            return Err(AuthError::InvalidName(format!(
                "Name must be at least {MIN_NAME_LEN} characters"
            )));
        }

        let email = normalize_email(&request.email);
        if !validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let referral_code =
            allocate_referral_code(self.users.as_ref(), &self.code_generator, Role::Admin).await?;

        let admin = NewUser {
            email,
            name,
            password_hash,
            role: Role::Admin,
            referral_code,
            telegram_username: None,
            phone: None,
            is_verified: true,
            status: "active".to_string(),
        };

        let user = self.users.create_user(&admin).await.map_err(|err| {
            if err.is_conflict() {
                AuthError::EmailTaken
            } else {
                err.into()
            }
        })?;

        log::info!("Administrator {} registered", user.id);
        Ok(user)
    }

    /// Seed the configured administrator if no account uses its email
    ///
    /// # Returns
    ///
    /// * `AuthResult<Option<User>>` - The created admin, or `None` if it existed
    pub async fn ensure_default_admin(&self, admin: &DefaultAdmin) -> AuthResult<Option<User>> {
        let email = normalize_email(&admin.email);
        if self.users.find_by_email(&email).await?.is_some() {
            log::debug!("Default administrator already present");
            return Ok(None);
        }

        let request = AdminSignupRequest {
            name: admin.name.clone(),
            email,
            password: admin.password.clone(),
        };

        match self.register_admin(request).await {
            Ok(user) => Ok(Some(user)),
            // Another instance seeded it first
            Err(AuthError::EmailTaken) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Find an account by email
    pub async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.users.find_by_email(&normalize_email(email)).await?)
    }

    fn issue_session(&self, user: &User) -> AuthResult<Session> {
        let now = Utc::now();
        let expires_at = now + self.session_duration;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            referral_code: user.referral_code.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(Session {
            token,
            expires_at,
            principal: Principal::from(user),
        })
    }
}
