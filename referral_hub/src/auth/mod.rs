//! Authentication module providing login, session tokens and administrator
//! accounts.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - JWT session tokens (12-hour expiry) carrying id, email, role and referral code
//! - Administrator signup and a seeded default administrator
//!
//! ## Example
//!
//! ```no_run
//! use referral_hub::auth::{AuthManager, LoginRequest};
//! use referral_hub::db::{Database, DatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let auth = AuthManager::new(
//!         &db.repositories(),
//!         "secret_pepper".to_string(),
//!         "jwt_secret".to_string(),
//!     );
//!
//!     let session = auth
//!         .login(LoginRequest {
//!             email: "admin@example.com".to_string(),
//!             password: "admin123".to_string(),
//!         })
//!         .await?;
//!     println!("Logged in as {}", session.principal.email);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod password;

pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, MIN_NAME_LEN, MIN_PASSWORD_LEN};
pub use models::{
    AdminSignupRequest, DefaultAdmin, LoginRequest, NewUser, Principal, Role, Session,
    SessionClaims, User, UserCredentials, UserId, UserSummary,
};
pub use password::PepperedHasher;
