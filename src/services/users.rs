//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    export,
    models::{
        import_report::ImportReport,
        user::{CreateUser, NewUser, Role, UpdateUser, User, UserClaims},
    },
    repository::Repository,
};

const ADMIN_USERNAME: &str = "admin";

/// Outcome of checking a password against a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Matched an unsalted SHA-256 digest that should be re-hashed
    ValidLegacy,
    Invalid,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by username and return JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        let check = verify_password(&user.password, password)?;
        if check == PasswordCheck::Invalid {
            tracing::warn!(username = %user.username, "rejected login");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        if !user.approved {
            tracing::warn!(username = %user.username, "login before approval");
            return Err(AppError::PendingApproval(
                "An administrator has not approved this account yet".to_string(),
            ));
        }

        if check == PasswordCheck::ValidLegacy {
            let upgraded = hash_password(password)?;
            self.repository.users.update_password(user.id, &upgraded).await?;
            tracing::info!(username = %user.username, "upgraded legacy password hash");
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(username = %user.username, "login");
        Ok((token, user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Self-registration. New accounts are staff and wait for approval.
    pub async fn register(&self, data: &CreateUser) -> AppResult<User> {
        data.validate()?;
        let username = data.username.trim();
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "Username cannot contain whitespace".to_string(),
            ));
        }

        if self.repository.users.get_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash: hash_password(&data.password)?,
                role: Role::Staff,
                approved: false,
                birthdate: data.birthdate.as_deref().map(str::trim).filter(|b| !b.is_empty()).map(str::to_string),
                created_at: None,
            })
            .await?;

        tracing::info!(username = %user.username, "account registered, awaiting approval");
        Ok(user)
    }

    /// Seed the `admin` account when no user exists yet
    pub async fn ensure_admin(&self) -> AppResult<bool> {
        if self.repository.users.count().await? > 0 {
            return Ok(false);
        }

        let created = self
            .repository
            .users
            .create_if_absent(&NewUser {
                username: ADMIN_USERNAME.to_string(),
                password_hash: hash_password(&self.config.bootstrap_admin_password)?,
                role: Role::Admin,
                approved: true,
                birthdate: None,
                created_at: None,
            })
            .await?;

        if created {
            tracing::warn!("created initial '{}' account; change its password", ADMIN_USERNAME);
        }
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Approve, change role or birthdate. Administrators cannot demote or
    /// suspend themselves.
    pub async fn update(&self, id: i32, data: &UpdateUser, admin: &UserClaims) -> AppResult<User> {
        if id == admin.user_id {
            if data.role.is_some_and(|r| r != Role::Admin) {
                return Err(AppError::BusinessRule(
                    "You cannot revoke your own administrator role".to_string(),
                ));
            }
            if data.approved == Some(false) {
                return Err(AppError::BusinessRule(
                    "You cannot revoke your own approval".to_string(),
                ));
            }
        }

        let user = self.repository.users.update(id, data).await?;
        tracing::info!(
            username = %user.username,
            approved = user.approved,
            role = user.role.as_str(),
            admin = admin.username(),
            "account updated"
        );
        Ok(user)
    }

    pub async fn delete(&self, id: i32, admin: &UserClaims) -> AppResult<()> {
        if id == admin.user_id {
            return Err(AppError::BusinessRule(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, admin = admin.username(), "account deleted");
        Ok(())
    }

    /// Load the legacy users sheet. Existing usernames are skipped.
    pub async fn import_csv(&self, bytes: &[u8]) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();
        let users = export::parse_users(bytes, &mut report)?;

        for (row, user) in users {
            if !is_stored_hash(&user.password_hash) {
                report.error(row, format!("{} has an unrecognised password hash", user.username));
                continue;
            }
            if self.repository.users.create_if_absent(&user).await? {
                report.imported += 1;
            } else {
                report.skipped += 1;
                report.error(row, format!("{} already exists", user.username));
            }
        }

        tracing::info!(
            imported = report.imported,
            skipped = report.skipped,
            errors = report.errors.len(),
            "user import finished"
        );
        Ok(report)
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against an Argon2 PHC string or a legacy SHA-256 digest
pub fn verify_password(stored: &str, password: &str) -> AppResult<PasswordCheck> {
    if is_legacy_digest(stored) {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        return Ok(if digest.eq_ignore_ascii_case(stored) {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        });
    }

    let parsed_hash = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
        {
            PasswordCheck::Valid
        } else {
            PasswordCheck::Invalid
        },
    )
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_stored_hash(stored: &str) -> bool {
    is_legacy_digest(stored) || PasswordHash::new(stored).is_ok()
}
