use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::repo::{CredentialStore, DuplicateEmail};
use super::repo_types::Identity;
use crate::error::AppError;

pub const DEMO_EMAIL: &str = "test@example.com";
pub const DEMO_PASSWORD: &str = "password123";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases the email and checks both fields are filled in.
fn validate(email: &str, password: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("Please fill in all fields"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

pub async fn register(
    store: &dyn CredentialStore,
    email: &str,
    password: &str,
) -> Result<Identity, AppError> {
    let email = validate(email, password)?;

    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::UserExists);
    }

    let hash = hash_password(password)?;
    let user = match store.create(&email, &hash).await {
        Ok(u) => u,
        Err(e) if e.is::<DuplicateEmail>() => return Err(AppError::UserExists),
        Err(e) => return Err(AppError::Store(e)),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Identity::from(&user))
}

/// Unknown email and wrong password both yield `InvalidCredentials`.
pub async fn authenticate(
    store: &dyn CredentialStore,
    email: &str,
    password: &str,
) -> Result<Identity, AppError> {
    let email = validate(email, password)?;

    let Some(user) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user authenticated");
    Ok(Identity::from(&user))
}

/// Registers the advertised demo account unless it already exists.
pub async fn seed_demo_account(store: &dyn CredentialStore) -> anyhow::Result<()> {
    match register(store, DEMO_EMAIL, DEMO_PASSWORD).await {
        Ok(_) | Err(AppError::UserExists) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("seed demo account: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStore;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let store = LocalStore::in_memory();
        let who = register(&store, "a@x.com", "p1").await.unwrap();
        assert_eq!(who.email, "a@x.com");

        let again = authenticate(&store, "a@x.com", "p1").await.unwrap();
        assert_eq!(again, who);

        let err = authenticate(&store, "a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_email_is_invalid_credentials() {
        let store = LocalStore::in_memory();
        let err = authenticate(&store, "nobody@x.com", "p1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_registration_is_user_exists() {
        let store = LocalStore::in_memory();
        register(&store, "a@x.com", "p1").await.unwrap();
        let err = register(&store, "  A@X.com ", "p2").await.unwrap_err();
        assert!(matches!(err, AppError::UserExists));
    }

    #[tokio::test]
    async fn email_is_normalized_for_login() {
        let store = LocalStore::in_memory();
        register(&store, "Alice@Example.com", "p1").await.unwrap();
        assert!(authenticate(&store, " alice@example.COM", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let store = LocalStore::in_memory();
        for (email, password) in [("", "p1"), ("a@x.com", ""), ("   ", "p1")] {
            let err = register(&store, email, password).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{email:?}/{password:?}");
        }
        let err = register(&store, "not-an-email", "p1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = LocalStore::in_memory();
        seed_demo_account(&store).await.unwrap();
        seed_demo_account(&store).await.unwrap();
        assert!(authenticate(&store, DEMO_EMAIL, DEMO_PASSWORD).await.is_ok());
    }
}
