use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::TokenKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{LoginRequest, RegisterRequest, UpdateRequest};
use super::repo_types::{NewUser, User, UserUpdate};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // One consistent password rule: alphanumeric, 6 to 30 characters.
    static ref PASSWORD_RE: Regex = Regex::new(r"^[a-zA-Z0-9]{6,30}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate_register(input: &RegisterRequest) -> Result<(), ApiError> {
    if input.username.len() < 5 {
        return Err(ApiError::Validation(
            "username must be at least 5 characters".into(),
        ));
    }
    if input.first_name.len() < 3 {
        return Err(ApiError::Validation(
            "firstName must be at least 3 characters".into(),
        ));
    }
    if input.last_name.is_empty() {
        return Err(ApiError::Validation("lastName is required".into()));
    }
    if input.email_address.len() < 8 || !is_valid_email(&input.email_address) {
        return Err(ApiError::Validation(
            "emailAddress must be a valid email of at least 8 characters".into(),
        ));
    }
    if !PASSWORD_RE.is_match(&input.password) {
        return Err(ApiError::Validation(
            "password must be 6 to 30 alphanumeric characters".into(),
        ));
    }
    Ok(())
}

fn validate_login(input: &LoginRequest) -> Result<(), ApiError> {
    if input.email_address.len() < 6 {
        return Err(ApiError::Validation(
            "emailAddress must be at least 6 characters".into(),
        ));
    }
    if input.password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

fn validate_update(input: &UpdateRequest) -> Result<(), ApiError> {
    if input.username.len() < 5 {
        return Err(ApiError::Validation(
            "username must be at least 5 characters".into(),
        ));
    }
    if input.first_name.len() < 3 {
        return Err(ApiError::Validation(
            "firstName must be at least 3 characters".into(),
        ));
    }
    if input.last_name.is_empty() {
        return Err(ApiError::Validation("lastName is required".into()));
    }
    Ok(())
}

pub async fn register(state: &AppState, mut input: RegisterRequest) -> Result<(), ApiError> {
    input.email_address = input.email_address.trim().to_lowercase();

    validate_register(&input)?;

    // Advisory pre-checks for friendlier messages. The unique constraints
    // in the store decide under concurrent registrations.
    let email_taken = state
        .store
        .find_by_email(&input.email_address)
        .await?
        .is_some();
    let username_taken = state
        .store
        .find_by_username(&input.username)
        .await?
        .is_some();
    match (email_taken, username_taken) {
        (true, true) => {
            return Err(ApiError::Conflict("email and username already taken".into()));
        }
        (true, false) => return Err(ApiError::Conflict("email already taken".into())),
        (false, true) => return Err(ApiError::Conflict("username already taken".into())),
        (false, false) => {}
    }

    let password = input.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    let user = state
        .store
        .create(NewUser {
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            email_address: input.email_address,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(())
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: Uuid,
}

pub async fn login(state: &AppState, mut input: LoginRequest) -> Result<LoginOutcome, ApiError> {
    input.email_address = input.email_address.trim().to_lowercase();

    validate_login(&input)?;

    let user = match state.store.find_by_email(&input.email_address).await? {
        Some(u) => u,
        None => {
            warn!(email = %input.email_address, "login with unknown email");
            return Err(ApiError::Authentication);
        }
    };

    let password = input.password.clone();
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(|e| ApiError::Internal(e.into()))?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Authentication);
    }

    let keys = TokenKeys::from_ref(state);
    let token = keys.sign(user.id).map_err(ApiError::Internal)?;

    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome {
        token,
        user_id: user.id,
    })
}

pub async fn get_info(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))
}

pub async fn update_info(
    state: &AppState,
    user_id: Uuid,
    input: UpdateRequest,
) -> Result<u64, ApiError> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    validate_update(&input)?;

    // A username collision only counts against a different user; keeping
    // one's own username is fine.
    if let Some(other) = state.store.find_by_username(&input.username).await? {
        if other.id != user.id {
            return Err(ApiError::Conflict("username already taken".into()));
        }
    }

    let modified = state
        .store
        .update(
            user.id,
            UserUpdate {
                username: input.username,
                first_name: input.first_name,
                last_name: input.last_name,
            },
        )
        .await?;

    info!(user_id = %user.id, "user updated");
    Ok(modified)
}

pub async fn delete_account(
    state: &AppState,
    user_id: Uuid,
    requested: Option<Uuid>,
) -> Result<(), ApiError> {
    // The deletable account is the token's own. An explicit id in the body
    // is accepted for wire compatibility but must match.
    if let Some(id) = requested {
        if id != user_id {
            warn!(user_id = %user_id, requested = %id, "delete of foreign account rejected");
            return Err(ApiError::Forbidden("cannot delete another user's account"));
        }
    }

    let deleted = state.store.delete_by_id(user_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("user"));
    }
    info!(user_id = %user_id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_input(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email_address: email.into(),
            password: "hunter2abc".into(),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email_address: email.into(),
            password: password.into(),
        }
    }

    fn update_input(username: &str) -> UpdateRequest {
        UpdateRequest {
            username: username.into(),
            first_name: "Alice".into(),
            last_name: "Smith".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_returns_verifiable_token() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");

        let outcome = login(&state, login_input("alice@example.com", "hunter2abc"))
            .await
            .expect("login");
        assert!(!outcome.token.is_empty());

        let stored = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .expect("user persisted");
        assert_eq!(outcome.user_id, stored.id);

        let keys = TokenKeys::from_ref(&state);
        let claims = keys.verify(&outcome.token).expect("token verifies");
        assert_eq!(claims.sub, stored.id);
    }

    #[tokio::test]
    async fn register_normalizes_email_case_and_whitespace() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "  Alice@Example.COM "))
            .await
            .expect("register");

        login(&state, login_input("alice@example.com", "hunter2abc"))
            .await
            .expect("login with normalized email");
    }

    #[tokio::test]
    async fn duplicate_email_reports_email_conflict() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("first register");

        let err = register(&state, register_input("bobby2", "alice@example.com"))
            .await
            .unwrap_err();
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "email already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_username_reports_username_conflict() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("first register");

        let err = register(&state, register_input("alice1", "bobby@example.com"))
            .await
            .unwrap_err();
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "username already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_email_and_username_reports_combined_conflict() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("first register");

        let err = register(&state, register_input("alice1", "alice@example.com"))
            .await
            .unwrap_err();
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "email and username already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_password_rejected_and_nothing_persisted() {
        let state = AppState::fake();
        let mut input = register_input("alice1", "alice@example.com");
        input.password = "ab".into();

        let err = register(&state, input).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn non_alphanumeric_password_rejected() {
        let state = AppState::fake();
        let mut input = register_input("alice1", "alice@example.com");
        input.password = "abc!def99".into();

        let err = register(&state, input).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn invalid_email_syntax_rejected() {
        let state = AppState::fake();
        let mut input = register_input("alice1", "alice@example.com");
        input.email_address = "not-an-email".into();

        let err = register(&state, input).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_with_unknown_email_fails_authentication() {
        let state = AppState::fake();
        let err = login(&state, login_input("ghost@example.com", "hunter2abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication));
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails_authentication() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");

        let err = login(&state, login_input("alice@example.com", "wrongpass9"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication));
    }

    #[tokio::test]
    async fn get_info_returns_profile_fields() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");
        let stored = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let user = get_info(&state, stored.id).await.expect("get info");
        assert_eq!(user.username, "alice1");
        assert_eq!(user.email_address, "alice@example.com");
    }

    #[tokio::test]
    async fn update_to_foreign_username_conflicts() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register alice");
        register(&state, register_input("bobby2", "bobby@example.com"))
            .await
            .expect("register bobby");
        let bobby = state
            .store
            .find_by_email("bobby@example.com")
            .await
            .unwrap()
            .unwrap();

        let err = update_info(&state, bobby.id, update_input("alice1"))
            .await
            .unwrap_err();
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "username already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_keeping_own_username_succeeds() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");
        let alice = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let modified = update_info(&state, alice.id, update_input("alice1"))
            .await
            .expect("self-collision excluded");
        assert_eq!(modified, 1);
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");
        let before = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        update_info(&state, before.id, update_input("alice9"))
            .await
            .expect("update");
        let after = state.store.find_by_id(before.id).await.unwrap().unwrap();
        assert_eq!(after.username, "alice9");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn update_for_missing_user_is_not_found() {
        let state = AppState::fake();
        let err = update_info(&state, Uuid::new_v4(), update_input("alice1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_nonexistent_user_is_not_found() {
        let state = AppState::fake();
        let err = delete_account(&state, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_then_fetch_is_not_found() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register");
        let alice = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        delete_account(&state, alice.id, Some(alice.id))
            .await
            .expect("delete own account");
        let err = get_info(&state, alice.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_with_foreign_id_is_forbidden() {
        let state = AppState::fake();
        register(&state, register_input("alice1", "alice@example.com"))
            .await
            .expect("register alice");
        register(&state, register_input("bobby2", "bobby@example.com"))
            .await
            .expect("register bobby");
        let alice = state
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        let bobby = state
            .store
            .find_by_email("bobby@example.com")
            .await
            .unwrap()
            .unwrap();

        let err = delete_account(&state, alice.id, Some(bobby.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // Bobby is untouched.
        assert!(state
            .store
            .find_by_id(bobby.id)
            .await
            .unwrap()
            .is_some());
    }
}
