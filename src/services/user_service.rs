use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::validation::{Validate, Validator};
use super::{now_utc, Paged, ServiceError};
use crate::api::users::{
    LoginUserRequest, RegisterUserRequest, SearchUserRequest, TokenResponse, UpdateUserRequest, UserResponse,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{generate_jwt, validate_jwt, AuthUser, Claims};
use crate::clock::Clock;
use crate::config::{AdminAccount, SecurityConfig};
use crate::database::models::{Role, User};
use crate::database::{transaction, Store};
use crate::filter::search;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        Validator::new()
            .required("email", &self.email)
            .max_len("email", &self.email, 100)
            .required("password", &self.password)
            .max_len("password", &self.password, 100)
            .required("username", &self.username)
            .max_len("username", &self.username, 100)
            .max_len("phone_number", &self.phone_number, 50)
            .min("grade_level", self.grade_level as i64, 0)
            .finish()
    }
}

impl Validate for LoginUserRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        Validator::new()
            .required("email", &self.email)
            .max_len("email", &self.email, 100)
            .required("password", &self.password)
            .max_len("password", &self.password, 100)
            .finish()
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        Validator::new()
            .max_len("username", &self.username, 100)
            .max_len("email", &self.email, 100)
            .max_len("password", &self.password, 100)
            .max_len("phone_number", &self.phone_number, 50)
            .max_len("avatar_url", &self.avatar_url, 255)
            .min("grade_level", self.grade_level as i64, 0)
            .finish()
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    security: Arc<SecurityConfig>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, security: SecurityConfig) -> Self {
        Self {
            store,
            clock,
            security: Arc::new(security),
        }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;

                if tx.users().find_by_email(&request.email).await?.is_some() {
                    warn!("Registration rejected, email already in use");
                    return Err(ServiceError::Conflict("Email already registered".to_string()));
                }

                let now = now_utc(clock.as_ref());
                let user = User {
                    id: Uuid::new_v4(),
                    username: request.username,
                    email: request.email,
                    password: hash_password(&request.password)?,
                    phone_number: request.phone_number,
                    grade_level: request.grade_level,
                    role: Role::User.to_string(),
                    avatar_url: String::new(),
                    birth_date: request.birth_date,
                    token: None,
                    created_at: now,
                    updated_at: now,
                };
                tx.users().create(&user).await?;
                Ok(UserResponse::from(&user))
            })
        })
        .await
    }

    /// Issue a fresh token and store it on the user row
    pub async fn login(&self, request: LoginUserRequest) -> Result<TokenResponse, ServiceError> {
        let clock = self.clock.clone();
        let security = self.security.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;

                let Some(mut user) = tx.users().find_by_email(&request.email).await? else {
                    warn!("Login failed for unknown email");
                    return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
                };
                if !verify_password(&request.password, &user.password)? {
                    warn!("Login failed for user {}", user.id);
                    return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
                }

                let role = user
                    .role()
                    .ok_or_else(|| ServiceError::Internal(format!("user {} has unknown role", user.id)))?;
                let claims = Claims::new(user.id, role, security.jwt_expiry_hours);
                let token = generate_jwt(&claims, &security.jwt_secret).map_err(|e| ServiceError::Internal(e.to_string()))?;

                user.token = Some(token.clone());
                user.updated_at = now_utc(clock.as_ref());
                tx.users().update(&user).await?;
                Ok(TokenResponse { token })
            })
        })
        .await
    }

    /// Resolve a presented token to its principal. The token must be validly signed,
    /// unexpired, and still the one stored for the user.
    pub async fn verify(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = validate_jwt(token, &self.security.jwt_secret).map_err(|e| {
            debug!("Token rejected: {}", e);
            ServiceError::Unauthorized("Invalid token".to_string())
        })?;

        let token = token.to_string();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let user = tx.users().find_by_id(claims.sub).await?.ok_or_else(|| {
                    debug!("Token subject {} no longer exists", claims.sub);
                    ServiceError::Unauthorized("Invalid token".to_string())
                })?;
                if user.token.as_deref() != Some(token.as_str()) {
                    debug!("Token for user {} is not the current session", user.id);
                    return Err(ServiceError::Unauthorized("Invalid token".to_string()));
                }
                let role = user
                    .role()
                    .ok_or_else(|| ServiceError::Unauthorized("Invalid token".to_string()))?;
                Ok(AuthUser { id: user.id, role })
            })
        })
        .await
    }

    pub async fn current(&self, principal: &AuthUser) -> Result<UserResponse, ServiceError> {
        self.get(principal.id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<UserResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let user = tx.users().find_by_id(id).await?.ok_or_else(|| {
                    warn!("User {} not found", id);
                    ServiceError::not_found("User")
                })?;
                Ok(UserResponse::from(&user))
            })
        })
        .await
    }

    /// Clear the stored token; the presented JWT stops verifying immediately
    pub async fn logout(&self, principal: &AuthUser) -> Result<bool, ServiceError> {
        let id = principal.id;
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let mut user = tx
                    .users()
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("User"))?;
                user.token = None;
                user.updated_at = now_utc(clock.as_ref());
                tx.users().update(&user).await?;
                Ok(true)
            })
        })
        .await
    }

    pub async fn search(&self, request: SearchUserRequest) -> Result<Paged<UserResponse>, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let mut validator = Validator::new();
                validator.paging(request.page, request.size);
                let birth_date = if request.birth_date.is_empty() {
                    None
                } else {
                    match NaiveDate::parse_from_str(&request.birth_date, "%Y-%m-%d") {
                        Ok(date) => Some(date),
                        Err(_) => {
                            validator.reject("birth_date", "Must be a date formatted YYYY-MM-DD");
                            None
                        }
                    }
                };
                validator.finish()?;

                let filter = search::users(&request, birth_date)?;
                let (users, total) = tx.users().search(&filter).await?;
                let items = users.iter().map(UserResponse::from).collect();
                Ok(Paged::new(items, request.page, request.size, total))
            })
        })
        .await
    }

    /// Sparse patch: empty strings, zero grade and absent dates leave fields untouched
    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> Result<UserResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;

                let mut user = tx.users().find_by_id(id).await?.ok_or_else(|| {
                    warn!("User {} not found for update", id);
                    ServiceError::not_found("User")
                })?;

                if request.is_empty() {
                    debug!("Empty patch for user {}, only touching updated_at", id);
                }

                if !request.email.is_empty() && request.email != user.email {
                    if tx.users().find_by_email(&request.email).await?.is_some() {
                        return Err(ServiceError::Conflict("Email already registered".to_string()));
                    }
                    user.email = request.email;
                }
                if !request.username.is_empty() {
                    user.username = request.username;
                }
                if !request.password.is_empty() {
                    user.password = hash_password(&request.password)?;
                }
                if !request.phone_number.is_empty() {
                    user.phone_number = request.phone_number;
                }
                if request.grade_level != 0 {
                    user.grade_level = request.grade_level;
                }
                if request.birth_date.is_some() {
                    user.birth_date = request.birth_date;
                }
                if !request.avatar_url.is_empty() {
                    user.avatar_url = request.avatar_url;
                }
                user.updated_at = now_utc(clock.as_ref());

                tx.users().update(&user).await?;
                Ok(UserResponse::from(&user))
            })
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                if tx.users().find_by_id(id).await?.is_none() {
                    warn!("User {} not found for delete", id);
                    return Err(ServiceError::not_found("User"));
                }
                tx.users().delete(id).await?;
                Ok(true)
            })
        })
        .await
    }

    /// Create the configured admin account unless its email is already registered.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, admin: &AdminAccount) -> Result<bool, ServiceError> {
        let admin = admin.clone();
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Validator::new()
                    .required("email", &admin.email)
                    .required("password", &admin.password)
                    .required("username", &admin.username)
                    .finish()?;

                if tx.users().find_by_email(&admin.email).await?.is_some() {
                    debug!("Admin account {} already present", admin.email);
                    return Ok(false);
                }

                let now = now_utc(clock.as_ref());
                let user = User {
                    id: Uuid::new_v4(),
                    username: admin.username,
                    email: admin.email,
                    password: hash_password(&admin.password)?,
                    phone_number: String::new(),
                    grade_level: 0,
                    role: Role::Admin.to_string(),
                    avatar_url: String::new(),
                    birth_date: None,
                    token: None,
                    created_at: now,
                    updated_at: now,
                };
                tx.users().create(&user).await?;
                info!("Created admin account {}", user.email);
                Ok(true)
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::AppConfig;
    use crate::database::memory::MemoryStore;

    fn service() -> UserService {
        UserService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::starting_at(2024, 1, 1)),
            AppConfig::for_testing().security,
        )
    }

    fn registration(email: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: "ana".to_string(),
            email: email.to_string(),
            password: "secret-pass".to_string(),
            grade_level: 7,
            ..Default::default()
        }
    }

    fn login(email: &str, password: &str) -> LoginUserRequest {
        LoginUserRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let users = service();
        users.register(registration("ana@example.com")).await.unwrap();
        let err = users.register(registration("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_validates_required_fields() {
        let err = service().register(RegisterUserRequest::default()).await.unwrap_err();
        match err {
            ServiceError::Validation { field_errors: Some(fields), .. } => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
                assert!(fields.contains_key("username"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_verify_logout_cycle() {
        let users = service();
        let registered = users.register(registration("bo@example.com")).await.unwrap();

        let wrong = users.login(login("bo@example.com", "nope")).await.unwrap_err();
        assert!(matches!(wrong, ServiceError::Unauthorized(_)));

        let token = users.login(login("bo@example.com", "secret-pass")).await.unwrap().token;
        let principal = users.verify(&token).await.unwrap();
        assert_eq!(principal.id, registered.id);
        assert_eq!(principal.role, Role::User);

        assert!(users.logout(&principal).await.unwrap());
        assert!(matches!(users.verify(&token).await, Err(ServiceError::Unauthorized(_))));
        assert!(matches!(users.verify("NOT_FOUND").await, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn empty_patch_leaves_fields_unchanged() {
        let users = service();
        let before = users.register(registration("cy@example.com")).await.unwrap();
        let after = users.update(before.id, UpdateUserRequest::default()).await.unwrap();

        assert_eq!(after.username, before.username);
        assert_eq!(after.email, before.email);
        assert_eq!(after.phone_number, before.phone_number);
        assert_eq!(after.grade_level, before.grade_level);
        assert_eq!(after.birth_date, before.birth_date);
        assert_eq!(after.avatar_url, before.avatar_url);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn password_patch_rehashes() {
        let users = service();
        let user = users.register(registration("di@example.com")).await.unwrap();
        let patch = UpdateUserRequest {
            password: "new-secret".to_string(),
            ..Default::default()
        };
        users.update(user.id, patch).await.unwrap();
        assert!(users.login(login("di@example.com", "secret-pass")).await.is_err());
        assert!(users.login(login("di@example.com", "new-secret")).await.is_ok());
    }

    #[tokio::test]
    async fn search_rejects_malformed_birth_date_and_bad_paging() {
        let users = service();
        let bad_date = SearchUserRequest {
            birth_date: "01/02/2010".to_string(),
            ..Default::default()
        };
        assert!(matches!(users.search(bad_date).await, Err(ServiceError::Validation { .. })));

        let bad_size = SearchUserRequest {
            size: 0,
            ..Default::default()
        };
        assert!(matches!(users.search(bad_size).await, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let users = service();
        let admin = AdminAccount {
            email: "root@example.com".to_string(),
            username: "root".to_string(),
            password: "root-pass".to_string(),
        };
        assert!(users.ensure_admin(&admin).await.unwrap());
        assert!(!users.ensure_admin(&admin).await.unwrap());

        let token = users.login(login("root@example.com", "root-pass")).await.unwrap().token;
        assert_eq!(users.verify(&token).await.unwrap().role, Role::Admin);
    }
}
