use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{Authenticated, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_or_decoy},
        validation::Validator,
    },
    error::AppError,
    users::{StoreError, UserRecord, UserStore},
};

/// Registration and login flows over a user store, token keys and validator.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
    validator: Validator,
    /// Verified in place of a stored hash when login finds no user.
    decoy_hash: Arc<str>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        keys: JwtKeys,
        validator: Validator,
    ) -> anyhow::Result<Self> {
        let decoy_hash = hash_password(&Uuid::new_v4().to_string()).context("hash decoy")?;
        Ok(Self {
            users,
            keys,
            validator,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<Authenticated, AppError> {
        self.validator.require("name", &req.name)?;
        self.validator.require("username", &req.username)?;
        self.validator.require("email", &req.email)?;
        self.validator.require("password", &req.password)?;

        if !self.validator.is_valid_email(&req.email) {
            warn!("register rejected: invalid email");
            return Err(AppError::BadRequest("invalid email format".into()));
        }

        let RegisterRequest {
            username,
            name,
            email,
            password,
        } = req;

        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("hash task panicked")?
            .context("hash password")?;

        let user = UserRecord::new(Uuid::new_v4(), name, username, email, hash);
        self.users.create(&user).await?;

        let access_token = self.keys.sign(user.id, &user.username, &user.email)?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(Authenticated {
            user: PublicUser::from(&user),
            access_token,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<Authenticated, AppError> {
        let username = req.username.filter(|u| !u.is_empty());
        let email = req.email.filter(|e| !e.is_empty());

        if username.is_none() && email.is_none() {
            return Err(AppError::BadRequest(
                "either username or email is required".into(),
            ));
        }
        self.validator.require("password", &req.password)?;

        let user = self.resolve(username.as_deref(), email.as_deref()).await?;

        // An unknown user still pays for one Argon2 verification.
        let password = req.password;
        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let decoy = self.decoy_hash.clone();
        let ok = tokio::task::spawn_blocking(move || {
            verify_or_decoy(&password, stored.as_deref(), &decoy)
        })
        .await
        .context("verify task panicked")?;

        let user = match user {
            Some(user) if ok => user,
            Some(user) => {
                warn!(user_id = %user.id, "login invalid password");
                return Err(AppError::invalid_credentials());
            }
            None => {
                warn!("login unknown user");
                return Err(AppError::invalid_credentials());
            }
        };

        let access_token = self.keys.sign(user.id, &user.username, &user.email)?;

        info!(user_id = %user.id, username = %user.username, "user logged in");
        Ok(Authenticated {
            user: PublicUser::from(&user),
            access_token,
        })
    }

    /// Username first, then email, falling through only on `NotFound` (or a soft-deleted row).
    async fn resolve(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRecord>, AppError> {
        if let Some(username) = username {
            match self.users.find_by_username(username).await {
                Ok(u) if !u.is_deleted() => return Ok(Some(u)),
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if let Some(email) = email {
            match self.users.find_by_email(email).await {
                Ok(u) if !u.is_deleted() => return Ok(Some(u)),
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}
