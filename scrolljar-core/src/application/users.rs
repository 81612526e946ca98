//! Account use cases: registration, activation, authentication and
//! resolution of bearer tokens into request principals

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

use super::errors::ApplicationError;
use super::mail::MailDispatcher;
use super::unit_of_work::finish;
use super::validation::{Validator, check_password};
use crate::config::AuthConfig;
use crate::domain::auth::{
    Email, ITokenRepository, IUserRepository, IssuedToken, NewUser, Principal, TokenScope, User,
};
use crate::domain::mailer::{MailMessage, MailTemplate};
use crate::domain::store::{StoreError, USERS_EMAIL_KEY};
use crate::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};
use crate::infrastructure::auth::{PasswordHasher, TokenGenerator};

const MAX_USERNAME_CHARS: usize = 512;

/// Parse an email into the validator, returning it when well formed
fn check_email(v: &mut Validator, raw: &str) -> Option<Email> {
    match Email::new(raw.to_string()) {
        Ok(email) => Some(email),
        Err(message) => {
            v.check(false, "email", message);
            None
        }
    }
}

/// Email and password validation shared by the credential endpoints
fn validate_credentials(email: &str, password: &str) -> Result<Email, ApplicationError> {
    let mut v = Validator::new();
    let parsed = check_email(&mut v, email);
    check_password(&mut v, "password", password);
    v.finish()?;
    parsed.ok_or_else(|| ApplicationError::validation("email", "must be a valid email address"))
}

/// Look up a user by email and check the password against the stored hash
async fn verify_credentials(
    users: &dyn IUserRepository,
    hasher: &PasswordHasher,
    email: &Email,
    password: String,
) -> Result<User, ApplicationError> {
    let Some(user) = users.find_by_email(email).await? else {
        return Err(ApplicationError::InvalidCredentials);
    };

    if hasher.verify(password, user.password_hash.clone()).await? {
        Ok(user)
    } else {
        Err(ApplicationError::InvalidCredentials)
    }
}

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Use case for registering an account.
///
/// The user row and its first activation token are written together; the
/// welcome mail carrying the token is sent in the background.
pub struct RegisterUserUseCase {
    units: Arc<dyn IUnitOfWorkFactory>,
    hasher: PasswordHasher,
    generator: TokenGenerator,
    mail: MailDispatcher,
    config: AuthConfig,
}

impl RegisterUserUseCase {
    pub fn new(
        units: Arc<dyn IUnitOfWorkFactory>,
        hasher: PasswordHasher,
        generator: TokenGenerator,
        mail: MailDispatcher,
        config: AuthConfig,
    ) -> Self {
        Self {
            units,
            hasher,
            generator,
            mail,
            config,
        }
    }

    #[instrument(skip(self, command), fields(username = %command.username))]
    pub async fn execute(&self, command: RegisterUserCommand) -> Result<User, ApplicationError> {
        let mut v = Validator::new();
        let username_len = command.username.chars().count();
        v.check(
            (1..=MAX_USERNAME_CHARS).contains(&username_len),
            "username",
            format!("must be within 1-{MAX_USERNAME_CHARS} characters"),
        );
        let email = check_email(&mut v, &command.email);
        check_password(&mut v, "password", &command.password);
        v.finish()?;
        let email = email
            .ok_or_else(|| ApplicationError::validation("email", "must be a valid email address"))?;

        let password_hash = self.hasher.hash(command.password).await?;
        let new_user = NewUser {
            username: command.username,
            email,
            password_hash,
        };

        let mut uow = self.units.begin().await?;
        let outcome = self.stage(uow.as_mut(), &new_user).await;
        let (user, activation) = finish(uow, outcome).await?;

        self.mail.dispatch(MailMessage {
            recipient: user.email.to_string(),
            template: MailTemplate::UserWelcome,
            data: serde_json::json!({
                "user_id": user.id.as_i64(),
                "username": user.username,
                "token": activation.plaintext,
                "expires_at": activation.token.expires_at,
            }),
        });

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn stage(
        &self,
        uow: &mut dyn IUnitOfWork,
        new_user: &NewUser,
    ) -> Result<(User, IssuedToken), ApplicationError> {
        let user = uow.insert_user(new_user).await.map_err(|e| {
            if e.is_duplicate_of(USERS_EMAIL_KEY) {
                ApplicationError::validation("email", "a user with this email address already exists")
            } else {
                e.into()
            }
        })?;

        let activation = self.generator.generate(
            user.id,
            TokenScope::Activation,
            self.config.activation_ttl(),
            Utc::now(),
        );
        uow.insert_token(&activation.token).await?;

        Ok((user, activation))
    }
}

/// Use case for activating an account with an emailed activation token
pub struct ActivateUserUseCase {
    units: Arc<dyn IUnitOfWorkFactory>,
    generator: TokenGenerator,
}

impl ActivateUserUseCase {
    pub fn new(units: Arc<dyn IUnitOfWorkFactory>, generator: TokenGenerator) -> Self {
        Self { units, generator }
    }

    #[instrument(skip(self, token))]
    pub async fn execute(&self, token: String) -> Result<User, ApplicationError> {
        let mut v = Validator::new();
        v.check(!token.is_empty(), "token", "must be provided");
        v.check(
            token.is_empty() || self.generator.is_well_formed(&token),
            "token",
            "invalid or expired activation token",
        );
        v.finish()?;

        let mut uow = self.units.begin().await?;
        let outcome = Self::stage(uow.as_mut(), &token).await;
        let user = finish(uow, outcome).await?;

        tracing::info!(user_id = %user.id, "User activated");
        Ok(user)
    }

    async fn stage(uow: &mut dyn IUnitOfWork, token: &str) -> Result<User, ApplicationError> {
        let hash = TokenGenerator::hash(token);
        let Some(mut user) = uow
            .find_user_by_token(&hash, TokenScope::Activation, Utc::now())
            .await?
        else {
            return Err(ApplicationError::validation(
                "token",
                "invalid or expired activation token",
            ));
        };

        user.version = uow
            .set_user_activated(&user.id, true, user.version)
            .await?;
        user.activated = true;

        uow.delete_tokens_for_user(&user.id, TokenScope::Activation)
            .await?;

        Ok(user)
    }
}

#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub authorization: IssuedToken,
    pub refresh: IssuedToken,
}

/// Use case for exchanging credentials for bearer tokens
pub struct AuthenticateUserUseCase {
    users: Arc<dyn IUserRepository>,
    units: Arc<dyn IUnitOfWorkFactory>,
    hasher: PasswordHasher,
    generator: TokenGenerator,
    config: AuthConfig,
}

impl AuthenticateUserUseCase {
    pub fn new(
        users: Arc<dyn IUserRepository>,
        units: Arc<dyn IUnitOfWorkFactory>,
        hasher: PasswordHasher,
        generator: TokenGenerator,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            units,
            hasher,
            generator,
            config,
        }
    }

    #[instrument(skip(self, email, password))]
    pub async fn execute(
        &self,
        email: String,
        password: String,
    ) -> Result<AuthTokens, ApplicationError> {
        let email = validate_credentials(&email, &password)?;
        let user = verify_credentials(self.users.as_ref(), &self.hasher, &email, password).await?;

        if !user.activated {
            return Err(ApplicationError::InactiveAccount);
        }

        let now = Utc::now();
        let tokens = AuthTokens {
            authorization: self.generator.generate(
                user.id,
                TokenScope::Authorization,
                self.config.authorization_ttl(),
                now,
            ),
            refresh: self.generator.generate(
                user.id,
                TokenScope::Refresh,
                self.config.refresh_ttl(),
                now,
            ),
        };

        let mut uow = self.units.begin().await?;
        let outcome = Self::stage(uow.as_mut(), &tokens).await;
        finish(uow, outcome).await?;

        tracing::info!(user_id = %user.id, "User authenticated");
        Ok(tokens)
    }

    async fn stage(uow: &mut dyn IUnitOfWork, tokens: &AuthTokens) -> Result<(), ApplicationError> {
        uow.insert_token(&tokens.authorization.token).await?;
        uow.insert_token(&tokens.refresh.token).await?;
        Ok(())
    }
}

/// Use case for requesting a fresh activation token.
///
/// The token is mailed to the account address; only its expiry is returned.
pub struct CreateActivationTokenUseCase {
    users: Arc<dyn IUserRepository>,
    tokens: Arc<dyn ITokenRepository>,
    hasher: PasswordHasher,
    generator: TokenGenerator,
    mail: MailDispatcher,
    config: AuthConfig,
}

impl CreateActivationTokenUseCase {
    pub fn new(
        users: Arc<dyn IUserRepository>,
        tokens: Arc<dyn ITokenRepository>,
        hasher: PasswordHasher,
        generator: TokenGenerator,
        mail: MailDispatcher,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            generator,
            mail,
            config,
        }
    }

    #[instrument(skip(self, email, password))]
    pub async fn execute(
        &self,
        email: String,
        password: String,
    ) -> Result<DateTime<Utc>, ApplicationError> {
        let email = validate_credentials(&email, &password)?;
        let user = verify_credentials(self.users.as_ref(), &self.hasher, &email, password).await?;

        if user.activated {
            return Err(ApplicationError::AlreadyActivated);
        }

        let activation = self.generator.generate(
            user.id,
            TokenScope::Activation,
            self.config.activation_ttl(),
            Utc::now(),
        );
        self.tokens.insert(&activation.token).await?;

        self.mail.dispatch(MailMessage {
            recipient: user.email.to_string(),
            template: MailTemplate::ActivationToken,
            data: serde_json::json!({
                "user_id": user.id.as_i64(),
                "token": activation.plaintext,
                "expires_at": activation.token.expires_at,
            }),
        });

        tracing::info!(user_id = %user.id, "Activation token issued");
        Ok(activation.token.expires_at)
    }
}

/// Resolves the `Authorization` header of a request into a [`Principal`]
pub struct ResolvePrincipalUseCase {
    tokens: Arc<dyn ITokenRepository>,
    generator: TokenGenerator,
}

impl ResolvePrincipalUseCase {
    pub fn new(tokens: Arc<dyn ITokenRepository>, generator: TokenGenerator) -> Self {
        Self { tokens, generator }
    }

    /// `None` resolves to [`Principal::Anonymous`]; a malformed, unknown or
    /// expired token is rejected.
    pub async fn execute(&self, bearer: Option<&str>) -> Result<Principal, ApplicationError> {
        let Some(token) = bearer else {
            return Ok(Principal::Anonymous);
        };

        if !self.generator.is_well_formed(token) {
            return Err(ApplicationError::InvalidAuthenticationToken);
        }

        let hash = TokenGenerator::hash(token);
        match self
            .tokens
            .find_user(&hash, TokenScope::Authorization, Utc::now())
            .await
        {
            Ok(Some(user)) => Ok(Principal::User(user)),
            Ok(None) | Err(StoreError::NotFound) => {
                Err(ApplicationError::InvalidAuthenticationToken)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credentials_reports_every_field() {
        match validate_credentials("not-an-email", "short") {
            Err(ApplicationError::Validation { errors }) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field[0].as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_credentials_normalizes_email() {
        let email = validate_credentials("Alice@Example.com", "long enough").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }
}
