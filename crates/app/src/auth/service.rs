//! Auth service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::{
        ApiTokenMetadata, ApiTokenVersion, AuthServiceError, IssuedApiToken, NewApiToken,
        Principal, Role, format_api_token, generate_api_token_secret, hash_api_token,
        parse_api_token, repository::PgAuthRepository,
    },
    domain::users::UserUuid,
};

#[derive(Debug, Clone)]
pub struct PgAuthService {
    repository: PgAuthRepository,
}

impl PgAuthService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PgAuthRepository::new(pool),
        }
    }

    /// Issue a new API token for the given user and role.
    ///
    /// # Errors
    ///
    /// Returns an error if database insertion fails.
    #[tracing::instrument(name = "auth.service.issue_api_token", skip(self), fields(user_uuid = %user, role = %role), err)]
    pub async fn issue_api_token(
        &self,
        user: UserUuid,
        role: Role,
    ) -> Result<IssuedApiToken, AuthServiceError> {
        let token_uuid = Uuid::now_v7();
        let version = ApiTokenVersion::V1;
        let secret = generate_api_token_secret();
        let token = format_api_token(token_uuid, version, &secret);

        let metadata = self
            .repository
            .create_api_token(&NewApiToken {
                uuid: token_uuid,
                user_uuid: user,
                role,
                version,
                token_hash: hash_api_token(&token),
            })
            .await?;

        info!(token_uuid = %token_uuid, "issued api token");

        Ok(IssuedApiToken { token, metadata })
    }

    /// List all tokens for the given user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_api_tokens(
        &self,
        user: UserUuid,
    ) -> Result<Vec<ApiTokenMetadata>, AuthServiceError> {
        Ok(self.repository.list_api_tokens_by_user(user).await?)
    }

    /// Revoke a token by UUID. Returns `true` if the token was active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke_api_token(&self, token_uuid: Uuid) -> Result<bool, AuthServiceError> {
        Ok(self
            .repository
            .revoke_api_token(token_uuid)
            .await?
            .is_some())
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authenticate_bearer(&self, bearer_token: &str) -> Result<Principal, AuthServiceError> {
        let parsed_token = parse_api_token(bearer_token).map_err(|_| AuthServiceError::NotFound)?;

        let token = self
            .repository
            .find_active_api_token_by_hash(&hash_api_token(bearer_token))
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        if token.uuid != parsed_token.token_uuid || token.version != parsed_token.version {
            return Err(AuthServiceError::NotFound);
        }

        // Auth success does not depend on this write.
        if let Err(error) = self.repository.touch_api_token_last_used(token.uuid).await {
            debug!(%error, token_uuid = %token.uuid, "failed to record token use");
        }

        Ok(Principal {
            user: token.user_uuid,
            role: token.role,
        })
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve a raw bearer token to the principal it was issued to.
    async fn authenticate_bearer(&self, bearer_token: &str) -> Result<Principal, AuthServiceError>;
}
