use serde_json::json;

use super::{fields, logged, record, require, NewUser, Orchestrator};
use crate::db::models::{Account, Session, UserProfile};
use crate::error::{ApiError, ApiResult};
use crate::platform::{avatars, unique_id, Query};

impl Orchestrator {
    /// Create the account, then its profile document with an initials avatar.
    ///
    /// A profile write failing after the account exists is reported but not
    /// compensated: the account stays and can sign in without a profile.
    pub async fn create_account(&self, user: NewUser) -> ApiResult<UserProfile> {
        logged("create_account", self.create_account_inner(user).await)
    }

    async fn create_account_inner(&self, user: NewUser) -> ApiResult<UserProfile> {
        require(&user.name, "name")?;
        require(&user.email, "email")?;

        let account = self
            .accounts
            .create(&unique_id(), &user.email, &user.password, &user.name)
            .await?;
        if account.id.is_empty() {
            return Err(ApiError::upstream("account service returned no id"));
        }

        let avatar_url = avatars::initials_url(&self.public_url, &account.name)?;

        self.save_user_to_db(&account, avatar_url.as_str(), user.username)
            .await
            .map_err(|e| {
                tracing::warn!("Account {} has no profile: {}", account.id, e);
                e
            })
    }

    async fn save_user_to_db(
        &self,
        account: &Account,
        image_url: &str,
        username: Option<String>,
    ) -> ApiResult<UserProfile> {
        let document = self
            .documents
            .create_document(
                &self.ids.users(),
                &unique_id(),
                fields(json!({
                    "accountId": account.id,
                    "email": account.email,
                    "name": account.name,
                    "imageUrl": image_url,
                    "username": username,
                })),
            )
            .await?;
        record(document)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        let result = self
            .accounts
            .create_email_password_session(email, password)
            .await
            .map_err(ApiError::from);
        logged("sign_in", result)
    }

    /// Account behind the session, then the first profile referencing it.
    pub async fn get_current_user(&self, session_secret: &str) -> ApiResult<UserProfile> {
        logged(
            "get_current_user",
            self.get_current_user_inner(session_secret).await,
        )
    }

    async fn get_current_user_inner(&self, session_secret: &str) -> ApiResult<UserProfile> {
        let account = self.accounts.get(session_secret).await?;

        let page = self
            .documents
            .list_documents(
                &self.ids.users(),
                &[Query::equal("accountId", account.id.as_str())],
            )
            .await?;

        let document = page
            .documents
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("no profile for account {}", account.id)))?;
        record(document)
    }

    pub async fn sign_out(&self, session_secret: &str) -> ApiResult<()> {
        let result = self
            .accounts
            .delete_session(session_secret)
            .await
            .map_err(ApiError::from);
        logged("sign_out", result)
    }
}
