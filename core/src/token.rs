// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// The well known key set URL for a user pool.
pub fn jwks_url(region: &str, user_pool_id: &str) -> String {
    format!(
        "https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json"
    )
}

/// The claims of a verified Cognito token that we care about. Everything
/// else is kept in `claims`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TokenPayload {
    /// `id` for identity tokens, `access` for access tokens
    #[serde(default)]
    pub token_use: Option<String>,

    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl TokenPayload {
    /// Identity tokens name the user in `cognito:username`, access tokens in
    /// `username`.
    pub fn username(&self) -> Option<&str> {
        let username = match self.token_use.as_deref() {
            Some("id") => self.cognito_username.as_deref(),
            _ => self.username.as_deref(),
        };

        username.filter(|username| !username.is_empty())
    }
}

/// Verifies bearer tokens against a remote key set.
#[async_trait]
pub trait TokenVerifier: Sync {
    type KeySet: Send + Sync;

    async fn fetch_key_set(
        &self,
        jwks_url: &str,
    ) -> Result<Self::KeySet, UpstreamError>;

    /// Check the signature and the standard time based claims, returning the
    /// decoded payload.
    fn verify(
        &self,
        token: &str,
        key_set: &Self::KeySet,
    ) -> Result<TokenPayload, UpstreamError>;
}
