// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::JwkSet;
use std::time::Duration;

/// Verify `token` with the key in `key_set` that matches its `kid` header.
///
/// `exp` is required and checked along with `nbf`. The audience is not
/// checked, since Cognito access tokens carry `client_id` instead of `aud`.
pub fn verify_token(
    token: &str,
    key_set: &JwkSet,
) -> Result<TokenPayload, Error> {
    let header = decode_header(token).map_err(|e| {
        Error::invalid_token(format!("invalid token header: {e}"))
    })?;

    let kid = header
        .kid
        .as_deref()
        .ok_or_else(|| Error::invalid_token("token is missing a kid header"))?;

    let jwk = key_set.find(kid).ok_or_else(|| {
        Error::invalid_token(format!("key {kid} not found in key set"))
    })?;

    let key = DecodingKey::from_jwk(jwk).map_err(|e| {
        Error::invalid_token(format!("key {kid} is unusable: {e}"))
    })?;

    let mut validation = Validation::new(header.alg);
    validation.validate_aud = false;
    validation.validate_nbf = true;

    let token_data =
        decode::<TokenPayload>(token, &key, &validation).map_err(|e| {
            Error::invalid_token(format!("token verification failed: {e}"))
        })?;

    Ok(token_data.claims)
}

/// A [`TokenVerifier`] that downloads the key set on every lookup.
#[derive(Clone, Debug)]
pub struct RemoteJwksVerifier {
    http: reqwest::Client,
}

impl RemoteJwksVerifier {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn from_config(config: &UserPoolConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.jwks_timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| {
                Error::internal_error(format!(
                    "failed to build key set HTTP client: {e}"
                ))
            })?;

        Ok(Self::new(http))
    }
}

#[async_trait]
impl TokenVerifier for RemoteJwksVerifier {
    type KeySet = JwkSet;

    async fn fetch_key_set(
        &self,
        jwks_url: &str,
    ) -> Result<JwkSet, UpstreamError> {
        let response = self
            .http
            .get(jwks_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                Error::unavailable(format!("failed to fetch key set: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unavailable(format!(
                "failed to fetch key set: HTTP {status}"
            ))
            .into());
        }

        let key_set: JwkSet = response.json().await.map_err(|e| {
            Error::unavailable(format!("invalid key set: {e}"))
        })?;

        Ok(key_set)
    }

    fn verify(
        &self,
        token: &str,
        key_set: &JwkSet,
    ) -> Result<TokenPayload, UpstreamError> {
        Ok(verify_token(token, key_set)?)
    }
}
