// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

fn default_jwks_timeout_secs() -> u64 {
    10
}

/// Static AWS credentials. Without these the default credential provider
/// chain is used.
#[derive(Deserialize, JsonSchema, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// How to reach a user pool.
#[derive(Deserialize, JsonSchema, Clone, Debug)]
pub struct UserPoolConfig {
    pub region: String,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Timeout for fetching the pool's key set, in seconds
    #[serde(default = "default_jwks_timeout_secs")]
    pub jwks_timeout_secs: u64,
}

impl UserPoolConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
            jwks_timeout_secs: default_jwks_timeout_secs(),
        }
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }
}
