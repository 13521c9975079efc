// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::de::DeserializeOwned;
use slog::{Logger, debug, error, warn};
use std::marker::PhantomData;

use super::*;

/// The largest page ListUsers will return.
pub const LIST_USERS_PAGE_SIZE: i32 = 60;

const MISSING_USERNAME_CLAIM: &str =
    "cognito:username or username needs to be passed";

fn upstream_error_to_error(
    log: &Logger,
    context: String,
) -> impl FnOnce(UpstreamError) -> Error {
    move |error| {
        match error {
            UpstreamError::Unclassified(error) => {
                // Keep the collaborator's own message for the caller, and log
                // the whole chain with our context for our own records.
                let detail = format!("{context} {error}");
                let error = error.context(context);
                // NB: Using the "#?" formatter is load bearing as it will
                // inline the entire error chain.
                error!(log, "{error:#?}");
                Error::internal_error(detail)
            }
            UpstreamError::Classified(error) => error,
        }
    }
}

/// UserPool implements user CRUD and token lookup over an identity provider
/// client, transforming the provider's raw users into [`UserRecord`]s with
/// custom attributes of type `T`.
pub struct UserPool<C, V, T = Properties> {
    log: Logger,
    user_pool_id: String,
    client: C,
    verifier: V,
    attributes: PhantomData<fn() -> T>,
}

impl<T> UserPool<CognitoClient, RemoteJwksVerifier, T>
where
    T: Serialize + DeserializeOwned,
{
    /// Build a pool backed by the AWS SDK and a remote key set verifier.
    pub async fn for_user_pool_id(
        log: Logger,
        user_pool_id: impl Into<String>,
        config: &UserPoolConfig,
    ) -> Result<Self, Error> {
        let client = CognitoClient::from_config(config).await;
        let verifier = RemoteJwksVerifier::from_config(config)?;

        Ok(Self::new(log, user_pool_id, client, verifier))
    }
}

impl<C, V, T> UserPool<C, V, T>
where
    C: IdentityProviderClient,
    V: TokenVerifier,
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        log: Logger,
        user_pool_id: impl Into<String>,
        client: C,
        verifier: V,
    ) -> Self {
        Self {
            log,
            user_pool_id: user_pool_id.into(),
            client,
            verifier,
            attributes: PhantomData,
        }
    }

    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create a user whose username is their email.
    ///
    /// Unless `options.verified` is set Cognito emails the user their
    /// temporary password.
    pub async fn create_user(
        &self,
        request: CreateUserRequest<T>,
        options: CreateUserOptions,
    ) -> Result<UserRecord<T>, Error> {
        let CreateUserRequest { email, password, attributes } = request;

        let Some(email) = email.filter(|email| !email.is_empty()) else {
            return Err(Error::invalid_parameter(
                "email is required to create a user",
            ));
        };

        let mut attributes = encode_attributes(&attributes)?;

        // The email attribute always comes from the request's email.
        attributes.push(Attribute::new(EMAIL_ATTRIBUTE, email.clone()));
        attributes.push(Attribute::new(
            EMAIL_VERIFIED_ATTRIBUTE,
            if options.verified { "true" } else { "false" },
        ));

        debug!(self.log, "creating user";
            "username" => email.as_str(),
            "verified" => options.verified,
        );

        let user = NewUser {
            username: email.clone(),
            temporary_password: password,
            attributes,
            suppress_notification: options.verified,
            delivery_medium: DeliveryMedium::Email,
        };

        let raw_user = self
            .client
            .create_user(&self.user_pool_id, user)
            .await
            .map_err(upstream_error_to_error(
                &self.log,
                format!("create user {email} failed!"),
            ))?;

        UserRecord::from_raw(raw_user)
    }

    /// Update a user's attributes, and their password if one is supplied.
    ///
    /// The attribute update and the password reset are sent together. They
    /// are not atomic: if one fails the other is not rolled back, and the
    /// first failure is returned.
    pub async fn update_user(
        &self,
        id: &str,
        request: UpdateUserRequest<T>,
    ) -> Result<UserRecord<T>, Error> {
        let UpdateUserRequest { password, attributes } = request;

        let attributes = encode_attributes(&attributes)?;
        let password = password.filter(|password| !password.is_empty());

        debug!(self.log, "updating user";
            "username" => id,
            "attributes" => attributes.len(),
            "password" => password.is_some(),
        );

        let update_attributes = self.client.update_user_attributes(
            &self.user_pool_id,
            id,
            attributes,
        );

        let set_password = async {
            match &password {
                Some(password) => {
                    self.client
                        .set_user_password(&self.user_pool_id, id, password, false)
                        .await
                }
                None => Ok(()),
            }
        };

        let (attributes_result, password_result) =
            tokio::join!(update_attributes, set_password);

        if attributes_result.is_ok() != password_result.is_ok() {
            warn!(self.log, "user update partially applied";
                "username" => id,
                "attributes_updated" => attributes_result.is_ok(),
                "password_set" => password_result.is_ok(),
            );
        }

        let context = format!("update user {id} failed!");
        attributes_result
            .map_err(upstream_error_to_error(&self.log, context.clone()))?;
        password_result.map_err(upstream_error_to_error(&self.log, context))?;

        self.get_user_by_id(id).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), Error> {
        debug!(self.log, "deleting user"; "username" => id);

        self.client.delete_user(&self.user_pool_id, id).await.map_err(
            upstream_error_to_error(
                &self.log,
                format!("delete user {id} failed!"),
            ),
        )
    }

    /// Every user in the pool. All pages are fetched before anything is
    /// returned; use [`UserPool::pages`] to bound memory use.
    pub async fn list_users(&self) -> Result<Vec<UserRecord<T>>, Error> {
        let mut pages = self.pages();
        let mut users = Vec::new();

        while let Some(page) = pages.next_page().await? {
            users.extend(page);
        }

        debug!(self.log, "listed users"; "count" => users.len());

        Ok(users)
    }

    /// A lazy, restartable walk over the pool's users, one page at a time.
    pub fn pages(&self) -> UserPages<'_, C, V, T> {
        UserPages::new(self)
    }

    /// Fetch a single page of users. An empty continuation token is the same
    /// as none at all.
    pub async fn list_users_page(
        &self,
        pagination_token: Option<String>,
    ) -> Result<UserPage<T>, Error> {
        let pagination_token =
            pagination_token.filter(|token| !token.is_empty());

        let ListUsersPage { users, pagination_token } = self
            .client
            .list_users(
                &self.user_pool_id,
                pagination_token,
                LIST_USERS_PAGE_SIZE,
            )
            .await
            .map_err(upstream_error_to_error(
                &self.log,
                "list users failed!".to_string(),
            ))?;

        let users = users
            .into_iter()
            .map(UserRecord::from_raw)
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(UserPage {
            users,
            next_token: pagination_token.filter(|token| !token.is_empty()),
        })
    }

    pub async fn get_user_by_id(
        &self,
        id: &str,
    ) -> Result<UserRecord<T>, Error> {
        let raw_user = self
            .client
            .get_user(&self.user_pool_id, id)
            .await
            .map_err(upstream_error_to_error(
                &self.log,
                format!("get user by id {id} failed!"),
            ))?;

        UserRecord::from_raw(raw_user)
    }

    /// Verify `token` against the pool's key set and return the user it
    /// names. The user is always looked up afresh, so a valid token for a
    /// deleted user fails with `NotFound`.
    pub async fn get_user_using_token(
        &self,
        token: &str,
    ) -> Result<UserRecord<T>, Error> {
        let region = self.client.region().await.map_err(
            upstream_error_to_error(
                &self.log,
                "resolving region failed!".to_string(),
            ),
        )?;

        let url = jwks_url(&region, &self.user_pool_id);

        let key_set = self.verifier.fetch_key_set(&url).await.map_err(
            upstream_error_to_error(
                &self.log,
                format!("fetching key set {url} failed!"),
            ),
        )?;

        let payload = self.verifier.verify(token, &key_set).map_err(
            upstream_error_to_error(
                &self.log,
                "token verification failed!".to_string(),
            ),
        )?;

        let Some(username) = payload.username() else {
            return Err(Error::invalid_token(MISSING_USERNAME_CLAIM));
        };

        debug!(self.log, "token verified";
            "username" => username,
            "token_use" => payload.token_use.as_deref().unwrap_or(""),
        );

        self.get_user_by_id(username).await
    }
}

impl<V, T> UserPool<InMemoryIdentityProvider, V, T> {
    pub fn state(&self) -> InMemoryIdentityProviderState {
        self.client.state()
    }
}
