// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// Channels Cognito can use to deliver the welcome message.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq)]
pub enum DeliveryMedium {
    Email,
    Sms,
}

/// An AdminCreateUser request.
#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub temporary_password: Option<String>,
    pub attributes: Vec<Attribute>,

    /// Don't send the welcome message at all.
    pub suppress_notification: bool,

    pub delivery_medium: DeliveryMedium,
}

/// A single page of a ListUsers response.
#[derive(Clone, Debug, PartialEq)]
pub struct ListUsersPage {
    pub users: Vec<RawUser>,
    pub pagination_token: Option<String>,
}

/// The admin API of the identity provider that holds the users.
#[async_trait]
pub trait IdentityProviderClient: Sync {
    async fn create_user(
        &self,
        user_pool_id: &str,
        user: NewUser,
    ) -> Result<RawUser, UpstreamError>;

    async fn delete_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<(), UpstreamError>;

    async fn get_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<RawUser, UpstreamError>;

    async fn update_user_attributes(
        &self,
        user_pool_id: &str,
        username: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(), UpstreamError>;

    async fn set_user_password(
        &self,
        user_pool_id: &str,
        username: &str,
        password: &str,
        permanent: bool,
    ) -> Result<(), UpstreamError>;

    async fn list_users(
        &self,
        user_pool_id: &str,
        pagination_token: Option<String>,
        limit: i32,
    ) -> Result<ListUsersPage, UpstreamError>;

    /// The region this client sends requests to.
    async fn region(&self) -> Result<String, UpstreamError>;
}
