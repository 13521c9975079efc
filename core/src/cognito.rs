// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use anyhow::Context;
use anyhow::anyhow;
use aws_sdk_cognitoidentityprovider as cognito_idp;
use cognito_idp::error::DisplayErrorContext;
use cognito_idp::error::ProvideErrorMetadata;
use cognito_idp::error::SdkError;
use cognito_idp::types::AttributeType;
use cognito_idp::types::DeliveryMediumType;
use cognito_idp::types::MessageActionType;
use cognito_idp::types::UserType;

/// Map a Cognito error code onto the kind of failure it represents. Codes we
/// don't know about stay unclassified.
pub fn error_kind_for_code(code: &str) -> Option<ErrorKind> {
    let kind = match code {
        "UserNotFoundException" | "ResourceNotFoundException" => {
            ErrorKind::NotFound
        }

        "UsernameExistsException" | "AliasExistsException" => {
            ErrorKind::Conflict
        }

        "InvalidParameterException" | "InvalidPasswordException" => {
            ErrorKind::InvalidParameter
        }

        "TooManyRequestsException" | "LimitExceededException" => {
            ErrorKind::Throttled
        }

        "NotAuthorizedException" => ErrorKind::NotAuthorized,

        _ => return None,
    };

    Some(kind)
}

fn classify<E, R>(error: SdkError<E, R>) -> UpstreamError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match error.code().and_then(error_kind_for_code) {
        Some(kind) => {
            let detail = match error.message() {
                Some(message) => message.to_string(),
                None => DisplayErrorContext(&error).to_string(),
            };

            Error::new(kind, detail).into()
        }

        // Dispatch failures, timeouts, and service errors we don't map
        None => anyhow::Error::new(error).into(),
    }
}

fn to_attribute_types(
    attributes: Vec<Attribute>,
) -> Result<Vec<AttributeType>, UpstreamError> {
    let attributes = attributes
        .into_iter()
        .map(|Attribute { name, value }| {
            AttributeType::builder().name(name).set_value(value).build()
        })
        .collect::<Result<Vec<_>, _>>()
        .context("building user attributes")?;

    Ok(attributes)
}

fn from_attribute_types(attributes: &[AttributeType]) -> Vec<Attribute> {
    attributes
        .iter()
        .map(|attribute| Attribute {
            name: attribute.name().to_string(),
            value: attribute.value().map(str::to_string),
        })
        .collect()
}

fn from_user_type(user: &UserType) -> Result<RawUser, UpstreamError> {
    let username =
        user.username().ok_or_else(|| anyhow!("user has no username"))?;

    Ok(RawUser {
        username: username.to_string(),
        attributes: from_attribute_types(user.attributes()),
    })
}

fn delivery_medium_type(medium: DeliveryMedium) -> DeliveryMediumType {
    match medium {
        DeliveryMedium::Email => DeliveryMediumType::Email,
        DeliveryMedium::Sms => DeliveryMediumType::Sms,
    }
}

/// An [`IdentityProviderClient`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct CognitoClient {
    client: cognito_idp::Client,
}

impl CognitoClient {
    pub fn new(client: cognito_idp::Client) -> Self {
        Self { client }
    }

    /// Load the SDK configuration for `config.region`. Without explicit
    /// credentials the default provider chain (environment, profile, IMDS)
    /// is used.
    pub async fn from_config(config: &UserPoolConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(
                cognito_idp::config::Credentials::new(
                    &credentials.access_key_id,
                    &credentials.secret_access_key,
                    None,
                    None,
                    "cognito-user-pool-config",
                ),
            );
        }

        let sdk_config = loader.load().await;
        Self::new(cognito_idp::Client::new(&sdk_config))
    }
}

#[async_trait]
impl IdentityProviderClient for CognitoClient {
    async fn create_user(
        &self,
        user_pool_id: &str,
        user: NewUser,
    ) -> Result<RawUser, UpstreamError> {
        let NewUser {
            username,
            temporary_password,
            attributes,
            suppress_notification,
            delivery_medium,
        } = user;

        let output = self
            .client
            .admin_create_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .set_temporary_password(temporary_password)
            .set_message_action(
                suppress_notification.then_some(MessageActionType::Suppress),
            )
            .desired_delivery_mediums(delivery_medium_type(delivery_medium))
            .set_user_attributes(Some(to_attribute_types(attributes)?))
            .send()
            .await
            .map_err(classify)?;

        let user = output
            .user()
            .ok_or_else(|| anyhow!("AdminCreateUser returned no user"))?;

        from_user_type(user)
    }

    async fn delete_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<(), UpstreamError> {
        self.client
            .admin_delete_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn get_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<RawUser, UpstreamError> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify)?;

        Ok(RawUser {
            username: output.username().to_string(),
            attributes: from_attribute_types(output.user_attributes()),
        })
    }

    async fn update_user_attributes(
        &self,
        user_pool_id: &str,
        username: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(), UpstreamError> {
        self.client
            .admin_update_user_attributes()
            .user_pool_id(user_pool_id)
            .username(username)
            .set_user_attributes(Some(to_attribute_types(attributes)?))
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn set_user_password(
        &self,
        user_pool_id: &str,
        username: &str,
        password: &str,
        permanent: bool,
    ) -> Result<(), UpstreamError> {
        self.client
            .admin_set_user_password()
            .user_pool_id(user_pool_id)
            .username(username)
            .password(password)
            .permanent(permanent)
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn list_users(
        &self,
        user_pool_id: &str,
        pagination_token: Option<String>,
        limit: i32,
    ) -> Result<ListUsersPage, UpstreamError> {
        let output = self
            .client
            .list_users()
            .user_pool_id(user_pool_id)
            .set_pagination_token(pagination_token)
            .limit(limit)
            .send()
            .await
            .map_err(classify)?;

        let users = output
            .users()
            .iter()
            .map(from_user_type)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListUsersPage {
            users,
            pagination_token: output.pagination_token().map(str::to_string),
        })
    }

    async fn region(&self) -> Result<String, UpstreamError> {
        let region = self
            .client
            .config()
            .region()
            .ok_or_else(|| anyhow!("no region configured for Cognito client"))?;

        Ok(region.to_string())
    }
}
