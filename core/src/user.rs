// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use serde::de::DeserializeOwned;

/// The fields used to create a new user. Any extra attributes ride along in
/// `attributes`.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default)]
pub struct CreateUserRequest<T = Properties> {
    /// Required. It becomes the username as well as the email attribute.
    pub email: Option<String>,

    /// A temporary password that the user must change after signing in. If
    /// omitted, Cognito generates one.
    pub password: Option<String>,

    #[serde(flatten)]
    pub attributes: T,
}

/// The fields used to update an existing user. Email is the username, so it
/// cannot be changed here.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default)]
pub struct UpdateUserRequest<T = Properties> {
    /// If present (and not empty) the user's password is reset to this value.
    pub password: Option<String>,

    #[serde(flatten)]
    pub attributes: T,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, Default)]
pub struct CreateUserOptions {
    /// Mark the email as verified and don't send the welcome message that
    /// carries the temporary password.
    #[serde(default)]
    pub verified: bool,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
pub struct UserRecord<T = Properties> {
    /// The Cognito username, fixed at creation
    pub id: String,

    pub email: Option<String>,

    pub email_verified: bool,

    #[serde(flatten)]
    pub attributes: T,
}

impl<T> UserRecord<T>
where
    T: DeserializeOwned,
{
    /// Normalize a user as returned by the identity provider.
    ///
    /// `email` and `email_verified` are lifted out of the attribute list into
    /// their own fields and `sub` is dropped. Everything else passes through
    /// to `attributes`.
    pub fn from_raw(user: RawUser) -> Result<Self, Error> {
        let email = user.attribute(EMAIL_ATTRIBUTE).map(str::to_string);
        let email_verified =
            user.attribute(EMAIL_VERIFIED_ATTRIBUTE) == Some("true");

        let properties: Properties = user
            .attributes
            .into_iter()
            .filter(|attribute| {
                attribute.name != SUB_ATTRIBUTE
                    && !RESERVED_ATTRIBUTES.contains(&attribute.name.as_str())
            })
            .filter_map(|attribute| {
                attribute.value.map(|value| (attribute.name, value))
            })
            .collect();

        Ok(UserRecord {
            id: user.username,
            email,
            email_verified,
            attributes: decode_attributes(properties)?,
        })
    }
}

/// One page of a user listing.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug)]
pub struct UserPage<T = Properties> {
    pub users: Vec<UserRecord<T>>,

    /// Pass this back to fetch the following page. `None` on the last page.
    pub next_token: Option<String>,
}
