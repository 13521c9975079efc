// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

/// The operations of [`IdentityProviderClient`], used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentityProviderOperation {
    CreateUser,
    DeleteUser,
    GetUser,
    UpdateUserAttributes,
    SetUserPassword,
    ListUsers,
    Region,
}

/// A call made against the in-memory identity provider, in the order it
/// arrived.
#[derive(Clone, Debug, PartialEq)]
pub enum IdentityProviderCall {
    CreateUser(NewUser),
    DeleteUser { username: String },
    GetUser { username: String },
    UpdateUserAttributes { username: String, attributes: Vec<Attribute> },
    SetUserPassword { username: String, permanent: bool },
    ListUsers { pagination_token: Option<String>, limit: i32 },
    Region,
}

impl IdentityProviderCall {
    pub fn operation(&self) -> IdentityProviderOperation {
        match self {
            IdentityProviderCall::CreateUser(_) => {
                IdentityProviderOperation::CreateUser
            }
            IdentityProviderCall::DeleteUser { .. } => {
                IdentityProviderOperation::DeleteUser
            }
            IdentityProviderCall::GetUser { .. } => {
                IdentityProviderOperation::GetUser
            }
            IdentityProviderCall::UpdateUserAttributes { .. } => {
                IdentityProviderOperation::UpdateUserAttributes
            }
            IdentityProviderCall::SetUserPassword { .. } => {
                IdentityProviderOperation::SetUserPassword
            }
            IdentityProviderCall::ListUsers { .. } => {
                IdentityProviderOperation::ListUsers
            }
            IdentityProviderCall::Region => IdentityProviderOperation::Region,
        }
    }
}

/// A welcome message that Cognito would have sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub username: String,
    pub medium: DeliveryMedium,
    pub destination: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredUser {
    pub attributes: Vec<Attribute>,
    pub password: Option<String>,
    pub password_permanent: bool,
}

impl StoredUser {
    fn set_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    fn to_raw(&self, username: &str) -> RawUser {
        RawUser {
            username: username.to_string(),
            attributes: self.attributes.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryIdentityProviderState {
    pub users: BTreeMap<String, StoredUser>,
    pub calls: Vec<IdentityProviderCall>,
    pub notifications: Vec<Notification>,
}

impl InMemoryIdentityProviderState {
    fn user_mut(&mut self, username: &str) -> Result<&mut StoredUser, Error> {
        self.users.get_mut(username).ok_or_else(|| Error::not_found(username))
    }

    /// How many calls of one kind have been made so far.
    pub fn call_count(&self, operation: IdentityProviderOperation) -> usize {
        self.calls.iter().filter(|call| call.operation() == operation).count()
    }
}

/// A non-optimized identity provider for use with tests. It ignores the user
/// pool id and keeps a single pool's users, ordered by username.
///
/// Pagination tokens are the decimal offset of the next user.
pub struct InMemoryIdentityProvider {
    region: String,
    state: Mutex<InMemoryIdentityProviderState>,
    failures: Mutex<BTreeMap<IdentityProviderOperation, Error>>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_region("us-east-1")
    }

    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(InMemoryIdentityProviderState::default()),
            failures: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn state(&self) -> InMemoryIdentityProviderState {
        self.state.lock().unwrap().clone()
    }

    /// Seed a user without going through `create_user`, and without
    /// recording a call.
    pub fn insert_user(&self, username: &str, attributes: Vec<Attribute>) {
        let mut user = StoredUser {
            attributes: vec![Attribute::new(
                SUB_ATTRIBUTE,
                Uuid::new_v4().to_string(),
            )],
            password: None,
            password_permanent: false,
        };

        for attribute in attributes {
            user.set_attribute(attribute);
        }

        let mut state = self.state.lock().unwrap();
        state.users.insert(username.to_string(), user);
    }

    /// Make every later call of `operation` fail with `error`. The call is
    /// still recorded.
    pub fn fail(&self, operation: IdentityProviderOperation, error: Error) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn record(
        &self,
        state: &mut InMemoryIdentityProviderState,
        call: IdentityProviderCall,
    ) -> Result<(), UpstreamError> {
        let operation = call.operation();
        state.calls.push(call);

        match self.failures.lock().unwrap().get(&operation) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProviderClient for InMemoryIdentityProvider {
    async fn create_user(
        &self,
        _user_pool_id: &str,
        user: NewUser,
    ) -> Result<RawUser, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, IdentityProviderCall::CreateUser(user.clone()))?;

        let NewUser {
            username,
            temporary_password,
            attributes,
            suppress_notification,
            delivery_medium,
        } = user;

        if state.users.contains_key(&username) {
            return Err(Error::conflict(&username).into());
        }

        let mut stored_user = StoredUser {
            attributes: vec![Attribute::new(
                SUB_ATTRIBUTE,
                Uuid::new_v4().to_string(),
            )],
            password: temporary_password,
            password_permanent: false,
        };

        for attribute in attributes {
            stored_user.set_attribute(attribute);
        }

        if !suppress_notification {
            let destination = match delivery_medium {
                DeliveryMedium::Email => EMAIL_ATTRIBUTE,
                DeliveryMedium::Sms => "phone_number",
            };

            state.notifications.push(Notification {
                username: username.clone(),
                medium: delivery_medium,
                destination: stored_user
                    .to_raw(&username)
                    .attribute(destination)
                    .map(str::to_string),
            });
        }

        let raw_user = stored_user.to_raw(&username);
        let existing = state.users.insert(username, stored_user);
        assert!(existing.is_none());

        Ok(raw_user)
    }

    async fn delete_user(
        &self,
        _user_pool_id: &str,
        username: &str,
    ) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            IdentityProviderCall::DeleteUser { username: username.to_string() },
        )?;

        match state.users.remove(username) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(username).into()),
        }
    }

    async fn get_user(
        &self,
        _user_pool_id: &str,
        username: &str,
    ) -> Result<RawUser, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            IdentityProviderCall::GetUser { username: username.to_string() },
        )?;

        let user = state
            .users
            .get(username)
            .ok_or_else(|| Error::not_found(username))?;

        Ok(user.to_raw(username))
    }

    async fn update_user_attributes(
        &self,
        _user_pool_id: &str,
        username: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            IdentityProviderCall::UpdateUserAttributes {
                username: username.to_string(),
                attributes: attributes.clone(),
            },
        )?;

        let user = state.user_mut(username)?;
        for attribute in attributes {
            user.set_attribute(attribute);
        }

        Ok(())
    }

    async fn set_user_password(
        &self,
        _user_pool_id: &str,
        username: &str,
        password: &str,
        permanent: bool,
    ) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            IdentityProviderCall::SetUserPassword {
                username: username.to_string(),
                permanent,
            },
        )?;

        let user = state.user_mut(username)?;
        user.password = Some(password.to_string());
        user.password_permanent = permanent;

        Ok(())
    }

    async fn list_users(
        &self,
        _user_pool_id: &str,
        pagination_token: Option<String>,
        limit: i32,
    ) -> Result<ListUsersPage, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            IdentityProviderCall::ListUsers {
                pagination_token: pagination_token.clone(),
                limit,
            },
        )?;

        let limit = match usize::try_from(limit) {
            Ok(limit) if (1..=60).contains(&limit) => limit,
            _ => {
                return Err(Error::invalid_parameter(format!(
                    "limit {limit} must be between 1 and 60"
                ))
                .into());
            }
        };

        let offset = match pagination_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                Error::invalid_parameter(format!(
                    "invalid pagination token {token}"
                ))
            })?,
        };

        let users: Vec<RawUser> = state
            .users
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(username, user)| user.to_raw(username))
            .collect();

        let next = offset + users.len();
        let pagination_token =
            (next < state.users.len()).then(|| next.to_string());

        Ok(ListUsersPage { users, pagination_token })
    }

    async fn region(&self) -> Result<String, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, IdentityProviderCall::Region)?;

        Ok(self.region.clone())
    }
}
