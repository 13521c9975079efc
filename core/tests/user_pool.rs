// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use cognito_user_pool::*;

const POOL_ID: &str = "eu-west-1_TestPool";

fn log() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

/// Hands back canned payloads for known tokens and remembers which key set
/// URLs were requested.
#[derive(Default)]
struct StaticTokenVerifier {
    payloads: BTreeMap<String, TokenPayload>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl StaticTokenVerifier {
    fn with_token(mut self, token: &str, payload: serde_json::Value) -> Self {
        self.payloads
            .insert(token.to_string(), serde_json::from_value(payload).unwrap());
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    type KeySet = ();

    async fn fetch_key_set(&self, jwks_url: &str) -> Result<(), UpstreamError> {
        self.fetched.lock().unwrap().push(jwks_url.to_string());
        Ok(())
    }

    fn verify(
        &self,
        token: &str,
        _key_set: &(),
    ) -> Result<TokenPayload, UpstreamError> {
        self.payloads.get(token).cloned().ok_or_else(|| {
            Error::invalid_token("signature verification failed").into()
        })
    }
}

fn pool() -> UserPool<InMemoryIdentityProvider, StaticTokenVerifier> {
    pool_with_verifier(StaticTokenVerifier::default())
}

fn pool_with_verifier(
    verifier: StaticTokenVerifier,
) -> UserPool<InMemoryIdentityProvider, StaticTokenVerifier> {
    UserPool::new(
        log(),
        POOL_ID,
        InMemoryIdentityProvider::with_region("eu-west-1"),
        verifier,
    )
}

fn create_request(email: &str, password: &str) -> CreateUserRequest {
    let mut attributes = Properties::new();
    attributes.insert("role".to_string(), "manager".to_string());

    CreateUserRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
        attributes,
    }
}

fn update_request(
    password: Option<&str>,
    attributes: &[(&str, &str)],
) -> UpdateUserRequest {
    UpdateUserRequest {
        password: password.map(str::to_string),
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[tokio::test]
async fn test_create_user() {
    let pool = pool();

    let dwight = pool
        .create_user(
            create_request("dwight@example.com", "Beets#1"),
            CreateUserOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(dwight.id, "dwight@example.com");
    assert_eq!(dwight.email.as_deref(), Some("dwight@example.com"));
    assert!(!dwight.email_verified);
    assert_eq!(dwight.attributes.get("role").map(String::as_str), Some("manager"));
    assert!(!dwight.attributes.contains_key("sub"));
    assert!(!dwight.attributes.contains_key("password"));

    let state = pool.state();
    let [IdentityProviderCall::CreateUser(new_user)] = &state.calls[..] else {
        panic!("unexpected calls {:?}", state.calls);
    };

    assert_eq!(new_user.username, "dwight@example.com");
    assert_eq!(new_user.temporary_password.as_deref(), Some("Beets#1"));
    assert!(!new_user.suppress_notification);
    assert_eq!(new_user.delivery_medium, DeliveryMedium::Email);
    assert_eq!(
        new_user.attributes,
        vec![
            Attribute::new("role", "manager"),
            Attribute::new("email", "dwight@example.com"),
            Attribute::new("email_verified", "false"),
        ]
    );

    // An unverified user gets their temporary password by email
    assert_eq!(
        state.notifications,
        vec![Notification {
            username: "dwight@example.com".to_string(),
            medium: DeliveryMedium::Email,
            destination: Some("dwight@example.com".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_create_verified_user_suppresses_notification() {
    let pool = pool();

    let jim = pool
        .create_user(
            create_request("jim@example.com", "Pranks#1"),
            CreateUserOptions { verified: true },
        )
        .await
        .unwrap();

    assert!(jim.email_verified);

    let state = pool.state();
    assert!(state.notifications.is_empty());

    let IdentityProviderCall::CreateUser(new_user) = &state.calls[0] else {
        panic!("unexpected call {:?}", state.calls[0]);
    };
    assert!(new_user.suppress_notification);
    assert!(
        new_user
            .attributes
            .contains(&Attribute::new("email_verified", "true"))
    );
}

#[tokio::test]
async fn test_create_user_validation() {
    let pool = pool();

    // email is required
    let mut request = create_request("ignored@example.com", "Temp#1");
    request.email = None;
    let error = pool
        .create_user(request, CreateUserOptions::default())
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidParameter);

    // reserved keys cannot be smuggled in as custom attributes
    for key in ["id", "email", "email_verified"] {
        let mut request = create_request("michael@example.com", "Temp#1");
        request.attributes.insert(key.to_string(), "true".to_string());

        let error = pool
            .create_user(request, CreateUserOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidParameter);
    }

    // None of the above reached the provider
    assert!(pool.state().calls.is_empty());
}

#[tokio::test]
async fn test_create_duplicate_user_is_a_conflict() {
    let pool = pool();

    pool.create_user(
        create_request("pam@example.com", "Art#1"),
        CreateUserOptions::default(),
    )
    .await
    .unwrap();

    let error = pool
        .create_user(
            create_request("pam@example.com", "Art#2"),
            CreateUserOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_update_user_without_password() {
    let pool = pool();
    pool.create_user(
        create_request("andy@example.com", "Cornell#1"),
        CreateUserOptions::default(),
    )
    .await
    .unwrap();

    let andy = pool
        .update_user(
            "andy@example.com",
            update_request(None, &[("role", "salesman")]),
        )
        .await
        .unwrap();

    assert_eq!(andy.attributes.get("role").map(String::as_str), Some("salesman"));

    let state = pool.state();
    assert_eq!(
        state.call_count(IdentityProviderOperation::UpdateUserAttributes),
        1
    );
    assert_eq!(state.call_count(IdentityProviderOperation::SetUserPassword), 0);

    // The result is a fresh read
    assert!(matches!(
        state.calls.last(),
        Some(IdentityProviderCall::GetUser { username })
            if username == "andy@example.com"
    ));
}

#[tokio::test]
async fn test_update_user_with_password() {
    let pool = pool();
    pool.create_user(
        create_request("kevin@example.com", "Chili#1"),
        CreateUserOptions::default(),
    )
    .await
    .unwrap();

    let kevin = pool
        .update_user(
            "kevin@example.com",
            update_request(Some("Chili#2"), &[("role", "accountant")]),
        )
        .await
        .unwrap();

    assert_eq!(
        kevin.attributes.get("role").map(String::as_str),
        Some("accountant")
    );
    assert!(!kevin.attributes.contains_key("password"));

    let state = pool.state();
    assert_eq!(
        state.call_count(IdentityProviderOperation::UpdateUserAttributes),
        1
    );
    assert_eq!(state.call_count(IdentityProviderOperation::SetUserPassword), 1);
    assert!(state.calls.contains(&IdentityProviderCall::SetUserPassword {
        username: "kevin@example.com".to_string(),
        permanent: false,
    }));

    let stored = &state.users["kevin@example.com"];
    assert_eq!(stored.password.as_deref(), Some("Chili#2"));
    assert!(!stored.password_permanent);
}

#[tokio::test]
async fn test_update_user_ignores_password_attribute_keys() {
    let pool = pool();
    pool.create_user(
        create_request("oscar@example.com", "Senator#1"),
        CreateUserOptions::default(),
    )
    .await
    .unwrap();

    // A password key in the attribute bag is neither an attribute nor a
    // password change; an empty password is no password.
    pool.update_user(
        "oscar@example.com",
        update_request(Some(""), &[("PassWord", "nope"), ("role", "accountant")]),
    )
    .await
    .unwrap();

    let state = pool.state();
    assert_eq!(state.call_count(IdentityProviderOperation::SetUserPassword), 0);
    assert!(state.calls.contains(&IdentityProviderCall::UpdateUserAttributes {
        username: "oscar@example.com".to_string(),
        attributes: vec![Attribute::new("role", "accountant")],
    }));
}

#[tokio::test]
async fn test_update_user_rejects_email_change() {
    let pool = pool();

    let error = pool
        .update_user(
            "angela@example.com",
            update_request(None, &[("email", "cats@example.com")]),
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::InvalidParameter);
    assert!(pool.state().calls.is_empty());
}

#[tokio::test]
async fn test_update_user_partial_failure_is_not_rolled_back() {
    let provider = InMemoryIdentityProvider::new();
    provider.insert_user(
        "ryan@example.com",
        vec![Attribute::new("email", "ryan@example.com")],
    );
    provider.fail(
        IdentityProviderOperation::SetUserPassword,
        Error::throttled("Rate exceeded"),
    );

    let pool: UserPool<_, _> = UserPool::new(
        log(),
        POOL_ID,
        provider,
        StaticTokenVerifier::default(),
    );

    let error = pool
        .update_user(
            "ryan@example.com",
            update_request(Some("Wuphf#1"), &[("role", "temp")]),
        )
        .await
        .unwrap_err();

    assert_eq!(error, Error::throttled("Rate exceeded"));

    // The attribute half went through, and no re-read happened
    let state = pool.state();
    let stored = &state.users["ryan@example.com"];
    assert!(stored.attributes.contains(&Attribute::new("role", "temp")));
    assert_eq!(stored.password, None);
    assert_eq!(state.call_count(IdentityProviderOperation::GetUser), 0);
}

/// Holds each update call until both have arrived, then lets them finish in
/// a chosen order.
struct RendezvousClient {
    inner: InMemoryIdentityProvider,
    arrived: tokio::sync::Barrier,
    first_finished: tokio::sync::Notify,
    finishes_first: IdentityProviderOperation,
}

impl RendezvousClient {
    fn new(
        inner: InMemoryIdentityProvider,
        finishes_first: IdentityProviderOperation,
    ) -> Self {
        Self {
            inner,
            arrived: tokio::sync::Barrier::new(2),
            first_finished: tokio::sync::Notify::new(),
            finishes_first,
        }
    }

    async fn hold(&self, operation: IdentityProviderOperation) {
        self.arrived.wait().await;
        if operation != self.finishes_first {
            self.first_finished.notified().await;
        }
    }

    fn release(&self, operation: IdentityProviderOperation) {
        if operation == self.finishes_first {
            self.first_finished.notify_one();
        }
    }
}

#[async_trait]
impl IdentityProviderClient for RendezvousClient {
    async fn create_user(
        &self,
        user_pool_id: &str,
        user: NewUser,
    ) -> Result<RawUser, UpstreamError> {
        self.inner.create_user(user_pool_id, user).await
    }

    async fn delete_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<(), UpstreamError> {
        self.inner.delete_user(user_pool_id, username).await
    }

    async fn get_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<RawUser, UpstreamError> {
        self.inner.get_user(user_pool_id, username).await
    }

    async fn update_user_attributes(
        &self,
        user_pool_id: &str,
        username: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(), UpstreamError> {
        let operation = IdentityProviderOperation::UpdateUserAttributes;
        self.hold(operation).await;
        let result = self
            .inner
            .update_user_attributes(user_pool_id, username, attributes)
            .await;
        self.release(operation);
        result
    }

    async fn set_user_password(
        &self,
        user_pool_id: &str,
        username: &str,
        password: &str,
        permanent: bool,
    ) -> Result<(), UpstreamError> {
        let operation = IdentityProviderOperation::SetUserPassword;
        self.hold(operation).await;
        let result = self
            .inner
            .set_user_password(user_pool_id, username, password, permanent)
            .await;
        self.release(operation);
        result
    }

    async fn list_users(
        &self,
        user_pool_id: &str,
        pagination_token: Option<String>,
        limit: i32,
    ) -> Result<ListUsersPage, UpstreamError> {
        self.inner.list_users(user_pool_id, pagination_token, limit).await
    }

    async fn region(&self) -> Result<String, UpstreamError> {
        self.inner.region().await
    }
}

#[tokio::test]
async fn test_update_user_sends_both_calls_concurrently() {
    for finishes_first in [
        IdentityProviderOperation::UpdateUserAttributes,
        IdentityProviderOperation::SetUserPassword,
    ] {
        let provider = InMemoryIdentityProvider::new();
        provider.insert_user(
            "oscar@example.com",
            vec![Attribute::new("email", "oscar@example.com")],
        );

        let pool: UserPool<_, _> = UserPool::new(
            log(),
            POOL_ID,
            RendezvousClient::new(provider, finishes_first),
            StaticTokenVerifier::default(),
        );

        // Awaiting one call before starting the other never gets past the
        // barrier
        let oscar = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            pool.update_user(
                "oscar@example.com",
                update_request(Some("Senator#1"), &[("role", "accountant")]),
            ),
        )
        .await
        .expect("update calls were not in flight together")
        .unwrap();

        assert_eq!(
            oscar.attributes.get("role").map(String::as_str),
            Some("accountant")
        );

        let operations: Vec<_> = pool
            .client()
            .inner
            .state()
            .calls
            .iter()
            .map(IdentityProviderCall::operation)
            .collect();

        let finishes_last = match finishes_first {
            IdentityProviderOperation::UpdateUserAttributes => {
                IdentityProviderOperation::SetUserPassword
            }
            _ => IdentityProviderOperation::UpdateUserAttributes,
        };

        assert_eq!(
            operations,
            vec![finishes_first, finishes_last, IdentityProviderOperation::GetUser]
        );

        let state = pool.client().inner.state();
        let stored = &state.users["oscar@example.com"];
        assert_eq!(stored.password.as_deref(), Some("Senator#1"));
    }
}

#[tokio::test]
async fn test_delete_user() {
    let pool = pool();
    pool.create_user(
        create_request("toby@example.com", "Hr#1"),
        CreateUserOptions::default(),
    )
    .await
    .unwrap();

    pool.delete_user("toby@example.com").await.unwrap();

    let error = pool.get_user_by_id("toby@example.com").await.unwrap_err();
    assert!(error.is_not_found());

    // Deleting again passes the provider's not found through
    let error = pool.delete_user("toby@example.com").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_get_user_by_id_is_stable() {
    let pool = pool();
    pool.create_user(
        create_request("stanley@example.com", "Pretzel#1"),
        CreateUserOptions { verified: true },
    )
    .await
    .unwrap();

    let first = pool.get_user_by_id("stanley@example.com").await.unwrap();
    let second = pool.get_user_by_id("stanley@example.com").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(pool.state().call_count(IdentityProviderOperation::GetUser), 2);
}

#[tokio::test]
async fn test_list_users_fetches_every_page() {
    let provider = InMemoryIdentityProvider::new();
    for i in 0..121 {
        let email = format!("user{i:03}@example.com");
        provider.insert_user(&email, vec![Attribute::new("email", &email)]);
    }

    let pool: UserPool<_, _> = UserPool::new(
        log(),
        POOL_ID,
        provider,
        StaticTokenVerifier::default(),
    );

    let users = pool.list_users().await.unwrap();
    assert_eq!(users.len(), 121);
    assert_eq!(users[0].id, "user000@example.com");
    assert_eq!(users[120].id, "user120@example.com");

    assert_eq!(
        pool.state().calls,
        vec![
            IdentityProviderCall::ListUsers {
                pagination_token: None,
                limit: LIST_USERS_PAGE_SIZE,
            },
            IdentityProviderCall::ListUsers {
                pagination_token: Some("60".to_string()),
                limit: LIST_USERS_PAGE_SIZE,
            },
            IdentityProviderCall::ListUsers {
                pagination_token: Some("120".to_string()),
                limit: LIST_USERS_PAGE_SIZE,
            },
        ]
    );
}

#[tokio::test]
async fn test_pages_are_lazy_and_restartable() {
    let provider = InMemoryIdentityProvider::new();
    for i in 0..70 {
        provider.insert_user(&format!("user{i:02}"), vec![]);
    }

    let pool: UserPool<_, _> = UserPool::new(
        log(),
        POOL_ID,
        provider,
        StaticTokenVerifier::default(),
    );

    let mut pages = pool.pages();
    assert!(pool.state().calls.is_empty());

    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 60);
    assert!(!pages.is_exhausted());
    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 10);
    assert!(pages.is_exhausted());
    assert!(pages.next_page().await.unwrap().is_none());

    pages.restart();
    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first[0].id, "user00");

    assert_eq!(pool.state().call_count(IdentityProviderOperation::ListUsers), 3);
}

/// Serves a fixed set of ListUsers pages, keyed by the continuation token
/// that asks for them, and remembers every token it was asked for. Creating
/// users fails as if the network dropped.
#[derive(Default)]
struct ScriptedListClient {
    pages: Vec<(Option<&'static str>, Vec<&'static str>, Option<&'static str>)>,
    requested: Arc<Mutex<Vec<Option<String>>>>,
}

#[async_trait]
impl IdentityProviderClient for ScriptedListClient {
    async fn create_user(
        &self,
        _user_pool_id: &str,
        _user: NewUser,
    ) -> Result<RawUser, UpstreamError> {
        Err(anyhow::anyhow!("connection reset by peer").into())
    }

    async fn delete_user(
        &self,
        _user_pool_id: &str,
        _username: &str,
    ) -> Result<(), UpstreamError> {
        unimplemented!()
    }

    async fn get_user(
        &self,
        _user_pool_id: &str,
        _username: &str,
    ) -> Result<RawUser, UpstreamError> {
        unimplemented!()
    }

    async fn update_user_attributes(
        &self,
        _user_pool_id: &str,
        _username: &str,
        _attributes: Vec<Attribute>,
    ) -> Result<(), UpstreamError> {
        unimplemented!()
    }

    async fn set_user_password(
        &self,
        _user_pool_id: &str,
        _username: &str,
        _password: &str,
        _permanent: bool,
    ) -> Result<(), UpstreamError> {
        unimplemented!()
    }

    async fn list_users(
        &self,
        _user_pool_id: &str,
        pagination_token: Option<String>,
        _limit: i32,
    ) -> Result<ListUsersPage, UpstreamError> {
        self.requested.lock().unwrap().push(pagination_token.clone());

        let (_, usernames, next) = self
            .pages
            .iter()
            .find(|(token, _, _)| token.map(str::to_string) == pagination_token)
            .ok_or_else(|| {
                Error::invalid_parameter(format!(
                    "unexpected pagination token {pagination_token:?}"
                ))
            })?;

        Ok(ListUsersPage {
            users: usernames
                .iter()
                .map(|username| RawUser {
                    username: username.to_string(),
                    attributes: vec![Attribute::new("sub", "opaque")],
                })
                .collect(),
            pagination_token: next.map(str::to_string),
        })
    }

    async fn region(&self) -> Result<String, UpstreamError> {
        Ok("us-east-1".to_string())
    }
}

#[tokio::test]
async fn test_list_users_follows_continuation_tokens() {
    let client = ScriptedListClient {
        pages: vec![
            (None, vec!["u1", "u2"], Some("a")),
            (Some("a"), vec!["u3"], Some("b")),
            (Some("b"), vec!["u4", "u5"], None),
        ],
        ..Default::default()
    };
    let requested = client.requested.clone();

    let pool: UserPool<_, _> =
        UserPool::new(log(), POOL_ID, client, StaticTokenVerifier::default());

    let users = pool.list_users().await.unwrap();
    let ids: Vec<_> = users.iter().map(|user| user.id.as_str()).collect();
    assert_eq!(ids, ["u1", "u2", "u3", "u4", "u5"]);
    assert!(users.iter().all(|user| user.attributes.is_empty()));

    assert_eq!(
        *requested.lock().unwrap(),
        vec![None, Some("a".to_string()), Some("b".to_string())]
    );
}

#[tokio::test]
async fn test_empty_continuation_token_ends_listing() {
    let client = ScriptedListClient {
        pages: vec![
            (None, vec!["u1"], Some("a")),
            (Some("a"), vec!["u2"], Some("")),
        ],
        ..Default::default()
    };

    let pool: UserPool<_, _> =
        UserPool::new(log(), POOL_ID, client, StaticTokenVerifier::default());

    assert_eq!(pool.list_users().await.unwrap().len(), 2);

    let page = pool.list_users_page(Some("a".to_string())).await.unwrap();
    assert_eq!(page.next_token, None);

    // An empty token passed in by a caller means the first page
    let page = pool.list_users_page(Some(String::new())).await.unwrap();
    assert_eq!(page.next_token.as_deref(), Some("a"));
    assert_eq!(page.users[0].id, "u1");
}

#[tokio::test]
async fn test_unclassified_errors_keep_the_message() {
    let client = ScriptedListClient::default();
    let pool: UserPool<_, _> =
        UserPool::new(log(), POOL_ID, client, StaticTokenVerifier::default());

    let error = pool
        .create_user(
            create_request("creed@example.com", "Quabity#1"),
            CreateUserOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Internal);
    assert!(error.detail.contains("connection reset by peer"));
}

fn token_pool(
    verifier: StaticTokenVerifier,
) -> UserPool<InMemoryIdentityProvider, StaticTokenVerifier> {
    let provider = InMemoryIdentityProvider::with_region("eu-west-1");
    provider.insert_user("u1", vec![Attribute::new("email", "u1@example.com")]);

    UserPool::new(log(), POOL_ID, provider, verifier)
}

#[tokio::test]
async fn test_get_user_using_access_token() {
    let verifier = StaticTokenVerifier::default().with_token(
        "access-token",
        serde_json::json!({ "token_use": "access", "username": "u1" }),
    );
    let fetched = verifier.fetched.clone();
    let pool = token_pool(verifier);

    let by_token = pool.get_user_using_token("access-token").await.unwrap();
    let by_id = pool.get_user_by_id("u1").await.unwrap();
    assert_eq!(by_token, by_id);
    assert_eq!(by_token.email.as_deref(), Some("u1@example.com"));

    assert_eq!(*fetched.lock().unwrap(), vec![jwks_url("eu-west-1", POOL_ID)]);
}

#[tokio::test]
async fn test_get_user_using_id_token() {
    let verifier = StaticTokenVerifier::default().with_token(
        "id-token",
        serde_json::json!({
            "token_use": "id",
            "cognito:username": "u1",
            "email": "u1@example.com",
        }),
    );
    let pool = token_pool(verifier);

    let user = pool.get_user_using_token("id-token").await.unwrap();
    assert_eq!(user.id, "u1");
}

#[tokio::test]
async fn test_get_user_using_token_without_username() {
    let verifier = StaticTokenVerifier::default()
        .with_token("anonymous", serde_json::json!({ "token_use": "access" }));
    let pool = token_pool(verifier);

    let error = pool.get_user_using_token("anonymous").await.unwrap_err();
    assert_eq!(
        error,
        Error::invalid_token("cognito:username or username needs to be passed")
    );

    // No lookup was attempted
    assert_eq!(pool.state().call_count(IdentityProviderOperation::GetUser), 0);
}

#[tokio::test]
async fn test_get_user_using_bad_token() {
    let pool = token_pool(StaticTokenVerifier::default());

    let error = pool.get_user_using_token("forged").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidToken);
    assert_eq!(pool.state().call_count(IdentityProviderOperation::GetUser), 0);
}

#[tokio::test]
async fn test_get_user_using_token_for_deleted_user() {
    let verifier = StaticTokenVerifier::default().with_token(
        "stale",
        serde_json::json!({ "token_use": "access", "username": "u1" }),
    );
    let pool = token_pool(verifier);

    pool.delete_user("u1").await.unwrap();

    let error = pool.get_user_using_token("stale").await.unwrap_err();
    assert!(error.is_not_found());
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
struct SalesAttributes {
    #[serde(rename = "custom:branch")]
    branch: Option<String>,

    #[serde(rename = "custom:quota")]
    #[serde(skip_serializing_if = "Option::is_none")]
    quota: Option<String>,
}

#[tokio::test]
async fn test_typed_attributes() {
    let pool: UserPool<_, _, SalesAttributes> = UserPool::new(
        log(),
        POOL_ID,
        InMemoryIdentityProvider::new(),
        StaticTokenVerifier::default(),
    );

    let phyllis = pool
        .create_user(
            CreateUserRequest {
                email: Some("phyllis@example.com".to_string()),
                password: None,
                attributes: SalesAttributes {
                    branch: Some("scranton".to_string()),
                    quota: None,
                },
            },
            CreateUserOptions { verified: true },
        )
        .await
        .unwrap();

    assert_eq!(
        phyllis.attributes,
        SalesAttributes { branch: Some("scranton".to_string()), quota: None }
    );

    let phyllis = pool
        .update_user(
            "phyllis@example.com",
            UpdateUserRequest {
                password: None,
                attributes: SalesAttributes {
                    branch: None,
                    quota: Some("120".to_string()),
                },
            },
        )
        .await
        .unwrap();

    // Unset fields are left alone rather than cleared
    assert_eq!(
        phyllis.attributes,
        SalesAttributes {
            branch: Some("scranton".to_string()),
            quota: Some("120".to_string()),
        }
    );
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct LicenseAttributes {
    #[serde(rename = "custom:seats")]
    seats: u32,

    #[serde(rename = "custom:trial")]
    trial: bool,
}

#[tokio::test]
async fn test_typed_scalar_attributes_read_back() {
    let pool: UserPool<_, _, LicenseAttributes> = UserPool::new(
        log(),
        POOL_ID,
        InMemoryIdentityProvider::new(),
        StaticTokenVerifier::default(),
    );

    let darryl = pool
        .create_user(
            CreateUserRequest {
                email: Some("darryl@example.com".to_string()),
                password: None,
                attributes: LicenseAttributes { seats: 3, trial: true },
            },
            CreateUserOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(darryl.attributes, LicenseAttributes { seats: 3, trial: true });

    let darryl = pool
        .update_user(
            "darryl@example.com",
            UpdateUserRequest {
                password: None,
                attributes: LicenseAttributes { seats: 12, trial: false },
            },
        )
        .await
        .unwrap();

    assert_eq!(darryl.attributes, LicenseAttributes { seats: 12, trial: false });

    let fetched = pool.get_user_by_id("darryl@example.com").await.unwrap();
    assert_eq!(fetched, darryl);

    let listed = pool.list_users().await.unwrap();
    assert_eq!(listed, vec![darryl]);

    let state = pool.state();
    let stored = &state.users["darryl@example.com"];
    assert!(stored.attributes.contains(&Attribute::new("custom:seats", "12")));
}
