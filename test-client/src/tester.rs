// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use anyhow::bail;
use slog::Logger;
use slog::info;
use uuid::Uuid;

use cognito_user_pool::CognitoClient;
use cognito_user_pool::CreateUserOptions;
use cognito_user_pool::CreateUserRequest;
use cognito_user_pool::ErrorKind;
use cognito_user_pool::Properties;
use cognito_user_pool::RemoteJwksVerifier;
use cognito_user_pool::UpdateUserRequest;
use cognito_user_pool::UserPool;
use cognito_user_pool::UserPoolConfig;
use cognito_user_pool::UserRecord;

/// Runs a create / read / update / list / delete scenario against a live
/// user pool. Every user it creates is deleted again, even on failure.
pub struct Tester {
    log: Logger,
    pool: UserPool<CognitoClient, RemoteJwksVerifier>,
    run_id: String,
}

impl Tester {
    pub async fn new(
        log: Logger,
        user_pool_id: String,
        config: &UserPoolConfig,
    ) -> anyhow::Result<Self> {
        let pool: UserPool<CognitoClient, RemoteJwksVerifier> =
            UserPool::for_user_pool_id(log.clone(), user_pool_id, config)
                .await?;

        Ok(Self { log, pool, run_id: Uuid::new_v4().simple().to_string() })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        self.nonexistent_user_tests()
            .await
            .context("nonexistent_user_tests")?;

        let dwight = self.create_user_tests().await.context("create_user_tests")?;

        let result = self.existing_user_tests(&dwight).await;

        // Clean up regardless of how the scenario went
        let cleanup = self.delete_user_tests(&dwight).await;

        result?;
        cleanup.context("delete_user_tests")?;

        Ok(())
    }

    async fn existing_user_tests(
        &self,
        dwight: &UserRecord,
    ) -> anyhow::Result<()> {
        self.update_user_tests(dwight).await.context("update_user_tests")?;
        self.list_users_test(dwight).await.context("list_users_test")?;
        self.token_tests().await.context("token_tests")?;

        Ok(())
    }

    async fn nonexistent_user_tests(&self) -> anyhow::Result<()> {
        let random_id = format!("nonexistent-{}", self.run_id);

        let error = match self.pool.get_user_by_id(&random_id).await {
            Ok(user) => bail!("GET of nonexistent user returned {user:?}"),
            Err(error) => error,
        };

        if error.kind != ErrorKind::NotFound {
            bail!("GET of nonexistent user returned {error}");
        }

        let error = match self.pool.delete_user(&random_id).await {
            Ok(()) => bail!("DELETE of nonexistent user succeeded"),
            Err(error) => error,
        };

        if error.kind != ErrorKind::NotFound {
            bail!("DELETE of nonexistent user returned {error}");
        }

        Ok(())
    }

    async fn create_user_tests(&self) -> anyhow::Result<UserRecord> {
        let email = format!("dschrute+{}@dundermifflin.com", self.run_id);

        let mut attributes = Properties::new();
        attributes.insert("given_name".to_string(), "Dwight".to_string());

        let request = CreateUserRequest {
            email: Some(email.clone()),
            password: Some(format!("Beets-{}-1A!", self.run_id)),
            attributes,
        };

        let user = self
            .pool
            .create_user(request.clone(), CreateUserOptions { verified: true })
            .await?;

        info!(self.log, "created test user"; "id" => user.id.as_str());

        if user.email.as_deref() != Some(email.as_str()) {
            bail!("email of test user is {:?}, not {email}", user.email);
        }

        if !user.email_verified {
            bail!("test user was created verified but email_verified is false");
        }

        if user.attributes.contains_key("sub") {
            bail!("test user exposes the sub attribute");
        }

        if user.attributes.get("given_name").map(String::as_str)
            != Some("Dwight")
        {
            bail!("given_name of test user is {:?}", user.attributes);
        }

        // Creating the same user again must conflict
        match self
            .pool
            .create_user(request, CreateUserOptions { verified: true })
            .await
        {
            Ok(_) => bail!("creating a duplicate user succeeded"),
            Err(error) if error.kind == ErrorKind::Conflict => {}
            Err(error) => bail!("duplicate create returned {error}"),
        }

        Ok(user)
    }

    async fn update_user_tests(&self, dwight: &UserRecord) -> anyhow::Result<()> {
        let mut attributes = Properties::new();
        attributes.insert("family_name".to_string(), "Schrute".to_string());

        let updated = self
            .pool
            .update_user(
                &dwight.id,
                UpdateUserRequest {
                    password: Some(format!("Farm-{}-2B!", self.run_id)),
                    attributes,
                },
            )
            .await?;

        if updated.id != dwight.id {
            bail!("update changed the id from {} to {}", dwight.id, updated.id);
        }

        if updated.attributes.get("family_name").map(String::as_str)
            != Some("Schrute")
        {
            bail!("family_name was not updated: {:?}", updated.attributes);
        }

        if updated.attributes.get("given_name") != dwight.attributes.get("given_name")
        {
            bail!("update clobbered given_name: {:?}", updated.attributes);
        }

        Ok(())
    }

    async fn list_users_test(&self, dwight: &UserRecord) -> anyhow::Result<()> {
        let users = self.pool.list_users().await?;

        if !users.iter().any(|user| user.id == dwight.id) {
            bail!("{} users listed, none of them {}", users.len(), dwight.id);
        }

        let mut pages = self.pool.pages();
        let Some(first_page) = pages.next_page().await? else {
            bail!("first page of users was missing");
        };

        if first_page.is_empty() {
            bail!("first page of users was empty");
        }

        Ok(())
    }

    async fn token_tests(&self) -> anyhow::Result<()> {
        match self.pool.get_user_using_token("not-a-token").await {
            Ok(user) => bail!("garbage token resolved to {user:?}"),
            Err(error) if error.kind == ErrorKind::InvalidToken => Ok(()),
            Err(error) => bail!("garbage token returned {error}"),
        }
    }

    async fn delete_user_tests(&self, dwight: &UserRecord) -> anyhow::Result<()> {
        self.pool.delete_user(&dwight.id).await?;

        match self.pool.get_user_by_id(&dwight.id).await {
            Ok(_) => bail!("deleted user {} can still be read", dwight.id),
            Err(error) if error.is_not_found() => {}
            Err(error) => bail!("GET of deleted user returned {error}"),
        }

        info!(self.log, "deleted test user"; "id" => dwight.id.as_str());

        Ok(())
    }
}
