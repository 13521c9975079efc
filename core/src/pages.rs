// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::de::DeserializeOwned;

use super::*;

/// Walks a user pool one ListUsers page at a time.
///
/// Nothing is fetched until [`UserPages::next_page`] is called. A failed
/// fetch leaves the cursor where it was, so calling `next_page` again retries
/// the same page.
pub struct UserPages<'a, C, V, T> {
    pool: &'a UserPool<C, V, T>,
    next_token: Option<String>,
    exhausted: bool,
}

impl<'a, C, V, T> UserPages<'a, C, V, T>
where
    C: IdentityProviderClient,
    V: TokenVerifier,
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(pool: &'a UserPool<C, V, T>) -> Self {
        Self { pool, next_token: None, exhausted: false }
    }

    /// The next page of users, or `None` once the provider has stopped
    /// handing out continuation tokens.
    pub async fn next_page(
        &mut self,
    ) -> Result<Option<Vec<UserRecord<T>>>, Error> {
        if self.exhausted {
            return Ok(None);
        }

        let UserPage { users, next_token } =
            self.pool.list_users_page(self.next_token.clone()).await?;

        self.exhausted = next_token.is_none();
        self.next_token = next_token;

        Ok(Some(users))
    }

    /// Go back to the first page.
    pub fn restart(&mut self) {
        self.next_token = None;
        self.exhausted = false;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
