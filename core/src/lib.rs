// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A typed adapter over an AWS Cognito user pool.
//!
//! [`UserPool`] maps generic property bags onto Cognito user attributes,
//! pages through the ListUsers endpoint, and resolves bearer tokens to user
//! records after verifying them against the pool's published key set. The
//! network client and the token verifier sit behind the
//! [`IdentityProviderClient`] and [`TokenVerifier`] traits.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

mod attribute;
mod cognito;
mod config;
mod error;
mod identity_provider;
mod in_memory_identity_provider;
mod jwks;
mod pages;
mod pool;
mod token;
mod user;

pub use attribute::*;
pub use cognito::*;
pub use config::*;
pub use error::*;
pub use identity_provider::*;
pub use in_memory_identity_provider::*;
pub use jwks::*;
pub use pages::*;
pub use pool::*;
pub use token::*;
pub use user::*;
