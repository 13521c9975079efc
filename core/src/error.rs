// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// The broad category of a failed user pool operation.
#[derive(Deserialize, Serialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The user (or the pool) does not exist
    NotFound,

    /// The request was rejected by validation, either locally or by the
    /// identity provider
    InvalidParameter,

    /// A user with the same username or alias exists already
    Conflict,

    /// The identity provider is rate limiting us
    Throttled,

    /// Our credentials were not accepted by the identity provider
    NotAuthorized,

    /// A bearer token was malformed, expired, badly signed, or did not name a
    /// user
    InvalidToken,

    /// A remote dependency (for example the key set endpoint) could not be
    /// reached or returned garbage
    Unavailable,

    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Throttled => "throttled",
            ErrorKind::NotAuthorized => "not authorized",
            ErrorKind::InvalidToken => "invalid token",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal error",
        };

        write!(f, "{s}")
    }
}

/// The error returned by every [`UserPool`] operation.
///
/// `detail` carries the message text from whichever collaborator failed.
#[derive(Deserialize, Serialize, JsonSchema, Clone, Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,

    pub detail: String,
}

impl Error {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn not_found(username: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("User {username} not found"))
    }

    pub fn invalid_parameter(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, detail)
    }

    pub fn conflict(username: &str) -> Self {
        Self::new(
            ErrorKind::Conflict,
            format!("User account with username {username} already exists"),
        )
    }

    pub fn throttled(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Throttled, detail)
    }

    pub fn not_authorized(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthorized, detail)
    }

    pub fn invalid_token(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, detail)
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for Error {}

/// A collaborator (the identity provider client or the token verifier) may
/// fail with an error it could not classify, or with one it already mapped
/// onto an [`ErrorKind`].
#[derive(Debug)]
pub enum UpstreamError {
    Unclassified(anyhow::Error),
    Classified(Error),
}

impl From<Error> for UpstreamError {
    fn from(e: Error) -> UpstreamError {
        UpstreamError::Classified(e)
    }
}

impl From<anyhow::Error> for UpstreamError {
    fn from(e: anyhow::Error) -> UpstreamError {
        UpstreamError::Unclassified(e)
    }
}
