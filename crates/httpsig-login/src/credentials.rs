//! Per-request credentials handed to the login flow.

use std::sync::Arc;

use http::request::Parts;
use httpsig_auth::{AuthError, Authorization, Challenge, RequestContent};

/// The challenge in force, the client's authorization and the request it
/// covers.
///
/// Built once per request and dropped when the login attempt ends.
#[derive(Debug, Clone)]
pub struct HttpsigCredentials {
    challenge: Arc<Challenge>,
    authorization: Authorization,
    content: RequestContent,
}

impl HttpsigCredentials {
    /// Bundle already parsed parts.
    pub fn new(challenge: Arc<Challenge>, authorization: Authorization, content: RequestContent) -> Self {
        Self {
            challenge,
            authorization,
            content,
        }
    }

    /// Capture credentials from request parts.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingAuthHeader`] when the request is unsigned,
    /// or the parse error of the authorization.
    pub fn from_parts(challenge: Arc<Challenge>, parts: &Parts) -> Result<Self, AuthError> {
        let authorization = Authorization::from_headers(&parts.headers)?;
        let content = RequestContent::from_parts(parts);
        Ok(Self::new(challenge, authorization, content))
    }

    /// The challenge the request is checked against.
    #[must_use]
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// The client authorization.
    #[must_use]
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// The request snapshot.
    #[must_use]
    pub fn content(&self) -> &RequestContent {
        &self.content
    }
}
