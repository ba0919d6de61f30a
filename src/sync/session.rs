use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Short-lived OAuth bearer credential.
///
/// Expiry is not tracked; an expired token surfaces as an HTTP error on use.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    obtained_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(token.into()),
            obtained_at: Utc::now(),
        }
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

/// Credential slot for one user session.
///
/// Operations that authenticate take the session mutably and overwrite the
/// token; loads only read it. Parallel actions use separate sessions.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<AccessToken>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self { token: Some(token) }
    }

    /// Store a freshly obtained token, dropping the previous one.
    pub fn replace_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
