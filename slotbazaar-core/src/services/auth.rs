//! Auth service - login, registration and the saved session

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Credentials, Registration, Session, User};
use crate::ports::{CasinoBackend, SessionStore};

pub const INVALID_CREDENTIALS: &str = "Incorrect username or password";
pub const NOT_LOGGED_IN: &str = "You are not logged in. Run `sb login` first.";

/// Run `f` with the saved access token
///
/// A rejected token clears the saved session, so the next command starts
/// from the login prompt.
pub fn with_session<T>(store: &dyn SessionStore, f: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    let session = store.load()?.ok_or_else(|| Error::validation(NOT_LOGGED_IN))?;
    forget_on_unauthorized(store, f(&session.access_token))
}

fn forget_on_unauthorized<T>(store: &dyn SessionStore, result: Result<T>) -> Result<T> {
    if let Err(error) = &result {
        if error.is_unauthorized() {
            store.clear()?;
        }
    }
    result
}

/// Auth service
pub struct AuthService {
    backend: Arc<dyn CasinoBackend>,
    store: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn CasinoBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self { backend, store }
    }

    /// The saved session, if any
    pub fn session(&self) -> Result<Option<Session>> {
        self.store.load()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }
        let tokens = self
            .backend
            .login(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .map_err(|e| match e {
                Error::Unauthorized => Error::Api {
                    status: 401,
                    message: INVALID_CREDENTIALS.to_string(),
                },
                other => other,
            })?;

        let name = tokens
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_else(|| username.to_string());
        let session = Session::from_tokens(name, &tokens);
        self.store.save(&session)?;
        Ok(session)
    }

    /// Create the account, then log straight in
    pub fn register(&self, registration: &Registration) -> Result<(User, Session)> {
        registration.validate()?;
        let user = self.backend.register(registration)?;
        let session = self.login(&registration.username, &registration.password)?;
        Ok((user, session))
    }

    /// Forget the saved session. Returns whether one existed.
    pub fn logout(&self) -> Result<bool> {
        let had_session = self.store.load()?.is_some();
        self.store.clear()?;
        Ok(had_session)
    }

    /// Trade the saved refresh token for a new pair
    pub fn refresh(&self) -> Result<Session> {
        let session = self.store.load()?.ok_or_else(|| Error::validation(NOT_LOGGED_IN))?;
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::validation("No refresh token saved. Please log in again."))?;

        let tokens = forget_on_unauthorized(self.store.as_ref(), self.backend.refresh(refresh_token))?;
        let mut renewed = Session::from_tokens(session.username, &tokens);
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = session.refresh_token;
        }
        self.store.save(&renewed)?;
        Ok(renewed)
    }

    pub fn current_user(&self) -> Result<User> {
        with_session(self.store.as_ref(), |token| self.backend.me(token))
    }
}
