//! Explicit application context: settings, persisted auth and the
//! authenticated client, threaded into the front end instead of a global
//! store.

use thiserror::Error;
use trivia_client::{
    AuthGateway, AuthSession, ClientError, Credentials, ErrorKind, Registration, TriviaClient, User,
};

use crate::auth_file::{self, AuthStoreError, SavedAuth};
use crate::config::Settings;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] AuthStoreError),

    #[error("not logged in; run `trivia login` first")]
    NotLoggedIn,
}

pub struct AppContext<A = TriviaClient> {
    settings: Settings,
    gateway: A,
    auth: Option<SavedAuth>,
}

impl AppContext<TriviaClient> {
    /// Build a context talking HTTP to `settings.api_url`.
    pub fn from_settings(settings: Settings) -> Result<Self, ContextError> {
        let client = TriviaClient::new(&settings.api_url, settings.http_timeout)?;
        Ok(Self::with_gateway(settings, client))
    }

    /// Client for session calls, carrying the current token.
    pub fn session_client(&self) -> Result<TriviaClient, ContextError> {
        if self.auth.is_none() {
            return Err(ContextError::NotLoggedIn);
        }
        Ok(self.gateway.clone())
    }
}

impl<A: AuthGateway> AppContext<A> {
    pub fn with_gateway(settings: Settings, gateway: A) -> Self {
        Self {
            settings,
            gateway,
            auth: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gateway(&self) -> &A {
        &self.gateway
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.as_ref().map(|a| &a.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Restore the persisted login, if any. A corrupt auth file is discarded.
    pub fn initialize(&mut self) -> Result<Option<&User>, ContextError> {
        let dir = &self.settings.data_dir;
        let saved = match auth_file::load_auth(dir) {
            Ok(saved) => saved,
            Err(e @ AuthStoreError::Parse { .. }) => {
                tracing::warn!(error = %e, "discarding unreadable auth file");
                auth_file::clear_auth(dir)?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        match saved {
            Some(auth) => {
                tracing::info!(user_id = %auth.user.id, "restored login");
                self.gateway.authorize(Some(&auth.access_token));
                self.auth = Some(auth);
            }
            None => {
                tracing::debug!("no saved login");
                self.gateway.authorize(None);
                self.auth = None;
            }
        }
        Ok(self.user())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User, ContextError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = self.gateway.login(&credentials).await?;
        self.adopt(&session)
    }

    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<&User, ContextError> {
        let registration = Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = self.gateway.register(&registration).await?;
        self.adopt(&session)
    }

    /// Forget the login in memory and on disk.
    pub fn logout(&mut self) -> Result<(), ContextError> {
        if let Some(auth) = self.auth.take() {
            tracing::info!(user_id = %auth.user.id, "logged out");
        }
        self.gateway.authorize(None);
        auth_file::clear_auth(&self.settings.data_dir)?;
        Ok(())
    }

    /// Re-read the profile, e.g. to pick up a new total score after a game.
    /// An expired token logs the user out.
    pub async fn refresh_user(&mut self) -> Result<Option<&User>, ContextError> {
        if self.auth.is_none() {
            return Ok(None);
        }

        match self.gateway.profile().await {
            Ok(user) => {
                if let Some(auth) = self.auth.as_mut() {
                    auth.user = user;
                    auth_file::save_auth(auth, &self.settings.data_dir)?;
                }
                Ok(self.user())
            }
            Err(e) if e.kind() == ErrorKind::Unauthorized => {
                tracing::warn!(error = %e, "token rejected, logging out");
                self.logout()?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn adopt(&mut self, session: &AuthSession) -> Result<&User, ContextError> {
        let auth = SavedAuth::from_session(session);
        auth_file::save_auth(&auth, &self.settings.data_dir)?;
        self.gateway.authorize(Some(&auth.access_token));
        tracing::info!(user_id = %auth.user.id, "logged in");
        Ok(&self.auth.insert(auth).user)
    }
}
