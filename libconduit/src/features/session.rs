//! The signed-in user, restored from and persisted to the credential store

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{LoadUserFn, RemoveUserFn, StoreUserFn};
use crate::credentials::CredentialStore;
use crate::error::{CredentialStoreError, Result};
use crate::runtime::{Cmd, Store};
use crate::types::User;

#[derive(Clone)]
pub struct Env {
    pub load_user: LoadUserFn,
    pub remove_user: RemoveUserFn,
}

impl Env {
    pub fn from_store(credentials: Arc<dyn CredentialStore>) -> Self {
        let loader = Arc::clone(&credentials);
        Self {
            load_user: Arc::new(move || {
                let credentials = Arc::clone(&loader);
                run_blocking(move || credentials.load()).boxed()
            }),
            remove_user: Arc::new(move || {
                let credentials = Arc::clone(&credentials);
                run_blocking(move || credentials.delete()).boxed()
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub user: Option<User>,
    /// Set once the initial load from the credential store has finished or
    /// a newer user has been published
    pub restored: bool,
    pub error: Option<CredentialStoreError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    LoadedUser(std::result::Result<User, CredentialStoreError>),
    /// Published by [`Session`] after it replaced or removed the stored user
    UserChanged(Option<User>),
    SignOut,
    RemovedUser(std::result::Result<(), CredentialStoreError>),
}

pub fn init(env: &Env) -> (Model, Cmd<Msg>) {
    (
        Model::default(),
        Cmd::attempt((env.load_user)(), Msg::LoadedUser),
    )
}

pub fn update(env: &Env, msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        // A user published while the load was running is newer than
        // whatever the load found.
        Msg::LoadedUser(_) if model.restored => {
            tracing::debug!("Ignoring stored user loaded after a session change");
            (model.clone(), Cmd::none())
        }

        Msg::LoadedUser(Ok(user)) => (
            Model {
                user: Some(user),
                restored: true,
                error: None,
            },
            Cmd::none(),
        ),

        Msg::LoadedUser(Err(CredentialStoreError::NoItem)) => (
            Model {
                user: None,
                restored: true,
                error: None,
            },
            Cmd::none(),
        ),

        Msg::LoadedUser(Err(e)) => {
            tracing::warn!("Could not restore stored user: {}", e);
            (
                Model {
                    user: None,
                    restored: true,
                    error: Some(e),
                },
                Cmd::none(),
            )
        }

        Msg::UserChanged(user) => (
            Model {
                user,
                restored: true,
                error: None,
            },
            Cmd::none(),
        ),

        Msg::SignOut => (
            model.clone(),
            Cmd::attempt((env.remove_user)(), Msg::RemovedUser),
        ),

        Msg::RemovedUser(Ok(())) => (
            Model {
                user: None,
                error: None,
                ..model.clone()
            },
            Cmd::none(),
        ),

        Msg::RemovedUser(Err(e)) => (
            Model {
                error: Some(e),
                ..model.clone()
            },
            Cmd::none(),
        ),
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}

/// Shared handle other features use to persist or forget the user.
///
/// Writes go to the credential store first; the session model only changes
/// once the write succeeded.
#[derive(Clone)]
pub struct Session {
    store: Store<Model, Msg>,
    credentials: Arc<dyn CredentialStore>,
}

impl Session {
    pub fn start(credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let store = store(Env::from_store(Arc::clone(&credentials)))?;
        Ok(Self { store, credentials })
    }

    pub fn store(&self) -> &Store<Model, Msg> {
        &self.store
    }

    pub fn user(&self) -> Option<User> {
        self.store.model().user
    }

    /// Replace the stored user (delete, then save)
    pub fn store_user(&self, user: User) -> BoxFuture<'static, std::result::Result<(), CredentialStoreError>> {
        let credentials = Arc::clone(&self.credentials);
        let store = self.store.clone();
        async move {
            let saved = user.clone();
            run_blocking(move || credentials.replace(&saved)).await?;
            store.send(Msg::UserChanged(Some(user)));
            Ok(())
        }
        .boxed()
    }

    pub fn remove_user(&self) -> BoxFuture<'static, std::result::Result<(), CredentialStoreError>> {
        let credentials = Arc::clone(&self.credentials);
        let store = self.store.clone();
        async move {
            run_blocking(move || credentials.delete()).await?;
            store.send(Msg::UserChanged(None));
            Ok(())
        }
        .boxed()
    }

    pub fn store_user_fn(&self) -> StoreUserFn {
        let session = self.clone();
        Arc::new(move |user: User| session.store_user(user))
    }

    pub fn remove_user_fn(&self) -> RemoveUserFn {
        let session = self.clone();
        Arc::new(move || session.remove_user())
    }
}

/// Credential backends block (keyring IPC, file I/O), so they run off the
/// async workers.
async fn run_blocking<T, F>(f: F) -> std::result::Result<T, CredentialStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, CredentialStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CredentialStoreError::Platform(format!("credential task failed: {}", e)))?
}
