//! Feature reducers
//!
//! Every feature has the same shape: a `Model`, a closed `Msg` enum, an `Env`
//! holding the functions it may call, `init(&Env)`, a pure
//! `update(&Env, Msg, &Model) -> (Model, Cmd<Msg>)` and a `store(Env)`
//! constructor. Network and credential calls only happen inside the returned
//! [`Cmd`](crate::runtime::Cmd), and their failures arrive back as `Result`
//! values inside messages.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::api::ConduitApi;
use crate::error::{CredentialStoreError, HttpError};
use crate::runtime::Thunk;
use crate::types::{Article, User};

pub mod account;
pub mod app;
pub mod authentication;
pub mod home;
pub mod login;
pub mod profile;
pub mod session;
pub mod sign_in;

pub type LoginFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<User, HttpError>> + Send + Sync>;
pub type FetchFeedFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Article>, HttpError>> + Send + Sync>;
pub type LoadUserFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<User, CredentialStoreError>> + Send + Sync>;
pub type StoreUserFn =
    Arc<dyn Fn(User) -> BoxFuture<'static, Result<(), CredentialStoreError>> + Send + Sync>;
pub type RemoveUserFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), CredentialStoreError>> + Send + Sync>;

/// Failure shown by the login and sign-in forms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("could not store credentials: {0}")]
    Credential(#[from] CredentialStoreError),
}

/// Dependencies of the login and sign-in forms
#[derive(Clone)]
pub struct AuthEnv {
    pub login: LoginFn,
    pub store_user: StoreUserFn,
    pub remove_user: RemoveUserFn,
    pub dismiss_view: Thunk,
}

impl AuthEnv {
    /// Wire the form to the API and the shared session
    pub fn live(api: &ConduitApi, session: &session::Session, dismiss_view: Thunk) -> Self {
        Self {
            login: login_fn(api.clone()),
            store_user: session.store_user_fn(),
            remove_user: session.remove_user_fn(),
            dismiss_view,
        }
    }
}

pub fn login_fn(api: ConduitApi) -> LoginFn {
    Arc::new(move |email: String, password: String| {
        let api = api.clone();
        async move { api.login(&email, &password).await }.boxed()
    })
}

pub fn fetch_feed_fn(api: ConduitApi) -> FetchFeedFn {
    Arc::new(move || {
        let api = api.clone();
        async move { api.fetch_feed().await }.boxed()
    })
}
