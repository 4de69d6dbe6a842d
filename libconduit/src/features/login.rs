//! Login form
//!
//! Submitting calls the API. A returned user is persisted through the
//! session; if persisting fails the credential is removed again so no
//! half-written login survives, and the error is shown on the form.

use super::{AuthEnv, FormError};
use crate::error::{CredentialStoreError, HttpError, Result};
use crate::runtime::{Cmd, Store};
use crate::types::User;

pub type Env = AuthEnv;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub username: String,
    pub password: String,
    pub user: Option<User>,
    pub error: Option<FormError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    EnteredUsername(String),
    EnteredPassword(String),
    SubmittedForm,
    CompletedLogin(std::result::Result<User, HttpError>),
    StoredUser(std::result::Result<(), CredentialStoreError>),
    RevertedCredential(std::result::Result<(), CredentialStoreError>),
    ClickedCancel,
}

pub fn init(_env: &Env) -> (Model, Cmd<Msg>) {
    (Model::default(), Cmd::none())
}

pub fn update(env: &Env, msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::EnteredUsername(username) => (
            Model {
                username,
                ..model.clone()
            },
            Cmd::none(),
        ),

        Msg::EnteredPassword(password) => (
            Model {
                password,
                ..model.clone()
            },
            Cmd::none(),
        ),

        Msg::SubmittedForm => (
            model.clone(),
            Cmd::attempt(
                (env.login)(model.username.clone(), model.password.clone()),
                Msg::CompletedLogin,
            ),
        ),

        Msg::CompletedLogin(Ok(user)) => (
            Model {
                user: Some(user.clone()),
                error: None,
                ..model.clone()
            },
            Cmd::attempt((env.store_user)(user), Msg::StoredUser),
        ),

        Msg::CompletedLogin(Err(e)) => {
            tracing::debug!("Login rejected: {}", e);
            (
                Model {
                    user: None,
                    error: Some(FormError::Http(e)),
                    ..model.clone()
                },
                Cmd::none(),
            )
        }

        Msg::StoredUser(Ok(())) => (model.clone(), Cmd::Thunk(env.dismiss_view.clone())),

        Msg::StoredUser(Err(e)) => (
            Model {
                user: None,
                error: Some(FormError::Credential(e)),
                ..model.clone()
            },
            Cmd::attempt((env.remove_user)(), Msg::RevertedCredential),
        ),

        // Nothing left to compensate: the form already shows the save error
        Msg::RevertedCredential(Ok(())) => (model.clone(), Cmd::none()),

        Msg::RevertedCredential(Err(e)) => {
            tracing::warn!("Could not revert credential after failed login: {}", e);
            (model.clone(), Cmd::none())
        }

        Msg::ClickedCancel => (model.clone(), Cmd::Thunk(env.dismiss_view.clone())),
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}
