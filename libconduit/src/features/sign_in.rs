//! Sign-in sheet presented from the account page

use super::{AuthEnv, FormError};
use crate::error::{CredentialStoreError, HttpError, Result};
use crate::runtime::{Cmd, Store};
use crate::types::User;

pub type Env = AuthEnv;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub user: Option<User>,
    pub username: String,
    pub password: String,
    pub error: Option<FormError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    EnteredUsername(String),
    EnteredPassword(String),
    SubmittedForm,
    CompletedSignIn(std::result::Result<User, HttpError>),
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

        Msg::SubmittedForm => {
            let sign_in = (env.login)(model.username.clone(), model.password.clone());
            (model.clone(), Cmd::attempt(sign_in, Msg::CompletedSignIn))
        }

        Msg::CompletedSignIn(Ok(user)) => {
            let persist = (env.store_user)(user.clone());
            (
                Model {
                    user: Some(user),
                    error: None,
                    ..model.clone()
                },
                Cmd::attempt(persist, Msg::StoredUser),
            )
        }

        Msg::CompletedSignIn(Err(e)) => {
            tracing::debug!("Sign in rejected: {}", e);
            (
                Model {
                    user: None,
                    error: Some(e.into()),
                    ..model.clone()
                },
                Cmd::none(),
            )
        }

        Msg::StoredUser(Ok(())) => (model.clone(), Cmd::Thunk(env.dismiss_view.clone())),

        Msg::StoredUser(Err(e)) => (
            Model {
                user: None,
                error: Some(e.into()),
                ..model.clone()
            },
            Cmd::attempt((env.remove_user)(), Msg::RevertedCredential),
        ),

        Msg::RevertedCredential(Ok(())) => (model.clone(), Cmd::none()),

        Msg::RevertedCredential(Err(e)) => {
            tracing::warn!("Could not revert credential after failed sign in: {}", e);
            (model.clone(), Cmd::none())
        }

        Msg::ClickedCancel => (model.clone(), Cmd::Thunk(env.dismiss_view.clone())),
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}
