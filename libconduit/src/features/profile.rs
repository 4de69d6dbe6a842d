//! Profile page with a single "Log out" action

use super::RemoveUserFn;
use crate::error::{CredentialStoreError, Result};
use crate::runtime::{Cmd, Store, Thunk};

#[derive(Clone)]
pub struct Env {
    pub dismiss_view: Thunk,
    pub remove_user: RemoveUserFn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Model;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    LoggedOut,
    RemovedUser(std::result::Result<(), CredentialStoreError>),
}

pub fn init(_env: &Env) -> (Model, Cmd<Msg>) {
    (Model, Cmd::none())
}

pub fn update(env: &Env, msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::LoggedOut => (*model, Cmd::attempt((env.remove_user)(), Msg::RemovedUser)),
        Msg::RemovedUser(Ok(())) => (*model, Cmd::Thunk(env.dismiss_view.clone())),
        Msg::RemovedUser(Err(e)) => {
            tracing::warn!("Log out failed: {}", e);
            (*model, Cmd::none())
        }
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}
