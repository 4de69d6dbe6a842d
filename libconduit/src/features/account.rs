//! Account page: opens the sign-in/sign-up sheets and signs out

use super::RemoveUserFn;
use crate::error::{CredentialStoreError, Result};
use crate::runtime::{Cmd, Store};

#[derive(Clone)]
pub struct Env {
    pub remove_user: RemoveUserFn,
}

/// Sheet presented over the account page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetView {
    SignIn,
    SignUp,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub sheet_view: SheetView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    ChangedSheetView(SheetView),
    SignedOut,
    RemovedUser(std::result::Result<(), CredentialStoreError>),
}

pub fn init(_env: &Env) -> (Model, Cmd<Msg>) {
    (Model::default(), Cmd::none())
}

pub fn update(env: &Env, msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::ChangedSheetView(sheet_view) => (Model { sheet_view }, Cmd::none()),

        Msg::SignedOut => (
            model.clone(),
            Cmd::attempt((env.remove_user)(), Msg::RemovedUser),
        ),

        Msg::RemovedUser(Ok(())) => (model.clone(), Cmd::none()),

        // The session keeps the user, so the page keeps offering "Sign Out"
        Msg::RemovedUser(Err(e)) => {
            tracing::warn!("Sign out failed: {}", e);
            (model.clone(), Cmd::none())
        }
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}
