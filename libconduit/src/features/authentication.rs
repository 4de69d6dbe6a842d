//! Switches between the sign-up and login forms

use crate::error::Result;
use crate::runtime::{Cmd, Store};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostedView {
    #[default]
    SignUp,
    Login,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub hosted_view: HostedView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    ReplacedView(HostedView),
}

pub fn init() -> (Model, Cmd<Msg>) {
    (Model::default(), Cmd::none())
}

pub fn update(msg: Msg, _model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::ReplacedView(hosted_view) => (Model { hosted_view }, Cmd::none()),
    }
}

pub fn store() -> Result<Store<Model, Msg>> {
    let (model, cmd) = init();
    Store::new(model, cmd, update)
}
