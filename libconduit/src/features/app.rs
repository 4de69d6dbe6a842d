//! Root composition: one page active at a time
//!
//! Page messages are wrapped in the root `Msg` and routed to the page that
//! is currently shown. Page commands are lifted with [`Cmd::map`] so their
//! results come back wrapped the same way.

use super::{account, home};
use crate::error::Result;
use crate::runtime::{Cmd, Store};

#[derive(Clone)]
pub struct Env {
    pub home: home::Env,
    pub account: account::Env,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Home(home::Model),
    Account(account::Model),
}

impl Model {
    pub fn page(&self) -> Page {
        match self {
            Model::Home(_) => Page::Home,
            Model::Account(_) => Page::Account,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Home(home::Msg),
    Account(account::Msg),
    ChangedPage(Page),
}

pub fn init(env: &Env) -> (Model, Cmd<Msg>) {
    update_with(Model::Home, Msg::Home, home::init(&env.home))
}

pub fn update(env: &Env, msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match (msg, model) {
        (Msg::Home(msg), Model::Home(page)) => {
            update_with(Model::Home, Msg::Home, home::update(&env.home, msg, page))
        }
        (Msg::Account(msg), Model::Account(page)) => update_with(
            Model::Account,
            Msg::Account,
            account::update(&env.account, msg, page),
        ),
        (Msg::ChangedPage(Page::Home), _) => {
            update_with(Model::Home, Msg::Home, home::init(&env.home))
        }
        (Msg::ChangedPage(Page::Account), _) => update_with(
            Model::Account,
            Msg::Account,
            account::init(&env.account),
        ),
        // Late results for a page that is no longer shown
        (Msg::Home(msg), Model::Account(_)) => {
            tracing::debug!(?msg, "dropping home message while on account page");
            (model.clone(), Cmd::none())
        }
        (Msg::Account(msg), Model::Home(_)) => {
            tracing::debug!(?msg, "dropping account message while on home page");
            (model.clone(), Cmd::none())
        }
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}

fn update_with<PageModel, PageMsg>(
    to_model: impl FnOnce(PageModel) -> Model,
    to_msg: impl Fn(PageMsg) -> Msg + Send + Sync + 'static,
    (model, cmd): (PageModel, Cmd<PageMsg>),
) -> (Model, Cmd<Msg>)
where
    PageMsg: Send + 'static,
{
    (to_model(model), cmd.map(to_msg))
}
