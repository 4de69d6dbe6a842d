//! Home page: the global article feed

use super::FetchFeedFn;
use crate::error::Result;
use crate::runtime::{Cmd, Store};
use crate::types::Article;

#[derive(Clone)]
pub struct Env {
    pub fetch_feed: FetchFeedFn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub articles: Vec<Article>,
    /// True until the first `GotArticles` arrives
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    GotArticles(Vec<Article>),
}

pub fn init(env: &Env) -> (Model, Cmd<Msg>) {
    (
        Model {
            articles: Vec::new(),
            loading: true,
        },
        fetch_feed(env),
    )
}

pub fn update(_env: &Env, msg: Msg, _model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::GotArticles(articles) => (
            Model {
                articles,
                loading: false,
            },
            Cmd::none(),
        ),
    }
}

pub fn store(env: Env) -> Result<Store<Model, Msg>> {
    let (model, cmd) = init(&env);
    Store::new(model, cmd, move |msg, model| update(&env, msg, model))
}

/// A failed fetch shows an empty feed
fn fetch_feed(env: &Env) -> Cmd<Msg> {
    Cmd::attempt((env.fetch_feed)(), |result| match result {
        Ok(articles) => Msg::GotArticles(articles),
        Err(e) => {
            tracing::warn!("Failed to fetch feed: {}", e);
            Msg::GotArticles(Vec::new())
        }
    })
}
