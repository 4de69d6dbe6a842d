//! Declarative side effects returned by reducers
//!
//! A reducer never performs I/O itself. It describes the work as a [`Cmd`]
//! and the [`Store`](super::Store) runs it after the new model has been
//! published:
//!
//! - `None`: nothing to do
//! - `Task`: a future resolving to at most one follow-up message
//! - `Thunk`: a synchronous procedure run at dispatch time, e.g. dismissing a view
//! - `Batch`: several commands started together, in order
//!
//! Failures never cross this boundary raw. [`Cmd::attempt`] folds a
//! `Result` into a message before the future is boxed.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

/// A synchronous side effect
pub type Thunk = Arc<dyn Fn() + Send + Sync>;

pub enum Cmd<Msg> {
    None,
    Task(BoxFuture<'static, Option<Msg>>),
    Thunk(Thunk),
    Batch(Vec<Cmd<Msg>>),
}

/// Shape of a [`Cmd`] with the payloads erased.
///
/// Futures and closures cannot be compared, so transitions are checked for
/// determinism by comparing kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdKind {
    None,
    Task,
    Thunk,
    Batch(Vec<CmdKind>),
}

impl<Msg: Send + 'static> Cmd<Msg> {
    pub fn none() -> Self {
        Cmd::None
    }

    /// Run `future` and deliver its output
    pub fn perform<F>(future: F) -> Self
    where
        F: Future<Output = Msg> + Send + 'static,
    {
        Cmd::Task(future.map(Some).boxed())
    }

    /// Run a fallible `future` and turn either outcome into a message
    pub fn attempt<T, E, F, M>(future: F, to_msg: M) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        M: FnOnce(Result<T, E>) -> Msg + Send + 'static,
    {
        Cmd::Task(async move { Some(to_msg(future.await)) }.boxed())
    }

    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Cmd::Thunk(Arc::new(f))
    }

    pub fn batch(cmds: impl IntoIterator<Item = Cmd<Msg>>) -> Self {
        Cmd::Batch(cmds.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }

    pub fn kind(&self) -> CmdKind {
        match self {
            Cmd::None => CmdKind::None,
            Cmd::Task(_) => CmdKind::Task,
            Cmd::Thunk(_) => CmdKind::Thunk,
            Cmd::Batch(cmds) => CmdKind::Batch(cmds.iter().map(Cmd::kind).collect()),
        }
    }

    /// Lift the messages this command produces into a parent message type
    pub fn map<N, F>(self, f: F) -> Cmd<N>
    where
        N: Send + 'static,
        F: Fn(Msg) -> N + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<N>(self, f: Arc<dyn Fn(Msg) -> N + Send + Sync>) -> Cmd<N>
    where
        N: Send + 'static,
    {
        match self {
            Cmd::None => Cmd::None,
            Cmd::Task(future) => Cmd::Task(future.map(move |msg| msg.map(|m| f(m))).boxed()),
            Cmd::Thunk(thunk) => Cmd::Thunk(thunk),
            Cmd::Batch(cmds) => Cmd::Batch(
                cmds.into_iter()
                    .map(|cmd| cmd.map_shared(Arc::clone(&f)))
                    .collect(),
            ),
        }
    }
}

impl<Msg> Default for Cmd<Msg> {
    fn default() -> Self {
        Cmd::None
    }
}

impl<Msg> std::fmt::Debug for Cmd<Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cmd::None => f.write_str("Cmd::None"),
            Cmd::Task(_) => f.write_str("Cmd::Task"),
            Cmd::Thunk(_) => f.write_str("Cmd::Thunk"),
            Cmd::Batch(cmds) => f.debug_tuple("Cmd::Batch").field(cmds).finish(),
        }
    }
}
