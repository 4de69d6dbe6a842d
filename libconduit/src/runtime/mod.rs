//! Unidirectional state runtime
//!
//! `Msg` → [`Store::send`] → `update` → (new model, [`Cmd`]) → publish →
//! execute the command → zero or one `Msg` back into the Store.

pub mod cmd;
pub mod store;

pub use cmd::{Cmd, CmdKind, Thunk};
pub use store::{Store, SubscriptionId};
