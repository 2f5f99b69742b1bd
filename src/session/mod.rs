//! Session/profile store: who is signed in, and with what authorization.
//!
//! SYSTEM CONTEXT
//! ==============
//! Platform auth events → [`SessionStore`] transitions → route guards
//! re-evaluate → UI renders. The store is the only writer of [`Session`];
//! guards, avatar menus and profile pages are read-only observers holding a
//! `watch::Receiver`.
//!
//! ORDERING
//! ========
//! Every transition that starts new work (fetch, refresh, logout, remote
//! sign-out, dispose) takes a fresh request token. Completions carrying an
//! older token are discarded, so a fetch that finishes after a logout can
//! never resurrect the identity.

mod state;
mod store;

pub use state::{LoadingState, Session};
pub use store::{SessionError, SessionStore};
