//! Signal tracking and the panel's dispatch loop.
//!
//! This module turns ConnMan signals into events for the core, performs the
//! calls and timers the core asks for, and isolates all bus access behind
//! the [`transport::Transport`] trait.

pub(crate) mod dispatch;
pub(crate) mod manager;
pub(crate) mod transport;
