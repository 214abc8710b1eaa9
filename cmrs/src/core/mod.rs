//! Sans-IO panel logic.
//!
//! Nothing in this module touches the bus. [`panel_state::PanelState`]
//! consumes [`events::Event`]s and produces [`events::Action`]s; the
//! monitoring layer turns those into signals, calls and timers.

pub(crate) mod editor;
pub(crate) mod events;
pub(crate) mod panel_state;
pub(crate) mod registry;
pub(crate) mod technology;
