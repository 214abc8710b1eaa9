//! D-Bus proxy interfaces for ConnMan.
//!
//! This module contains the low-level proxy definitions for the three
//! ConnMan object kinds, plus the conversion between their `a{sv}`
//! property maps and the typed values the core works with.

pub(crate) mod decode;
mod manager;
mod service;
mod technology;

pub(crate) use manager::{ConnmanManagerProxy, ObjectProperties};
pub(crate) use service::ConnmanServiceProxy;
pub(crate) use technology::ConnmanTechnologyProxy;
