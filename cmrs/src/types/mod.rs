//! Shared constants for the ConnMan D-Bus API.

pub(crate) mod constants;
