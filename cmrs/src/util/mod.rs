//! Formatting and parsing helpers shared by the models and the editor.

pub(crate) mod utils;
