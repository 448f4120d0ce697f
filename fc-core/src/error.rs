//! Error types, re-exported from the shared `fc-error` crate

pub use fc_error::{FanctrlError, Result};
