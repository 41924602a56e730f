//! Error shared by every storage structure in the workspace.

use thiserror::Error;

/// Storage for a core structure could not grow.
///
/// Raised by the calendar, the molecule store and the surface grids when
/// a fallible reservation fails. The engine treats this as fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// A reservation failed.
    #[error("out of memory while growing {what}")]
    Exhausted {
        /// Which structure was growing.
        what: &'static str,
    },
}

impl ResourceError {
    /// Shorthand for [`ResourceError::Exhausted`].
    pub fn exhausted(what: &'static str) -> Self {
        Self::Exhausted { what }
    }
}
