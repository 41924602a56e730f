//! Severity levels for recoverable model problems.

/// How the simulator reacts to a model problem it knows how to repair.
///
/// Applies to degenerate polygons (repaired by removal) and to reaction
/// probabilities above one (repaired by rescaling). `Cope` changes the
/// model silently, `Warn` changes it and logs a warning, `Error` rejects
/// the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    /// Repair silently.
    Cope,
    /// Repair and log a warning.
    #[default]
    Warn,
    /// Refuse the model.
    Error,
}
