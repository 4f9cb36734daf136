mod delete;
mod install;

pub use delete::Deleter;
pub use install::Installer;

/// Terminal result of one reconciliation invocation, reported once through
/// the exit status and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The desired state was reached within the deadline.
    Converged,
    /// The deadline elapsed before convergence; fatal for the invocation.
    TimedOut,
    /// Normal deletion stalled; stripping the finalizer got the object
    /// reaped, or the forced uninstall finished the job.
    EscalatedAndCleaned,
    /// Even the forced uninstall failed. Cleanup is best-effort by design,
    /// so the invocation still completes.
    EscalatedAndFailed,
}

impl Outcome {
    /// Whether the invocation should report success to the workflow engine.
    pub fn is_success(self) -> bool {
        !matches!(self, Outcome::TimedOut)
    }
}
