use clap::{Parser, ValueEnum};

/// Applies or removes one HelmRelease and waits for it to settle, for use as
/// a workflow task container.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ExecutorCli {
    /// Base64-encoded HelmRelease manifest to reconcile
    #[arg(long)]
    pub spec: String,

    /// Action to perform on the release
    #[arg(long, value_enum)]
    pub action: ExecutorAction,

    /// Overall timeout for the invocation, in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Interval between retry/poll iterations, in seconds
    #[arg(long, default_value_t = 10)]
    pub interval: u64,
}

/// The two operations a single process invocation can perform.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorAction {
    /// Converge the release and wait until it is ready
    Install,
    /// Delete the release and wait until it is gone
    Delete,
}
