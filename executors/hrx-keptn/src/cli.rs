use clap::Parser;

use hrx_executor::cli::ExecutorAction;

/// Gates one release through a quality evaluation instead of applying it
/// directly; shares the default executor's task interface.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct KeptnCli {
    /// Base64-encoded HelmRelease manifest the evaluation is derived from
    #[arg(long)]
    pub spec: String,

    /// Action to perform
    #[arg(long, value_enum)]
    pub action: ExecutorAction,

    /// Overall timeout for the invocation, in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Interval between poll iterations, in seconds
    #[arg(long, default_value_t = 10)]
    pub interval: u64,

    /// Name of the config map holding shipyard.yaml and the plugin settings
    #[arg(long)]
    pub configmap_name: String,

    /// Namespace of that config map
    #[arg(long)]
    pub configmap_namespace: String,
}
