use envconfig::Envconfig;

/// Process-level settings with workable defaults; the workflow engine
/// overrides them through the container environment.
#[derive(Envconfig, Clone, Debug)]
pub struct ExecutorConfig {
    /// Consecutive seconds the Ready condition must hold before install
    /// reports success.
    /// Env: HRX_SETTLE_SECONDS
    #[envconfig(from = "HRX_SETTLE_SECONDS", default = "5")]
    pub settle_seconds: u32,

    /// Cadence for the delete-side removal polls.
    /// Env: HRX_REMOVAL_POLL_SECS
    #[envconfig(from = "HRX_REMOVAL_POLL_SECS", default = "1")]
    pub removal_poll_secs: u64,

    /// Sub-deadline for each removal poll. Kept well below the usual
    /// workflow timeout so escalation has room to act before the engine
    /// gives up on the task.
    /// Env: HRX_REMOVAL_WINDOW_SECS
    #[envconfig(from = "HRX_REMOVAL_WINDOW_SECS", default = "60")]
    pub removal_window_secs: u64,

    /// Helm binary used by the forced-uninstall fallback.
    /// Env: HRX_HELM_BIN
    #[envconfig(from = "HRX_HELM_BIN", default = "helm")]
    pub helm_bin: String,
}
