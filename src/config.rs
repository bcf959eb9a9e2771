use tracing::trace;

/// Tunables for the poller workers and the availability state machine.
///
/// The hysteresis constants mirror the classic unreachable-host discipline:
/// after the first network error a host gets `unreachable_delay` seconds of
/// breathing room between probes; once failures span more than
/// `unreachable_period` seconds the host is flipped unavailable and probed
/// only every `unavailable_delay` seconds.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PollerConfig {
    /// Seconds between probes while a host is in the grace window
    #[serde(default = "default_unreachable_delay")]
    pub unreachable_delay: i64,

    /// Seconds between probes once a host is unavailable
    #[serde(default = "default_unavailable_delay")]
    pub unavailable_delay: i64,

    /// Length of the grace window in seconds; failures spanning more than
    /// this flip the host unavailable
    #[serde(default = "default_unreachable_period")]
    pub unreachable_period: i64,

    /// Watchdog timeout in seconds for transports that do not manage
    /// their own deadline
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Ceiling in seconds on how long a worker sleeps between passes
    #[serde(default = "default_poll_delay")]
    pub poll_delay: u64,

    /// Seconds until a not-supported item is retried; 0 parks it entirely
    #[serde(default = "default_refresh_unsupported")]
    pub refresh_unsupported: i64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            unreachable_delay: default_unreachable_delay(),
            unavailable_delay: default_unavailable_delay(),
            unreachable_period: default_unreachable_period(),
            timeout: default_timeout(),
            poll_delay: default_poll_delay(),
            refresh_unsupported: default_refresh_unsupported(),
        }
    }
}

fn default_unreachable_delay() -> i64 {
    15
}

fn default_unavailable_delay() -> i64 {
    60
}

fn default_unreachable_period() -> i64 {
    45
}

fn default_timeout() -> u64 {
    3
}

fn default_poll_delay() -> u64 {
    5
}

fn default_refresh_unsupported() -> i64 {
    600
}

pub fn read_config_file(path: &str) -> anyhow::Result<PollerConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
