use clap::Parser;
use url::Url;

/// NBA daily win-prediction dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "courtside", version, about)]
pub struct Config {
    /// Prediction backend base URL (local dev server or hosted service)
    #[arg(
        long,
        env = "PREDICTIONS_API_URL",
        default_value = "http://localhost:8000"
    )]
    pub api_base_url: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Timeout for backend requests, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// Background slate refresh interval, in seconds
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "300")]
    pub refresh_interval_secs: u64,

    /// Favorite win chance above which a game is badged HIGH CONFIDENCE
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value = "0.75")]
    pub confidence_threshold: f64,

    /// Keep the slate in the backend's order instead of confidence-first
    #[arg(long, env = "AS_RECEIVED_ORDER", default_value = "false")]
    pub as_received_order: bool,

    /// Skip pre-loading team histories after each slate refresh
    #[arg(long, env = "NO_WARM_HISTORY", default_value = "false")]
    pub no_warm_history: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.api_base_url)
            .map_err(|e| anyhow::anyhow!("invalid api_base_url '{}': {}", self.api_base_url, e))?;
        if !(0.5..1.0).contains(&self.confidence_threshold) {
            anyhow::bail!("confidence_threshold must be in [0.5, 1.0)");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.refresh_interval_secs < 10 {
            anyhow::bail!("refresh_interval_secs must be at least 10");
        }
        Ok(())
    }
}
