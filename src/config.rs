use std::time::Duration;

// REST API location on the instance
pub const API_BASE_PATH: &str = "/vmturbo/rest";
pub const USER_AGENT: &str = "cloudplan-cli";

// Environment fallbacks for connection settings
pub const ENV_HOST: &str = "TURBO_HOST";
pub const ENV_USERNAME: &str = "TURBO_USERNAME";
pub const ENV_PASSWORD: &str = "TURBO_PASSWORD";
pub const ENV_LOG: &str = "CLOUDPLAN_LOG";

/// Name of the live market every scenario is applied against.
pub const REALTIME_MARKET: &str = "Market";
/// Market state reported once a plan has finished computing.
pub const MARKET_SUCCEEDED: &str = "SUCCEEDED";

/// Upstream prices are hourly; reports are monthly.
pub const DEFAULT_HOURS_PER_MONTH: f64 = 730.0;

// Poll defaults for waiting on a plan market
pub const DEFAULT_POLL_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 240;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60 * 60);
