// -
// Process exit contract

/// Exit status after the tracked field drifted from its baseline
pub const EXIT_CODE_DRIFT: i32 = 1;
/// Exit status when the watch can never be established
pub const EXIT_CODE_CONNECTION_FAILED: i32 = 2;

// -
// Configuration

/// Prefix of environment variable overrides, e.g. `SENTINEL__TARGET__NAME`
pub(crate) const CONFIG_ENV_PREFIX: &str = "SENTINEL";
pub(crate) const CONFIG_ENV_SEPARATOR: &str = "__";
/// Environment variable naming an extra configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

// -
// Watch protocol

/// In-band error code meaning the resume version is too old to continue from
pub const WATCH_ERROR_EXPIRED: &str = "EXPIRED";

/// Log file name inside `monitoring.log_dir`
pub const LOG_FILE_NAME: &str = "sentinel.log";
