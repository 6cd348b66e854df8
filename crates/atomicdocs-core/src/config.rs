//! Configuration for the AtomicDocs gateway.
//!
//! Values are layered: built-in defaults, then an optional TOML or JSON file,
//! then `ATOMICDOCS_*` environment variables. The fixed delays of the gateway
//! (readiness grace period, automatic registration delay, poll interval) are
//! tunables here rather than guarantees.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::mount::DocsMount;
use crate::platform::BinaryResolver;

/// Gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Documentation subprocess settings.
    pub subprocess: SubprocessSettings,
    /// Route registration settings.
    pub registration: RegistrationSettings,
    /// Documentation proxy settings.
    pub proxy: ProxySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl GatewayConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| CoreError::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| CoreError::config(format!("invalid TOML: {e}"))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| CoreError::config(format!("invalid JSON: {e}"))),
            _ => Err(CoreError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Variables are prefixed with `ATOMICDOCS_`. Unparseable values are
    /// ignored and the previous value is kept.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ATOMICDOCS_HOST") {
            self.subprocess.host = host;
        }

        if let Some(port) = lookup("ATOMICDOCS_PORT").and_then(|v| v.parse().ok()) {
            self.subprocess.port = port;
        }

        if let Some(dir) = lookup("ATOMICDOCS_BIN_DIR") {
            self.subprocess.bin_dir = PathBuf::from(dir);
        }

        if let Some(ms) = lookup("ATOMICDOCS_READY_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.subprocess.ready_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = lookup("ATOMICDOCS_AUTO_REGISTER_DELAY_MS").and_then(|v| v.parse().ok())
        {
            self.registration.auto_delay = Duration::from_millis(ms);
        }

        if let Some(n) = lookup("ATOMICDOCS_MAX_REGISTER_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.registration.max_attempts = n;
        }

        if let Some(ms) = lookup("ATOMICDOCS_REGISTER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.registration.timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = lookup("ATOMICDOCS_PROXY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.proxy.timeout = Duration::from_millis(ms);
        }

        if let Some(level) = lookup("ATOMICDOCS_LOG") {
            self.logging.level = level;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.subprocess.host.is_empty() {
            return Err(CoreError::config("subprocess.host is required"));
        }

        if self.subprocess.port == 0 {
            return Err(CoreError::config("subprocess.port must be non-zero"));
        }

        if !self.registration.path.starts_with('/') {
            return Err(CoreError::config("registration.path must start with /"));
        }

        if self.registration.max_attempts == 0 {
            return Err(CoreError::config("registration.max_attempts must be at least 1"));
        }

        if self.registration.poll_interval.is_zero() {
            return Err(CoreError::config("registration.poll_interval must be non-zero"));
        }

        if self.registration.timeout.is_zero() {
            return Err(CoreError::config("registration.timeout must be non-zero"));
        }

        if !self.proxy.mount.starts_with('/') || self.proxy.mount.trim_end_matches('/').is_empty()
        {
            return Err(CoreError::config(
                "proxy.mount must start with / and must not be the root",
            ));
        }

        if http::HeaderName::from_bytes(self.proxy.port_header.as_bytes()).is_err() {
            return Err(CoreError::config(format!(
                "proxy.port_header is not a valid header name: {}",
                self.proxy.port_header
            )));
        }

        Ok(())
    }

    /// Base URL of the documentation subprocess, e.g. `http://localhost:6174`.
    pub fn subprocess_url(&self) -> String {
        format!("http://{}:{}", self.subprocess.host, self.subprocess.port)
    }

    /// Full URL of the registration endpoint.
    pub fn registration_url(&self) -> String {
        format!("{}{}", self.subprocess_url(), self.registration.path)
    }

    /// The reserved documentation mount.
    pub fn mount(&self) -> DocsMount {
        DocsMount::new(self.proxy.mount.clone())
    }

    /// Binary resolver for the configured product and directory.
    pub fn resolver(&self) -> BinaryResolver {
        BinaryResolver::new(self.subprocess.product.clone(), self.subprocess.bin_dir.clone())
    }
}

/// Documentation subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubprocessSettings {
    /// Host the subprocess listens on.
    pub host: String,
    /// Port the subprocess listens on.
    pub port: u16,
    /// Directory containing the platform binaries.
    pub bin_dir: PathBuf,
    /// Product prefix of the binary names.
    pub product: String,
    /// Grace period after spawn before the subprocess is presumed reachable.
    #[serde(with = "duration_serde")]
    pub ready_delay: Duration,
}

impl Default for SubprocessSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6174,
            bin_dir: PathBuf::from("bin"),
            product: "atomicdocs".to_string(),
            ready_delay: Duration::from_millis(500),
        }
    }
}

/// Route registration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationSettings {
    /// Registration endpoint on the subprocess.
    pub path: String,
    /// Delay between middleware installation and automatic registration.
    #[serde(with = "duration_serde")]
    pub auto_delay: Duration,
    /// Interval between readiness checks for manual registration.
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
    /// Readiness checks before manual registration is abandoned.
    pub max_attempts: u32,
    /// Deadline for one registration request.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            path: "/api/register".to_string(),
            auto_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(100),
            max_attempts: 300,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Documentation proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Mount prefix reserved for documentation.
    pub mount: String,
    /// Deadline for the subprocess to answer.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Header carrying the host's listening port.
    pub port_header: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            mount: crate::mount::DEFAULT_MOUNT.to_string(),
            timeout: Duration::from_secs(5),
            port_header: "X-App-Port".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `atomicdocs=debug`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Set the subprocess host.
    #[must_use]
    pub fn subprocess_host(mut self, host: impl Into<String>) -> Self {
        self.config.subprocess.host = host.into();
        self
    }

    /// Set the subprocess port.
    #[must_use]
    pub fn subprocess_port(mut self, port: u16) -> Self {
        self.config.subprocess.port = port;
        self
    }

    /// Set the binary directory.
    #[must_use]
    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.subprocess.bin_dir = dir.into();
        self
    }

    /// Set the readiness grace period.
    #[must_use]
    pub fn ready_delay(mut self, delay: Duration) -> Self {
        self.config.subprocess.ready_delay = delay;
        self
    }

    /// Set the automatic registration delay.
    #[must_use]
    pub fn auto_register_delay(mut self, delay: Duration) -> Self {
        self.config.registration.auto_delay = delay;
        self
    }

    /// Set the readiness poll interval for manual registration.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.registration.poll_interval = interval;
        self
    }

    /// Set the readiness check limit for manual registration.
    #[must_use]
    pub fn max_register_attempts(mut self, attempts: u32) -> Self {
        self.config.registration.max_attempts = attempts;
        self
    }

    /// Set the deadline for one registration request.
    #[must_use]
    pub fn register_timeout(mut self, timeout: Duration) -> Self {
        self.config.registration.timeout = timeout;
        self
    }

    /// Set the proxy deadline.
    #[must_use]
    pub fn proxy_timeout(mut self, timeout: Duration) -> Self {
        self.config.proxy.timeout = timeout;
        self
    }

    /// Set the documentation mount prefix.
    #[must_use]
    pub fn mount(mut self, mount: impl Into<String>) -> Self {
        self.config.proxy.mount = mount.into();
        self
    }

    /// Set the log filter.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CoreResult<GatewayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Durations written as `250ms`, `5s`, `2m` or `1h`; bare numbers are seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |digits: &str| -> Result<u64, String> {
            digits
                .trim()
                .parse()
                .map_err(|_| format!("invalid duration: {s}"))
        };

        if let Some(stripped) = s.strip_suffix("ms") {
            Ok(Duration::from_millis(number(stripped)?))
        } else if let Some(stripped) = s.strip_suffix('s') {
            Ok(Duration::from_secs(number(stripped)?))
        } else if let Some(stripped) = s.strip_suffix('m') {
            Ok(Duration::from_secs(number(stripped)? * 60))
        } else if let Some(stripped) = s.strip_suffix('h') {
            Ok(Duration::from_secs(number(stripped)? * 3600))
        } else {
            Ok(Duration::from_secs(number(s)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.subprocess.port, 6174);
        assert_eq!(config.subprocess.ready_delay, Duration::from_millis(500));
        assert_eq!(config.registration.auto_delay, Duration::from_millis(1000));
        assert_eq!(config.registration.poll_interval, Duration::from_millis(100));
        assert_eq!(config.registration.timeout, Duration::from_secs(5));
        assert_eq!(config.registration_url(), "http://localhost:6174/api/register");
        assert_eq!(config.proxy.port_header, "X-App-Port");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::builder()
            .subprocess_host("127.0.0.1")
            .subprocess_port(7000)
            .proxy_timeout(Duration::from_millis(250))
            .max_register_attempts(5)
            .build()
            .unwrap();

        assert_eq!(config.subprocess_url(), "http://127.0.0.1:7000");
        assert_eq!(config.proxy.timeout, Duration::from_millis(250));
        assert_eq!(config.registration.max_attempts, 5);
    }

    #[test]
    fn test_validation() {
        assert!(GatewayConfig::builder().subprocess_port(0).build().is_err());
        assert!(GatewayConfig::builder().max_register_attempts(0).build().is_err());
        assert!(GatewayConfig::builder().mount("/").build().is_err());
        assert!(GatewayConfig::builder().mount("docs").build().is_err());
        assert!(GatewayConfig::builder()
            .poll_interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(GatewayConfig::builder()
            .register_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("ATOMICDOCS_PORT", "7100"),
            ("ATOMICDOCS_READY_DELAY_MS", "50"),
            ("ATOMICDOCS_PROXY_TIMEOUT_MS", "not-a-number"),
            ("ATOMICDOCS_REGISTER_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let config =
            GatewayConfig::default().with_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.subprocess.port, 7100);
        assert_eq!(config.subprocess.ready_delay, Duration::from_millis(50));
        assert_eq!(config.proxy.timeout, Duration::from_secs(5));
        assert_eq!(config.registration.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_toml_config() {
        let toml = r#"
[subprocess]
port = 6200
ready_delay = "750ms"

[registration]
auto_delay = "2s"
max_attempts = 10

[proxy]
mount = "/reference"
"#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.subprocess.port, 6200);
        assert_eq!(config.subprocess.host, "localhost");
        assert_eq!(config.subprocess.ready_delay, Duration::from_millis(750));
        assert_eq!(config.registration.auto_delay, Duration::from_secs(2));
        assert_eq!(config.mount().json_path(), "/reference/json");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"subprocess": {{"port": 6300}}}}"#).unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.subprocess.port, 6300);

        let other = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(GatewayConfig::from_file(other.path()).is_err());
    }

    #[test]
    fn test_parse_duration() {
        use duration_serde::parse_duration;
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("soon").is_err());
    }
}
