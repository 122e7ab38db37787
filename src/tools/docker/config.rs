use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use super::DockerExecutionError;

/// When the engine pulls the image before running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

/// Credentials for a private registry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryAuth {
    /// Registry host, e.g. `registry.example.com`.
    pub server_address: String,
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DockerTlsConfig {
    #[serde(default = "default_true")]
    pub verify: bool,
    /// Directory holding `ca.pem`, `cert.pem` and `key.pem`.
    pub cert_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Limits and isolation settings of the sandbox container.
///
/// The defaults are locked down: no network, all capabilities dropped,
/// read-only root filesystem, an unprivileged user, 256m of memory and a 30s
/// wall-clock timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DockerExecutionConfig {
    /// Wall-clock limit in seconds.
    #[serde(deserialize_with = "seconds")]
    pub timeout: Duration,
    /// Docker memory size such as `256m` or `1g`.
    pub memory_limit: Option<String>,
    pub memory_swap_limit: Option<String>,
    pub network_disabled: bool,
    pub cap_drop: Vec<String>,
    pub user: Option<String>,
    pub read_only_rootfs: bool,
    /// Directory the code is written to, mounted as a world-writable tmpfs of
    /// `tmpfs_size`.
    pub working_dir: String,
    pub tmpfs_size: String,
    pub environment_variables: BTreeMap<String, String>,
    pub cpu_shares: Option<u64>,
    /// Microseconds per 100ms period.
    pub cpu_quota: Option<u64>,
    pub pids_limit: Option<u64>,
    /// Cap on captured stdout and stderr, each.
    pub max_output_bytes: usize,
    pub registry_auth: Option<RegistryAuth>,
    pub docker_host: Option<String>,
    pub tls: Option<DockerTlsConfig>,
    pub pull_policy: PullPolicy,
    /// Docker CLI binary.
    pub docker_binary: String,
}

impl Default for DockerExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            memory_limit: Some("256m".to_string()),
            memory_swap_limit: None,
            network_disabled: true,
            cap_drop: vec!["ALL".to_string()],
            user: Some("65534:65534".to_string()),
            read_only_rootfs: true,
            working_dir: "/sandbox".to_string(),
            tmpfs_size: "64m".to_string(),
            environment_variables: BTreeMap::new(),
            cpu_shares: None,
            cpu_quota: None,
            pids_limit: Some(64),
            max_output_bytes: 1024 * 1024,
            registry_auth: None,
            docker_host: None,
            tls: None,
            pull_policy: PullPolicy::IfNotPresent,
            docker_binary: "docker".to_string(),
        }
    }
}

/// Parses a Docker memory size (`512`, `64k`, `256m`, `1g`, optional `b`
/// suffix) into bytes.
pub fn parse_memory_size(value: &str) -> Option<u64> {
    let value = value.trim().to_ascii_lowercase();
    let value = value.strip_suffix('b').unwrap_or(&value);
    let (digits, multiplier) = match value.chars().last()? {
        'k' => (&value[..value.len() - 1], 1024),
        'm' => (&value[..value.len() - 1], 1024 * 1024),
        'g' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        c if c.is_ascii_digit() => (value, 1),
        _ => return None,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()?.checked_mul(multiplier)
}

/// Docker refuses containers with less memory than this.
const MIN_MEMORY_BYTES: u64 = 6 * 1024 * 1024;

impl DockerExecutionConfig {
    /// Defaults plus the daemon settings of the Docker CLI environment:
    /// `DOCKER_HOST`, `DOCKER_TLS_VERIFY` and `DOCKER_CERT_PATH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.docker_host = std::env::var("DOCKER_HOST").ok().filter(|h| !h.is_empty());
        let verify = std::env::var("DOCKER_TLS_VERIFY")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);
        let cert_path = std::env::var("DOCKER_CERT_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if verify || cert_path.is_some() {
            config.tls = Some(DockerTlsConfig { verify, cert_path });
        }
        config
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self, DockerExecutionError> {
        toml::from_str(content).map_err(|e| {
            DockerExecutionError::invalid_configuration(format!("invalid TOML config: {}", e))
        })
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DockerExecutionError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DockerExecutionError::invalid_configuration(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory_limit<S: Into<String>>(mut self, memory_limit: S) -> Self {
        self.memory_limit = Some(memory_limit.into());
        self
    }

    pub fn with_network_disabled(mut self, network_disabled: bool) -> Self {
        self.network_disabled = network_disabled;
        self
    }

    pub fn with_environment_variable<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_pull_policy(mut self, pull_policy: PullPolicy) -> Self {
        self.pull_policy = pull_policy;
        self
    }

    pub fn with_registry_auth(mut self, registry_auth: RegistryAuth) -> Self {
        self.registry_auth = Some(registry_auth);
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn validate(&self) -> Result<(), DockerExecutionError> {
        let invalid = |message: String| Err(DockerExecutionError::invalid_configuration(message));

        if self.timeout.is_zero() {
            return invalid("timeout must be positive".to_string());
        }
        if self.max_output_bytes == 0 {
            return invalid("max_output_bytes must be positive".to_string());
        }
        let memory = match &self.memory_limit {
            Some(limit) => match parse_memory_size(limit) {
                Some(bytes) if bytes < MIN_MEMORY_BYTES => {
                    return invalid(format!("memory_limit {} is below 6m", limit))
                }
                Some(bytes) => Some(bytes),
                None => return invalid(format!("malformed memory_limit {:?}", limit)),
            },
            None => None,
        };
        if let Some(swap) = &self.memory_swap_limit {
            // -1 means unlimited swap
            if swap != "-1" {
                let Some(swap_bytes) = parse_memory_size(swap) else {
                    return invalid(format!("malformed memory_swap_limit {:?}", swap));
                };
                match memory {
                    Some(memory) if swap_bytes < memory => {
                        return invalid(
                            "memory_swap_limit must not be below memory_limit".to_string(),
                        )
                    }
                    None => {
                        return invalid("memory_swap_limit needs memory_limit".to_string())
                    }
                    _ => {}
                }
            }
        }
        if parse_memory_size(&self.tmpfs_size).is_none() {
            return invalid(format!("malformed tmpfs_size {:?}", self.tmpfs_size));
        }
        if !self.working_dir.starts_with('/') {
            return invalid(format!("working_dir {:?} must be absolute", self.working_dir));
        }
        if self.cpu_quota.is_some_and(|quota| quota < 1000) {
            return invalid("cpu_quota must be at least 1000".to_string());
        }
        if self.pids_limit == Some(0) {
            return invalid("pids_limit must be positive".to_string());
        }
        if let Some(user) = &self.user {
            if user.is_empty() || user.chars().any(char::is_whitespace) {
                return invalid(format!("invalid user {:?}", user));
            }
        }
        for key in self.environment_variables.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return invalid(format!("invalid environment variable name {:?}", key));
            }
        }
        if let Some(auth) = &self.registry_auth {
            if auth.server_address.is_empty() || auth.username.is_empty() {
                return invalid("registry_auth needs a server address and username".to_string());
            }
        }
        if self.docker_binary.is_empty() {
            return invalid("docker_binary must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_size() {
        assert_eq!(parse_memory_size("512"), Some(512));
        assert_eq!(parse_memory_size("64k"), Some(64 * 1024));
        assert_eq!(parse_memory_size("256m"), Some(256 * 1024 * 1024));
        assert_eq!(parse_memory_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_size("32mb"), Some(32 * 1024 * 1024));
        assert_eq!(parse_memory_size("m"), None);
        assert_eq!(parse_memory_size("12x"), None);
        assert_eq!(parse_memory_size("-5m"), None);
    }

    #[test]
    fn test_defaults_are_locked_down() {
        let config = DockerExecutionConfig::default();
        assert!(config.network_disabled);
        assert!(config.read_only_rootfs);
        assert_eq!(config.cap_drop, vec!["ALL"]);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = vec![
            DockerExecutionConfig::default().with_timeout(Duration::ZERO),
            DockerExecutionConfig::default().with_memory_limit("lots"),
            DockerExecutionConfig::default().with_memory_limit("1m"),
            DockerExecutionConfig::default().with_max_output_bytes(0),
            DockerExecutionConfig::default().with_environment_variable("A=B", "c"),
            DockerExecutionConfig {
                memory_swap_limit: Some("128m".to_string()),
                ..Default::default()
            },
            DockerExecutionConfig {
                working_dir: "relative".to_string(),
                ..Default::default()
            },
            DockerExecutionConfig {
                cpu_quota: Some(10),
                ..Default::default()
            },
        ];
        for config in cases {
            let error = config.validate().unwrap_err();
            assert_eq!(
                error.kind(),
                super::super::DockerErrorKind::InvalidConfiguration
            );
        }

        let unlimited_swap = DockerExecutionConfig {
            memory_swap_limit: Some("-1".to_string()),
            ..Default::default()
        };
        assert!(unlimited_swap.validate().is_ok());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_toml_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
timeout = 5
memory_limit = "128m"
pull_policy = "never"

[environment_variables]
LANG = "C.UTF-8"

[registry_auth]
server_address = "registry.example.com"
username = "ci"
password = "secret"
"#
        )
        .unwrap();

        let config = DockerExecutionConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.memory_limit.as_deref(), Some("128m"));
        assert_eq!(config.pull_policy, PullPolicy::Never);
        assert_eq!(config.environment_variables["LANG"], "C.UTF-8");
        assert!(config.network_disabled);
        assert!(config.validate().is_ok());

        assert!(DockerExecutionConfig::from_toml_str("timeout = \"soon\"").is_err());
    }
}
