//! Configuration types for the coordinator

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use vultr_latency_common::catalog::CatalogError;
use vultr_latency_common::defaults;

/// Configuration errors. These are the only fatal errors of a session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("VULTR_API_KEY is not set (export VULTR_API_KEY='your-api-key' or add it to .env)")]
    MissingApiKey,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to read SSH public key from {path}: {source}")]
    PublicKeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SSH public key: {0}")]
    InvalidPublicKey(String),

    #[error("Probe binary not found: {0}")]
    ProbeBinaryMissing(PathBuf),
}

/// Cloud provider access and instance shape
#[derive(Debug, Clone)]
pub struct VultrConfig {
    /// API bearer token
    pub api_key: String,
    /// API base URL
    pub api_base_url: String,
    /// Plan id for every instance
    pub plan: String,
    /// Operating system id for every instance
    pub os_id: u32,
    /// API-registered SSH key ids attached at creation
    pub sshkey_ids: Vec<String>,
}

/// Remote shell access to provisioned hosts
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Remote shell program
    pub ssh_program: String,
    /// Remote copy program
    pub scp_program: String,
    /// Private key passed to ssh/scp with `-i`
    pub key_path: Option<PathBuf>,
    /// Public key injected through user-data
    pub public_key: Option<String>,
    /// `ConnectTimeout` in seconds
    pub connect_timeout_secs: u64,
    /// Attempts for the shell-ready check
    pub shell_retries: u32,
    /// Delay between shell-ready attempts
    pub shell_retry_delay: Duration,
    /// Hard timeout for a probe run
    pub probe_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            key_path: None,
            public_key: None,
            connect_timeout_secs: defaults::DEFAULT_SSH_CONNECT_TIMEOUT_SECS,
            shell_retries: defaults::DEFAULT_SHELL_RETRIES,
            shell_retry_delay: Duration::from_secs(defaults::DEFAULT_SHELL_RETRY_DELAY_SECS),
            probe_timeout: Duration::from_secs(defaults::DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

impl SshConfig {
    /// Options shared by every ssh and scp invocation
    pub fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if let Some(key) = &self.key_path {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    /// Process timeout for the trivial `echo ok` check
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs + 10)
    }
}

/// What to measure and for how long
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Catalog region codes to deploy, in catalog order
    pub regions: Vec<String>,
    /// Pre-selected duration answer, skips the prompt
    pub duration: Option<String>,
    /// Wall-clock cap on waiting for instances
    pub ready_timeout: Duration,
    /// Interval between readiness polls
    pub poll_interval: Duration,
    /// Interval between measurement passes in timed mode
    pub pass_interval: Duration,
    /// How long the teardown prompt waits before destroying
    pub teardown_prompt: Duration,
    /// Rows in the lowest-latency ranking
    pub top_n: usize,
    /// Directory for the CSV export
    pub output_dir: PathBuf,
    /// Local probe binary uploaded to every host (searched for when unset)
    pub probe_binary: Option<PathBuf>,
}

/// Runtime behavior flags
#[derive(Debug, Clone, Default)]
pub struct RuntimeFlags {
    /// Never destroy instances at the end of the session
    pub keep: bool,
    /// Print the plan and exit without network calls
    pub dry_run: bool,
}

/// Configuration for a measurement session
///
/// Composed of focused sub-configs for organization.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub vultr: VultrConfig,
    pub ssh: SshConfig,
    pub session: SessionConfig,
    pub flags: RuntimeFlags,
}

impl RunConfig {
    pub fn regions(&self) -> &[String] {
        &self.session.regions
    }
    pub fn keep(&self) -> bool {
        self.flags.keep
    }
    pub fn dry_run(&self) -> bool {
        self.flags.dry_run
    }
}

/// Require a non-blank API key
pub fn require_api_key(value: Option<&str>) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ConfigError::MissingApiKey),
    }
}

/// Merge `VULTR_SSH_KEY_IDS` (comma separated) and `VULTR_SSH_KEY_ID`.
///
/// The list takes precedence over the single id.
pub fn parse_ssh_key_ids(list: Option<&str>, single: Option<&str>) -> Vec<String> {
    let ids: Vec<String> = list
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if !ids.is_empty() {
        return ids;
    }
    match single.map(str::trim) {
        Some(id) if !id.is_empty() => vec![id.to_string()],
        _ => Vec::new(),
    }
}

/// Resolve the public key to inject, from inline content or a file.
///
/// Inline content wins. A path that does not exist is ignored; a path that
/// exists but cannot be read is an error.
pub fn resolve_public_key(
    inline: Option<&str>,
    path: Option<&Path>,
) -> Result<Option<String>, ConfigError> {
    let content = match inline.map(str::trim).filter(|s| !s.is_empty()) {
        Some(key) => key.to_string(),
        None => match path {
            Some(path) if path.exists() => std::fs::read_to_string(path)
                .map_err(|source| ConfigError::PublicKeyRead {
                    path: path.to_path_buf(),
                    source,
                })?
                .trim()
                .to_string(),
            _ => return Ok(None),
        },
    };

    if content.is_empty() {
        return Ok(None);
    }
    validate_public_key(&content)?;
    Ok(Some(content))
}

/// Reject key material that would break the single-quoted user-data line
pub fn validate_public_key(key: &str) -> Result<(), ConfigError> {
    const FORBIDDEN: &[char] = &['\'', '\n', '\r'];
    if let Some(bad) = key.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(ConfigError::InvalidPublicKey(format!(
            "contains forbidden character {bad:?}"
        )));
    }
    if !key.starts_with("ssh-") && !key.starts_with("ecdsa-") && !key.starts_with("sk-") {
        return Err(ConfigError::InvalidPublicKey(
            "expected an OpenSSH public key (ssh-ed25519, ssh-rsa, ecdsa-...)".to_string(),
        ));
    }
    Ok(())
}

/// Locate the probe binary to upload.
///
/// An explicit path must exist. Otherwise common build output locations are
/// searched, preferring the statically linked musl build.
pub fn find_probe_binary(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ConfigError::ProbeBinaryMissing(path.to_path_buf()))
        };
    }

    const NAME: &str = "vultr-latency-probe";
    let candidates = [
        format!("target/x86_64-unknown-linux-musl/release/{NAME}"),
        format!("../target/x86_64-unknown-linux-musl/release/{NAME}"),
        format!("target/x86_64-unknown-linux-gnu/release/{NAME}"),
        format!("../target/x86_64-unknown-linux-gnu/release/{NAME}"),
        format!("target/release/{NAME}"),
        format!("../target/release/{NAME}"),
    ];

    candidates
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()))
        .ok_or_else(|| ConfigError::ProbeBinaryMissing(PathBuf::from(NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFakeKeyMaterial user@host";

    #[test]
    fn test_require_api_key() {
        assert!(matches!(require_api_key(None), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            require_api_key(Some("   ")),
            Err(ConfigError::MissingApiKey)
        ));
        assert_eq!(require_api_key(Some(" abc ")).unwrap(), "abc");
    }

    #[test]
    fn test_ssh_key_ids_precedence() {
        assert_eq!(parse_ssh_key_ids(Some("a, b,,c "), Some("z")), vec!["a", "b", "c"]);
        assert_eq!(parse_ssh_key_ids(Some(" , "), Some("z")), vec!["z"]);
        assert_eq!(parse_ssh_key_ids(None, Some("z")), vec!["z"]);
        assert!(parse_ssh_key_ids(None, Some("")).is_empty());
        assert!(parse_ssh_key_ids(None, None).is_empty());
    }

    #[test]
    fn test_public_key_inline_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-rsa AAAAB3Nza other@host").unwrap();

        let key = resolve_public_key(Some(KEY), Some(file.path())).unwrap();
        assert_eq!(key.as_deref(), Some(KEY));
    }

    #[test]
    fn test_public_key_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{KEY}").unwrap();

        let key = resolve_public_key(None, Some(file.path())).unwrap();
        assert_eq!(key.as_deref(), Some(KEY));
    }

    #[test]
    fn test_public_key_missing_file_ignored() {
        let key = resolve_public_key(None, Some(Path::new("/nonexistent/id.pub"))).unwrap();
        assert!(key.is_none());
        assert!(resolve_public_key(None, None).unwrap().is_none());
    }

    #[test]
    fn test_public_key_rejects_quote() {
        let err = resolve_public_key(Some("ssh-ed25519 AAAA'; rm -rf /"), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPublicKey(_)));
    }

    #[test]
    fn test_public_key_rejects_non_key() {
        assert!(validate_public_key("hello world").is_err());
        assert!(validate_public_key(KEY).is_ok());
    }

    #[test]
    fn test_ssh_args() {
        let mut ssh = SshConfig::default();
        let args = ssh.common_args();
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=15".to_string()));
        assert!(!args.contains(&"-i".to_string()));

        ssh.key_path = Some(PathBuf::from("/home/me/.ssh/id_ed25519"));
        ssh.connect_timeout_secs = 5;
        let args = ssh.common_args();
        assert_eq!(&args[args.len() - 2..], ["-i", "/home/me/.ssh/id_ed25519"]);
        assert_eq!(ssh.check_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_find_probe_binary_explicit() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(find_probe_binary(Some(file.path())).unwrap(), file.path());

        let err = find_probe_binary(Some(Path::new("/nonexistent/probe"))).unwrap_err();
        assert!(matches!(err, ConfigError::ProbeBinaryMissing(_)));
    }
}
