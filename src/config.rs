//! Configuration types for insights-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection profile loaded from the credential config file
///
/// The file is JSON with camelCase keys, e.g.:
///
/// ```json
/// {
///   "domain": "https://assistant.example.com",
///   "tenancyId": "ocid1.tenancy.oc1..aaaa",
///   "userId": "ocid1.user.oc1..bbbb",
///   "fingerprint": "12:34:56:78:9a:bc",
///   "privateKeyPath": "/home/me/.keys/api_key.pem"
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Service endpoint, with or without the `https://` scheme
    pub domain: String,

    /// Tenancy OCID the signing key belongs to
    pub tenancy_id: String,

    /// User OCID the signing key belongs to
    pub user_id: String,

    /// Fingerprint of the public key on file with the service
    pub fingerprint: String,

    /// Path to the RSA private key in PEM form (PKCS#8 or PKCS#1)
    pub private_key_path: PathBuf,
}

impl Profile {
    /// Load and validate a profile from a JSON config file
    ///
    /// Fails with a [`Error::Config`] naming the offending key if the file is
    /// unreadable, not valid JSON, or any required field is empty.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {e}", path.display()))
        })?;

        let profile: Profile = serde_json::from_str(&contents).map_err(|e| {
            Error::config(format!("invalid config file {}: {e}", path.display()))
        })?;

        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("domain", self.domain.as_str()),
            ("tenancyId", self.tenancy_id.as_str()),
            ("userId", self.user_id.as_str()),
            ("fingerprint", self.fingerprint.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config_key(
                    format!("required field '{key}' is missing or empty"),
                    key,
                ));
            }
        }
        if self.private_key_path.as_os_str().is_empty() {
            return Err(Error::config_key(
                "required field 'privateKeyPath' is missing or empty",
                "privateKeyPath",
            ));
        }
        Ok(())
    }

    /// The endpoint as a full base URL, defaulting the scheme to `https://`
    pub fn base_url(&self) -> String {
        if self.domain.starts_with("http://") || self.domain.starts_with("https://") {
            self.domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.domain.trim_end_matches('/'))
        }
    }
}

/// Backoff schedule for the status-polling loop
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of status checks before giving up (default: 20)
    pub max_attempts: u32,

    /// Delay before the second attempt (default: 200ms)
    pub initial_delay: Duration,

    /// Ceiling on any single delay (default: 60s)
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each attempt (default: 3.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 3.0,
        }
    }
}
