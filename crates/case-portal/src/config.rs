use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Portal-provider configuration.
///
/// Most FOIA portals (NextRequest, GovQA, JustFOIA, agency-bespoke forms)
/// expose no public submission API, so the default behavior is to hand
/// every submission to a human via a [`case_core::PortalTask`]. Only portals
/// whose host appears in `automation_hosts` are attempted automatically.
#[derive(Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Hostnames (e.g. `"foia.chicago.gov"`) this deployment has a working
    /// automated submission integration for.
    #[serde(default)]
    pub automation_hosts: HashSet<String>,

    /// Timeout for the automated submission HTTP request.
    #[serde(default = "default_request_timeout", with = "humantime_seconds")]
    pub request_timeout: Duration,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("automation_hosts", &self.automation_hosts)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self { automation_hosts: HashSet::new(), request_timeout: default_request_timeout() }
    }
}

impl PortalConfig {
    /// Returns `true` if `portal_url`'s host has a working automated
    /// submission integration.
    #[must_use]
    pub fn is_automated(&self, portal_url: &str) -> bool {
        reqwest::Url::parse(portal_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .is_some_and(|host| self.automation_hosts.contains(&host))
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

mod humantime_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_automation_hosts() {
        let config = PortalConfig::default();
        assert!(config.automation_hosts.is_empty());
        assert!(!config.is_automated("https://foia.chicago.gov/submit"));
    }

    #[test]
    fn is_automated_matches_registered_host() {
        let mut config = PortalConfig::default();
        config.automation_hosts.insert("foia.chicago.gov".to_owned());
        assert!(config.is_automated("https://foia.chicago.gov/submit?case=1"));
        assert!(!config.is_automated("https://records.nyc.gov/submit"));
    }

    #[test]
    fn is_automated_rejects_unparseable_url() {
        let config = PortalConfig::default();
        assert!(!config.is_automated("not a url"));
    }
}
