//! Checks the project's release feed for a newer version.

use std::cmp::Ordering;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::error::{DailyworkError, Result};

/// How often the terminal UI re-checks while it is open.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Version of this build.
pub fn current_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Release metadata as served by the GitHub releases API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStatus {
    pub has_update: bool,
    pub latest_version: Option<String>,
    pub release_url: Option<String>,
}

/// Compares dotted version strings component by component.
///
/// A leading `v` is ignored, and missing or non-numeric components count as 0,
/// so `v1.2` equals `1.2.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn parts(v: &str) -> Vec<u64> {
        let v = v.trim();
        let v = v.strip_prefix(['v', 'V']).unwrap_or(v);
        v.split('.').map(|p| p.trim().parse().unwrap_or(0)).collect()
    }
    let (a, b) = (parts(a), parts(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    url: String,
    current_version: String,
    client: Client,
}

impl UpdateChecker {
    pub fn new(url: impl Into<String>, current_version: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DailyworkError::UpdateCheck(format!("Failed to create HTTP client: {}", e)))?;
        Ok(UpdateChecker {
            url: url.into(),
            current_version: current_version.into(),
            client,
        })
    }

    /// Fetches the latest release. Drafts and prereleases count as none.
    pub fn fetch_latest(&self) -> Result<Option<Release>> {
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, format!("dailywork/{}", self.current_version))
            .header(ACCEPT, "application/vnd.github+json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DailyworkError::UpdateCheck(format!(
                "release feed returned {}",
                status.as_u16()
            )));
        }

        let release: Release = response.json()?;
        if release.draft || release.prerelease {
            debug!("Ignoring unpublished release {}", release.tag_name);
            return Ok(None);
        }
        Ok(Some(release))
    }

    pub fn check(&self) -> Result<UpdateStatus> {
        let Some(release) = self.fetch_latest()? else {
            return Ok(UpdateStatus::default());
        };
        let has_update = compare_versions(&release.tag_name, &self.current_version) == Ordering::Greater;
        debug!(
            "Latest release {} (current {}), update: {}",
            release.tag_name, self.current_version, has_update
        );
        Ok(UpdateStatus {
            has_update,
            latest_version: Some(release.tag_name.trim_start_matches(['v', 'V']).to_string()),
            release_url: Some(release.html_url),
        })
    }

    /// Like [`check`](Self::check), but any failure reads as "no update".
    pub fn check_quietly(&self) -> UpdateStatus {
        self.check().unwrap_or_else(|e| {
            debug!("Update check failed: {}", e);
            UpdateStatus::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_component_wise() {
        assert_eq!(compare_versions("v1.2.10", "1.2.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "v1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("0.9.9", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.x.3", "1.0.3"), Ordering::Equal);
    }

    fn release_body(tag: &str, prerelease: bool, draft: bool) -> String {
        format!(
            r#"{{"tag_name":"{tag}","name":"Release {tag}","published_at":"2024-03-05T00:00:00Z","html_url":"https://example.com/{tag}","prerelease":{prerelease},"draft":{draft}}}"#
        )
    }

    #[test]
    fn newer_release_is_reported() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", "dailywork/0.3.2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release_body("v0.4.0", false, false))
            .create();

        let checker = UpdateChecker::new(server.url(), "0.3.2").unwrap();
        let status = checker.check().unwrap();
        assert!(status.has_update);
        assert_eq!(status.latest_version.as_deref(), Some("0.4.0"));
        assert_eq!(status.release_url.as_deref(), Some("https://example.com/v0.4.0"));
        mock.assert();
    }

    #[test]
    fn same_version_is_not_an_update() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(release_body("v0.3.2", false, false))
            .create();

        let checker = UpdateChecker::new(server.url(), "0.3.2").unwrap();
        assert!(!checker.check().unwrap().has_update);
    }

    #[test]
    fn prereleases_and_drafts_are_ignored() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(release_body("v9.0.0", true, false))
            .create();
        let checker = UpdateChecker::new(server.url(), "0.3.2").unwrap();
        assert_eq!(checker.check().unwrap(), UpdateStatus::default());

        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(release_body("v9.0.0", false, true))
            .create();
        let checker = UpdateChecker::new(server.url(), "0.3.2").unwrap();
        assert!(!checker.check().unwrap().has_update);
    }

    #[test]
    fn failures_are_quiet() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/").with_status(500).create();
        let checker = UpdateChecker::new(server.url(), "0.3.2").unwrap();
        assert!(checker.check().is_err());
        assert_eq!(checker.check_quietly(), UpdateStatus::default());
    }
}
