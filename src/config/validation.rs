use super::defaults::{LOCAL_HOSTS, MAX_FIELD_BYTES};
use super::manager_conf::read_manager_secret;
use super::{AppConfig, MAX_ACTION_TIMEOUT_MS, MIN_ACTION_TIMEOUT_MS};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize optional fields.
    pub fn validate(&mut self) -> Result<()> {
        self.host = self.host.trim().to_string();
        if self.host.is_empty() {
            bail!("--host must not be empty");
        }
        if self.host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            bail!("--host contains whitespace or control characters");
        }
        if self.port == 0 {
            bail!("--port must be between 1 and 65535");
        }
        if !(MIN_ACTION_TIMEOUT_MS..=MAX_ACTION_TIMEOUT_MS).contains(&self.action_timeout_ms) {
            bail!(
                "--action-timeout-ms must be between {MIN_ACTION_TIMEOUT_MS} and {MAX_ACTION_TIMEOUT_MS}, got {}",
                self.action_timeout_ms
            );
        }

        self.username = normalize_optional(self.username.take());
        let Some(username) = self.username.as_deref() else {
            bail!("No username provided (use -u flag)");
        };
        check_header_value("--username", username)?;
        if let Some(password) = self.password.as_deref() {
            check_header_value("--password", password)?;
        }

        self.channel = normalize_optional(self.channel.take());
        if let Some(channel) = self.channel.as_deref() {
            check_header_value("--channel", channel)?;
            if channel.contains(char::is_whitespace) {
                bail!("--channel must not contain whitespace");
            }
        }
        Ok(())
    }

    /// Fill in the password from the manager config when connecting locally
    /// without one. Remote connections without a password log in with an
    /// empty secret and let the server decide.
    pub fn resolve_password(&mut self) -> Result<()> {
        if self.password.as_deref().is_some_and(|p| !p.is_empty()) {
            return Ok(());
        }
        let Some(username) = self.username.clone() else {
            bail!("No username provided (use -u flag)");
        };
        if !self.is_local_host() {
            self.password = Some(String::new());
            return Ok(());
        }
        let secret = read_manager_secret(&self.manager_conf, &username).with_context(|| {
            format!(
                "No password specified, and failed to autodetect from {}",
                self.manager_conf.display()
            )
        })?;
        check_header_value("manager.conf secret", &secret)?;
        crate::log_debug(&format!(
            "AMI password for {username} loaded from {}",
            self.manager_conf.display()
        ));
        self.password = Some(secret);
        Ok(())
    }

    pub fn is_local_host(&self) -> bool {
        LOCAL_HOSTS
            .iter()
            .any(|local| self.host.eq_ignore_ascii_case(local))
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// AMI is a line protocol; a CR or LF inside a header value would inject headers.
pub(super) fn check_header_value(flag: &str, value: &str) -> Result<()> {
    if value.len() > MAX_FIELD_BYTES {
        bail!("{flag} is longer than {MAX_FIELD_BYTES} bytes");
    }
    if value.chars().any(|c| c.is_control()) {
        bail!("{flag} contains control characters");
    }
    Ok(())
}
