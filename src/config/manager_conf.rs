//! Password lookup in Asterisk's `manager.conf`.
//!
//! Only the subset needed to find a user's `secret` is understood: `[section]`
//! headers (optionally followed by a template marker such as `(!)`), `key = value`
//! or `key => value` lines, and `;` comments.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Read `path` and return the `secret` configured for `username`.
pub fn read_manager_secret(path: &Path, username: &str) -> Result<String> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    secret_for_user(&contents, username)
        .ok_or_else(|| anyhow!("no secret for user [{username}] in {}", path.display()))
}

/// Find the `secret` of section `[username]`. The `general` section is never a user.
pub fn secret_for_user(contents: &str, username: &str) -> Option<String> {
    if username.eq_ignore_ascii_case("general") {
        return None;
    }
    let mut in_section = false;
    let mut secret = None;
    for raw in contents.lines() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = section_name(line) {
            in_section = name == username;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = split_assignment(line) {
            if key.eq_ignore_ascii_case("secret") {
                secret = Some(value.to_string());
            }
        }
    }
    secret.filter(|s| !s.is_empty())
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn section_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(rest[..end].trim())
}

fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let value = value.strip_prefix('>').unwrap_or(value);
    Some((key.trim(), value.trim()))
}
