//! Environment-derived configuration.
//!
//! | Variable              | Meaning                                            |
//! |-----------------------|----------------------------------------------------|
//! | `ZOTERO_API_KEY`      | Zotero API key (required)                          |
//! | `ZOTERO_TARGET_GROUP` | Group URL (`.../groups/12345/name`) or numeric ID  |
//! | `ZOTERO_USER_ID`      | User library ID, used when no group is set         |
//! | `CROSSREF_MAILTO`     | Contact for the Crossref polite pool (optional)    |
//!
//! Only the binary reads these. The graph builder receives ready gateways.

use crate::crossref::DEFAULT_MAILTO;
use crate::error::{CitegraphError, Result};
use regex::Regex;
use std::sync::LazyLock;

static GROUP_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/groups/(\d+)").expect("valid group URL pattern"));

/// Which Zotero library to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryRef {
    Group(String),
    User(String),
}

impl LibraryRef {
    /// Accept a bare numeric group ID or any URL containing `/groups/<id>`.
    pub fn parse_group(input: &str) -> Result<Self> {
        let input = input.trim();
        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self::Group(input.to_string()));
        }

        GROUP_URL_REGEX
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|id| Self::Group(id.as_str().to_string()))
            .ok_or_else(|| {
                CitegraphError::Config(format!("Could not extract Group ID from URL: {}", input))
            })
    }
}

/// Credentials and target library for the Zotero gateway.
#[derive(Debug, Clone)]
pub struct ZoteroConfig {
    pub api_key: String,
    pub library: LibraryRef,
}

/// Everything the binary needs to construct gateways.
#[derive(Debug, Clone)]
pub struct Settings {
    pub zotero: ZoteroConfig,
    pub crossref_mailto: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("ZOTERO_API_KEY").ok_or_else(|| {
            CitegraphError::Config("ZOTERO_API_KEY environment variable not set".to_string())
        })?;

        let library = match (get("ZOTERO_TARGET_GROUP"), get("ZOTERO_USER_ID")) {
            (Some(group), _) => LibraryRef::parse_group(&group)?,
            (None, Some(user)) => LibraryRef::User(user.trim().to_string()),
            (None, None) => {
                return Err(CitegraphError::Config(
                    "ZOTERO_TARGET_GROUP or ZOTERO_USER_ID environment variable not set"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            zotero: ZoteroConfig { api_key, library },
            crossref_mailto: get("CROSSREF_MAILTO").unwrap_or_else(|| DEFAULT_MAILTO.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_parse_group() -> Result<()> {
        assert_eq!(
            LibraryRef::parse_group("https://www.zotero.org/groups/12345/my_group")?,
            LibraryRef::Group("12345".into())
        );
        assert_eq!(LibraryRef::parse_group(" 678 ")?, LibraryRef::Group("678".into()));
        assert!(matches!(
            LibraryRef::parse_group("https://www.zotero.org/users/1"),
            Err(CitegraphError::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn test_group_settings() -> Result<()> {
        let s = settings(&[
            ("ZOTERO_API_KEY", "test_key"),
            ("ZOTERO_TARGET_GROUP", "https://www.zotero.org/groups/12345"),
            ("ZOTERO_USER_ID", "99"),
        ])?;

        assert_eq!(s.zotero.api_key, "test_key");
        assert_eq!(s.zotero.library, LibraryRef::Group("12345".into()));
        assert_eq!(s.crossref_mailto, DEFAULT_MAILTO);
        Ok(())
    }

    #[test]
    fn test_user_settings_and_mailto() -> Result<()> {
        let s = settings(&[
            ("ZOTERO_API_KEY", "k"),
            ("ZOTERO_USER_ID", "99"),
            ("CROSSREF_MAILTO", "me@example.org"),
        ])?;

        assert_eq!(s.zotero.library, LibraryRef::User("99".into()));
        assert_eq!(s.crossref_mailto, "me@example.org");
        Ok(())
    }

    #[test]
    fn test_missing_values() {
        assert!(matches!(
            settings(&[("ZOTERO_TARGET_GROUP", "1")]),
            Err(CitegraphError::Config(_))
        ));
        assert!(matches!(
            settings(&[("ZOTERO_API_KEY", "k"), ("ZOTERO_TARGET_GROUP", "  ")]),
            Err(CitegraphError::Config(_))
        ));
    }
}
