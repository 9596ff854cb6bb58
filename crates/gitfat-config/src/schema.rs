// GitFat - Large File Support for Git
// Copyright (C) 2025 GitFat Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! `.gitfat` configuration schema
//!
//! The file lives at the repository work-tree root and carries exactly one
//! backend section:
//!
//! ```toml
//! [rsync]
//! remote = "storage.example.com:/srv/fat"
//! sshuser = "deploy"       # optional
//! sshport = "2222"         # optional
//! ```
//!
//! Unknown sections and unknown keys are rejected at parse time so a typo
//! never silently selects the wrong remote.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Rsync remote: `host:/path` or a plain local path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsyncRemote {
    pub remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sshuser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sshport: Option<String>,
}

/// Pull-only HTTP remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRemote {
    pub remote: String,
}

/// S3 (or S3-compatible) remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Remote {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
}

/// Local-directory remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyRemote {
    pub remote: String,
}

/// The remote section actually present in a validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSpec {
    Rsync(RsyncRemote),
    Http(HttpRemote),
    S3(S3Remote),
    Copy(CopyRemote),
}

impl RemoteSpec {
    /// Section name, for logs and messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteSpec::Rsync(_) => "rsync",
            RemoteSpec::Http(_) => "http",
            RemoteSpec::S3(_) => "s3",
            RemoteSpec::Copy(_) => "copy",
        }
    }
}

/// Parsed `.gitfat` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitFatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync: Option<RsyncRemote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpRemote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Remote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyRemote>,
}

impl GitFatConfig {
    /// Require exactly one backend section.
    pub fn validate(&self) -> ConfigResult<()> {
        let present: Vec<&str> = [
            self.rsync.as_ref().map(|_| "rsync"),
            self.http.as_ref().map(|_| "http"),
            self.s3.as_ref().map(|_| "s3"),
            self.copy.as_ref().map(|_| "copy"),
        ]
        .into_iter()
        .flatten()
        .collect();

        match present.len() {
            1 => Ok(()),
            0 => Err(ConfigError::validation(
                "no backend section; expected one of [rsync], [http], [s3], [copy]",
            )),
            _ => Err(ConfigError::validation(format!(
                "multiple backend sections: {}",
                present.join(", ")
            ))),
        }
    }

    /// The single configured remote, after [`validate`](Self::validate).
    pub fn remote(&self) -> ConfigResult<RemoteSpec> {
        self.validate()?;
        if let Some(rsync) = &self.rsync {
            Ok(RemoteSpec::Rsync(rsync.clone()))
        } else if let Some(http) = &self.http {
            Ok(RemoteSpec::Http(http.clone()))
        } else if let Some(s3) = &self.s3 {
            Ok(RemoteSpec::S3(s3.clone()))
        } else if let Some(copy) = &self.copy {
            Ok(RemoteSpec::Copy(copy.clone()))
        } else {
            // validate() guarantees one section
            Err(ConfigError::validation("no backend section"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsync_section_with_ssh_options() {
        let config: GitFatConfig = toml::from_str(
            r#"
            [rsync]
            remote = "storage.example.com:/srv/fat"
            sshuser = "deploy"
            sshport = "2222"
            "#,
        )
        .unwrap();

        match config.remote().unwrap() {
            RemoteSpec::Rsync(rsync) => {
                assert_eq!(rsync.remote, "storage.example.com:/srv/fat");
                assert_eq!(rsync.sshuser.as_deref(), Some("deploy"));
                assert_eq!(rsync.sshport.as_deref(), Some("2222"));
            }
            other => panic!("expected rsync, got {:?}", other),
        }
    }

    #[test]
    fn test_s3_section() {
        let config: GitFatConfig = toml::from_str(
            r#"
            [s3]
            bucket = "assets"
            prefix = "fat"
            endpoint = "https://minio.example.com"
            acl = "private"
            "#,
        )
        .unwrap();

        let remote = config.remote().unwrap();
        assert_eq!(remote.kind(), "s3");
    }

    #[test]
    fn test_no_section_is_rejected() {
        let config: GitFatConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_err());
        assert!(config.remote().is_err());
    }

    #[test]
    fn test_two_sections_are_rejected() {
        let config: GitFatConfig = toml::from_str(
            r#"
            [rsync]
            remote = "host:/srv/fat"

            [http]
            remote = "https://example.com/fat"
            "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiple backend sections"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result: Result<GitFatConfig, _> = toml::from_str(
            r#"
            [ftp]
            remote = "ftp://example.com/fat"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: Result<GitFatConfig, _> = toml::from_str(
            r#"
            [copy]
            remote = "/srv/fat"
            compression = "zstd"
            "#,
        );
        assert!(result.is_err());
    }
}
