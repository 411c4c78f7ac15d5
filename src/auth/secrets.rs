//! OAuth client secrets discovery.
//!
//! Google Cloud console hands out a JSON file for each OAuth client. Desktop
//! clients nest their fields under `installed`, web clients under `web`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File names checked for client secrets, in order.
pub const CLIENT_SECRET_FILES: [&str; 3] =
    ["credentials.json", "client_secrets.json", "client_secret.json"];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Steps for creating a client secrets file.
pub const SETUP_INSTRUCTIONS: &str = "\
To fix this:
1. Go to https://console.cloud.google.com/
2. Create a project (or select an existing one)
3. Search 'Gmail API' in the search bar and ENABLE it
4. Go to 'APIs & Services' > 'Credentials'
5. Click '+ CREATE CREDENTIALS' > 'OAuth client ID'
6. If prompted, configure the consent screen (External, just add your email)
7. Application type: 'Desktop app', name it anything
8. Click 'Download JSON' on the created credential";

/// Problems locating or reading client secrets. All of these are fatal.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(
        "no credentials file found\n\nLooked in: {}\n\n{}\n9. Save it as 'credentials.json' in: {}\n\nThen run this command again.",
        .dir.display(),
        SETUP_INSTRUCTIONS,
        .dir.display()
    )]
    MissingClientSecrets { dir: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a Google OAuth client file: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// OAuth client identity read from a client secrets file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum SecretsFile {
    Installed(ClientSecrets),
    Web(ClientSecrets),
}

impl ClientSecrets {
    /// Finds and parses the first client secrets file present in `dir`.
    pub fn discover(dir: &Path) -> Result<(Self, PathBuf), SetupError> {
        let path = find_secrets_file(dir).ok_or_else(|| SetupError::MissingClientSecrets {
            dir: dir.to_path_buf(),
        })?;
        let secrets = Self::load(&path)?;
        Ok((secrets, path))
    }

    /// Parses the client secrets file at `path`.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let contents = fs::read_to_string(path).map_err(|source| SetupError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| SetupError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses either client layout.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        match serde_json::from_str(json)? {
            SecretsFile::Installed(secrets) | SecretsFile::Web(secrets) => Ok(secrets),
        }
    }
}

/// Returns the first of [`CLIENT_SECRET_FILES`] that exists in `dir`.
pub fn find_secrets_file(dir: &Path) -> Option<PathBuf> {
    CLIENT_SECRET_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "forgot",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn parses_installed_layout() {
        let secrets = ClientSecrets::from_json(INSTALLED).unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("shh"));
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn parses_web_layout_with_defaults() {
        let secrets = ClientSecrets::from_json(r#"{"web": {"client_id": "abc"}}"#).unwrap();
        assert_eq!(secrets.client_id, "abc");
        assert_eq!(secrets.client_secret, None);
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(ClientSecrets::from_json(r#"{"service_account": {}}"#).is_err());
    }

    #[test]
    fn discovery_follows_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("client_secret.json"),
            r#"{"web": {"client_id": "third"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("client_secrets.json"),
            r#"{"installed": {"client_id": "second"}}"#,
        )
        .unwrap();

        let (secrets, path) = ClientSecrets::discover(dir.path()).unwrap();
        assert_eq!(secrets.client_id, "second");
        assert_eq!(path, dir.path().join("client_secrets.json"));
    }

    #[test]
    fn missing_file_explains_setup() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientSecrets::discover(dir.path()).unwrap_err();

        assert!(matches!(err, SetupError::MissingClientSecrets { .. }));
        let message = err.to_string();
        assert!(message.contains("console.cloud.google.com"));
        assert!(message.contains(&dir.path().display().to_string()));
        assert!(message.contains("credentials.json"));
    }

    #[test]
    fn malformed_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("credentials.json"), "not json").unwrap();

        let err = ClientSecrets::discover(dir.path()).unwrap_err();
        assert!(matches!(err, SetupError::Invalid { .. }));
    }
}
