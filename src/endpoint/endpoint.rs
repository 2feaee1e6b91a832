//! Git endpoint definition and `git://` URI parsing

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const URI_SCHEME: &str = "git://";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid endpoint URI: {0}")]
    InvalidUri(String),
    #[error("Unknown endpoint parameter: {0}")]
    UnknownParameter(String),
}

/// Per-endpoint configuration
///
/// Every field is optional; blank values count as absent. The password is
/// accepted on input but never serialized back out.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitEndpoint {
    /// Working directory of the local repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    /// Remote name or URL used by clone, push and pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    /// Fixed operation; when blank the `GitOperation` header decides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl GitEndpoint {
    /// Parse `git://<remotePath>?localPath=..&operation=..&branchName=..&username=..&password=..`
    ///
    /// Everything between the scheme and the first `?` is the remote path,
    /// taken verbatim. Query values are form-url-decoded.
    pub fn parse_uri(uri: &str) -> Result<Self, EndpointError> {
        let rest = uri
            .trim()
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| EndpointError::InvalidUri(format!("missing {} scheme", URI_SCHEME)))?;

        let (remote, query) = match rest.split_once('?') {
            Some((remote, query)) => (remote, Some(query)),
            None => (rest, None),
        };

        let mut endpoint = GitEndpoint::default();
        if !remote.is_empty() {
            endpoint.remote_path = Some(remote.to_string());
        }

        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                let value = Some(value.into_owned());
                match key.as_ref() {
                    "localPath" => endpoint.local_path = value,
                    "remotePath" => endpoint.remote_path = value,
                    "operation" => endpoint.operation = value,
                    "branchName" => endpoint.branch_name = value,
                    "username" => endpoint.username = value,
                    "password" => endpoint.password = value,
                    other => return Err(EndpointError::UnknownParameter(other.to_string())),
                }
            }
        }

        Ok(endpoint)
    }

    /// Fill every blank field from `base`
    pub fn overlay(mut self, base: GitEndpoint) -> GitEndpoint {
        fn pick(own: &mut Option<String>, fallback: Option<String>) {
            if non_blank(own).is_none() {
                *own = fallback;
            }
        }
        pick(&mut self.local_path, base.local_path);
        pick(&mut self.remote_path, base.remote_path);
        pick(&mut self.operation, base.operation);
        pick(&mut self.branch_name, base.branch_name);
        pick(&mut self.username, base.username);
        pick(&mut self.password, base.password);
        self
    }

    pub fn local_path(&self) -> Option<&str> {
        non_blank(&self.local_path)
    }

    pub fn remote_path(&self) -> Option<&str> {
        non_blank(&self.remote_path)
    }

    pub fn operation(&self) -> Option<&str> {
        non_blank(&self.operation)
    }

    pub fn branch_name(&self) -> Option<&str> {
        non_blank(&self.branch_name)
    }

    /// Username and password, only when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (non_blank(&self.username), non_blank(&self.password)) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

impl fmt::Debug for GitEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitEndpoint")
            .field("local_path", &self.local_path)
            .field("remote_path", &self.remote_path)
            .field("operation", &self.operation)
            .field("branch_name", &self.branch_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_uri() {
        let endpoint = GitEndpoint::parse_uri(
            "git://https://example.com/repo.git?localPath=/tmp/repo&operation=pull&branchName=main&username=bob&password=s%3Dcret",
        )
        .unwrap();

        assert_eq!(endpoint.remote_path(), Some("https://example.com/repo.git"));
        assert_eq!(endpoint.local_path(), Some("/tmp/repo"));
        assert_eq!(endpoint.operation(), Some("pull"));
        assert_eq!(endpoint.branch_name(), Some("main"));
        assert_eq!(endpoint.credentials(), Some(("bob", "s=cret")));
    }

    #[test]
    fn test_parse_local_only_uri() {
        let endpoint = GitEndpoint::parse_uri("git://?localPath=%2Fsrv%2Fwork%20tree").unwrap();
        assert_eq!(endpoint.remote_path(), None);
        assert_eq!(endpoint.local_path(), Some("/srv/work tree"));
        assert_eq!(endpoint.operation(), None);
    }

    #[test]
    fn test_parse_rejects_wrong_scheme() {
        let err = GitEndpoint::parse_uri("file:///tmp/repo").unwrap_err();
        assert!(matches!(err, EndpointError::InvalidUri(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_parameter() {
        let err = GitEndpoint::parse_uri("git://?localPath=/x&depth=1").unwrap_err();
        assert_eq!(err, EndpointError::UnknownParameter("depth".to_string()));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let endpoint = GitEndpoint {
            local_path: Some("   ".to_string()),
            username: Some("bob".to_string()),
            password: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(endpoint.local_path(), None);
        assert_eq!(endpoint.credentials(), None);
    }

    #[test]
    fn test_overlay_keeps_explicit_fields() {
        let explicit = GitEndpoint {
            operation: Some("push".to_string()),
            ..Default::default()
        };
        let from_uri = GitEndpoint::parse_uri("git://origin?localPath=/repo&operation=pull").unwrap();

        let merged = explicit.overlay(from_uri);

        assert_eq!(merged.operation(), Some("push"));
        assert_eq!(merged.local_path(), Some("/repo"));
        assert_eq!(merged.remote_path(), Some("origin"));
    }

    #[test]
    fn test_password_never_serialized() {
        let endpoint = GitEndpoint::parse_uri("git://origin?localPath=/repo&username=u&password=p").unwrap();

        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(!json.contains("password"));
        assert!(!format!("{:?}", endpoint).contains("\"p\""));

        let back: GitEndpoint = serde_json::from_str(r#"{"local_path":"/r","password":"x"}"#).unwrap();
        assert_eq!(back.password.as_deref(), Some("x"));
    }
}
