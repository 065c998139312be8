//! Version specifiers.
//!
//! A dependency's version string may carry a protocol (`embed:`, `pub:`,
//! `github:`, `file:`, `workspace:`), name a remote repository by shape
//! (`owner/repo#tag`), be the wildcard `*`, or reference a bundled package.

use std::fmt;

/// Parsed version specifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// `*` or the empty string
    Wildcard,
    /// `embed:<id>`, served from the target's embedded table
    Embed(String),
    /// `pub:<id>`, a published script
    Published(String),
    /// `github:owner/repo#tag` or a bare `owner/repo#tag`
    Repo(RepoRef),
    /// `file:<path>`, local and exempt from mismatch checks
    File(String),
    /// `workspace:<id>`
    Workspace(String),
    /// Anything else refers to a pre-bundled package
    Bundled(String),
}

/// Remote repository reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    /// Sub-directory inside the repository holding the package
    pub path: Option<String>,
    pub tag: Option<String>,
}

impl VersionSpec {
    /// Parse a version string; never fails, unknown shapes are bundled refs
    pub fn parse(input: &str) -> Self {
        if input.is_empty() || input == "*" {
            return VersionSpec::Wildcard;
        }

        if let Some((protocol, argument)) = input.split_once(':') {
            match protocol {
                "embed" => return VersionSpec::Embed(argument.to_string()),
                "pub" => return VersionSpec::Published(argument.to_string()),
                "file" => return VersionSpec::File(argument.to_string()),
                "workspace" => return VersionSpec::Workspace(argument.to_string()),
                "github" => {
                    if let Some(repo) = RepoRef::parse(argument) {
                        return VersionSpec::Repo(repo);
                    }
                },
                _ => {},
            }
            return VersionSpec::Bundled(input.to_string());
        }

        match RepoRef::parse(input) {
            Some(repo) => VersionSpec::Repo(repo),
            None => VersionSpec::Bundled(input.to_string()),
        }
    }

    /// Protocol name, empty for wildcard, bare repository and bundled refs
    pub fn protocol(&self) -> &'static str {
        match self {
            VersionSpec::Embed(_) => "embed",
            VersionSpec::Published(_) => "pub",
            VersionSpec::Repo(_) => "github",
            VersionSpec::File(_) => "file",
            VersionSpec::Workspace(_) => "workspace",
            VersionSpec::Wildcard | VersionSpec::Bundled(_) => "",
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, VersionSpec::Wildcard)
    }

    /// Fetching this package needs network access
    pub fn is_remote(&self) -> bool {
        matches!(self, VersionSpec::Published(_) | VersionSpec::Repo(_))
    }

    /// Local references are rewritten to `*` when publishing
    pub fn is_publish_local(&self) -> bool {
        matches!(
            self,
            VersionSpec::Wildcard | VersionSpec::File(_) | VersionSpec::Workspace(_)
        )
    }
}

/// `file:` references are exempt from version mismatch and conflict checks
pub fn is_file_ref(spec: &str) -> bool {
    spec.starts_with("file:")
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Wildcard => write!(f, "*"),
            VersionSpec::Embed(id) => write!(f, "embed:{}", id),
            VersionSpec::Published(id) => write!(f, "pub:{}", id),
            VersionSpec::Repo(repo) => write!(f, "github:{}", repo),
            VersionSpec::File(path) => write!(f, "file:{}", path),
            VersionSpec::Workspace(id) => write!(f, "workspace:{}", id),
            VersionSpec::Bundled(v) => write!(f, "{}", v),
        }
    }
}

impl RepoRef {
    /// Parse `owner/repo[/path][#tag]`; `None` if the shape does not match
    pub fn parse(input: &str) -> Option<Self> {
        let (location, tag) = match input.split_once('#') {
            Some((l, t)) if !t.is_empty() => (l, Some(t.to_string())),
            Some(_) => return None,
            None => (input, None),
        };

        let segments: Vec<&str> = location.split('/').collect();
        if segments.len() < 2 || !segments.iter().all(|s| is_repo_segment(s)) {
            return None;
        }

        let path = if segments.len() > 2 {
            Some(segments[2..].join("/"))
        } else {
            None
        };

        Some(RepoRef {
            owner: segments[0].to_string(),
            repo: segments[1].to_string(),
            path,
            tag,
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn is_repo_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(ref path) = self.path {
            write!(f, "/{}", path)?;
        }
        if let Some(ref tag) = self.tag {
            write!(f, "#{}", tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_dispatch() {
        assert_eq!(VersionSpec::parse("*"), VersionSpec::Wildcard);
        assert_eq!(VersionSpec::parse(""), VersionSpec::Wildcard);
        assert_eq!(
            VersionSpec::parse("embed:radio"),
            VersionSpec::Embed("radio".to_string())
        );
        assert_eq!(
            VersionSpec::parse("pub:12345-67890"),
            VersionSpec::Published("12345-67890".to_string())
        );
        assert_eq!(
            VersionSpec::parse("file:../lib"),
            VersionSpec::File("../lib".to_string())
        );
        assert_eq!(
            VersionSpec::parse("workspace:sensors"),
            VersionSpec::Workspace("sensors".to_string())
        );
        assert_eq!(
            VersionSpec::parse("1.0"),
            VersionSpec::Bundled("1.0".to_string())
        );
    }

    #[test]
    fn test_repository_detected_by_shape() {
        let spec = VersionSpec::parse("acme/neopixel#v0.3.1");
        match spec {
            VersionSpec::Repo(ref repo) => {
                assert_eq!(repo.full_name(), "acme/neopixel");
                assert_eq!(repo.tag.as_deref(), Some("v0.3.1"));
                assert_eq!(repo.path, None);
            },
            other => panic!("expected repository, got {:?}", other),
        }
        assert_eq!(spec.protocol(), "github");
        assert!(spec.is_remote());

        let spec = VersionSpec::parse("github:acme/kits/lights");
        match spec {
            VersionSpec::Repo(repo) => {
                assert_eq!(repo.path.as_deref(), Some("lights"));
                assert_eq!(repo.tag, None);
                assert_eq!(repo.to_string(), "acme/kits/lights");
            },
            other => panic!("expected repository, got {:?}", other),
        }
    }

    #[test]
    fn test_non_repository_shapes() {
        assert!(RepoRef::parse("neopixel").is_none());
        assert!(RepoRef::parse("acme/").is_none());
        assert!(RepoRef::parse("acme/neo pixel").is_none());
        assert!(RepoRef::parse("acme/neopixel#").is_none());
        assert!(RepoRef::parse("../neopixel").is_none());
        // an unknown protocol stays a bundled reference
        assert_eq!(
            VersionSpec::parse("npm:lodash"),
            VersionSpec::Bundled("npm:lodash".to_string())
        );
    }

    #[test]
    fn test_local_classification() {
        assert!(is_file_ref("file:."));
        assert!(!is_file_ref("workspace:x"));
        assert!(VersionSpec::parse("workspace:x").is_publish_local());
        assert!(VersionSpec::parse("").is_publish_local());
        assert!(!VersionSpec::parse("1.2.0").is_publish_local());
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["*", "embed:a", "pub:b", "github:o/r#t", "file:x", "workspace:y", "2.0"] {
            assert_eq!(VersionSpec::parse(input).to_string(), input);
        }
    }
}
