use serde::Deserialize;
use std::fmt;

/// File looked up at the repository root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".since-todo.toml";

const TAG_SLOT: &str = "{tag}";
const COMMIT_SLOT: &str = "{commit}";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdaterConfig {
    /// Only tags starting with this prefix count as releases; the prefix is
    /// stripped to obtain the version written into sources.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
    /// Pathspec globs of files to scan
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub links: Links,
}

fn default_tag_prefix() -> String {
    "jenkins-".to_string()
}

fn default_include() -> Vec<String> {
    ["*.java", "*.jelly", "*.js"]
        .iter()
        .map(|glob| glob.to_string())
        .collect()
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            tag_prefix: default_tag_prefix(),
            include: default_include(),
            links: Links::default(),
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.tag_prefix.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "tag_prefix",
            });
        }

        if self.include.is_empty() {
            issues.push(ValidationIssue::MissingField { field: "include" });
        }
        if self.include.iter().any(|glob| glob.trim().is_empty()) {
            issues.push(ValidationIssue::InvalidValue {
                field: "include",
                message: "globs must not be empty".to_string(),
            });
        }

        let url = &self.links.release_url;
        if !url.is_empty() && !url.contains(TAG_SLOT) {
            issues.push(ValidationIssue::InvalidValue {
                field: "links.release_url",
                message: format!("template must contain {TAG_SLOT} or be empty"),
            });
        }
        let url = &self.links.commit_url;
        if !url.is_empty() && !url.contains(COMMIT_SLOT) {
            issues.push(ValidationIssue::InvalidValue {
                field: "links.commit_url",
                message: format!("template must contain {COMMIT_SLOT} or be empty"),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// URL templates for the final report.
///
/// Both default to the Jenkins GitHub project. An empty template prints the
/// bare tag or commit id.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Links {
    #[serde(default = "default_release_url")]
    pub release_url: String,
    #[serde(default = "default_commit_url")]
    pub commit_url: String,
}

fn default_release_url() -> String {
    "https://github.com/jenkinsci/jenkins/releases/tag/{tag}".to_string()
}

fn default_commit_url() -> String {
    "https://github.com/jenkinsci/jenkins/commit/{commit}".to_string()
}

impl Default for Links {
    fn default() -> Self {
        Self {
            release_url: default_release_url(),
            commit_url: default_commit_url(),
        }
    }
}

impl Links {
    /// Links that render tags and commit ids as they are.
    pub fn bare() -> Self {
        Self {
            release_url: String::new(),
            commit_url: String::new(),
        }
    }

    pub fn release(&self, tag: &str) -> String {
        render_link(&self.release_url, TAG_SLOT, tag)
    }

    pub fn commit(&self, commit: &str) -> String {
        render_link(&self.commit_url, COMMIT_SLOT, commit)
    }
}

fn render_link(template: &str, slot: &str, value: &str) -> String {
    if template.is_empty() {
        value.to_string()
    } else {
        template.replace(slot, value)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
        }
    }
}
