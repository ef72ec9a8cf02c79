use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder segment GitHub appends to `releases_url`.
const RELEASE_ID_PLACEHOLDER: &str = "{/id}";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repository {
    pub name: String,
    pub releases_url: String,
}

impl Repository {
    /// Concrete release listing endpoint for this repository.
    pub fn releases_endpoint(&self) -> String {
        self.releases_url.replace(RELEASE_ID_PLACEHOLDER, "")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Release {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Author {
    pub login: String,
}

impl Release {
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.login.as_str())
    }
}
