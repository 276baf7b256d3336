//! Session data structure

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::Result;

/// Where a session originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    #[default]
    None,
    NewTab,
    Menu,
    ExternalLink,
    HomeScreen,
    Restored,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::None => "none",
            SessionSource::NewTab => "new_tab",
            SessionSource::Menu => "menu",
            SessionSource::ExternalLink => "external_link",
            SessionSource::HomeScreen => "home_screen",
            SessionSource::Restored => "restored",
        }
    }
}

impl std::fmt::Display for SessionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique identifier
    pub id: String,
    /// Current URL
    pub url: String,
    /// Page title, empty until the page reports one
    pub title: String,
    /// Session this one was opened from, if any
    pub parent_id: Option<String>,
    /// How the session was opened
    pub source: SessionSource,
    /// Private sessions are never persisted
    pub private: bool,
}

impl Session {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_id(Uuid::new_v4().to_string(), url)
    }

    /// Create a session with a caller-chosen identifier
    pub fn with_id(id: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(SessionError::InvalidUrl("URL cannot be empty".to_string()));
        }

        Ok(Self {
            id: id.into(),
            url,
            title: String::new(),
            parent_id: None,
            source: SessionSource::None,
            private: false,
        })
    }

    pub fn with_source(mut self, source: SessionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Update URL (navigation)
    pub fn navigate(&mut self, url: String) -> Result<()> {
        if url.is_empty() {
            return Err(SessionError::InvalidUrl("URL cannot be empty".to_string()));
        }

        self.url = url;
        self.title = String::new(); // Reset title until page loads

        Ok(())
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new("https://example.com").unwrap();
        assert_eq!(session.url, "https://example.com");
        assert_eq!(session.source, SessionSource::None);
        assert!(session.title.is_empty());
        assert!(!session.private);
        assert_eq!(session.display_title(), "https://example.com");
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(Session::new("").is_err());

        let mut session = Session::with_id("a", "https://example.com").unwrap();
        assert!(session.navigate(String::new()).is_err());
        assert_eq!(session.url, "https://example.com");
    }

    #[test]
    fn test_navigate_resets_title() {
        let mut session = Session::with_id("a", "https://example.com").unwrap();
        session.set_title("Example".to_string());
        assert_eq!(session.display_title(), "Example");

        session.navigate("https://mozilla.org".to_string()).unwrap();
        assert!(session.title.is_empty());
        assert_eq!(session.display_title(), "https://mozilla.org");
    }

    #[test]
    fn test_source_names() {
        assert_eq!(SessionSource::ExternalLink.to_string(), "external_link");
        let json = serde_json::to_string(&SessionSource::NewTab).unwrap();
        assert_eq!(json, "\"new_tab\"");
    }
}
