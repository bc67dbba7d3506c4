//! Query mode selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend behavior profile chosen by the user.
///
/// The mode is opaque to the front end beyond display and round-tripping:
/// it is sent with every query and echoed on assistant messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Direct answers based on the training material.
    #[default]
    Knowledge,
    /// Structured preparation and planning.
    Preparation,
}

impl QueryMode {
    pub const ALL: [QueryMode; 2] = [QueryMode::Knowledge, QueryMode::Preparation];

    /// Wire value sent to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Knowledge => "knowledge",
            QueryMode::Preparation => "preparation",
        }
    }

    /// Badge shown next to assistant messages and in the header.
    pub fn label(&self) -> &'static str {
        match self {
            QueryMode::Knowledge => "📚 Knowledge Mode",
            QueryMode::Preparation => "📋 Preparation Mode",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QueryMode::Knowledge => "Direct answers based on training materials",
            QueryMode::Preparation => "Structured preparation and planning",
        }
    }

    /// Text of the synthetic message injected when this mode becomes active.
    pub fn welcome_text(&self) -> String {
        match self {
            QueryMode::Knowledge => format!(
                "**{}** is active. {}. Ask me anything about your training documents.",
                self.label(),
                self.description()
            ),
            QueryMode::Preparation => format!(
                "**{}** is active. {}. Tell me what you want to prepare for and I will put together a structured plan.",
                self.label(),
                self.description()
            ),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "knowledge" | "k" => Ok(QueryMode::Knowledge),
            "preparation" | "prep" | "p" => Ok(QueryMode::Preparation),
            other => Err(format!(
                "Unknown mode '{}'. Expected 'knowledge' or 'preparation'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_knowledge() {
        assert_eq!(QueryMode::default(), QueryMode::Knowledge);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Preparation".parse::<QueryMode>(), Ok(QueryMode::Preparation));
        assert_eq!("prep".parse::<QueryMode>(), Ok(QueryMode::Preparation));
        assert_eq!(" knowledge ".parse::<QueryMode>(), Ok(QueryMode::Knowledge));
        assert!("summary".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&QueryMode::Preparation).unwrap();
        assert_eq!(json, "\"preparation\"");
    }
}
