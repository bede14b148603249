//! Publication status shared by posts and pages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a post or page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Private,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "DRAFT",
            ContentStatus::Published => "PUBLISHED",
            ContentStatus::Private => "PRIVATE",
        }
    }

    pub fn is_published(&self) -> bool {
        *self == ContentStatus::Published
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(ContentStatus::Draft),
            "PUBLISHED" => Ok(ContentStatus::Published),
            "PRIVATE" => Ok(ContentStatus::Private),
            _ => Err(anyhow::anyhow!("Invalid content status: {}", s)),
        }
    }
}
