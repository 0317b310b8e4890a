use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Psychology,
    Study,
    Life,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Psychology => "psychology",
            Category::Study => "study",
            Category::Life => "life",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "psychology" => Ok(Category::Psychology),
            "study" => Ok(Category::Study),
            "life" => Ok(Category::Life),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub id: Uuid,
    pub category: Category,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Advice {
    pub fn new(
        category: Category,
        question: String,
        answer: String,
        author_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            question,
            answer,
            author_id,
            created_at: Utc::now(),
        }
    }
}
