use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Description stored when a report arrives without one.
pub const DEFAULT_DESCRIPTION: &str = "Mobile Report";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized category: {0}")]
pub struct UnknownCategory(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized ticket status: {0}")]
pub struct UnknownStatus(pub String);

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Pothole,
    Garbage,
    #[serde(rename = "Water Leak", alias = "Broken Pipe")]
    WaterLeak,
    Streetlight,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Pothole,
        Category::Garbage,
        Category::WaterLeak,
        Category::Streetlight,
    ];

    /// Canonical label, as persisted and returned to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pothole => "Pothole",
            Category::Garbage => "Garbage",
            Category::WaterLeak => "Water Leak",
            Category::Streetlight => "Streetlight",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive; ignores spaces, underscores and hyphens.
    /// "Broken Pipe" is the mobile client's label for water leaks.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "pothole" => Ok(Category::Pothole),
            "garbage" => Ok(Category::Garbage),
            "waterleak" | "brokenpipe" => Ok(Category::WaterLeak),
            "streetlight" => Ok(Category::Streetlight),
            _ => Err(UnknownCategory(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// --- Ticket ---

/// A persisted civic issue. `location` is fixed at creation; duplicate
/// reports only bump `report_count` and `last_reported_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub category: Category,
    pub description: String,
    pub location: GeoPoint,
    pub status: TicketStatus,
    pub report_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_reported_at: DateTime<Utc>,
}

/// A validated report on its way into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub category: Category,
    pub description: String,
    pub location: GeoPoint,
}

impl NewTicket {
    pub fn new(category: Category, description: Option<&str>, location: GeoPoint) -> Self {
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();
        Self {
            category,
            description,
            location,
        }
    }

    /// The row an insert produces: fresh id, open, counted once.
    pub fn into_ticket(self, now: DateTime<Utc>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            category: self.category,
            description: self.description,
            location: self.location,
            status: TicketStatus::Open,
            report_count: 1,
            created_at: now,
            last_reported_at: now,
        }
    }
}

// --- Submission outcome ---

/// Which branch a submission took. Observability only; callers must not
/// make business decisions on it beyond choosing a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Duplicate,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Duplicate => write!(f, "duplicate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketResult {
    pub outcome: Outcome,
    pub ticket: Ticket,
}

impl TicketResult {
    pub fn created(ticket: Ticket) -> Self {
        Self {
            outcome: Outcome::Created,
            ticket,
        }
    }

    pub fn duplicate(ticket: Ticket) -> Self {
        Self {
            outcome: Outcome::Duplicate,
            ticket,
        }
    }
}

// --- Listing ---

/// Window over the ticket listing. `limit: None` means everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}
