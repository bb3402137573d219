use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle of a project record.
///
/// The upload front-end creates records as `Pending`; the pipeline moves them
/// through `Processing` into exactly one of the terminal states. Terminal
/// states are never left again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProjectStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::Pending, ProjectStatus::Processing)
                | (ProjectStatus::Processing, ProjectStatus::Completed)
                | (ProjectStatus::Processing, ProjectStatus::Error)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Error)
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProjectStatus::Pending => write!(f, "pending"),
            ProjectStatus::Processing => write!(f, "processing"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProjectStatus::Pending),
            "processing" => Ok(ProjectStatus::Processing),
            "completed" => Ok(ProjectStatus::Completed),
            "error" => Ok(ProjectStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid project status: {}", s)),
        }
    }
}

/// One upload's record in the document store.
///
/// Created by the upload front-end with status `Pending`; from then on only
/// the pipeline mutates it. `storage_path`, `original_url`, and `name` are
/// immutable after creation; `processed_url` is set exactly once on
/// completion; `error` is present iff status is `Error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub storage_path: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// A fresh record the way the upload collaborator creates one.
    pub fn new_pending(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        storage_path: impl Into<String>,
        original_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            storage_path: storage_path.into(),
            original_url: original_url.into(),
            processed_url: None,
            error: None,
            status: ProjectStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
