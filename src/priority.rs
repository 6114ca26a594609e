use crate::error::{Result, TasklineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A task priority. Lower number = earlier in the list, always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(i64);

impl Priority {
    pub fn new(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(TasklineError::InvalidPriority(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Priority {
    type Error = TasklineError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The slice of a task the reconciler needs to see.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PriorityCandidate {
    pub id: i64,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
}

/// One planned priority change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityShift {
    pub task_id: i64,
    pub from: i64,
    pub to: i64,
}

/// Plan the shifts that make every candidate's priority distinct.
///
/// `candidates` must already be ordered by priority, then creation time.
/// The walk carries the previous task's post-shift value forward; any task at
/// or below it moves to exactly one above it. Chained duplicates therefore
/// resolve in one pass (`[3, 3, 3]` becomes `[3, 4, 5]`), the first task of the
/// slice never moves, and no value ever decreases. Candidates the cascade does
/// not reach are left alone.
pub fn plan_shifts(candidates: &[PriorityCandidate]) -> Result<Vec<PriorityShift>> {
    let mut shifts = Vec::new();
    let mut previous: Option<i64> = None;

    for candidate in candidates {
        let value = match previous {
            Some(prev) if candidate.priority <= prev => {
                let to = prev.checked_add(1).ok_or_else(|| {
                    TasklineError::InvalidInput(format!(
                        "priority overflow while shifting task {}",
                        candidate.id
                    ))
                })?;
                shifts.push(PriorityShift {
                    task_id: candidate.id,
                    from: candidate.priority,
                    to,
                });
                to
            },
            _ => candidate.priority,
        };
        previous = Some(value);
    }

    Ok(shifts)
}
