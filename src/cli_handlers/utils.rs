//! Output helpers shared by the command handlers.

use crate::db::models::{PaginatedTasks, Task};
use crate::error::{Result, TasklineError};
use serde::Serialize;

/// Resolve `--owner`/`TASKLINE_OWNER`, rejecting blank values.
pub fn require_owner(owner: Option<&str>) -> Result<&str> {
    match owner.map(str::trim) {
        Some(owner) if !owner.is_empty() => Ok(owner),
        _ => Err(TasklineError::InvalidInput(
            "an owner is required: pass --owner or set TASKLINE_OWNER".to_string(),
        )),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status_badge(task: &Task) -> &'static str {
    if task.deleted {
        "x"
    } else if task.completed {
        "✓"
    } else {
        "○"
    }
}

/// Print one task in a human-friendly block
pub fn print_task(task: &Task) {
    println!("{} Task #{}: {}", status_badge(task), task.id, task.title);
    println!("  Priority: {}", task.priority);
    println!("  Completed: {}", if task.completed { "yes" } else { "no" });
    println!("  Created: {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));
    if !task.description.is_empty() {
        println!("  Description:");
        for line in task.description.lines() {
            println!("    {}", line);
        }
    }
}

/// One line per task, ordered as returned
pub fn print_task_list(page: &PaginatedTasks) {
    if page.tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    for task in &page.tasks {
        println!(
            "{} #{:<5} [{:>4}] {}",
            status_badge(task),
            task.id,
            task.priority,
            task.title
        );
    }

    if page.has_more {
        println!(
            "\nShowing {} of {} (use --offset {} for more)",
            page.tasks.len(),
            page.total_count,
            page.offset + page.tasks.len() as i64
        );
    }
}
