use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Taskline - a per-user ordered task list

Every active task (not completed, not deleted) of an owner has a distinct
priority. Creating or re-prioritizing a task onto a value that is already
taken shifts the later-created task(s) up by one until the values are
distinct again. Lower numbers come first.

Examples:
  tl --owner alice create --title "Write report" --priority 1
  tl --owner alice update 3 --priority 1
  tl --owner alice list --search report
  tl --owner alice reconcile --from 1

Environment:
  TASKLINE_OWNER            default for --owner
  TASKLINE_DB               default for --db
  TASKLINE_LOCK_TIMEOUT_MS  how long a write waits for the owner's lock
  TASKLINE_LOG_FILE         write logs to this file instead of stderr
"#;

#[derive(Parser, Clone)]
#[command(name = "tl")]
#[command(about = "Per-user ordered task list with unique priorities")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Database file (overrides TASKLINE_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Owner whose tasks the command operates on
    #[arg(long, global = true, env = "TASKLINE_OWNER")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Create a task
    Create {
        /// Title (at least 5 characters, stored capitalized)
        #[arg(long)]
        title: String,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Priority (positive integer, lower comes first)
        #[arg(long, allow_hyphen_values = true)]
        priority: i64,

        /// Create the task already completed
        #[arg(long)]
        completed: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show one task
    Get {
        id: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Update fields of a task
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        priority: Option<i64>,

        /// Set or clear the completed flag (true/false)
        #[arg(long)]
        completed: Option<bool>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Mark a task completed
    Complete {
        id: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete a task (soft delete)
    Delete {
        id: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List active tasks by priority
    List {
        /// Case-insensitive title filter
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List completed tasks
    Completed {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List all tasks that are not deleted
    All {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show active, completed and total counts
    Stats {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Re-establish distinct priorities from a starting value
    Reconcile {
        /// Lowest priority to examine
        #[arg(long, allow_hyphen_values = true)]
        from: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tl",
            "create",
            "--title",
            "Write report",
            "--priority",
            "3",
            "--owner",
            "alice",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.owner.as_deref(), Some("alice"));
        match cli.command {
            Commands::Create {
                title,
                priority,
                completed,
                format,
                ..
            } => {
                assert_eq!(title, "Write report");
                assert_eq!(priority, 3);
                assert!(!completed);
                assert_eq!(format, OutputFormat::Json);
            },
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_parse_negative_priority_reaches_validation() {
        let cli = Cli::try_parse_from(["tl", "update", "4", "--priority", "-2"]).unwrap();
        match cli.command {
            Commands::Update { id, priority, .. } => {
                assert_eq!(id, 4);
                assert_eq!(priority, Some(-2));
            },
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_parse_update_completed_flag() {
        let cli =
            Cli::try_parse_from(["tl", "update", "1", "--completed", "false"]).unwrap();
        match cli.command {
            Commands::Update { completed, .. } => assert_eq!(completed, Some(false)),
            _ => panic!("expected update"),
        }
    }
}
