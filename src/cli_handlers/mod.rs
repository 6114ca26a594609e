// CLI command handlers
//
// Task commands resolve the owner, call into TaskManager or the reconciler,
// and print text or JSON to stdout.

pub mod task_commands;
pub mod utils;

pub use task_commands::handle_command;
pub use utils::{print_json, print_task, print_task_list, require_owner};
