use crate::cli::{Commands, OutputFormat};
use crate::cli_handlers::utils::{print_json, print_task, print_task_list, require_owner};
use crate::context::AppContext;
use crate::db::models::NewTask;
use crate::error::Result;
use crate::priority::Priority;
use crate::tasks::TaskUpdate;
use serde_json::json;

/// Dispatch one subcommand for `owner`.
pub async fn handle_command(ctx: &AppContext, owner: Option<&str>, cmd: Commands) -> Result<()> {
    let owner = require_owner(owner)?;

    match cmd {
        Commands::Create {
            title,
            description,
            priority,
            completed,
            format,
        } => handle_create(ctx, owner, &title, &description, priority, completed, format).await,

        Commands::Get { id, format } => {
            let task = ctx.task_manager().get_task(owner, id).await?;
            match format {
                OutputFormat::Json => print_json(&task),
                OutputFormat::Text => {
                    print_task(&task);
                    Ok(())
                },
            }
        },

        Commands::Update {
            id,
            title,
            description,
            priority,
            completed,
            format,
        } => {
            let task_mgr = ctx.task_manager();
            let before = task_mgr.get_task(owner, id).await?;
            let task = task_mgr
                .update_task(
                    owner,
                    id,
                    TaskUpdate {
                        title: title.as_deref(),
                        description: description.as_deref(),
                        priority,
                        completed,
                    },
                )
                .await?;

            match format {
                OutputFormat::Json => print_json(&task),
                OutputFormat::Text => {
                    println!("Task updated: #{} {}", task.id, task.title);
                    if let Some(requested) = priority {
                        if requested != task.priority {
                            // An older task already held the value
                            println!("  Priority: {} (requested {})", task.priority, requested);
                        } else {
                            println!("  Priority: {}", task.priority);
                        }
                    } else if before.priority != task.priority {
                        println!("  Priority: {} -> {}", before.priority, task.priority);
                    }
                    Ok(())
                },
            }
        },

        Commands::Complete { id, format } => {
            let task = ctx.task_manager().complete_task(owner, id).await?;
            match format {
                OutputFormat::Json => print_json(&task),
                OutputFormat::Text => {
                    println!("Task completed: #{} {}", task.id, task.title);
                    Ok(())
                },
            }
        },

        Commands::Delete { id, format } => {
            ctx.task_manager().delete_task(owner, id).await?;
            match format {
                OutputFormat::Json => print_json(&json!({ "deleted": id })),
                OutputFormat::Text => {
                    println!("Task deleted: #{}", id);
                    Ok(())
                },
            }
        },

        Commands::List {
            search,
            limit,
            offset,
            format,
        } => {
            let page = ctx
                .task_manager()
                .list_active(owner, search.as_deref(), limit, offset)
                .await?;
            match format {
                OutputFormat::Json => print_json(&page),
                OutputFormat::Text => {
                    print_task_list(&page);
                    Ok(())
                },
            }
        },

        Commands::Completed {
            limit,
            offset,
            format,
        } => {
            let page = ctx
                .task_manager()
                .list_completed(owner, limit, offset)
                .await?;
            match format {
                OutputFormat::Json => print_json(&page),
                OutputFormat::Text => {
                    print_task_list(&page);
                    Ok(())
                },
            }
        },

        Commands::All {
            limit,
            offset,
            format,
        } => {
            let page = ctx.task_manager().list_all(owner, limit, offset).await?;
            match format {
                OutputFormat::Json => print_json(&page),
                OutputFormat::Text => {
                    print_task_list(&page);
                    Ok(())
                },
            }
        },

        Commands::Stats { format } => {
            let counts = ctx.task_manager().counts(owner).await?;
            match format {
                OutputFormat::Json => print_json(&counts),
                OutputFormat::Text => {
                    println!("Active:    {}", counts.active);
                    println!("Completed: {}", counts.completed);
                    println!("Total:     {}", counts.total);
                    Ok(())
                },
            }
        },

        Commands::Reconcile { from, format } => {
            let from = Priority::new(from)?;
            let outcome = ctx.reconciler.reconcile(&ctx.pool, owner, from).await?;
            match format {
                OutputFormat::Json => print_json(&outcome),
                OutputFormat::Text => {
                    if outcome.is_noop() {
                        println!(
                            "Priorities already distinct ({} task(s) from {})",
                            outcome.examined, outcome.from_priority
                        );
                    } else {
                        println!(
                            "Shifted {} of {} task(s) from priority {}:",
                            outcome.shifts.len(),
                            outcome.examined,
                            outcome.from_priority
                        );
                        for shift in &outcome.shifts {
                            println!("  #{}: {} -> {}", shift.task_id, shift.from, shift.to);
                        }
                    }
                    Ok(())
                },
            }
        },
    }
}

async fn handle_create(
    ctx: &AppContext,
    owner: &str,
    title: &str,
    description: &str,
    priority: i64,
    completed: bool,
    format: OutputFormat,
) -> Result<()> {
    let task = ctx
        .task_manager()
        .add_task(
            owner,
            NewTask {
                title,
                description,
                priority,
                completed,
            },
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&task),
        OutputFormat::Text => {
            println!("Task created: #{} {}", task.id, task.title);
            println!("  Priority: {}", task.priority);
            if task.priority != priority {
                println!("  (priority {} was taken, moved to {})", priority, task.priority);
            }
            if task.completed {
                println!("  Completed: yes");
            }
            println!("  Owner: {}", task.owner);
            Ok(())
        },
    }
}
