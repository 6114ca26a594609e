pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod owner_lock;
pub mod priority;
pub mod reconciler;
pub mod sql_constants;
pub mod tasks;

#[cfg(test)]
pub mod test_utils;
