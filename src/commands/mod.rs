pub mod app_command;

pub use app_command::{parse_fields, AppCommand, COMMANDS, HELP};
