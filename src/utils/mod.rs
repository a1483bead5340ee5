pub mod command;
pub mod path_validator;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use path_validator::PathValidator;
