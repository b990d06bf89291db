pub mod commands;
pub mod systemctl;

pub use commands::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use systemctl::{ProcessHandle, ServiceController};
