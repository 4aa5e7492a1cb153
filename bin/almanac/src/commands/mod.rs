//! Contains subcommands for the almanac CLI.

mod logs;
pub use logs::LogsCommand;

mod head;
pub use head::HeadCommand;

mod coverage;
pub use coverage::CoverageCommand;

mod forget;
pub use forget::ForgetCommand;
