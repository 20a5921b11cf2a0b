//! CLI command handlers.

mod collect;
mod dispatch;
mod init;
mod list;
mod show_config;

pub use collect::run_collect;
pub use dispatch::run_dispatch;
pub use init::run_init;
pub use list::run_list;
pub use show_config::run_show_config;
