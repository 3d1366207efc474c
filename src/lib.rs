pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod password;
pub mod server;
pub mod store;
pub mod utils;
pub mod workspace;

pub use config::Config;
pub use database::Database;
pub use models::{Category, Task};
pub use store::TaskStore;
pub use utils::Profile;
pub use workspace::{Project, User, Workspace};
