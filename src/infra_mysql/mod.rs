mod friendship_repo_mysql;
mod pool;
mod subscription_repo_mysql;
mod user_repo_mysql;

pub use friendship_repo_mysql::*;
pub use pool::*;
pub use subscription_repo_mysql::*;
pub use user_repo_mysql::*;

mod repo_tx_mysql;

pub use repo_tx_mysql::*;

mod util;

#[cfg(test)]
mod schema_check;
