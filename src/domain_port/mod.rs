// repo

mod friendship_repo;
mod repo_error;
mod subscription_repo;
mod user_repo;

mod repo_tx;

pub use friendship_repo::*;
pub use repo_error::*;
pub use subscription_repo::*;
pub use user_repo::*;

pub use repo_tx::*;
