//! Process-local adapters with the same transactional behavior as the MySQL ones.
//! Backs the `fake` storage backend and the test suite.

mod friendship_repo_memory;
mod store;
mod subscription_repo_memory;
mod user_repo_memory;

pub use friendship_repo_memory::*;
pub use store::{FailPoint, MemoryStore};
pub use subscription_repo_memory::*;
pub use user_repo_memory::*;

mod repo_tx_memory;

pub use repo_tx_memory::*;
