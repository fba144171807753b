mod block_updates_service;
mod connect_friendship_service;
mod relation_error;
mod relationship_service;
mod subscribe_user_service;
mod subscription_propagator;

pub use block_updates_service::*;
pub use connect_friendship_service::*;
pub use relation_error::*;
pub use relationship_service::*;
pub use subscribe_user_service::*;
pub use subscription_propagator::*;
