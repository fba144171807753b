mod block_updates_service_impl;
mod connect_friendship_service_impl;
mod deadline;
mod direct_propagator;
mod relationship_service_impl;
mod subscribe_user_service_impl;

#[cfg(test)]
pub(crate) mod fixture;

pub use block_updates_service_impl::*;
pub use connect_friendship_service_impl::*;
pub use deadline::*;
pub use direct_propagator::*;
pub use relationship_service_impl::*;
pub use subscribe_user_service_impl::*;
