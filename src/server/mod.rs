mod channel_bus;
mod delivery;
mod event_consumer_impl;
mod event_handler_impl;
mod event_publisher_impl;
mod port;
mod queued_propagator;
mod server;

pub use channel_bus::*;
pub use event_consumer_impl::*;
pub use event_handler_impl::*;
pub use event_publisher_impl::*;
pub use port::*;
pub use queued_propagator::*;
pub use server::*;
