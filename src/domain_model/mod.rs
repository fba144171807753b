mod friendship;
mod mention;
mod subscription;
mod user;

pub use friendship::*;
pub use mention::*;
pub use subscription::*;
pub use user::*;
