//! capellix: direct LED control for Corsair Commander Core controllers.

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod keepalive;
pub mod led;
pub mod models;
pub mod protocol;
pub mod session;
pub mod topology;

pub use error::CapellixError;
pub use session::CommanderCore;
