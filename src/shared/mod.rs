// This is free and unencumbered software released into the public domain.

mod config;
pub use config::*;

mod device;
pub use device::*;

pub mod backends {
    pub mod sim;
}

mod error;
pub use error::*;

mod pipeline;
pub use pipeline::*;

mod recorder;
pub use recorder::*;

mod session;
pub use session::*;

mod sink;
pub use sink::*;

mod targets;
pub use targets::*;
