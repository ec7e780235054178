//! Connection multiplexer: target registry, persistent channel clients, and
//! the framing protocol spoken over their stdin/stdout.

pub mod channel;
pub mod codec;
pub mod launcher;
pub mod multiplexer;
pub mod reporter;

pub use channel::{Channel, ChannelSettings};
pub use launcher::{Launcher, Link, ProcessHandle, SpawnLauncher};
pub use multiplexer::Multiplexer;
pub use reporter::FailureReporter;
