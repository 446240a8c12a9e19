#[macro_use]
extern crate tracing;

mod config;
mod error;
pub mod hooks;
pub mod list;
mod poller;
mod timer;
mod watcher;

pub use config::*;
pub use error::{Error, Result};
pub use poller::{DeviceSource, Poller};
pub use timer::Timer;
pub use watcher::ConfigWatcher;
