//! # Netplat Core Kernel
//!
//! Process-level composition of the platform.
//!
//! - **Application composer**: [`Application`](bootstrap::Application)
//!   runs discovery, initializes the plugins, mounts their routers behind
//!   the tenant middleware, serves, and tears everything down in order.
//! - **Core constants** in [`constants`].
//! - **Error handling**: the top-level [`Error`](error::Error) and its
//!   `Result` alias.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use error::{Error, KernelLifecyclePhase, Result};

#[cfg(test)]
mod tests;
