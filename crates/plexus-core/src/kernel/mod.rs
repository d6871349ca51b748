//! # Plexus Core Kernel
//!
//! The `kernel` module holds the [`Framework`]: the container-wide coordinator
//! that discovers plugins, resolves them and starts or stops them in order.
//!
//! ## Key Components:
//!
//! - **Framework**: [`Framework`] and its [`FrameworkBuilder`], driving the
//!   CREATED → STARTED → STOPPING → STOPPED state machine ([`FrameworkState`]).
//! - **Core Constants**: defaults for start levels, descriptor file names and
//!   directories, in the `constants` submodule.
//! - **Error Handling**: the runtime-wide [`Error`] and `Result` alias in the
//!   `error` submodule.
pub mod constants;
pub mod error;
pub mod framework;
pub mod state;

pub use error::{Error, Result};
pub use framework::{Framework, FrameworkBuilder};
pub(crate) use framework::FrameworkCore;
pub use state::FrameworkState;
