//! # Plexus Core Extension Registry
//!
//! Extension points are named slots that any plugin can contribute data to.
//! Contributions are plain JSON values looked up by extension-point id.
pub mod manager;

pub use manager::{Extension, ExtensionManager};

#[cfg(test)]
mod tests;
