// ABOUTME: Composable capability traits for the container engine.
// ABOUTME: Defines ContainerOps, ImageOps, NetworkOps and the Engine umbrella.

mod container;
mod image;
mod network;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use network::{NetworkError, NetworkOps};
pub use shared_types::*;

/// Everything the deployment orchestrator needs from one host's engine.
///
/// Implemented automatically for any type with all three capabilities, so
/// test doubles only implement the capability traits.
pub trait Engine: ContainerOps + ImageOps + NetworkOps {}

impl<T: ContainerOps + ImageOps + NetworkOps> Engine for T {}
