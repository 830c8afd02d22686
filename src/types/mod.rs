// ABOUTME: Engine identifiers and validated domain types.
// ABOUTME: Phantom-typed ids plus the name:tag image reference.

mod id;
mod image_ref;

pub use id::{ContainerId, ImageId, NetworkId};
pub use image_ref::{ImageRef, ParseImageRefError};
