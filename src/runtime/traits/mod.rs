// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, ImageOps, and the Runtime facade over both.

mod container;
mod facade;
mod image;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use facade::Runtime;
pub use image::{ImageError, ImageOps};
pub use shared_types::*;
