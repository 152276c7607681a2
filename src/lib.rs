//! Multiresolution (pyramid) image access for interactive viewers.
//!
//! This library is organized into several crates:
//! - **core**: axes, points, index extents, world bounds and the index-to-world transform
//! - **storage**: pyramid level metadata, chunk sources, and `MultiscaleImage`, which assembles cached images of any
//!   region at any scale
//! - **control**: a level-of-detail controller that picks the rendered scale from crop changes and frame rate samples
//!
//! Start with `MultiscaleImage::get_image` and `LodController`.

pub use lodview_core as core;
pub use lodview_storage as storage;

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::storage::prelude::*;

    #[cfg(feature = "control")]
    pub use super::control::prelude::*;
}

#[cfg(feature = "control")]
pub use lodview_control as control;
