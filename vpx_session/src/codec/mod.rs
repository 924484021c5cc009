//! Codec interface descriptors.
//!
//! A [`CodecInterface`] identifies one encode or decode algorithm and the
//! engine implementing it. The interfaces in [`interfaces`] are process-wide
//! singletons.

pub mod descriptor;
pub mod interfaces;

pub use descriptor::{Capabilities, CodecInterface, Version};
