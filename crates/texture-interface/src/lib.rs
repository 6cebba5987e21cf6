//! Zero-copy texture sharing between native producers and the Flutter
//! compositor.
//!
//! Producers either push CPU pixel buffers through [`pixel_buffer::CpuFrame`]
//! or draw into shared D3D11 surfaces managed by [`gpu_surface`]; both reach
//! the compositor without a per-frame copy. [`registry::FrameRegistry`] owns
//! the live frames and [`plugin::TextureInterfacePlugin`] serves the
//! `texture_interface` method channel on top of it.

pub mod gpu_surface;
pub mod pixel_buffer;
pub mod plugin;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use plugin::TextureInterfacePlugin;
pub use registry::{FrameId, FrameRegistry, GpuTextureReply, RegistryError};
