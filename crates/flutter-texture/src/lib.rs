//! Host-boundary layer for a Flutter Windows external-texture plugin.
//!
//! [`ffi`] mirrors the embedder's texture-registrar ABI, [`registrar`] puts a
//! trait in front of it so frame sources never see the raw entry points, and
//! [`protocol`] models the channel's decoded method calls. The live embedder
//! binding in [`desktop`] is Windows-only; everything else is plain data and
//! compiles everywhere.

pub mod ffi;
pub mod logging;
pub mod protocol;
pub mod registrar;

#[cfg(target_os = "windows")]
pub mod desktop;

pub use registrar::{GpuSurfaceType, PixelFormat, TextureId, TextureInfo, TextureRegistrar};

#[cfg(target_os = "windows")]
pub use desktop::DesktopTextureRegistrar;
