//! D3D11 shared-surface plumbing and the ANGLE import bridge.
//!
//! [`surface::SharedSurface`] allocates OS-shareable D3D11 textures and
//! exports their DXGI shared handles as revocable capabilities;
//! [`interop::AngleBridge`] imports those handles into GLES so renderers
//! that only speak GL can draw into the same memory the compositor samples.
//! The EGL attribute tables in [`egl`] are plain data and compile
//! everywhere; everything touching a device is Windows-only.

pub mod egl;

#[cfg(target_os = "windows")]
pub mod device;
#[cfg(target_os = "windows")]
pub mod interop;
#[cfg(target_os = "windows")]
pub mod surface;

#[cfg(target_os = "windows")]
pub use device::Dx11Device;
#[cfg(target_os = "windows")]
pub use interop::{AngleBridge, BoundSurface};
#[cfg(target_os = "windows")]
pub use surface::{SharedHandle, SharedSurface};
