//! Shared D3D11 surface factory.
//!
//! Surfaces are created with OS-level sharing enabled and export their DXGI
//! shared handle as a revocable capability: the handle names the texture for
//! importers in other devices, and goes invalid the moment the owning
//! surface is dropped.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11Texture2D, D3D11_BIND_RENDER_TARGET, D3D11_BIND_SHADER_RESOURCE,
    D3D11_RESOURCE_MISC_SHARED, D3D11_TEXTURE2D_DESC, D3D11_USAGE_DEFAULT,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::IDXGIResource;

/// A DXGI shared handle tied to the liveness of its owning surface.
///
/// The raw value is a process-wide identifier, not an owned kernel object;
/// clones share the same validity flag. Importers must check
/// [`SharedHandle::is_valid`] before opening the resource and treat a `false`
/// as a frame to skip.
#[derive(Clone)]
pub struct SharedHandle {
    raw: *mut c_void,
    alive: Arc<AtomicBool>,
}

// SAFETY: `raw` is never dereferenced, only passed to APIs that treat it as
// an identifier, and the liveness flag is atomic.
unsafe impl Send for SharedHandle {}
unsafe impl Sync for SharedHandle {}

impl SharedHandle {
    /// The raw handle value, for APIs that open the shared resource.
    pub fn raw(&self) -> *mut c_void {
        self.raw
    }

    /// The handle's bit pattern, for transmission across a call boundary.
    pub fn as_i64(&self) -> i64 {
        self.raw as i64
    }

    /// Whether the owning surface is still alive.
    pub fn is_valid(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// A D3D11 2D texture created with OS-level sharing enabled.
///
/// Single mip, single slice, no CPU access, bindable as both render target
/// and shader resource so either producer style can draw into it. Dropping
/// the surface revokes every exported [`SharedHandle`] before the texture is
/// released.
pub struct SharedSurface {
    texture: ID3D11Texture2D,
    handle: SharedHandle,
    width: u32,
    height: u32,
    format: DXGI_FORMAT,
}

// SAFETY: the texture interface is only borrowed out, never mutated through
// `&self`, and D3D11 resources are free-threaded.
unsafe impl Send for SharedSurface {}
unsafe impl Sync for SharedSurface {}

impl SharedSurface {
    /// Create a `width` x `height` shared texture on `device`.
    ///
    /// `None` when texture creation, the `IDXGIResource` cast, or handle
    /// extraction fails; each step logs its own failure and there is nothing
    /// to retry with the same arguments.
    pub fn create(
        device: &ID3D11Device,
        width: u32,
        height: u32,
        format: DXGI_FORMAT,
    ) -> Option<Self> {
        let desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: format,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: (D3D11_BIND_RENDER_TARGET.0 | D3D11_BIND_SHADER_RESOURCE.0) as u32,
            CPUAccessFlags: 0,
            MiscFlags: D3D11_RESOURCE_MISC_SHARED.0 as u32,
        };

        let mut texture = None;
        if let Err(e) = unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture as *mut _)) }
        {
            error!("CreateTexture2D failed for {width}x{height} shared surface: {e}");
            return None;
        }
        let texture: ID3D11Texture2D = texture?;

        let resource: IDXGIResource = match texture.cast() {
            Ok(resource) => resource,
            Err(e) => {
                error!("Shared texture does not expose IDXGIResource: {e}");
                return None;
            }
        };

        let raw = match unsafe { resource.GetSharedHandle() } {
            Ok(handle) if !handle.is_invalid() => handle.0,
            Ok(_) => {
                error!("GetSharedHandle returned a null handle");
                return None;
            }
            Err(e) => {
                error!("GetSharedHandle failed: {e}");
                return None;
            }
        };

        debug!("Shared {width}x{height} surface created, handle {raw:p}");

        Some(Self {
            texture,
            handle: SharedHandle {
                raw,
                alive: Arc::new(AtomicBool::new(true)),
            },
            width,
            height,
            format,
        })
    }

    /// Export the handle capability. Clones stay tied to this surface.
    pub fn shared_handle(&self) -> SharedHandle {
        self.handle.clone()
    }

    /// Borrow the owned texture, for producers on the same device.
    pub fn texture(&self) -> &ID3D11Texture2D {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> DXGI_FORMAT {
        self.format
    }
}

impl Drop for SharedSurface {
    fn drop(&mut self) {
        // Revoke every exported handle before the texture is released.
        self.handle.alive.store(false, Ordering::Release);
    }
}
