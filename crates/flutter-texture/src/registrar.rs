//! The registrar seam between frame sources and the host compositor.
//!
//! Frame sources talk to the host through [`TextureRegistrar`] only, so the
//! whole texture lifecycle can be driven by a recording fake in tests and by
//! the live embedder in production.

use std::ffi::c_void;
use std::mem::size_of;

use num_derive::FromPrimitive;

use crate::ffi;

/// Host-assigned identity of a registered external texture.
pub type TextureId = i64;

/// GPU surface kinds understood by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum GpuSurfaceType {
    None = 0,
    /// A DXGI shared handle naming a D3D11 texture in another device.
    DxgiSharedHandle = 1,
    /// A raw `ID3D11Texture2D` pointer within the engine's own device.
    D3d11Texture2D = 2,
}

/// Pixel formats understood by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum PixelFormat {
    None = 0,
    Rgba8888 = 1,
    Bgra8888 = 2,
}

/// Registration payload for [`TextureRegistrar::register_texture`].
///
/// Carries the raw pull callback and its context; the callback stays valid
/// for as long as the registration lives, which is the caller's problem to
/// arrange (frame sources keep their state alive until the unregister
/// release fires).
#[derive(Clone, Copy)]
pub enum TextureInfo {
    PixelBuffer {
        callback: ffi::PixelBufferTextureCallback,
        user_data: *mut c_void,
    },
    GpuSurface {
        kind: GpuSurfaceType,
        callback: ffi::GpuSurfaceTextureCallback,
        user_data: *mut c_void,
    },
}

impl TextureInfo {
    /// Lower to the C registration struct.
    pub fn to_raw(&self) -> ffi::FlutterDesktopTextureInfo {
        match *self {
            TextureInfo::PixelBuffer { callback, user_data } => ffi::FlutterDesktopTextureInfo {
                texture_type: ffi::kFlutterDesktopTextureTypePixelBuffer,
                config: ffi::FlutterDesktopTextureInfoConfig {
                    pixel_buffer_config: ffi::FlutterDesktopPixelBufferTextureConfig {
                        callback,
                        user_data,
                    },
                },
            },
            TextureInfo::GpuSurface { kind, callback, user_data } => {
                ffi::FlutterDesktopTextureInfo {
                    texture_type: ffi::kFlutterDesktopTextureTypeGpuSurface,
                    config: ffi::FlutterDesktopTextureInfoConfig {
                        gpu_surface_config: ffi::FlutterDesktopGpuSurfaceTextureConfig {
                            struct_size: size_of::<ffi::FlutterDesktopGpuSurfaceTextureConfig>(),
                            r#type: kind as i32,
                            callback,
                            user_data,
                        },
                    },
                }
            }
        }
    }
}

/// The host's external-texture surface.
///
/// Implemented by the live embedder on Windows and by recording fakes in
/// tests. All three calls may come from any thread.
pub trait TextureRegistrar: Send + Sync {
    /// Register a texture and return its host-assigned id, or
    /// [`ffi::INVALID_TEXTURE_ID`] when the host refuses.
    fn register_texture(&self, info: &TextureInfo) -> TextureId;

    /// Tell the compositor a new frame is ready to pull.
    fn mark_frame_available(&self, texture_id: TextureId) -> bool;

    /// Unregister a texture. `release` runs once the host guarantees no
    /// further pulls; pull state must stay alive until then.
    fn unregister_texture(&self, texture_id: TextureId, release: Box<dyn FnOnce() + Send>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    unsafe extern "C" fn null_pixel_pull(
        _w: usize,
        _h: usize,
        _user_data: *mut c_void,
    ) -> *const ffi::FlutterDesktopPixelBuffer {
        std::ptr::null()
    }

    unsafe extern "C" fn null_gpu_pull(
        _w: usize,
        _h: usize,
        _user_data: *mut c_void,
    ) -> *const ffi::FlutterDesktopGpuSurfaceDescriptor {
        std::ptr::null()
    }

    #[test]
    fn surface_kinds_round_trip_through_their_tags() {
        assert_eq!(
            GpuSurfaceType::from_i32(ffi::kFlutterDesktopGpuSurfaceTypeDxgiSharedHandle),
            Some(GpuSurfaceType::DxgiSharedHandle)
        );
        assert_eq!(GpuSurfaceType::DxgiSharedHandle as i32, 1);
        assert_eq!(PixelFormat::from_i32(ffi::kFlutterDesktopPixelFormatRGBA8888), Some(PixelFormat::Rgba8888));
        assert_eq!(GpuSurfaceType::from_i32(99), None);
    }

    #[test]
    fn pixel_buffer_info_lowers_with_the_right_tag() {
        let info = TextureInfo::PixelBuffer {
            callback: null_pixel_pull,
            user_data: 0x10 as *mut c_void,
        };
        let raw = info.to_raw();
        assert_eq!(raw.texture_type, ffi::kFlutterDesktopTextureTypePixelBuffer);
        let config = unsafe { raw.config.pixel_buffer_config };
        assert_eq!(config.user_data as usize, 0x10);
    }

    #[test]
    fn gpu_surface_info_lowers_with_struct_size_and_kind() {
        let info = TextureInfo::GpuSurface {
            kind: GpuSurfaceType::DxgiSharedHandle,
            callback: null_gpu_pull,
            user_data: std::ptr::null_mut(),
        };
        let raw = info.to_raw();
        assert_eq!(raw.texture_type, ffi::kFlutterDesktopTextureTypeGpuSurface);
        let config = unsafe { raw.config.gpu_surface_config };
        assert_eq!(
            config.struct_size,
            size_of::<ffi::FlutterDesktopGpuSurfaceTextureConfig>()
        );
        assert_eq!(config.r#type, ffi::kFlutterDesktopGpuSurfaceTypeDxgiSharedHandle);
    }
}
