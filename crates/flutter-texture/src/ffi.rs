//! Hardcoded Flutter Windows embedder constants and C-repr structs for the
//! external-texture registrar.
//!
//! These mirror the texture portion of `flutter_texture_registrar.h`. The
//! structs cross the embedder ABI by pointer, so field order, C casing, and
//! layout are preserved exactly.

#![allow(non_upper_case_globals)]
#![allow(dead_code)]

use std::ffi::c_void;

// ============================================================================
// Enum tags (FlutterDesktopTextureType and friends)
// ============================================================================

/// Texture whose frames arrive as CPU pixel buffers.
pub const kFlutterDesktopTextureTypePixelBuffer: i32 = 0;
/// Texture whose frames arrive as GPU surface descriptors.
pub const kFlutterDesktopTextureTypeGpuSurface: i32 = 1;

pub const kFlutterDesktopPixelFormatNone: i32 = 0;
pub const kFlutterDesktopPixelFormatRGBA8888: i32 = 1;
pub const kFlutterDesktopPixelFormatBGRA8888: i32 = 2;

pub const kFlutterDesktopGpuSurfaceTypeNone: i32 = 0;
/// Surface identified by a DXGI shared handle.
pub const kFlutterDesktopGpuSurfaceTypeDxgiSharedHandle: i32 = 1;
pub const kFlutterDesktopGpuSurfaceTypeD3d11Texture2D: i32 = 2;

/// Texture id the embedder returns when registration fails.
pub const INVALID_TEXTURE_ID: i64 = -1;

// ============================================================================
// Frame payloads
// ============================================================================

/// Fired by the engine once a delivered payload is no longer in use.
pub type ReleaseCallback = unsafe extern "C" fn(release_context: *mut c_void);

/// A CPU pixel buffer lent to the compositor. The bytes are borrowed; the
/// engine runs `release_callback` when it is done reading them.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct FlutterDesktopPixelBuffer {
    pub buffer: *const u8,
    pub width: usize,
    pub height: usize,
    pub release_callback: Option<ReleaseCallback>,
    pub release_context: *mut c_void,
}

/// A GPU surface lent to the compositor.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct FlutterDesktopGpuSurfaceDescriptor {
    /// Must be `size_of::<FlutterDesktopGpuSurfaceDescriptor>()`.
    pub struct_size: usize,
    /// Meaning depends on the surface type; for DXGI shared handles this is
    /// the handle value itself.
    pub handle: *mut c_void,
    /// Physical extents of the surface.
    pub width: usize,
    pub height: usize,
    /// Portion of the surface that carries frame data.
    pub visible_width: usize,
    pub visible_height: usize,
    pub format: i32,
    pub release_callback: Option<ReleaseCallback>,
    pub release_context: *mut c_void,
}

// ============================================================================
// Registration configs
// ============================================================================

/// Pull callback for pixel-buffer textures. Invoked on the raster thread
/// whenever the compositor wants the current frame.
pub type PixelBufferTextureCallback = unsafe extern "C" fn(
    width: usize,
    height: usize,
    user_data: *mut c_void,
) -> *const FlutterDesktopPixelBuffer;

/// Pull callback for GPU-surface textures.
pub type GpuSurfaceTextureCallback = unsafe extern "C" fn(
    width: usize,
    height: usize,
    user_data: *mut c_void,
) -> *const FlutterDesktopGpuSurfaceDescriptor;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct FlutterDesktopPixelBufferTextureConfig {
    pub callback: PixelBufferTextureCallback,
    pub user_data: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct FlutterDesktopGpuSurfaceTextureConfig {
    pub struct_size: usize,
    pub r#type: i32,
    pub callback: GpuSurfaceTextureCallback,
    pub user_data: *mut c_void,
}

/// The config union inside `FlutterDesktopTextureInfo` (anonymous in C).
#[repr(C)]
#[derive(Copy, Clone)]
pub union FlutterDesktopTextureInfoConfig {
    pub pixel_buffer_config: FlutterDesktopPixelBufferTextureConfig,
    pub gpu_surface_config: FlutterDesktopGpuSurfaceTextureConfig,
}

/// Registration payload for `FlutterDesktopTextureRegistrarRegisterExternalTexture`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct FlutterDesktopTextureInfo {
    pub texture_type: i32,
    pub config: FlutterDesktopTextureInfoConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    // The embedder reads these structs through raw pointers; a layout drift
    // corrupts frames silently, so pin the sizes down.

    #[test]
    fn pixel_buffer_layout_is_five_pointer_words() {
        assert_eq!(
            size_of::<FlutterDesktopPixelBuffer>(),
            5 * size_of::<usize>()
        );
    }

    #[test]
    fn gpu_surface_descriptor_layout_matches_the_header() {
        // Eight pointer-sized fields plus an i32 padded to a word.
        assert_eq!(
            size_of::<FlutterDesktopGpuSurfaceDescriptor>(),
            9 * size_of::<usize>()
        );
    }

    #[test]
    fn texture_info_config_is_as_wide_as_its_widest_member() {
        assert_eq!(
            size_of::<FlutterDesktopTextureInfoConfig>(),
            size_of::<FlutterDesktopGpuSurfaceTextureConfig>()
        );
        assert!(
            size_of::<FlutterDesktopPixelBufferTextureConfig>()
                <= size_of::<FlutterDesktopGpuSurfaceTextureConfig>()
        );
    }

    #[test]
    fn callbacks_keep_their_null_niche() {
        // Option<fn> must stay pointer-sized for the C layout to hold.
        assert_eq!(size_of::<Option<ReleaseCallback>>(), size_of::<usize>());
    }
}
