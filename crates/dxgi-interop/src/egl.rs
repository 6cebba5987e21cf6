//! EGL and ANGLE constants, attribute tables, and error names.
//!
//! Values are hardcoded from the Khronos `egl.h` and ANGLE's
//! `eglext_angle.h` headers. The display fallback ladder is the same one the
//! Flutter engine walks when it brings ANGLE up, so a surface bound here
//! lands on the same adapter family the compositor renders with. Everything
//! in this module is plain data; nothing touches a device.

#![allow(dead_code)]

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

pub type EGLint = i32;
pub type EGLenum = u32;
/// EGL booleans are 32-bit on the wire, not Rust `bool`s.
pub type EGLBoolean = u32;

pub const EGL_FALSE: EGLBoolean = 0;
pub const EGL_TRUE: EGLBoolean = 1;

// ============================================================================
// Core EGL (egl.h)
// ============================================================================

pub const EGL_NONE: EGLint = 0x3038;

pub const EGL_ALPHA_SIZE: EGLint = 0x3021;
pub const EGL_BLUE_SIZE: EGLint = 0x3022;
pub const EGL_GREEN_SIZE: EGLint = 0x3023;
pub const EGL_RED_SIZE: EGLint = 0x3024;
pub const EGL_SURFACE_TYPE: EGLint = 0x3033;
pub const EGL_RENDERABLE_TYPE: EGLint = 0x3040;

pub const EGL_PBUFFER_BIT: EGLint = 0x0001;
pub const EGL_OPENGL_ES2_BIT: EGLint = 0x0004;

pub const EGL_HEIGHT: EGLint = 0x3056;
pub const EGL_WIDTH: EGLint = 0x3057;

pub const EGL_TEXTURE_RGBA: EGLint = 0x305E;
pub const EGL_TEXTURE_FORMAT: EGLint = 0x3080;
pub const EGL_TEXTURE_TARGET: EGLint = 0x3081;
pub const EGL_TEXTURE_2D: EGLint = 0x305F;
pub const EGL_BACK_BUFFER: EGLint = 0x3084;

pub const EGL_CONTEXT_CLIENT_VERSION: EGLint = 0x3098;

// ============================================================================
// EGL_ANGLE_platform_angle (eglext_angle.h)
// ============================================================================

pub const EGL_PLATFORM_ANGLE_ANGLE: EGLenum = 0x3202;
pub const EGL_PLATFORM_ANGLE_TYPE_ANGLE: EGLint = 0x3203;
pub const EGL_PLATFORM_ANGLE_MAX_VERSION_MAJOR_ANGLE: EGLint = 0x3204;
pub const EGL_PLATFORM_ANGLE_MAX_VERSION_MINOR_ANGLE: EGLint = 0x3205;
pub const EGL_PLATFORM_ANGLE_TYPE_D3D9_ANGLE: EGLint = 0x3207;
pub const EGL_PLATFORM_ANGLE_TYPE_D3D11_ANGLE: EGLint = 0x3208;
pub const EGL_PLATFORM_ANGLE_DEVICE_TYPE_ANGLE: EGLint = 0x3209;
pub const EGL_PLATFORM_ANGLE_DEVICE_TYPE_D3D_WARP_ANGLE: EGLint = 0x320B;
pub const EGL_PLATFORM_ANGLE_ENABLE_AUTOMATIC_TRIM_ANGLE: EGLint = 0x320F;

// EGL_ANGLE_d3d_share_handle_client_buffer
pub const EGL_D3D_TEXTURE_2D_SHARE_HANDLE_ANGLE: EGLenum = 0x3200;

// ============================================================================
// Errors
// ============================================================================

/// EGL error codes, for readable logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum EglError {
    Success = 0x3000,
    NotInitialized = 0x3001,
    BadAccess = 0x3002,
    BadAlloc = 0x3003,
    BadAttribute = 0x3004,
    BadConfig = 0x3005,
    BadContext = 0x3006,
    BadCurrentSurface = 0x3007,
    BadDisplay = 0x3008,
    BadMatch = 0x3009,
    BadNativePixmap = 0x300A,
    BadNativeWindow = 0x300B,
    BadParameter = 0x300C,
    BadSurface = 0x300D,
    ContextLost = 0x300E,
}

/// Render a raw `eglGetError` code for logging.
pub fn error_name(code: EGLint) -> String {
    match EglError::from_i32(code) {
        Some(error) => format!("{error:?}"),
        None => format!("0x{code:04X}"),
    }
}

// ============================================================================
// Attribute tables
// ============================================================================

/// One ANGLE display-creation attempt.
pub struct DisplayTier {
    /// Tier name for logs.
    pub name: &'static str,
    /// `eglGetPlatformDisplayEXT` attribute list, EGL_NONE-terminated.
    pub attributes: &'static [EGLint],
}

/// Display fallback ladder, best first: D3D11, D3D11 capped at feature level
/// 9_3, D3D9, then D3D11 on the WARP software rasterizer. The first tier
/// whose display also initializes wins; when the whole ladder fails, GPU
/// surface binding stays off for the rest of the process.
pub const DISPLAY_TIERS: [DisplayTier; 4] = [
    DisplayTier {
        name: "D3D11",
        attributes: &[
            EGL_PLATFORM_ANGLE_TYPE_ANGLE,
            EGL_PLATFORM_ANGLE_TYPE_D3D11_ANGLE,
            EGL_PLATFORM_ANGLE_ENABLE_AUTOMATIC_TRIM_ANGLE,
            EGL_TRUE as EGLint,
            EGL_NONE,
        ],
    },
    DisplayTier {
        name: "D3D11 FL9_3",
        attributes: &[
            EGL_PLATFORM_ANGLE_TYPE_ANGLE,
            EGL_PLATFORM_ANGLE_TYPE_D3D11_ANGLE,
            EGL_PLATFORM_ANGLE_MAX_VERSION_MAJOR_ANGLE,
            9,
            EGL_PLATFORM_ANGLE_MAX_VERSION_MINOR_ANGLE,
            3,
            EGL_PLATFORM_ANGLE_ENABLE_AUTOMATIC_TRIM_ANGLE,
            EGL_TRUE as EGLint,
            EGL_NONE,
        ],
    },
    DisplayTier {
        name: "D3D9",
        attributes: &[
            EGL_PLATFORM_ANGLE_TYPE_ANGLE,
            EGL_PLATFORM_ANGLE_TYPE_D3D9_ANGLE,
            EGL_PLATFORM_ANGLE_ENABLE_AUTOMATIC_TRIM_ANGLE,
            EGL_TRUE as EGLint,
            EGL_NONE,
        ],
    },
    DisplayTier {
        name: "D3D11 WARP",
        attributes: &[
            EGL_PLATFORM_ANGLE_TYPE_ANGLE,
            EGL_PLATFORM_ANGLE_TYPE_D3D11_ANGLE,
            EGL_PLATFORM_ANGLE_DEVICE_TYPE_ANGLE,
            EGL_PLATFORM_ANGLE_DEVICE_TYPE_D3D_WARP_ANGLE,
            EGL_PLATFORM_ANGLE_ENABLE_AUTOMATIC_TRIM_ANGLE,
            EGL_TRUE as EGLint,
            EGL_NONE,
        ],
    },
];

/// Config request: 8-bit RGBA, ES2-renderable, pbuffer-capable.
pub const CONFIG_ATTRIBUTES: [EGLint; 13] = [
    EGL_RED_SIZE,
    8,
    EGL_GREEN_SIZE,
    8,
    EGL_BLUE_SIZE,
    8,
    EGL_ALPHA_SIZE,
    8,
    EGL_RENDERABLE_TYPE,
    EGL_OPENGL_ES2_BIT,
    EGL_SURFACE_TYPE,
    EGL_PBUFFER_BIT,
    EGL_NONE,
];

/// Context request: ES2.
pub const CONTEXT_ATTRIBUTES: [EGLint; 3] = [EGL_CONTEXT_CLIENT_VERSION, 2, EGL_NONE];

/// Attribute list for a pbuffer wrapping a D3D share handle, sized to the
/// frame and bindable as an RGBA `TEXTURE_2D` image.
pub fn pbuffer_attributes(width: u32, height: u32) -> [EGLint; 9] {
    [
        EGL_WIDTH,
        width as EGLint,
        EGL_HEIGHT,
        height as EGLint,
        EGL_TEXTURE_TARGET,
        EGL_TEXTURE_2D,
        EGL_TEXTURE_FORMAT,
        EGL_TEXTURE_RGBA,
        EGL_NONE,
    ]
}
