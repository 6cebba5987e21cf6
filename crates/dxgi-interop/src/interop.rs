//! Import of DXGI shared handles into GLES through ANGLE.
//!
//! One process-wide ANGLE display, config, and ES2 context serve every
//! frame. Each imported frame gets its own pbuffer surface wrapping the
//! shared handle, bound to a fresh GLES texture name. Display bring-up walks
//! [`egl::DISPLAY_TIERS`] once and the outcome is cached for the life of the
//! process, a total failure included, so concurrent first users can never
//! race two displays into existence.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::Mutex;

use libloading::Library;
use once_cell::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::egl::{self, EGLBoolean, EGLenum, EGLint};
use crate::surface::SharedHandle;

// EGL handle types are opaque pointers.
pub type EGLDisplay = *mut c_void;
pub type EGLConfig = *mut c_void;
pub type EGLContext = *mut c_void;
pub type EGLSurface = *mut c_void;
pub type EGLClientBuffer = *mut c_void;

const EGL_NO_DISPLAY: EGLDisplay = std::ptr::null_mut();
const EGL_NO_CONTEXT: EGLContext = std::ptr::null_mut();
const EGL_NO_SURFACE: EGLSurface = std::ptr::null_mut();

// ---------------------------------------------------------------------------
// EGL entry point typedefs
// ---------------------------------------------------------------------------

type EglGetProcAddress = unsafe extern "system" fn(name: *const c_char) -> *mut c_void;

type EglGetPlatformDisplayExt = unsafe extern "system" fn(
    platform: EGLenum,
    native_display: *mut c_void,
    attrib_list: *const EGLint,
) -> EGLDisplay;

type EglInitialize = unsafe extern "system" fn(
    display: EGLDisplay,
    major: *mut EGLint,
    minor: *mut EGLint,
) -> EGLBoolean;

type EglChooseConfig = unsafe extern "system" fn(
    display: EGLDisplay,
    attrib_list: *const EGLint,
    configs: *mut EGLConfig,
    config_size: EGLint,
    num_config: *mut EGLint,
) -> EGLBoolean;

type EglCreateContext = unsafe extern "system" fn(
    display: EGLDisplay,
    config: EGLConfig,
    share_context: EGLContext,
    attrib_list: *const EGLint,
) -> EGLContext;

type EglCreatePbufferFromClientBuffer = unsafe extern "system" fn(
    display: EGLDisplay,
    buftype: EGLenum,
    buffer: EGLClientBuffer,
    config: EGLConfig,
    attrib_list: *const EGLint,
) -> EGLSurface;

type EglDestroySurface =
    unsafe extern "system" fn(display: EGLDisplay, surface: EGLSurface) -> EGLBoolean;

type EglMakeCurrent = unsafe extern "system" fn(
    display: EGLDisplay,
    draw: EGLSurface,
    read: EGLSurface,
    context: EGLContext,
) -> EGLBoolean;

type EglBindTexImage = unsafe extern "system" fn(
    display: EGLDisplay,
    surface: EGLSurface,
    buffer: EGLint,
) -> EGLBoolean;

type EglReleaseTexImage = unsafe extern "system" fn(
    display: EGLDisplay,
    surface: EGLSurface,
    buffer: EGLint,
) -> EGLBoolean;

type EglGetError = unsafe extern "system" fn() -> EGLint;

// ---------------------------------------------------------------------------
// Function table
// ---------------------------------------------------------------------------

/// EGL entry points resolved from the ANGLE runtime shipped with the host.
struct EglFunctions {
    get_proc_address: EglGetProcAddress,
    get_platform_display_ext: EglGetPlatformDisplayExt,
    initialize: EglInitialize,
    choose_config: EglChooseConfig,
    create_context: EglCreateContext,
    create_pbuffer_from_client_buffer: EglCreatePbufferFromClientBuffer,
    destroy_surface: EglDestroySurface,
    make_current: EglMakeCurrent,
    bind_tex_image: EglBindTexImage,
    release_tex_image: EglReleaseTexImage,
    get_error: EglGetError,
    /// Keeps libEGL.dll pinned for the life of the table.
    _egl: Library,
}

unsafe fn resolve<T: Copy>(lib: &Library, name: &'static str) -> Option<T> {
    match unsafe { lib.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Some(*symbol),
        Err(e) => {
            error!("libEGL.dll is missing {name}: {e}");
            None
        }
    }
}

impl EglFunctions {
    /// Resolve the table from libEGL.dll. ANGLE exports the EXT entry points
    /// directly, so everything loads by symbol name.
    fn load() -> Option<Self> {
        let lib = match unsafe { Library::new("libEGL.dll") } {
            Ok(lib) => lib,
            Err(e) => {
                error!("Failed to open libEGL.dll: {e}");
                return None;
            }
        };
        unsafe {
            let fns = Self {
                get_proc_address: resolve(&lib, "eglGetProcAddress")?,
                get_platform_display_ext: resolve(&lib, "eglGetPlatformDisplayEXT")?,
                initialize: resolve(&lib, "eglInitialize")?,
                choose_config: resolve(&lib, "eglChooseConfig")?,
                create_context: resolve(&lib, "eglCreateContext")?,
                create_pbuffer_from_client_buffer: resolve(&lib, "eglCreatePbufferFromClientBuffer")?,
                destroy_surface: resolve(&lib, "eglDestroySurface")?,
                make_current: resolve(&lib, "eglMakeCurrent")?,
                bind_tex_image: resolve(&lib, "eglBindTexImage")?,
                release_tex_image: resolve(&lib, "eglReleaseTexImage")?,
                get_error: resolve(&lib, "eglGetError")?,
                _egl: lib,
            };
            debug!("EGL entry points resolved from libEGL.dll");
            Some(fns)
        }
    }

    /// Last EGL error, rendered for logs.
    fn last_error(&self) -> String {
        egl::error_name(unsafe { (self.get_error)() })
    }
}

// ---------------------------------------------------------------------------
// Process-wide bridge
// ---------------------------------------------------------------------------

/// Process-wide ANGLE display, config, and ES2 context.
pub struct AngleBridge {
    fns: EglFunctions,
    display: EGLDisplay,
    config: EGLConfig,
    context: EGLContext,
    /// Name of the display tier that came up, for diagnostics.
    tier: &'static str,
    /// The context may be current on one thread at a time; every
    /// make-current/GL sequence runs under this lock.
    current_lock: Mutex<()>,
}

// SAFETY: EGL handles are process-wide identifiers, the function table is
// immutable after load, and context currency is serialized by current_lock.
unsafe impl Send for AngleBridge {}
unsafe impl Sync for AngleBridge {}

impl AngleBridge {
    /// The process-wide bridge, brought up on first use.
    ///
    /// `None` means the whole display ladder failed; that outcome is as
    /// final as a successful bring-up and later calls will not retry.
    pub fn get() -> Option<&'static AngleBridge> {
        static BRIDGE: OnceCell<Option<AngleBridge>> = OnceCell::new();
        BRIDGE.get_or_init(AngleBridge::initialize).as_ref()
    }

    fn initialize() -> Option<Self> {
        let fns = EglFunctions::load()?;

        let mut display = EGL_NO_DISPLAY;
        let mut tier = "";
        for candidate in &egl::DISPLAY_TIERS {
            let handle = unsafe {
                (fns.get_platform_display_ext)(
                    egl::EGL_PLATFORM_ANGLE_ANGLE,
                    std::ptr::null_mut(),
                    candidate.attributes.as_ptr(),
                )
            };
            if handle.is_null() {
                warn!(
                    "eglGetPlatformDisplayEXT({}) failed: {}",
                    candidate.name,
                    fns.last_error()
                );
                continue;
            }
            let (mut major, mut minor): (EGLint, EGLint) = (0, 0);
            if unsafe { (fns.initialize)(handle, &mut major, &mut minor) } != egl::EGL_TRUE {
                warn!("eglInitialize({}) failed: {}", candidate.name, fns.last_error());
                continue;
            }
            debug!(
                "ANGLE display initialized on tier {} (EGL {}.{})",
                candidate.name, major, minor
            );
            display = handle;
            tier = candidate.name;
            break;
        }
        if display.is_null() {
            error!("Every ANGLE display tier failed; GPU surface binding is off for this process");
            return None;
        }

        let mut config: EGLConfig = std::ptr::null_mut();
        let mut num_configs: EGLint = 0;
        let chose = unsafe {
            (fns.choose_config)(
                display,
                egl::CONFIG_ATTRIBUTES.as_ptr(),
                &mut config,
                1,
                &mut num_configs,
            )
        };
        if chose != egl::EGL_TRUE || num_configs < 1 || config.is_null() {
            error!(
                "eglChooseConfig found no RGBA8888 pbuffer config: {}",
                fns.last_error()
            );
            return None;
        }

        let context = unsafe {
            (fns.create_context)(display, config, EGL_NO_CONTEXT, egl::CONTEXT_ATTRIBUTES.as_ptr())
        };
        if context.is_null() {
            error!("eglCreateContext failed: {}", fns.last_error());
            return None;
        }

        Some(Self {
            fns,
            display,
            config,
            context,
            tier,
            current_lock: Mutex::new(()),
        })
    }

    /// Display tier the bridge came up on.
    pub fn tier(&self) -> &'static str {
        self.tier
    }

    /// Wrap `handle` in a pbuffer surface and bind it to a fresh GLES
    /// texture name, sampled with nearest filtering.
    ///
    /// Failures here are per-frame: the display and context stay usable for
    /// the next caller.
    pub fn bind_surface(
        &'static self,
        handle: &SharedHandle,
        width: u32,
        height: u32,
    ) -> Option<BoundSurface> {
        if !handle.is_valid() {
            warn!("Refusing to bind a revoked shared handle");
            return None;
        }

        let attributes = egl::pbuffer_attributes(width, height);
        let surface = unsafe {
            (self.fns.create_pbuffer_from_client_buffer)(
                self.display,
                egl::EGL_D3D_TEXTURE_2D_SHARE_HANDLE_ANGLE,
                handle.raw(),
                self.config,
                attributes.as_ptr(),
            )
        };
        if surface.is_null() {
            error!(
                "eglCreatePbufferFromClientBuffer failed for {}x{}: {}",
                width,
                height,
                self.fns.last_error()
            );
            return None;
        }

        let guard = self.current_lock.lock().unwrap_or_else(|e| e.into_inner());
        if unsafe { (self.fns.make_current)(self.display, surface, surface, self.context) }
            != egl::EGL_TRUE
        {
            error!("eglMakeCurrent failed: {}", self.fns.last_error());
            drop(guard);
            unsafe { (self.fns.destroy_surface)(self.display, surface) };
            return None;
        }

        self.ensure_gles_loaded();

        let mut texture: gl::types::GLuint = 0;
        let mut bound = false;
        unsafe {
            gl::GenTextures(1, &mut texture);
            if texture != 0 {
                gl::BindTexture(gl::TEXTURE_2D, texture);
                if (self.fns.bind_tex_image)(self.display, surface, egl::EGL_BACK_BUFFER)
                    == egl::EGL_TRUE
                {
                    // Single-mip surface; sample it with nearest filtering.
                    gl::TexParameteri(
                        gl::TEXTURE_2D,
                        gl::TEXTURE_MIN_FILTER,
                        gl::NEAREST as gl::types::GLint,
                    );
                    gl::TexParameteri(
                        gl::TEXTURE_2D,
                        gl::TEXTURE_MAG_FILTER,
                        gl::NEAREST as gl::types::GLint,
                    );
                    bound = true;
                } else {
                    error!("eglBindTexImage failed: {}", self.fns.last_error());
                    gl::DeleteTextures(1, &texture);
                }
                gl::BindTexture(gl::TEXTURE_2D, 0);
            } else {
                error!("glGenTextures returned no texture name");
            }
            // Leave nothing current; the compositor owns this thread's state.
            (self.fns.make_current)(self.display, EGL_NO_SURFACE, EGL_NO_SURFACE, EGL_NO_CONTEXT);
        }
        drop(guard);

        if !bound {
            unsafe { (self.fns.destroy_surface)(self.display, surface) };
            return None;
        }

        debug!("Shared handle bound: {width}x{height} pbuffer on GLES texture {texture}");

        Some(BoundSurface {
            bridge: self,
            surface,
            gl_texture: texture,
            width,
            height,
        })
    }

    /// Load the GLES entry points once. ANGLE implements
    /// EGL_KHR_get_all_proc_addresses, so core functions resolve through
    /// eglGetProcAddress; a direct libGLESv2.dll lookup catches any the
    /// runtime declines to hand out.
    fn ensure_gles_loaded(&self) {
        // The cell keeps the fallback library pinned for the life of the
        // process.
        static GLES_LOADED: OnceCell<Option<Library>> = OnceCell::new();
        GLES_LOADED.get_or_init(|| {
            let fallback = unsafe { Library::new("libGLESv2.dll") }.ok();
            gl::load_with(|name| {
                let Ok(symbol) = CString::new(name) else {
                    return std::ptr::null();
                };
                let address = unsafe { (self.fns.get_proc_address)(symbol.as_ptr()) };
                if !address.is_null() {
                    return address as *const _;
                }
                let Some(lib) = &fallback else {
                    return std::ptr::null();
                };
                match unsafe { lib.get::<*const c_void>(name.as_bytes()) } {
                    Ok(symbol) => *symbol,
                    Err(_) => std::ptr::null(),
                }
            });
            debug!("GLES entry points loaded through eglGetProcAddress");
            fallback
        });
    }
}

// ---------------------------------------------------------------------------
// Bound surfaces
// ---------------------------------------------------------------------------

/// A shared surface imported into GLES: the pbuffer wrapping the D3D share
/// handle plus the texture name it is bound to.
///
/// Dropping releases only this frame's pbuffer and texture name; the
/// process-wide display and context are untouched.
pub struct BoundSurface {
    bridge: &'static AngleBridge,
    surface: EGLSurface,
    gl_texture: gl::types::GLuint,
    width: u32,
    height: u32,
}

// SAFETY: the surface handle is only used through the bridge, which
// serializes context currency; the texture name is a plain integer.
unsafe impl Send for BoundSurface {}
unsafe impl Sync for BoundSurface {}

impl BoundSurface {
    /// GLES texture name carrying the imported image.
    pub fn gl_texture(&self) -> gl::types::GLuint {
        self.gl_texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for BoundSurface {
    fn drop(&mut self) {
        let fns = &self.bridge.fns;
        let guard = self
            .bridge
            .current_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        unsafe {
            // Deleting the texture name needs the context current.
            if (fns.make_current)(self.bridge.display, self.surface, self.surface, self.bridge.context)
                == egl::EGL_TRUE
            {
                (fns.release_tex_image)(self.bridge.display, self.surface, egl::EGL_BACK_BUFFER);
                gl::DeleteTextures(1, &self.gl_texture);
                (fns.make_current)(
                    self.bridge.display,
                    EGL_NO_SURFACE,
                    EGL_NO_SURFACE,
                    EGL_NO_CONTEXT,
                );
            } else {
                warn!(
                    "eglMakeCurrent failed during surface teardown: {}",
                    fns.last_error()
                );
            }
            (fns.destroy_surface)(self.bridge.display, self.surface);
        }
        drop(guard);
    }
}
