//! Texture registrar backed by the live Flutter Windows embedder.
//!
//! The embedder's C entry points are resolved at runtime from
//! `flutter_windows.dll`, which is already loaded into any process hosting a
//! Flutter view, so the crate never links against it.

use std::ffi::c_void;

use libloading::Library;
use once_cell::sync::OnceCell;
use tracing::{debug, error};

use crate::ffi::{self, FlutterDesktopTextureInfo};
use crate::registrar::{TextureId, TextureInfo, TextureRegistrar};

type RegisterExternalTexture = unsafe extern "C" fn(
    texture_registrar: *mut c_void,
    info: *const FlutterDesktopTextureInfo,
) -> i64;

type UnregisterExternalTexture = unsafe extern "C" fn(
    texture_registrar: *mut c_void,
    texture_id: i64,
    callback: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
    user_data: *mut c_void,
);

type MarkExternalTextureFrameAvailable =
    unsafe extern "C" fn(texture_registrar: *mut c_void, texture_id: i64) -> bool;

/// Embedder texture entry points, resolved once per process.
struct EmbedderTextureFns {
    register: RegisterExternalTexture,
    unregister: UnregisterExternalTexture,
    mark_frame_available: MarkExternalTextureFrameAvailable,
    /// Keeps flutter_windows.dll pinned for the life of the table.
    _lib: Library,
}

// SAFETY: plain function pointers into a library that is never unloaded (the
// Library handle lives next to them).
unsafe impl Send for EmbedderTextureFns {}
unsafe impl Sync for EmbedderTextureFns {}

unsafe fn resolve<T: Copy>(lib: &Library, name: &'static str) -> Option<T> {
    match unsafe { lib.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Some(*symbol),
        Err(e) => {
            error!("flutter_windows.dll is missing {name}: {e}");
            None
        }
    }
}

impl EmbedderTextureFns {
    fn load() -> Option<Self> {
        let lib = match unsafe { Library::new("flutter_windows.dll") } {
            Ok(lib) => lib,
            Err(e) => {
                error!("Failed to open flutter_windows.dll: {e}");
                return None;
            }
        };
        unsafe {
            let fns = Self {
                register: resolve(
                    &lib,
                    "FlutterDesktopTextureRegistrarRegisterExternalTexture",
                )?,
                unregister: resolve(
                    &lib,
                    "FlutterDesktopTextureRegistrarUnregisterExternalTexture",
                )?,
                mark_frame_available: resolve(
                    &lib,
                    "FlutterDesktopTextureRegistrarMarkExternalTextureFrameAvailable",
                )?,
                _lib: lib,
            };
            debug!("Flutter embedder texture entry points resolved");
            Some(fns)
        }
    }

    fn get() -> Option<&'static Self> {
        static FNS: OnceCell<Option<EmbedderTextureFns>> = OnceCell::new();
        FNS.get_or_init(Self::load).as_ref()
    }
}

/// [`TextureRegistrar`] over a live `FlutterDesktopTextureRegistrarRef`.
pub struct DesktopTextureRegistrar {
    texture_registrar: *mut c_void,
}

// SAFETY: the registrar ref is an opaque engine-owned pointer and the
// embedder documents the texture registrar calls as thread-safe.
unsafe impl Send for DesktopTextureRegistrar {}
unsafe impl Sync for DesktopTextureRegistrar {}

impl DesktopTextureRegistrar {
    /// Wrap the texture registrar ref the embedder hands to the plugin at
    /// registration time. `None` when the embedder entry points cannot be
    /// resolved.
    pub fn new(texture_registrar: *mut c_void) -> Option<Self> {
        if texture_registrar.is_null() {
            error!("Embedder handed a null texture registrar");
            return None;
        }
        EmbedderTextureFns::get()?;
        Some(Self { texture_registrar })
    }
}

unsafe extern "C" fn run_release(user_data: *mut c_void) {
    // Reconstitute the boxed closure from unregister_texture and run it once.
    let release = unsafe { Box::from_raw(user_data as *mut Box<dyn FnOnce() + Send>) };
    release();
}

impl TextureRegistrar for DesktopTextureRegistrar {
    fn register_texture(&self, info: &TextureInfo) -> TextureId {
        let Some(fns) = EmbedderTextureFns::get() else {
            return ffi::INVALID_TEXTURE_ID;
        };
        let raw = info.to_raw();
        unsafe { (fns.register)(self.texture_registrar, &raw) }
    }

    fn mark_frame_available(&self, texture_id: TextureId) -> bool {
        let Some(fns) = EmbedderTextureFns::get() else {
            return false;
        };
        unsafe { (fns.mark_frame_available)(self.texture_registrar, texture_id) }
    }

    fn unregister_texture(&self, texture_id: TextureId, release: Box<dyn FnOnce() + Send>) {
        let Some(fns) = EmbedderTextureFns::get() else {
            // No embedder, no pending pulls; release immediately.
            release();
            return;
        };
        let user_data = Box::into_raw(Box::new(release)) as *mut c_void;
        unsafe {
            (fns.unregister)(
                self.texture_registrar,
                texture_id,
                Some(run_release),
                user_data,
            )
        }
    }
}
