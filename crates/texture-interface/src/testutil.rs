//! Recording registrar fake shared by the unit tests.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use flutter_texture::ffi::{
    FlutterDesktopGpuSurfaceDescriptor, FlutterDesktopPixelBuffer, GpuSurfaceTextureCallback,
    PixelBufferTextureCallback, INVALID_TEXTURE_ID,
};
use flutter_texture::registrar::GpuSurfaceType;
use flutter_texture::{TextureId, TextureInfo, TextureRegistrar};

/// What the fake saw registered under one texture id.
pub enum Registered {
    PixelBuffer {
        callback: PixelBufferTextureCallback,
        user_data: usize,
    },
    GpuSurface {
        kind: GpuSurfaceType,
        callback: GpuSurfaceTextureCallback,
        user_data: usize,
    },
}

/// Hands out sequential texture ids, records every call, and lets tests
/// drive compositor pulls through the captured callbacks.
pub struct FakeRegistrar {
    next_id: AtomicI64,
    pub registered: Mutex<Vec<(TextureId, Registered)>>,
    pub unregistered: Mutex<Vec<TextureId>>,
    pub marked: Mutex<Vec<TextureId>>,
    /// When set, refuse registrations the way a dead engine would.
    pub refuse: AtomicBool,
}

impl FakeRegistrar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(100),
            registered: Mutex::new(Vec::new()),
            unregistered: Mutex::new(Vec::new()),
            marked: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
        })
    }

    /// Pull the current frame of the pixel-buffer texture `id`, the way the
    /// raster thread would.
    pub fn pull_pixel_buffer(&self, id: TextureId) -> Option<FlutterDesktopPixelBuffer> {
        let registered = self.registered.lock().unwrap();
        registered.iter().find_map(|(tid, reg)| match reg {
            Registered::PixelBuffer { callback, user_data } if *tid == id => {
                let descriptor = unsafe { callback(0, 0, *user_data as *mut c_void) };
                if descriptor.is_null() {
                    None
                } else {
                    Some(unsafe { *descriptor })
                }
            }
            _ => None,
        })
    }

    /// Pull the descriptor of the GPU-surface texture `id`.
    pub fn pull_gpu_surface(&self, id: TextureId) -> Option<FlutterDesktopGpuSurfaceDescriptor> {
        let registered = self.registered.lock().unwrap();
        registered.iter().find_map(|(tid, reg)| match reg {
            Registered::GpuSurface { callback, user_data, .. } if *tid == id => {
                let descriptor = unsafe { callback(0, 0, *user_data as *mut c_void) };
                if descriptor.is_null() {
                    None
                } else {
                    Some(unsafe { *descriptor })
                }
            }
            _ => None,
        })
    }

    /// Surface kind texture `id` was registered with, if it is a GPU one.
    pub fn registered_gpu_kind(&self, id: TextureId) -> Option<GpuSurfaceType> {
        let registered = self.registered.lock().unwrap();
        registered.iter().find_map(|(tid, reg)| match reg {
            Registered::GpuSurface { kind, .. } if *tid == id => Some(*kind),
            _ => None,
        })
    }
}

impl TextureRegistrar for FakeRegistrar {
    fn register_texture(&self, info: &TextureInfo) -> TextureId {
        if self.refuse.load(Ordering::SeqCst) {
            return INVALID_TEXTURE_ID;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = match *info {
            TextureInfo::PixelBuffer { callback, user_data } => Registered::PixelBuffer {
                callback,
                user_data: user_data as usize,
            },
            TextureInfo::GpuSurface { kind, callback, user_data } => Registered::GpuSurface {
                kind,
                callback,
                user_data: user_data as usize,
            },
        };
        self.registered.lock().unwrap().push((id, record));
        id
    }

    fn mark_frame_available(&self, texture_id: TextureId) -> bool {
        self.marked.lock().unwrap().push(texture_id);
        true
    }

    fn unregister_texture(&self, texture_id: TextureId, release: Box<dyn FnOnce() + Send>) {
        self.unregistered.lock().unwrap().push(texture_id);
        // The engine confirms asynchronously; the fake confirms right away.
        release();
    }
}
