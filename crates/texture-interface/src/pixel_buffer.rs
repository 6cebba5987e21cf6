//! CPU pixel-buffer frame sink.
//!
//! The producer hands over raw pointers; the sink never copies and never
//! owns the bytes. Every accepted buffer carries a release ticket, the
//! callback and context configured at the moment the buffer arrived, and
//! that ticket fires exactly once: through the descriptor once the
//! compositor has pulled the buffer, or from the sink when the buffer is
//! replaced or torn down without ever being pulled.

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use flutter_texture::ffi::{self, FlutterDesktopPixelBuffer, ReleaseCallback};
use flutter_texture::{TextureId, TextureInfo, TextureRegistrar};

/// One accepted buffer generation.
struct BufferState {
    buffer: *const u8,
    width: usize,
    height: usize,
    release_callback: Option<ReleaseCallback>,
    release_context: *mut c_void,
    /// Set once the compositor has pulled this generation.
    delivered: bool,
}

impl Default for BufferState {
    fn default() -> Self {
        Self {
            buffer: std::ptr::null(),
            width: 0,
            height: 0,
            release_callback: None,
            release_context: std::ptr::null_mut(),
            delivered: false,
        }
    }
}

struct SourceState {
    current: BufferState,
    /// Ticket applied to the next accepted buffer.
    next_release_callback: Option<ReleaseCallback>,
    next_release_context: *mut c_void,
}

/// State shared between the sink and the compositor's pull callback.
struct PixelBufferSource {
    state: Mutex<SourceState>,
    /// Snapshot handed to the compositor. Only the pull path writes it, and
    /// the engine pulls from a single raster thread, so the pointer handed
    /// back stays stable until the next pull.
    pulled: UnsafeCell<FlutterDesktopPixelBuffer>,
}

// SAFETY: `pulled` is written only inside the pull callback (single raster
// thread) and read only through the pointer that pull returns; all
// cross-thread state sits behind `state`.
unsafe impl Send for PixelBufferSource {}
unsafe impl Sync for PixelBufferSource {}

impl PixelBufferSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SourceState {
                current: BufferState::default(),
                next_release_callback: None,
                next_release_context: std::ptr::null_mut(),
            }),
            pulled: UnsafeCell::new(FlutterDesktopPixelBuffer {
                buffer: std::ptr::null(),
                width: 0,
                height: 0,
                release_callback: None,
                release_context: std::ptr::null_mut(),
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept a new buffer, settling the previous generation's ticket if the
    /// compositor never saw it.
    fn update(&self, buffer: *const u8, width: usize, height: usize) {
        let mut state = self.lock();
        let (release_callback, release_context) =
            (state.next_release_callback, state.next_release_context);
        let previous = std::mem::replace(
            &mut state.current,
            BufferState {
                buffer,
                width,
                height,
                release_callback,
                release_context,
                delivered: false,
            },
        );
        drop(state);
        Self::settle_undelivered(previous);
    }

    /// Fire a generation's ticket when the compositor never pulled it.
    fn settle_undelivered(state: BufferState) {
        if state.delivered || state.buffer.is_null() {
            return;
        }
        if let Some(callback) = state.release_callback {
            unsafe { callback(state.release_context) };
        }
    }

    /// Teardown: settle whatever the compositor never saw.
    fn settle_on_teardown(&self) {
        let mut state = self.lock();
        let last = std::mem::take(&mut state.current);
        drop(state);
        Self::settle_undelivered(last);
    }

    /// Compositor pull: snapshot the current generation under the lock and
    /// hand out a stable pointer. The requested extents are advisory; the
    /// buffer is whatever the producer pushed last.
    ///
    /// The release ticket rides along only on a generation's first delivery.
    /// Repeat pulls of the same generation see the same bytes but no ticket,
    /// so the consumer can never fire it twice.
    fn acquire(&self, _width: usize, _height: usize) -> *const FlutterDesktopPixelBuffer {
        let mut state = self.lock();
        let first_delivery = !state.current.delivered;
        state.current.delivered = true;
        let snapshot = FlutterDesktopPixelBuffer {
            buffer: state.current.buffer,
            width: state.current.width,
            height: state.current.height,
            release_callback: if first_delivery {
                state.current.release_callback
            } else {
                None
            },
            release_context: if first_delivery {
                state.current.release_context
            } else {
                std::ptr::null_mut()
            },
        };
        drop(state);
        unsafe { *self.pulled.get() = snapshot };
        self.pulled.get() as *const FlutterDesktopPixelBuffer
    }
}

unsafe extern "C" fn pixel_buffer_pull(
    width: usize,
    height: usize,
    user_data: *mut c_void,
) -> *const FlutterDesktopPixelBuffer {
    if user_data.is_null() {
        return std::ptr::null();
    }
    let source = unsafe { &*(user_data as *const PixelBufferSource) };
    source.acquire(width, height)
}

/// A registered pixel-buffer texture.
///
/// Owns no pixel memory. [`CpuFrame::update`] publishes the producer's
/// pointer and nudges the compositor; dropping the frame unregisters the
/// texture first (keeping pull state alive until the host confirms) and then
/// settles any undelivered release ticket.
pub struct CpuFrame {
    registrar: Arc<dyn TextureRegistrar>,
    source: Arc<PixelBufferSource>,
    texture_id: TextureId,
}

impl CpuFrame {
    /// Register an empty pixel-buffer texture. No GPU resources are touched.
    ///
    /// A host refusal surfaces as [`ffi::INVALID_TEXTURE_ID`] from
    /// [`CpuFrame::texture_id`]; the sink still exists so updates are safe,
    /// they just go nowhere.
    pub fn new(registrar: Arc<dyn TextureRegistrar>) -> Self {
        let source = PixelBufferSource::new();
        let info = TextureInfo::PixelBuffer {
            callback: pixel_buffer_pull,
            user_data: Arc::as_ptr(&source) as *mut c_void,
        };
        let texture_id = registrar.register_texture(&info);
        if texture_id == ffi::INVALID_TEXTURE_ID {
            warn!("Host refused pixel-buffer texture registration");
        } else {
            debug!("Pixel-buffer texture registered with id {texture_id}");
        }
        Self {
            registrar,
            source,
            texture_id,
        }
    }

    /// Host-assigned texture id.
    pub fn texture_id(&self) -> TextureId {
        self.texture_id
    }

    /// Publish a new buffer and signal the compositor.
    ///
    /// The bytes stay owned by the caller and must outlive their delivery;
    /// the configured release ticket says when that is.
    pub fn update(&self, buffer: *const u8, width: usize, height: usize) {
        self.source.update(buffer, width, height);
        self.registrar.mark_frame_available(self.texture_id);
    }

    /// Callback fired exactly once per accepted buffer when the buffer is no
    /// longer needed. Applies to buffers accepted after this call.
    pub fn set_release_callback(&self, callback: Option<ReleaseCallback>) {
        self.source.lock().next_release_callback = callback;
    }

    /// Opaque context handed to the release callback.
    pub fn set_release_context(&self, context: *mut c_void) {
        self.source.lock().next_release_context = context;
    }
}

impl Drop for CpuFrame {
    fn drop(&mut self) {
        // Unregister first so no further pulls arrive; the source stays
        // alive until the host confirms.
        let source = self.source.clone();
        self.registrar
            .unregister_texture(self.texture_id, Box::new(move || drop(source)));
        self.source.settle_on_teardown();
    }
}
