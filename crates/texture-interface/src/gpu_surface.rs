//! GPU-surface frames: descriptor construction, registration, and the
//! platform resources behind them.

use std::ffi::c_void;
use std::sync::Arc;

use tracing::{debug, warn};

use flutter_texture::ffi::{self, FlutterDesktopGpuSurfaceDescriptor};
use flutter_texture::registrar::GpuSurfaceType;
use flutter_texture::{TextureId, TextureInfo, TextureRegistrar};

/// Descriptor shared with the compositor's pull callback. Immutable after
/// construction; the surface behind the handle is repainted in place, so
/// every pull returns the same descriptor.
struct GpuSurfaceSource {
    descriptor: FlutterDesktopGpuSurfaceDescriptor,
}

// SAFETY: the descriptor never changes after construction and its handle is
// an opaque identifier, never dereferenced here.
unsafe impl Send for GpuSurfaceSource {}
unsafe impl Sync for GpuSurfaceSource {}

/// Surface teardown is driven by explicit destroy calls, not the engine's
/// release signal.
unsafe extern "C" fn release_nothing(_context: *mut c_void) {}

unsafe extern "C" fn gpu_surface_pull(
    _width: usize,
    _height: usize,
    user_data: *mut c_void,
) -> *const FlutterDesktopGpuSurfaceDescriptor {
    if user_data.is_null() {
        return std::ptr::null();
    }
    let source = unsafe { &*(user_data as *const GpuSurfaceSource) };
    &source.descriptor
}

/// A GPU surface registered with the compositor as a DXGI shared handle.
///
/// Owns the registration and the descriptor only; the D3D11 texture and the
/// GLES binding live in [`GpuFrame`], which embeds this type.
pub struct GpuSurfaceRegistration {
    registrar: Arc<dyn TextureRegistrar>,
    source: Arc<GpuSurfaceSource>,
    texture_id: TextureId,
    handle_bits: i64,
}

impl GpuSurfaceRegistration {
    /// Build the shared-handle descriptor and register it.
    ///
    /// `handle` is the raw shared handle value; the full extent of the
    /// surface is visible. `None` when the host refuses the registration.
    pub fn new(
        registrar: Arc<dyn TextureRegistrar>,
        handle: *mut c_void,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let source = Arc::new(GpuSurfaceSource {
            descriptor: FlutterDesktopGpuSurfaceDescriptor {
                struct_size: std::mem::size_of::<FlutterDesktopGpuSurfaceDescriptor>(),
                handle,
                width: width as usize,
                height: height as usize,
                visible_width: width as usize,
                visible_height: height as usize,
                format: ffi::kFlutterDesktopPixelFormatRGBA8888,
                release_callback: Some(release_nothing),
                release_context: std::ptr::null_mut(),
            },
        });
        let info = TextureInfo::GpuSurface {
            kind: GpuSurfaceType::DxgiSharedHandle,
            callback: gpu_surface_pull,
            user_data: Arc::as_ptr(&source) as *mut c_void,
        };
        let texture_id = registrar.register_texture(&info);
        if texture_id == ffi::INVALID_TEXTURE_ID {
            warn!("Host refused GPU-surface texture registration");
            return None;
        }
        debug!("GPU-surface texture registered with id {texture_id}, handle {handle:p}");
        Some(Self {
            registrar,
            source,
            texture_id,
            handle_bits: handle as i64,
        })
    }

    pub fn texture_id(&self) -> TextureId {
        self.texture_id
    }

    /// The shared handle's bit pattern, for replies across a call boundary.
    pub fn shared_handle_bits(&self) -> i64 {
        self.handle_bits
    }

    /// Nudge the compositor to sample the surface again.
    pub fn mark_frame_available(&self) -> bool {
        self.registrar.mark_frame_available(self.texture_id)
    }
}

impl Drop for GpuSurfaceRegistration {
    fn drop(&mut self) {
        // The descriptor must outlive any in-flight pull.
        let source = self.source.clone();
        self.registrar
            .unregister_texture(self.texture_id, Box::new(move || drop(source)));
    }
}

/// A complete GPU frame: the shared D3D11 surface, its GLES import, and the
/// compositor registration.
///
/// Field order is teardown order: the registration goes first (stopping
/// pulls), then the GLES binding, then the surface itself, which revokes the
/// exported handle last.
#[cfg(target_os = "windows")]
pub struct GpuFrame {
    registration: GpuSurfaceRegistration,
    binding: dxgi_interop::BoundSurface,
    surface: dxgi_interop::SharedSurface,
}

#[cfg(target_os = "windows")]
impl GpuFrame {
    /// Allocate a shared RGBA surface, import it into GLES, and register it
    /// with the compositor.
    pub fn new(
        registrar: Arc<dyn TextureRegistrar>,
        device: &dxgi_interop::Dx11Device,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        use anyhow::anyhow;
        use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_R8G8B8A8_UNORM;

        let surface = dxgi_interop::SharedSurface::create(
            device.device(),
            width,
            height,
            DXGI_FORMAT_R8G8B8A8_UNORM,
        )
        .ok_or_else(|| anyhow!("failed to create a {width}x{height} shared surface"))?;
        let handle = surface.shared_handle();

        let bridge =
            dxgi_interop::AngleBridge::get().ok_or_else(|| anyhow!("ANGLE bridge unavailable"))?;
        let binding = bridge
            .bind_surface(&handle, width, height)
            .ok_or_else(|| anyhow!("failed to bind the shared surface into GLES"))?;

        let registration = GpuSurfaceRegistration::new(registrar, handle.raw(), width, height)
            .ok_or_else(|| anyhow!("host refused the GPU surface registration"))?;

        Ok(Self {
            registration,
            binding,
            surface,
        })
    }

    pub fn texture_id(&self) -> TextureId {
        self.registration.texture_id()
    }

    /// The exported handle capability.
    pub fn shared_handle(&self) -> dxgi_interop::SharedHandle {
        self.surface.shared_handle()
    }

    /// The shared handle's bit pattern.
    pub fn shared_handle_bits(&self) -> i64 {
        self.registration.shared_handle_bits()
    }

    /// GLES texture name renderers draw through.
    pub fn gl_texture(&self) -> u32 {
        self.binding.gl_texture()
    }

    /// Nudge the compositor after an external renderer finished a frame.
    pub fn mark_frame_available(&self) -> bool {
        self.registration.mark_frame_available()
    }
}
