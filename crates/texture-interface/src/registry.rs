//! Frame table keyed by caller-assigned ids.
//!
//! One table owns both frame kinds, so an id can never be claimed twice even
//! across the CPU and GPU paths, and every lookup failure maps to the same
//! not-found outcome on the wire.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, warn};

use flutter_texture::{TextureId, TextureRegistrar};

#[cfg(target_os = "windows")]
use crate::gpu_surface::GpuFrame;
use crate::pixel_buffer::CpuFrame;

/// Caller-assigned frame identifier.
pub type FrameId = i64;

/// Wire-visible registry failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The id does not name a live frame of the required kind.
    NotFound,
}

/// Reply to a successful GPU texture creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTextureReply {
    /// Bit pattern of the DXGI shared handle.
    pub shared_handle: i64,
    /// Host-assigned compositor texture id.
    pub texture_id: TextureId,
}

enum FrameEntry {
    Cpu(CpuFrame),
    #[cfg(target_os = "windows")]
    Gpu(GpuFrame),
}

impl FrameEntry {
    fn texture_id(&self) -> TextureId {
        match self {
            FrameEntry::Cpu(frame) => frame.texture_id(),
            #[cfg(target_os = "windows")]
            FrameEntry::Gpu(frame) => frame.texture_id(),
        }
    }
}

/// Live frames, at most one per id, plus the lazily created D3D11 device
/// they share.
pub struct FrameRegistry {
    registrar: Arc<dyn TextureRegistrar>,
    frames: Mutex<HashMap<FrameId, FrameEntry>>,
    #[cfg(target_os = "windows")]
    device: once_cell::sync::OnceCell<Option<dxgi_interop::Dx11Device>>,
}

impl FrameRegistry {
    pub fn new(registrar: Arc<dyn TextureRegistrar>) -> Self {
        Self {
            registrar,
            frames: Mutex::new(HashMap::new()),
            #[cfg(target_os = "windows")]
            device: once_cell::sync::OnceCell::new(),
        }
    }

    fn lock_frames(&self) -> MutexGuard<'_, HashMap<FrameId, FrameEntry>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get-or-create a pixel-buffer frame under `id`.
    ///
    /// Registering an already-claimed id leaves the existing frame untouched
    /// and returns its texture id, whichever kind it is.
    pub fn register(&self, id: FrameId) -> TextureId {
        let mut frames = self.lock_frames();
        match frames.entry(id) {
            Entry::Occupied(entry) => {
                #[cfg(target_os = "windows")]
                if matches!(entry.get(), FrameEntry::Gpu(_)) {
                    warn!("RegisterTexture({id}) hit an id held by a GPU frame");
                }
                entry.get().texture_id()
            }
            Entry::Vacant(slot) => {
                let frame = CpuFrame::new(self.registrar.clone());
                let texture_id = frame.texture_id();
                slot.insert(FrameEntry::Cpu(frame));
                debug!("Frame {id} registered as pixel-buffer texture {texture_id}");
                texture_id
            }
        }
    }

    /// Forward a producer buffer to the pixel-buffer frame under `id`.
    pub fn update_frame(
        &self,
        id: FrameId,
        buffer: *const u8,
        width: usize,
        height: usize,
    ) -> Result<(), RegistryError> {
        let frames = self.lock_frames();
        match frames.get(&id) {
            Some(FrameEntry::Cpu(frame)) => {
                frame.update(buffer, width, height);
                Ok(())
            }
            #[cfg(target_os = "windows")]
            Some(FrameEntry::Gpu(_)) => {
                warn!("UpdateFrame({id}) targets a GPU frame; no pixel sink at this id");
                Err(RegistryError::NotFound)
            }
            None => Err(RegistryError::NotFound),
        }
    }

    /// Destroy and remove whichever frame holds `id`.
    pub fn unregister(&self, id: FrameId) -> Result<(), RegistryError> {
        // Take the entry out under the lock, tear it down outside of it.
        let removed = self.lock_frames().remove(&id);
        match removed {
            Some(_) => {
                debug!("Frame {id} unregistered");
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    /// Lazily create the process-wide D3D11 device and report its interface
    /// address, or 0 when no device can be created. The first failure is
    /// cached like a success; later calls do not retry.
    #[cfg(target_os = "windows")]
    pub fn create_device(&self) -> i64 {
        match self.device() {
            Some(device) => device.address(),
            None => 0,
        }
    }

    #[cfg(not(target_os = "windows"))]
    pub fn create_device(&self) -> i64 {
        error!("D3D11 device requested off Windows");
        0
    }

    #[cfg(target_os = "windows")]
    fn device(&self) -> Option<&dxgi_interop::Dx11Device> {
        self.device
            .get_or_init(dxgi_interop::Dx11Device::new)
            .as_ref()
    }

    /// Allocate, share, import, and register a GPU surface under `id`.
    ///
    /// `None` covers every refusal: the id is already claimed, no device is
    /// available, or a resource step failed. An existing frame under `id` is
    /// never disturbed.
    pub fn create_gpu_texture(
        &self,
        id: FrameId,
        width: u32,
        height: u32,
    ) -> Option<GpuTextureReply> {
        if self.lock_frames().contains_key(&id) {
            warn!("CreateGPUTexture({id}) refused: id already claimed");
            return None;
        }
        self.create_gpu_texture_inner(id, width, height)
    }

    #[cfg(target_os = "windows")]
    fn create_gpu_texture_inner(
        &self,
        id: FrameId,
        width: u32,
        height: u32,
    ) -> Option<GpuTextureReply> {
        let Some(device) = self.device() else {
            error!("CreateGPUTexture({id}) failed: no D3D11 device");
            return None;
        };
        let frame = match GpuFrame::new(self.registrar.clone(), device, width, height) {
            Ok(frame) => frame,
            Err(e) => {
                error!("CreateGPUTexture({id}) failed: {e:#}");
                return None;
            }
        };
        let reply = GpuTextureReply {
            shared_handle: frame.shared_handle_bits(),
            texture_id: frame.texture_id(),
        };

        // The id may have been claimed while resources were being built.
        let mut frames = self.lock_frames();
        match frames.entry(id) {
            Entry::Occupied(_) => {
                warn!("CreateGPUTexture({id}) lost the id to a concurrent registration");
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(FrameEntry::Gpu(frame));
                debug!(
                    "Frame {id} registered as GPU surface texture {}",
                    reply.texture_id
                );
                Some(reply)
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn create_gpu_texture_inner(
        &self,
        id: FrameId,
        _width: u32,
        _height: u32,
    ) -> Option<GpuTextureReply> {
        error!("CreateGPUTexture({id}) failed: GPU surface sharing needs the Windows ANGLE stack");
        None
    }

    /// Destroy and remove the frame under `id`. Same table as
    /// [`FrameRegistry::unregister`]; the two differ only in the calls that
    /// reach them.
    pub fn destroy_gpu_texture(&self, id: FrameId) -> Result<(), RegistryError> {
        let removed = self.lock_frames().remove(&id);
        match removed {
            Some(_) => {
                debug!("GPU frame {id} destroyed");
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    /// Number of live frames.
    pub fn len(&self) -> usize {
        self.lock_frames().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
