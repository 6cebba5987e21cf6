//! Process-wide D3D11 device for shared-surface creation.

use tracing::{debug, error};
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP, D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0,
    D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_9_3,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, D3D11_CREATE_DEVICE_BGRA_SUPPORT,
    D3D11_CREATE_DEVICE_VIDEO_SUPPORT, D3D11_SDK_VERSION,
};

/// D3D11 device and immediate context shared by every GPU frame.
///
/// Video and BGRA capable so media producers can write the shared surfaces
/// directly. Construction walks driver types (hardware first, then the WARP
/// software rasterizer) and a descending feature-level ladder; `None` means
/// D3D11 is not available at all and the GPU path stays off.
pub struct Dx11Device {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    feature_level: D3D_FEATURE_LEVEL,
}

// SAFETY: D3D11 devices are free-threaded. The immediate context is not, but
// callers serialize their own submissions on it.
unsafe impl Send for Dx11Device {}
unsafe impl Sync for Dx11Device {}

impl Dx11Device {
    /// Feature levels requested, best first.
    const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 5] = [
        D3D_FEATURE_LEVEL_11_1,
        D3D_FEATURE_LEVEL_11_0,
        D3D_FEATURE_LEVEL_10_1,
        D3D_FEATURE_LEVEL_10_0,
        D3D_FEATURE_LEVEL_9_3,
    ];

    pub fn new() -> Option<Self> {
        let driver_types = [D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP];

        for &driver_type in &driver_types {
            let mut device = None;
            let mut context = None;
            let mut feature_level = D3D_FEATURE_LEVEL::default();

            let created = unsafe {
                D3D11CreateDevice(
                    None,
                    driver_type,
                    HMODULE::default(),
                    D3D11_CREATE_DEVICE_VIDEO_SUPPORT | D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    Some(&Self::FEATURE_LEVELS),
                    D3D11_SDK_VERSION,
                    Some(&mut device as *mut _),
                    Some(&mut feature_level as *mut _),
                    Some(&mut context as *mut _),
                )
            };
            match created {
                Ok(()) => {
                    debug!(
                        "D3D11 device created with driver type {:?} at feature level {:?}",
                        driver_type, feature_level
                    );
                    return Some(Self {
                        device: device?,
                        context: context?,
                        feature_level,
                    });
                }
                Err(e) => {
                    debug!("D3D11CreateDevice({driver_type:?}) failed: {e}");
                }
            }
        }

        error!("Failed to create D3D11 device with any driver type");
        None
    }

    /// Borrow the underlying `ID3D11Device`.
    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    /// Borrow the immediate device context.
    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }

    /// Feature level the device actually came up at.
    pub fn feature_level(&self) -> D3D_FEATURE_LEVEL {
        self.feature_level
    }

    /// The device's interface address, reported across the call boundary as
    /// an opaque diagnostic. Not a usable reference on the other side.
    pub fn address(&self) -> i64 {
        windows::core::Interface::as_raw(&self.device) as i64
    }
}
