//! Method-call handler for the `texture_interface` channel.

use std::sync::Arc;

use tracing::debug;

use flutter_texture::protocol::{
    CallError, MethodCall, MethodResponse, Value, BAD_ARGUMENTS_CODE, BAD_ARGUMENTS_MESSAGE,
    NOT_FOUND_CODE, NOT_FOUND_MESSAGE,
};
use flutter_texture::TextureRegistrar;

use crate::registry::{FrameRegistry, RegistryError};

/// Version descriptor reported by getPlatformVersion. Probing the real OS
/// build is the embedder's business; every Windows the engine still runs on
/// satisfies this floor.
const DEFAULT_PLATFORM_VERSION: &str = "Windows 10+";

/// The plugin: owns the frame registry and serves the channel's methods.
pub struct TextureInterfacePlugin {
    registry: FrameRegistry,
    platform_version: String,
}

impl TextureInterfacePlugin {
    /// Build the plugin around a host texture registrar.
    pub fn new(registrar: Arc<dyn TextureRegistrar>) -> Self {
        flutter_texture::logging::init();
        Self {
            registry: FrameRegistry::new(registrar),
            platform_version: DEFAULT_PLATFORM_VERSION.to_string(),
        }
    }

    /// Override the reported platform-version descriptor.
    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    /// Borrow the frame registry, for in-process producers that bypass the
    /// channel.
    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    /// Serve one decoded method call.
    pub fn handle_method_call(&self, method: &str, arguments: &Value) -> MethodResponse {
        let call = match MethodCall::parse(method, arguments) {
            Ok(call) => call,
            Err(CallError::NotImplemented) => {
                debug!("Unknown method {method:?} on the texture channel");
                return MethodResponse::NotImplemented;
            }
            Err(CallError::BadArguments(key)) => {
                debug!("Method {method:?} rejected: bad argument {key:?}");
                return MethodResponse::error(BAD_ARGUMENTS_CODE, BAD_ARGUMENTS_MESSAGE);
            }
        };
        self.dispatch(call)
    }

    fn dispatch(&self, call: MethodCall) -> MethodResponse {
        match call {
            MethodCall::GetPlatformVersion => {
                MethodResponse::Success(Value::String(self.platform_version.clone()))
            }
            MethodCall::RegisterTexture { id } => {
                MethodResponse::Success(Value::I64(self.registry.register(id)))
            }
            MethodCall::UpdateFrame { id, width, height, buffer } => {
                // The buffer travels as the producer pointer's bit pattern.
                let pixels = buffer as usize as *const u8;
                match self.registry.update_frame(id, pixels, width as usize, height as usize) {
                    Ok(()) => MethodResponse::Success(Value::Null),
                    Err(RegistryError::NotFound) => Self::not_found(),
                }
            }
            MethodCall::UnregisterTexture { id } => match self.registry.unregister(id) {
                Ok(()) => MethodResponse::Success(Value::Null),
                Err(RegistryError::NotFound) => Self::not_found(),
            },
            MethodCall::CreateD3d11Device => {
                MethodResponse::Success(Value::I64(self.registry.create_device()))
            }
            MethodCall::CreateGpuTexture { id, width, height } => {
                match self.registry.create_gpu_texture(id, width as u32, height as u32) {
                    Some(reply) => MethodResponse::Success(Value::Map(vec![
                        ("shared_handle".to_string(), Value::I64(reply.shared_handle)),
                        ("texture_id".to_string(), Value::I64(reply.texture_id)),
                    ])),
                    None => MethodResponse::Success(Value::I64(-1)),
                }
            }
            MethodCall::DestroyGpuTexture { id } => match self.registry.destroy_gpu_texture(id) {
                Ok(()) => MethodResponse::Success(Value::Null),
                Err(RegistryError::NotFound) => Self::not_found(),
            },
        }
    }

    fn not_found() -> MethodResponse {
        MethodResponse::error(NOT_FOUND_CODE, NOT_FOUND_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRegistrar;

    fn plugin() -> (TextureInterfacePlugin, Arc<FakeRegistrar>) {
        let registrar = FakeRegistrar::new();
        (TextureInterfacePlugin::new(registrar.clone()), registrar)
    }

    fn args(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn platform_version_reports_the_descriptor() {
        let (plugin, _) = plugin();
        let response = plugin.handle_method_call("getPlatformVersion", &Value::Null);
        assert_eq!(
            response,
            MethodResponse::Success(Value::String("Windows 10+".into()))
        );
    }

    #[test]
    fn platform_version_can_be_overridden() {
        let registrar = FakeRegistrar::new();
        let plugin =
            TextureInterfacePlugin::new(registrar).with_platform_version("Windows 11");
        let response = plugin.handle_method_call("getPlatformVersion", &Value::Null);
        assert_eq!(
            response,
            MethodResponse::Success(Value::String("Windows 11".into()))
        );
    }

    #[test]
    fn register_returns_the_host_texture_id_and_is_idempotent() {
        let (plugin, _) = plugin();
        let first = plugin.handle_method_call("RegisterTexture", &args(&[("id", Value::I32(1))]));
        let second = plugin.handle_method_call("RegisterTexture", &args(&[("id", Value::I32(1))]));
        assert!(matches!(first, MethodResponse::Success(Value::I64(_))));
        assert_eq!(first, second);
    }

    #[test]
    fn update_on_an_unknown_id_is_the_not_found_error() {
        let (plugin, _) = plugin();
        let response = plugin.handle_method_call(
            "UpdateFrame",
            &args(&[
                ("id", Value::I32(41)),
                ("width", Value::I32(2)),
                ("height", Value::I32(2)),
                ("buffer", Value::I64(0)),
            ]),
        );
        assert_eq!(
            response,
            MethodResponse::Error {
                code: "-2".into(),
                message: "Texture was not found.".into(),
            }
        );
    }

    #[test]
    fn malformed_arguments_are_the_invalid_arguments_error() {
        let (plugin, _) = plugin();
        let response =
            plugin.handle_method_call("RegisterTexture", &args(&[("order", Value::I32(66))]));
        assert_eq!(
            response,
            MethodResponse::Error {
                code: "-1".into(),
                message: "Invalid arguments.".into(),
            }
        );
    }

    #[test]
    fn unknown_methods_fall_through_to_not_implemented() {
        let (plugin, _) = plugin();
        let response = plugin.handle_method_call("TotallyUnknown", &Value::Null);
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[test]
    fn gpu_creation_on_a_claimed_id_returns_the_sentinel() {
        let (plugin, _) = plugin();
        plugin.handle_method_call("RegisterTexture", &args(&[("id", Value::I32(5))]));
        let response = plugin.handle_method_call(
            "CreateGPUTexture",
            &args(&[
                ("id", Value::I32(5)),
                ("width", Value::I32(64)),
                ("height", Value::I32(64)),
            ]),
        );
        assert_eq!(response, MethodResponse::Success(Value::I64(-1)));
    }

    #[test]
    fn create_device_reports_an_integer_address() {
        let (plugin, _) = plugin();
        let response = plugin.handle_method_call("CreateD3D11Device", &Value::Null);
        assert!(matches!(response, MethodResponse::Success(Value::I64(_))));
    }
}
