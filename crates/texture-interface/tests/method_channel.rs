//! End-to-end journeys over the `texture_interface` method channel, driven
//! against a recording host.

use std::ffi::c_void;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use flutter_texture::ffi::FlutterDesktopPixelBuffer;
use flutter_texture::protocol::{MethodResponse, Value};
use flutter_texture::{TextureId, TextureInfo, TextureRegistrar};
use texture_interface::TextureInterfacePlugin;

/// Minimal recording host: sequential ids plus captured pull callbacks.
struct RecordingHost {
    next_id: AtomicI64,
    pixel_pulls: Mutex<Vec<(TextureId, flutter_texture::ffi::PixelBufferTextureCallback, usize)>>,
    unregistered: Mutex<Vec<TextureId>>,
    marked: Mutex<Vec<TextureId>>,
}

impl RecordingHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            pixel_pulls: Mutex::new(Vec::new()),
            unregistered: Mutex::new(Vec::new()),
            marked: Mutex::new(Vec::new()),
        })
    }

    fn pull(&self, id: TextureId) -> Option<FlutterDesktopPixelBuffer> {
        let pulls = self.pixel_pulls.lock().unwrap();
        let (_, callback, user_data) = pulls.iter().find(|(tid, _, _)| *tid == id)?;
        let descriptor = unsafe { callback(0, 0, *user_data as *mut c_void) };
        if descriptor.is_null() {
            None
        } else {
            Some(unsafe { *descriptor })
        }
    }
}

impl TextureRegistrar for RecordingHost {
    fn register_texture(&self, info: &TextureInfo) -> TextureId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let TextureInfo::PixelBuffer { callback, user_data } = *info {
            self.pixel_pulls
                .lock()
                .unwrap()
                .push((id, callback, user_data as usize));
        }
        id
    }

    fn mark_frame_available(&self, texture_id: TextureId) -> bool {
        self.marked.lock().unwrap().push(texture_id);
        true
    }

    fn unregister_texture(&self, texture_id: TextureId, release: Box<dyn FnOnce() + Send>) {
        self.unregistered.lock().unwrap().push(texture_id);
        release();
    }
}

fn args(entries: &[(&str, Value)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

fn success_i64(response: &MethodResponse) -> i64 {
    match response {
        MethodResponse::Success(Value::I64(v)) => *v,
        other => panic!("expected Success(I64), got {other:?}"),
    }
}

#[test]
fn a_cpu_texture_lives_and_dies_over_the_channel() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host.clone());

    // Register, twice; the second call must return the same texture.
    let register = args(&[("id", Value::I32(1))]);
    let texture_id = success_i64(&plugin.handle_method_call("RegisterTexture", &register));
    assert_eq!(
        success_i64(&plugin.handle_method_call("RegisterTexture", &register)),
        texture_id
    );

    // Push a frame and watch it come out of the compositor pull.
    let pixels = vec![0xAAu8; 4 * 4 * 4];
    let update = args(&[
        ("id", Value::I32(1)),
        ("width", Value::I32(4)),
        ("height", Value::I32(4)),
        ("buffer", Value::I64(pixels.as_ptr() as i64)),
    ]);
    assert_eq!(
        plugin.handle_method_call("UpdateFrame", &update),
        MethodResponse::Success(Value::Null)
    );
    assert_eq!(host.marked.lock().unwrap().as_slice(), &[texture_id]);

    let pulled = host.pull(texture_id).unwrap();
    assert_eq!(pulled.buffer, pixels.as_ptr());
    assert_eq!((pulled.width, pulled.height), (4, 4));

    // Unregister; the host texture goes with it and the id is dead.
    let unregister = args(&[("id", Value::I32(1))]);
    assert_eq!(
        plugin.handle_method_call("UnregisterTexture", &unregister),
        MethodResponse::Success(Value::Null)
    );
    assert_eq!(host.unregistered.lock().unwrap().as_slice(), &[texture_id]);
    assert_eq!(
        plugin.handle_method_call("UpdateFrame", &update),
        MethodResponse::Error {
            code: "-2".into(),
            message: "Texture was not found.".into(),
        }
    );
}

#[test]
fn operations_on_unknown_ids_share_the_not_found_reply() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host);

    let not_found = MethodResponse::Error {
        code: "-2".into(),
        message: "Texture was not found.".into(),
    };

    let id_only = args(&[("id", Value::I32(99))]);
    assert_eq!(
        plugin.handle_method_call("UnregisterTexture", &id_only),
        not_found
    );
    assert_eq!(
        plugin.handle_method_call("DestroyGPUTexture", &id_only),
        not_found
    );
}

#[test]
fn unknown_methods_are_left_to_the_embedder() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host);

    assert_eq!(
        plugin.handle_method_call("registertexture", &Value::Null),
        MethodResponse::NotImplemented
    );
}

#[test]
fn malformed_calls_are_rejected_before_touching_the_registry() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host.clone());

    let response = plugin.handle_method_call(
        "UpdateFrame",
        &args(&[("id", Value::String("one".into()))]),
    );
    assert_eq!(
        response,
        MethodResponse::Error {
            code: "-1".into(),
            message: "Invalid arguments.".into(),
        }
    );
    assert!(host.pixel_pulls.lock().unwrap().is_empty());
}

#[test]
fn gpu_texture_on_a_taken_id_answers_with_the_sentinel() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host);

    plugin.handle_method_call("RegisterTexture", &args(&[("id", Value::I32(2))]));
    let response = plugin.handle_method_call(
        "CreateGPUTexture",
        &args(&[
            ("id", Value::I32(2)),
            ("width", Value::I32(128)),
            ("height", Value::I32(128)),
        ]),
    );
    assert_eq!(response, MethodResponse::Success(Value::I64(-1)));

    // The claimed id still answers as a pixel-buffer frame.
    let pixels = [0u8; 4];
    let update = args(&[
        ("id", Value::I32(2)),
        ("width", Value::I32(1)),
        ("height", Value::I32(1)),
        ("buffer", Value::I64(pixels.as_ptr() as i64)),
    ]);
    assert_eq!(
        plugin.handle_method_call("UpdateFrame", &update),
        MethodResponse::Success(Value::Null)
    );
}

#[test]
fn get_platform_version_answers_without_any_registration() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host);

    assert_eq!(
        plugin.handle_method_call("getPlatformVersion", &Value::Null),
        MethodResponse::Success(Value::String("Windows 10+".into()))
    );
}

#[test]
fn create_device_always_answers_with_an_integer() {
    let host = RecordingHost::new();
    let plugin = TextureInterfacePlugin::new(host);

    let response = plugin.handle_method_call("CreateD3D11Device", &Value::Null);
    assert!(matches!(response, MethodResponse::Success(Value::I64(_))));
}
