//! Decoded method-call protocol for the `texture_interface` channel.
//!
//! Wire decoding (the standard method codec) is the embedder's job; this
//! module models already-decoded values and maps incoming calls onto typed
//! operations. The codec shrinks small integers to 32 bits, so every integer
//! accessor folds both widths.

/// Channel this plugin serves.
pub const CHANNEL_NAME: &str = "texture_interface";

/// Error payload for operations naming an id with no live frame behind it.
pub const NOT_FOUND_CODE: &str = "-2";
pub const NOT_FOUND_MESSAGE: &str = "Texture was not found.";

/// Error payload for calls whose arguments are missing or mis-shaped.
pub const BAD_ARGUMENTS_CODE: &str = "-1";
pub const BAD_ARGUMENTS_MESSAGE: &str = "Invalid arguments.";

/// A decoded method-codec value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    /// Codec maps keep insertion order; keys are strings on this channel.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Integer value, folding the codec's 32/64-bit encodings.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a map entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A method call mapped onto its typed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    GetPlatformVersion,
    RegisterTexture { id: i64 },
    UpdateFrame { id: i64, width: i32, height: i32, buffer: i64 },
    UnregisterTexture { id: i64 },
    CreateD3d11Device,
    CreateGpuTexture { id: i64, width: i32, height: i32 },
    DestroyGpuTexture { id: i64 },
}

/// Why a call could not be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    /// The method name is not part of this channel.
    NotImplemented,
    /// A required argument is absent or has the wrong type; carries the key.
    BadArguments(&'static str),
}

fn int_arg(args: &Value, key: &'static str) -> Result<i64, CallError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or(CallError::BadArguments(key))
}

impl MethodCall {
    /// Map a decoded call (method name plus argument value) onto an
    /// operation. Method names are matched exactly, including case.
    pub fn parse(method: &str, args: &Value) -> Result<Self, CallError> {
        match method {
            "getPlatformVersion" => Ok(Self::GetPlatformVersion),
            "RegisterTexture" => Ok(Self::RegisterTexture { id: int_arg(args, "id")? }),
            "UpdateFrame" => Ok(Self::UpdateFrame {
                id: int_arg(args, "id")?,
                width: int_arg(args, "width")? as i32,
                height: int_arg(args, "height")? as i32,
                buffer: int_arg(args, "buffer")?,
            }),
            "UnregisterTexture" => Ok(Self::UnregisterTexture { id: int_arg(args, "id")? }),
            "CreateD3D11Device" => Ok(Self::CreateD3d11Device),
            "CreateGPUTexture" => Ok(Self::CreateGpuTexture {
                id: int_arg(args, "id")?,
                width: int_arg(args, "width")? as i32,
                height: int_arg(args, "height")? as i32,
            }),
            "DestroyGPUTexture" => Ok(Self::DestroyGpuTexture { id: int_arg(args, "id")? }),
            _ => Err(CallError::NotImplemented),
        }
    }
}

/// Outcome handed back to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error { code: String, message: String },
    /// Unknown method; the embedder answers with its not-implemented reply.
    NotImplemented,
}

impl MethodResponse {
    pub fn error(code: &str, message: &str) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
