use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Turns a stored payload into a typed domain object.
pub trait ResourceDecoder: Send + Sync {
    type Output;

    fn decode(&self, resource_tag: &str, bytes: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// Decodes JSON payloads.
#[derive(Debug)]
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResourceDecoder for JsonDecoder<T> {
    type Output = T;

    fn decode(&self, resource_tag: &str, bytes: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError {
            resource_tag: resource_tag.to_string(),
            message: e.to_string(),
        })
    }
}

/// Decodes MessagePack payloads.
#[derive(Debug)]
pub struct MsgpackDecoder<T>(PhantomData<fn() -> T>);

impl<T> MsgpackDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for MsgpackDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResourceDecoder for MsgpackDecoder<T> {
    type Output = T;

    fn decode(&self, resource_tag: &str, bytes: &[u8]) -> Result<T, DecodeError> {
        rmp_serde::from_slice(bytes).map_err(|e| DecodeError {
            resource_tag: resource_tag.to_string(),
            message: e.to_string(),
        })
    }
}

/// Passes payload bytes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl ResourceDecoder for RawDecoder {
    type Output = Vec<u8>;

    fn decode(&self, _resource_tag: &str, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(bytes.to_vec())
    }
}
