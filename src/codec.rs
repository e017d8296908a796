// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Payload Codecs
//!
//! A [`Codec`] turns a typed value into a message body and back. Each codec
//! carries the content type it is published with, so subscribers can tell
//! which format a delivery claims to be in.

use crate::errors::AmqpError;
use serde::{de::DeserializeOwned, Serialize};

/// Content type for JSON messages
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type for bincode messages
pub const BINCODE_CONTENT_TYPE: &str = "application/x-bincode";

/// Converts values of type `T` to and from message bodies.
pub trait Codec<T>: Send + Sync {
    /// Content type tag published alongside the encoded body.
    fn content_type(&self) -> &'static str;

    /// Fails with [`AmqpError::EncodePayloadError`] when `value` cannot be
    /// represented in this format.
    fn encode(&self, value: &T) -> Result<Vec<u8>, AmqpError>;

    /// Fails with [`AmqpError::DecodePayloadError`] on truncated or mismatched input.
    fn decode(&self, data: &[u8]) -> Result<T, AmqpError>;
}

/// Human-readable structured encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, AmqpError> {
        serde_json::to_vec(value).map_err(|err| AmqpError::EncodePayloadError(err.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<T, AmqpError> {
        serde_json::from_slice(data).map_err(|err| AmqpError::DecodePayloadError(err.to_string()))
    }
}

/// Compact binary record encoding, used for high-volume log traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn content_type(&self) -> &'static str {
        BINCODE_CONTENT_TYPE
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, AmqpError> {
        bincode::serialize(value).map_err(|err| AmqpError::EncodePayloadError(err.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<T, AmqpError> {
        bincode::deserialize(data).map_err(|err| AmqpError::DecodePayloadError(err.to_string()))
    }
}
