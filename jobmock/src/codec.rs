// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Argument lists and the serialization boundary they cross.
//!
//! Jobs in a real queue are stored in serialized form, so a handler never sees the
//! exact values the caller passed in. Every job is therefore sent through
//! [`Codec::roundtrip`] before `perform` is called, in both sync and async mode.

use serde::Serialize;
use serde_json::Value;

use crate::error::DispatchError;

/// Ordered, loosely typed job arguments.
pub type ArgumentList = Vec<Value>;

pub trait Codec: Send + Sync + 'static {
    fn encode(&self, args: &[Value]) -> Result<Vec<u8>, DispatchError>;

    fn decode(&self, bytes: &[u8]) -> Result<ArgumentList, DispatchError>;

    fn roundtrip(&self, args: &[Value]) -> Result<ArgumentList, DispatchError> {
        let bytes = self.encode(args)?;
        self.decode(&bytes)
    }
}

/// JSON, like the payloads of a Redis backed queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, args: &[Value]) -> Result<Vec<u8>, DispatchError> {
        Ok(serde_json::to_vec(args)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ArgumentList, DispatchError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Builds an argument list from any serializable value.
///
/// Tuples and sequences become one argument per element, `()` becomes no arguments
/// and everything else becomes a single argument. Anything that serializes to
/// `null` counts as `()`, so `None` or `Value::Null` also yield no arguments; pass
/// `(None::<T>,)` for a single `null` argument.
pub fn into_argument_list<A: Serialize>(args: A) -> Result<ArgumentList, DispatchError> {
    match serde_json::to_value(args)? {
        Value::Array(values) => Ok(values),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}
