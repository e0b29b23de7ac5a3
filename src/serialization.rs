//! Serialization of fitted parameters.
//!
//! Fitted preprocessors and models expose their learned state as plain
//! `*Params` structs. This module turns those structs into bytes and back,
//! without coupling the params to a specific container format.

use std::error::Error;

/// A trait for parameter representations that can be serialized to and from bytes.
///
/// Implementors should contain only plain numerical data (e.g., `Vec<f64>`, scalars,
/// vocabularies), never live handles or caches.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct ScalerLike {
        mean: Vec<f64>,
        scale: Vec<f64>,
    }

    #[test]
    fn test_params_bytes_preserve_values() {
        let params = ScalerLike {
            mean: vec![30.0, -1.5],
            scale: vec![1.0, 0.25],
        };
        let bytes = params.to_bytes().unwrap();
        let restored = ScalerLike::from_bytes(&bytes).unwrap();
        assert_eq!(params, restored);
    }

    #[test]
    fn test_truncated_bytes_fail() {
        let params = ScalerLike {
            mean: vec![1.0, 2.0, 3.0],
            scale: vec![1.0, 1.0, 1.0],
        };
        let bytes = params.to_bytes().unwrap();
        assert!(ScalerLike::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
