//! Serialization of fitted transformer and model parameters.
//!
//! Fitted components expose their learned state as plain `*Params` structs
//! (vectors and scalars only). This module turns those structs into bytes and
//! back, independent of the artifact envelope in [`crate::persistence`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;

/// A trait for parameter representations that can be serialized to and from bytes.
///
/// Implementors should contain only plain numerical data (e.g., `Vec<f64>`, scalars,
/// column names), not views or borrowed buffers.
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
    T: Serialize + DeserializeOwned,
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
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        values: Vec<f64>,
        names: Vec<String>,
    }

    #[test]
    fn test_params_keep_nan_cells() {
        let probe = Probe {
            values: vec![1.0, f64::NAN, -3.5],
            names: vec!["age".to_string(), "bmi".to_string()],
        };
        let bytes = probe.to_bytes().unwrap();
        let restored = Probe::from_bytes(&bytes).unwrap();

        assert_eq!(restored.names, probe.names);
        assert_eq!(restored.values[0], 1.0);
        assert!(restored.values[1].is_nan());
        assert_eq!(restored.values[2], -3.5);
    }

    #[test]
    fn test_truncated_bytes_fail() {
        let probe = Probe {
            values: vec![1.0, 2.0],
            names: vec!["x".to_string()],
        };
        let bytes = probe.to_bytes().unwrap();
        assert!(Probe::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
