//! Wire codec for assets.
//!
//! An encoded asset is a single version byte followed by the CBOR encoding
//! of the [`Asset`]. Assets always travel whole; there is no chunked or
//! resumable form.

use crate::asset::Asset;
use crate::error::{CoreError, Result};

/// Current wire format version.
pub const WIRE_VERSION: u8 = 0;

/// Encode an asset for transfer.
pub fn encode_asset(asset: &Asset) -> Result<Vec<u8>> {
    let mut buf = vec![WIRE_VERSION];
    ciborium::into_writer(asset, &mut buf)
        .map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(buf)
}

/// Decode an asset produced by [`encode_asset`].
pub fn decode_asset(bytes: &[u8]) -> Result<Asset> {
    let (&version, body) = bytes
        .split_first()
        .ok_or_else(|| CoreError::DecodingError("empty input".into()))?;

    if version != WIRE_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    ciborium::from_reader(body).map_err(|e| CoreError::DecodingError(e.to_string()))
}
