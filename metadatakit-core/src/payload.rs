//! Entry payload encoding: base64 blobs of validated JSON, with the legacy-key
//! fallback for records written by older clients.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    cipher::{self, MIN_BLOB_LEN},
    error::{DecryptError, PayloadError},
    node::{EncryptionKey, MetadataNode},
};

/// Checks that `json` parses as JSON, discarding the parsed value.
///
/// # Errors
/// Returns the parser's message on failure.
pub fn validate_json(json: &str) -> Result<(), String> {
    serde_json::from_str::<serde_json::Value>(json)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

/// Decodes a base64 payload into the raw `IV || ciphertext` blob.
///
/// # Errors
/// Returns [`DecryptError::InvalidPayload`] if the payload is not base64 or too
/// short to hold an IV and one block.
pub fn decode_payload(base64_payload: &str) -> Result<Vec<u8>, DecryptError> {
    let blob = STANDARD
        .decode(base64_payload.trim())
        .map_err(|err| DecryptError::InvalidPayload(err.to_string()))?;
    if blob.len() < MIN_BLOB_LEN {
        return Err(DecryptError::InvalidPayload(format!(
            "payload of {} bytes is shorter than {MIN_BLOB_LEN}",
            blob.len()
        )));
    }
    Ok(blob)
}

/// Decrypts a base64 payload stored under `node` and returns the JSON string.
///
/// The regular key is tried first; if that fails to produce valid JSON and the node
/// has a legacy unpadded key, the whole attempt is repeated with it.
///
/// # Errors
/// - [`DecryptError::InvalidPayload`] for undecodable payloads.
/// - [`DecryptError::FailedToDecryptWithRegularKey`] when no legacy key exists.
/// - [`DecryptError::FailedToDecrypt`] when both keys fail.
pub fn decrypt_entry(node: &MetadataNode, base64_payload: &str) -> Result<String, DecryptError> {
    let blob = decode_payload(base64_payload)?;
    decrypt_blob(node, &blob)
}

pub(crate) fn decrypt_blob(node: &MetadataNode, blob: &[u8]) -> Result<String, DecryptError> {
    let regular = match decrypt_with_key(node.encryption_key(), blob) {
        Ok(json) => return Ok(json),
        Err(err) => err,
    };

    let Some(unpadded_key) = node.unpadded_encryption_key() else {
        return Err(DecryptError::FailedToDecryptWithRegularKey(regular));
    };

    match decrypt_with_key(unpadded_key, blob) {
        Ok(json) => {
            log::warn!(
                "metadata entry at {} only decrypts with the legacy unpadded key",
                node.address()
            );
            Ok(json)
        }
        Err(unpadded) => Err(DecryptError::FailedToDecrypt { regular, unpadded }),
    }
}

fn decrypt_with_key(key: &EncryptionKey, blob: &[u8]) -> Result<String, PayloadError> {
    let plaintext = cipher::decrypt(key.as_bytes(), blob)?;
    let json = String::from_utf8(plaintext).map_err(|_| PayloadError::InvalidUtf8)?;
    validate_json(&json).map_err(PayloadError::InvalidJson)?;
    Ok(json)
}
