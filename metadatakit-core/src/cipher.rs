//! AES-256-CBC payload cipher.
//!
//! Blobs are laid out as `IV (16 bytes) || ciphertext` with ISO 10126 padding.

use cbc::cipher::{block_padding::Iso10126, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};

use crate::error::CipherError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the random IV prefix: one AES block.
pub const IV_LEN: usize = 16;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Shortest blob `decrypt` accepts: an IV and one block.
pub const MIN_BLOB_LEN: usize = IV_LEN + BLOCK_LEN;

/// Encrypts `plaintext` under a random IV and returns `IV || ciphertext`.
///
/// # Errors
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not 32 bytes.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Iso10126>(plaintext);

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Splits `blob` into IV and ciphertext and decrypts it.
///
/// # Errors
/// - [`CipherError::InvalidPayload`] if the blob is shorter than [`MIN_BLOB_LEN`]
///   or not block aligned.
/// - [`CipherError::InvalidKeyLength`] if `key` is not 32 bytes.
/// - [`CipherError::DecryptionFailed`] if the padding does not check out.
pub fn decrypt(key: &[u8], blob: &[u8]) -> Result<Vec<u8>, CipherError> {
    if blob.len() < MIN_BLOB_LEN || blob.len() % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidPayload { length: blob.len() });
    }
    let (iv, ciphertext) = blob.split_at(IV_LEN);

    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
    cipher
        .decrypt_padded_vec_mut::<Iso10126>(ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const KEY: [u8; 32] = [0x42; 32];

    #[test_case(b"" ; "empty")]
    #[test_case(b"{}" ; "short json")]
    #[test_case(b"0123456789abcdef" ; "exactly one block")]
    #[test_case(br#"{"sessions":[{"url":"https://example.com","topic":"abc"}]}"# ; "multi block")]
    fn test_round_trip(plaintext: &[u8]) {
        let blob = encrypt(&KEY, plaintext).unwrap();
        assert!(blob.len() >= MIN_BLOB_LEN);
        assert_eq!(blob.len() % BLOCK_LEN, 0);
        assert_eq!(decrypt(&KEY, &blob).unwrap(), plaintext);
    }

    #[test]
    fn test_iv_is_random() {
        let first = encrypt(&KEY, b"{}").unwrap();
        let second = encrypt(&KEY, b"{}").unwrap();
        assert_ne!(first[..IV_LEN], second[..IV_LEN]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_short_blob_is_invalid_payload() {
        let blob = encrypt(&KEY, b"{}").unwrap();
        assert_eq!(
            decrypt(&KEY, &blob[..IV_LEN]),
            Err(CipherError::InvalidPayload { length: IV_LEN })
        );
        assert_eq!(
            decrypt(&KEY, &blob[..MIN_BLOB_LEN - 1]),
            Err(CipherError::InvalidPayload {
                length: MIN_BLOB_LEN - 1
            })
        );
    }

    #[test]
    fn test_invalid_key_length() {
        assert_eq!(
            encrypt(&[0u8; 16], b"{}"),
            Err(CipherError::InvalidKeyLength(16))
        );
        let blob = encrypt(&KEY, b"{}").unwrap();
        assert_eq!(
            decrypt(&[0u8; 31], &blob),
            Err(CipherError::InvalidKeyLength(31))
        );
    }

    #[test]
    fn test_wrong_key_does_not_return_plaintext() {
        let blob = encrypt(&KEY, br#"{"hello":"world"}"#).unwrap();
        if let Ok(plaintext) = decrypt(&[0x24; 32], &blob) {
            assert_ne!(plaintext, br#"{"hello":"world"}"#);
        }
    }
}
