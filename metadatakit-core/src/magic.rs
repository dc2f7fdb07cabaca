//! Magic hashes: the hash-chained, signed version tokens of metadata records.
//!
//! ```text
//! message(payload, prev) = base64(prev || SHA256(payload))   if prev is present
//!                        = base64(payload)                   otherwise
//! magic(payload, prev)   = SHA256d("\x18Bitcoin Signed Message:\n" || varint(len) || message)
//! ```
//!
//! Every write signs `magic` with the entry node's key and sends `prev` along, so
//! each record commits to the full history of its address.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bitcoin::{
    hashes::{sha256d, Hash},
    secp256k1::Message,
    sign_message::{signed_msg_hash, MessageSignature},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{derivation::secp, error::MagicHashError, node::MetadataNode};

/// Length of a magic hash.
pub const MAGIC_HASH_LEN: usize = 32;

/// A magic hash value.
pub type MagicHash = [u8; MAGIC_HASH_LEN];

/// Builds the message that is signed for `payload`.
///
/// # Errors
/// Returns [`MagicHashError::InvalidPrevMagicHash`] if `prev_magic_hash` is not 32 bytes.
pub fn message(payload: &[u8], prev_magic_hash: Option<&[u8]>) -> Result<String, MagicHashError> {
    match prev_magic_hash {
        None => Ok(STANDARD.encode(payload)),
        Some(prev) if prev.len() == MAGIC_HASH_LEN => {
            let mut buffer = Vec::with_capacity(2 * MAGIC_HASH_LEN);
            buffer.extend_from_slice(prev);
            buffer.extend_from_slice(&Sha256::digest(payload));
            Ok(STANDARD.encode(buffer))
        }
        Some(prev) => Err(MagicHashError::InvalidPrevMagicHash(prev.len())),
    }
}

/// Computes the magic hash of `payload` chained onto `prev_magic_hash`.
///
/// # Errors
/// See [`message`].
pub fn compute_magic(
    payload: &[u8],
    prev_magic_hash: Option<&[u8]>,
) -> Result<MagicHash, MagicHashError> {
    let message = message(payload, prev_magic_hash)?;
    Ok(message_hash(&message).to_byte_array())
}

/// Computes the magic hash of a stored record from its wire fields.
///
/// # Errors
/// Returns [`MagicHashError::InvalidRecord`] if the payload is not base64 or the
/// previous hash is not hex.
pub fn compute_record_magic(
    base64_payload: &str,
    prev_magic_hash_hex: Option<&str>,
) -> Result<MagicHash, MagicHashError> {
    let payload = STANDARD
        .decode(base64_payload.trim())
        .map_err(|err| MagicHashError::InvalidRecord(format!("payload: {err}")))?;
    let prev = prev_magic_hash_hex
        .map(hex::decode)
        .transpose()
        .map_err(|err| MagicHashError::InvalidRecord(format!("prev_magic_hash: {err}")))?;
    compute_magic(&payload, prev.as_deref())
}

fn message_hash(message: &str) -> sha256d::Hash {
    signed_msg_hash(message)
}

/// Signs `message` as a Bitcoin signed message with the node's signing key.
///
/// Returns the base64 of the 65 byte compact recoverable signature.
#[must_use]
pub fn sign(message: &str, node: &MetadataNode) -> String {
    let digest = Message::from_digest(message_hash(message).to_byte_array());
    let signature = secp().sign_ecdsa_recoverable(&digest, node.signing_key());
    STANDARD.encode(MessageSignature::new(signature, true).serialize())
}

/// Checks that `signature` over `message` was produced by the node's key.
#[must_use]
pub fn verify(message: &str, signature: &str, node: &MetadataNode) -> bool {
    let Ok(bytes) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(signature) = MessageSignature::from_slice(&bytes) else {
        return false;
    };
    signature
        .recover_pubkey(secp(), message_hash(message))
        .is_ok_and(|recovered| {
            recovered
                .inner
                .serialize()
                .as_slice()
                .ct_eq(node.public_key().serialize().as_slice())
                .into()
        })
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::SecretKey;

    use super::*;
    use crate::node::EncryptionKey;

    fn node(byte: u8) -> MetadataNode {
        MetadataNode::new(
            SecretKey::from_slice(&[byte; 32]).unwrap(),
            None,
            EncryptionKey::from_bytes([0; 32]),
            None,
        )
    }

    #[test]
    fn test_first_message_is_payload_base64() {
        assert_eq!(message(b"payload", None).unwrap(), STANDARD.encode(b"payload"));
    }

    #[test]
    fn test_chained_message_embeds_prev_and_payload_digest() {
        let prev = [0xab; 32];
        let encoded = message(b"payload", Some(&prev)).unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len(), 64);
        assert_eq!(&decoded[..32], &prev);
        assert_eq!(&decoded[32..], Sha256::digest(b"payload").as_slice());
    }

    #[test]
    fn test_prev_magic_hash_must_be_32_bytes() {
        assert!(matches!(
            message(b"payload", Some(&[0u8; 31])),
            Err(MagicHashError::InvalidPrevMagicHash(31))
        ));
    }

    #[test]
    fn test_magic_is_bitcoin_message_hash() {
        let magic = compute_magic(b"payload", None).unwrap();
        let expected = signed_msg_hash(&STANDARD.encode(b"payload"));
        assert_eq!(magic, expected.to_byte_array());
    }

    #[test]
    fn test_magic_depends_on_prev() {
        let first = compute_magic(b"payload", None).unwrap();
        let chained = compute_magic(b"payload", Some(&first)).unwrap();
        assert_ne!(first, chained);
        assert_eq!(chained, compute_magic(b"payload", Some(&first)).unwrap());
    }

    #[test]
    fn test_record_magic_matches_raw_magic() {
        let prev = [0x11; 32];
        let payload = b"ciphertext bytes";
        assert_eq!(
            compute_record_magic(&STANDARD.encode(payload), Some(&hex::encode(prev))).unwrap(),
            compute_magic(payload, Some(&prev)).unwrap()
        );
        assert!(matches!(
            compute_record_magic("***", None),
            Err(MagicHashError::InvalidRecord(_))
        ));
        assert!(matches!(
            compute_record_magic(&STANDARD.encode(payload), Some("zz")),
            Err(MagicHashError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_sign_is_deterministic_and_verifies() {
        let node = node(0x22);
        let message = message(b"payload", None).unwrap();
        let signature = sign(&message, &node);
        assert_eq!(signature, sign(&message, &node));
        assert_eq!(STANDARD.decode(&signature).unwrap().len(), 65);
        assert!(verify(&message, &signature, &node));
    }

    #[test]
    fn test_verify_rejects_other_signer_or_message() {
        let signer = node(0x22);
        let other = node(0x33);
        let message = message(b"payload", None).unwrap();
        let signature = sign(&message, &signer);
        assert!(!verify(&message, &signature, &other));
        assert!(!verify("another message", &signature, &signer));
        assert!(!verify(&message, "not base64!", &signer));
    }
}
