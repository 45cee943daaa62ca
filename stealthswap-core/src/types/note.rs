//! Payment notes and receiver tags.
//!
//! A payment note is the opaque announcement a payer publishes so the recipient can
//! recognise the payment off-chain. The ledger never interprets it; it only checks
//! the field sizes and echoes it in the `PaymentNote` event.
//!
//! Two packing schemes exist:
//!
//! ```text
//! unpacked: iv (16) || x (32) || y (32) || ct0 (32) || ct1 (32) || ct2 (32) || mac (32)
//! packed:   x (32) || y (32) || note (32)
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{
    NOTE_CIPHERTEXT_WORDS, NOTE_IV_SIZE, UNCOMPRESSED_KEY_SIZE, UNCOMPRESSED_KEY_TAG, WORD_SIZE,
};
use crate::error::{LedgerError, Result};
use crate::types::Address;

/// A 32-byte ABI word.
pub type Word = [u8; WORD_SIZE];

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT NOTE
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque payment note attached to a payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scheme")]
pub enum PaymentNote {
    /// Seven-field note: ECIES IV, ephemeral key coordinates, three ciphertext
    /// words and a MAC.
    Unpacked {
        /// AES initialization vector.
        #[serde(with = "hex::serde")]
        iv: [u8; NOTE_IV_SIZE],
        /// Ephemeral public key x-coordinate.
        #[serde(with = "hex::serde")]
        x_coord: Word,
        /// Ephemeral public key y-coordinate.
        #[serde(with = "hex::serde")]
        y_coord: Word,
        /// Ciphertext word 0.
        #[serde(with = "hex::serde")]
        ct_buf0: Word,
        /// Ciphertext word 1.
        #[serde(with = "hex::serde")]
        ct_buf1: Word,
        /// Ciphertext word 2.
        #[serde(with = "hex::serde")]
        ct_buf2: Word,
        /// Integrity tag.
        #[serde(with = "hex::serde")]
        mac: Word,
    },
    /// Three-field note: ephemeral key coordinates and one opaque word.
    Packed {
        /// Ephemeral public key x-coordinate.
        #[serde(with = "hex::serde")]
        x_coord: Word,
        /// Ephemeral public key y-coordinate.
        #[serde(with = "hex::serde")]
        y_coord: Word,
        /// Opaque encrypted note word.
        #[serde(with = "hex::serde")]
        note: Word,
    },
}

impl PaymentNote {
    /// Builds a packed note from an uncompressed SEC1 ephemeral key and a
    /// 32-byte ciphertext.
    pub fn packed_from_parts(ephemeral_public_key: &[u8], ciphertext: &[u8]) -> Result<Self> {
        let (x_coord, y_coord) = split_uncompressed_key(ephemeral_public_key)?;
        let note = to_word(ciphertext, "ciphertext")?;
        Ok(PaymentNote::Packed {
            x_coord,
            y_coord,
            note,
        })
    }

    /// Builds an unpacked note from an ECIES bundle: 16-byte IV, uncompressed
    /// ephemeral key, ciphertext of at most three words (right-padded with zeros)
    /// and a 32-byte MAC.
    pub fn unpacked_from_parts(
        iv: &[u8],
        ephemeral_public_key: &[u8],
        ciphertext: &[u8],
        mac: &[u8],
    ) -> Result<Self> {
        let iv: [u8; NOTE_IV_SIZE] = iv.try_into().map_err(|_| {
            LedgerError::InvalidNote(format!(
                "iv: expected {} bytes, got {}",
                NOTE_IV_SIZE,
                iv.len()
            ))
        })?;
        let (x_coord, y_coord) = split_uncompressed_key(ephemeral_public_key)?;

        let max = NOTE_CIPHERTEXT_WORDS * WORD_SIZE;
        if ciphertext.is_empty() || ciphertext.len() > max {
            return Err(LedgerError::InvalidNote(format!(
                "ciphertext: expected 1..={} bytes, got {}",
                max,
                ciphertext.len()
            )));
        }
        let mut words = [[0u8; WORD_SIZE]; NOTE_CIPHERTEXT_WORDS];
        for (word, chunk) in words.iter_mut().zip(ciphertext.chunks(WORD_SIZE)) {
            word[..chunk.len()].copy_from_slice(chunk);
        }

        let mac = to_word(mac, "mac")?;
        let [ct_buf0, ct_buf1, ct_buf2] = words;

        Ok(PaymentNote::Unpacked {
            iv,
            x_coord,
            y_coord,
            ct_buf0,
            ct_buf1,
            ct_buf2,
            mac,
        })
    }

    /// Returns the ephemeral key coordinates.
    pub fn ephemeral_key(&self) -> (&Word, &Word) {
        match self {
            PaymentNote::Unpacked { x_coord, y_coord, .. }
            | PaymentNote::Packed { x_coord, y_coord, .. } => (x_coord, y_coord),
        }
    }

    /// Returns the uncompressed SEC1 encoding of the ephemeral key.
    pub fn ephemeral_public_key(&self) -> Vec<u8> {
        let (x, y) = self.ephemeral_key();
        let mut key = Vec::with_capacity(UNCOMPRESSED_KEY_SIZE);
        key.push(UNCOMPRESSED_KEY_TAG);
        key.extend_from_slice(x);
        key.extend_from_slice(y);
        key
    }

    /// Returns the note as the ordered list of event fields, in ABI order.
    pub fn fields(&self) -> Vec<(&'static str, Vec<u8>)> {
        match self {
            PaymentNote::Unpacked {
                iv,
                x_coord,
                y_coord,
                ct_buf0,
                ct_buf1,
                ct_buf2,
                mac,
            } => vec![
                ("iv", iv.to_vec()),
                ("xCoord", x_coord.to_vec()),
                ("yCoord", y_coord.to_vec()),
                ("ctBuf0", ct_buf0.to_vec()),
                ("ctBuf1", ct_buf1.to_vec()),
                ("ctBuf2", ct_buf2.to_vec()),
                ("mac", mac.to_vec()),
            ],
            PaymentNote::Packed {
                x_coord,
                y_coord,
                note,
            } => vec![
                ("xCoord", x_coord.to_vec()),
                ("yCoord", y_coord.to_vec()),
                ("note", note.to_vec()),
            ],
        }
    }
}

fn split_uncompressed_key(key: &[u8]) -> Result<(Word, Word)> {
    if key.len() != UNCOMPRESSED_KEY_SIZE || key[0] != UNCOMPRESSED_KEY_TAG {
        return Err(LedgerError::InvalidNote(format!(
            "ephemeral key must be {} bytes starting with 0x04",
            UNCOMPRESSED_KEY_SIZE
        )));
    }
    let x = to_word(&key[1..1 + WORD_SIZE], "x")?;
    let y = to_word(&key[1 + WORD_SIZE..], "y")?;
    Ok((x, y))
}

fn to_word(bytes: &[u8], field: &str) -> Result<Word> {
    bytes.try_into().map_err(|_| {
        LedgerError::InvalidNote(format!(
            "{}: expected {} bytes, got {}",
            field,
            WORD_SIZE,
            bytes.len()
        ))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECEIVER TAG
// ═══════════════════════════════════════════════════════════════════════════════

/// How the stealth address appears in the `PaymentNote` event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverDisclosure {
    /// The plain stealth address.
    Plain,
    /// `keccak256(stealth address)`.
    #[default]
    Hashed,
}

/// Receiver identity as published in a `PaymentNote` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ReceiverTag {
    /// The stealth address itself.
    Plain(Address),
    /// Keccak-256 of the stealth address bytes.
    Hashed(#[serde(with = "hex::serde")] Word),
}

impl ReceiverTag {
    /// Computes the tag for a stealth address under a disclosure mode.
    pub fn for_receiver(receiver: &Address, disclosure: ReceiverDisclosure) -> Self {
        match disclosure {
            ReceiverDisclosure::Plain => ReceiverTag::Plain(*receiver),
            ReceiverDisclosure::Hashed => ReceiverTag::Hashed(receiver.keccak256()),
        }
    }

    /// Returns true if this tag was produced for `receiver`.
    pub fn matches(&self, receiver: &Address) -> bool {
        match self {
            ReceiverTag::Plain(address) => address == receiver,
            ReceiverTag::Hashed(hash) => *hash == receiver.keccak256(),
        }
    }
}

impl std::fmt::Display for ReceiverTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiverTag::Plain(address) => write!(f, "{}", address),
            ReceiverTag::Hashed(hash) => write!(f, "0x{}", hex::encode(hash)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Uncompressed secp256k1 point and a 32-byte ciphertext.
    const EPHEMERAL_KEY: &str = "043a258b6e77773a2429dba2fc434544828c73e1251791abcb09a5a10f0998fe0f0a7857d76d5cba188a709013b9f352b3889b4a15bbd2fd41a35a323b04fba030";
    const CIPHERTEXT: &str = "8e99b5e16ef3c173144927260fca90f2a34c9c8997b102820baf1d1c9ef682f1";

    #[test]
    fn test_packed_note_from_parts() {
        let key = hex::decode(EPHEMERAL_KEY).unwrap();
        let ct = hex::decode(CIPHERTEXT).unwrap();
        let note = PaymentNote::packed_from_parts(&key, &ct).unwrap();

        let (x, y) = note.ephemeral_key();
        assert_eq!(hex::encode(x), &EPHEMERAL_KEY[2..66]);
        assert_eq!(hex::encode(y), &EPHEMERAL_KEY[66..130]);
        assert_eq!(note.ephemeral_public_key(), key);

        let fields = note.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].0, "note");
        assert_eq!(fields[2].1, ct);
    }

    #[test]
    fn test_unpacked_note_pads_ciphertext() {
        let key = hex::decode(EPHEMERAL_KEY).unwrap();
        let ct = vec![0x0e; 80];
        let note = PaymentNote::unpacked_from_parts(&[0xa6; 16], &key, &ct, &[0x59; 32]).unwrap();

        match &note {
            PaymentNote::Unpacked {
                ct_buf0,
                ct_buf1,
                ct_buf2,
                ..
            } => {
                assert_eq!(ct_buf0, &[0x0e; 32]);
                assert_eq!(ct_buf1, &[0x0e; 32]);
                assert_eq!(&ct_buf2[..16], &[0x0e; 16]);
                assert_eq!(&ct_buf2[16..], &[0u8; 16]);
            }
            other => panic!("unexpected note {:?}", other),
        }
        assert_eq!(note.fields().len(), 7);
    }

    #[test]
    fn test_note_rejects_bad_sizes() {
        let key = hex::decode(EPHEMERAL_KEY).unwrap();
        assert!(PaymentNote::packed_from_parts(&key[1..], &[0u8; 32]).is_err());
        assert!(PaymentNote::packed_from_parts(&key, &[0u8; 31]).is_err());

        let mut compressed = key.clone();
        compressed[0] = 0x02;
        assert!(PaymentNote::packed_from_parts(&compressed, &[0u8; 32]).is_err());

        assert!(PaymentNote::unpacked_from_parts(&[0u8; 15], &key, &[1u8; 32], &[0u8; 32]).is_err());
        assert!(PaymentNote::unpacked_from_parts(&[0u8; 16], &key, &[], &[0u8; 32]).is_err());
        assert!(PaymentNote::unpacked_from_parts(&[0u8; 16], &key, &[1u8; 97], &[0u8; 32]).is_err());
    }

    #[test]
    fn test_note_json_shape() {
        let note = PaymentNote::Packed {
            x_coord: [1u8; 32],
            y_coord: [2u8; 32],
            note: [3u8; 32],
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["scheme"], "packed");
        assert_eq!(json["note"], hex::encode([3u8; 32]));
        let back: PaymentNote = serde_json::from_value(json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_receiver_tag() {
        let receiver = Address::from_label("receiver1");
        let hashed = ReceiverTag::for_receiver(&receiver, ReceiverDisclosure::Hashed);
        let plain = ReceiverTag::for_receiver(&receiver, ReceiverDisclosure::Plain);

        assert_eq!(hashed, ReceiverTag::Hashed(receiver.keccak256()));
        assert_eq!(plain, ReceiverTag::Plain(receiver));
        assert!(hashed.matches(&receiver));
        assert!(plain.matches(&receiver));
        assert!(!hashed.matches(&Address::from_label("receiver2")));
        assert_eq!(ReceiverDisclosure::default(), ReceiverDisclosure::Hashed);
    }
}
