//! Binary envelope: `[iv: 12][key id: 3][version: 1][ciphertext + tag: N]`.
//!
//! Fields sit at fixed offsets. The version byte at offset 15 is the
//! discriminant; it is read before anything else and selects the widths of
//! the fields around it, so a future layout change means a new version.

use crate::{
    error::CodecError,
    kdf::{KEY_ID_LEN, KeyId},
    traits::IV_LEN,
    z85,
};

/// Offset of the version byte. Pinned for every version.
pub const VERSION_OFFSET: usize = IV_LEN + KEY_ID_LEN;

/// Token layout versions this build can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeVersion {
    V0,
}

impl EnvelopeVersion {
    /// Version written by [`Engine::encrypt`](crate::Engine::encrypt).
    pub const CURRENT: Self = Self::V0;

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::V0 => 0x00,
        }
    }

    /// Total size of the fixed header preceding the ciphertext.
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::V0 => IV_LEN + KEY_ID_LEN + 1,
        }
    }
}

impl TryFrom<u8> for EnvelopeVersion {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x00 => Ok(Self::V0),
            other => Err(CodecError::UnsupportedVersion(other)),
        }
    }
}

/// One encrypted token before transport encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// First 12 bytes of SHA-256 over the plaintext.
    pub iv: [u8; IV_LEN],
    pub key_id: KeyId,
    pub version: EnvelopeVersion,
    /// AEAD output, tag included.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Lay the fields out in wire order.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        [
            self.iv.as_slice(),
            self.key_id.as_bytes().as_slice(),
            [self.version.tag()].as_slice(),
            self.ciphertext.as_slice(),
        ]
        .concat()
    }

    /// Parse wire bytes, checking the version before slicing fields.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let Some(&tag) = bytes.get(VERSION_OFFSET) else {
            return Err(CodecError::MalformedToken(format!(
                "envelope is {} bytes, too short for a header",
                bytes.len()
            )));
        };

        match EnvelopeVersion::try_from(tag)? {
            EnvelopeVersion::V0 => Self::parse_v0(bytes),
        }
    }

    fn parse_v0(bytes: &[u8]) -> Result<Self, CodecError> {
        let header_len = EnvelopeVersion::V0.header_len();
        if bytes.len() < header_len {
            return Err(CodecError::MalformedToken("truncated v0 header".to_string()));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);
        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&bytes[IV_LEN..VERSION_OFFSET]);

        Ok(Self {
            iv,
            key_id: KeyId::from_bytes(key_id),
            version: EnvelopeVersion::V0,
            ciphertext: bytes[header_len..].to_vec(),
        })
    }

    /// Transport-encode the envelope into token text (without delimiters).
    #[must_use]
    pub fn serialize(&self) -> String {
        z85::encode_parts(&[
            self.iv.as_slice(),
            self.key_id.as_bytes().as_slice(),
            [self.version.tag()].as_slice(),
            self.ciphertext.as_slice(),
        ])
    }

    /// Decode token text (without delimiters) into an envelope.
    pub fn deserialize(token: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&z85::decode(token)?)
    }
}
