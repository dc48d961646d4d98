//! Reversible masking tokens for confidential text.
//!
//! A span of plaintext is turned into an opaque, self-describing token:
//! AES-256-GCM ciphertext under a password-derived key, framed in a fixed
//! binary envelope and rendered as printable text with a Z85-style codec.
//!
//! This crate is the pure layer: it never prompts and never touches storage.
//! Callers hand it resolved [`KeyMaterial`]; the password lifecycle lives in
//! `masksmith-vault`.

pub mod engine;
pub mod envelope;
pub mod error;
pub mod gcm;
pub mod kdf;
pub mod token;
pub mod traits;
pub mod z85;

pub use {
    engine::{Engine, VerifyPolicy},
    envelope::{Envelope, EnvelopeVersion},
    error::CodecError,
    gcm::Aes256GcmCipher,
    kdf::{KeyId, KeyMaterial, derive_from_password},
    token::TokenMatch,
    traits::Cipher,
};
