//! Z85-style radix-85 transport encoding.
//!
//! Every 4 input bytes become 5 printable characters. Unlike strict Z85 the
//! input length need not be a multiple of 4: a short final group is
//! zero-padded before conversion and the padding characters are dropped, so
//! `n` bytes always encode to `n / 4 * 5 + (n % 4 + 1)` characters (the last
//! term only when `n % 4 != 0`).
//!
//! The alphabet is Z85 with `>` replaced by `_`, so an encoded token can sit
//! inside the `<!MASK-SMITH:...>` delimiters without escaping.

use crate::error::CodecError;

/// The 85 output symbols, in digit order.
pub const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<_()[]{}@%$#";

/// Character appended to a short final group before decoding.
///
/// It is the highest digit, which makes truncated groups round up to the
/// value that still carries the original leading bytes.
pub const SENTINEL: u8 = ALPHABET[84];

const INVALID: u8 = 0xFF;

const DECODE_TABLE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Number of characters [`encode`] produces for `len` input bytes.
#[must_use]
pub const fn encoded_len(len: usize) -> usize {
    let tail = len % 4;
    len / 4 * 5 + if tail == 0 { 0 } else { tail + 1 }
}

/// Encode a byte sequence.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(data.len()));

    for chunk in data.chunks(4) {
        let digits = encode_group(chunk);
        // Characters beyond `chunk.len() + 1` only describe zero padding.
        out.extend(digits[..=chunk.len()].iter().map(|&b| char::from(b)));
    }

    out
}

/// The five symbols of up to 4 bytes, zero-padded on the right.
fn encode_group(chunk: &[u8]) -> [u8; 5] {
    let mut group = [0u8; 4];
    group[..chunk.len()].copy_from_slice(chunk);
    let mut value = u32::from_be_bytes(group);

    let mut digits = [0u8; 5];
    for digit in digits.iter_mut().rev() {
        *digit = ALPHABET[(value % 85) as usize];
        value /= 85;
    }
    digits
}

/// Concatenate several buffers and encode them as one string.
#[must_use]
pub fn encode_parts(parts: &[&[u8]]) -> String {
    encode(&parts.concat())
}

/// Decode text produced by [`encode`].
///
/// Fails with [`CodecError::MalformedToken`] on characters outside the
/// alphabet, on a lone trailing character (which cannot carry a byte), on
/// groups whose value does not fit in 32 bits, and on a short final group
/// that [`encode`] would not have produced.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let input = text.as_bytes();
    if input.len() % 5 == 1 {
        return Err(CodecError::MalformedToken(
            "dangling character at end of input".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(input.len() / 5 * 4 + 4);

    for chunk in input.chunks(5) {
        let mut value: u64 = 0;
        for i in 0..5 {
            let symbol = chunk.get(i).copied().unwrap_or(SENTINEL);
            let digit = DECODE_TABLE[symbol as usize];
            if digit == INVALID {
                return Err(CodecError::MalformedToken(format!(
                    "invalid character {:?}",
                    char::from(symbol)
                )));
            }
            value = value * 85 + u64::from(digit);
        }

        let value = u32::try_from(value)
            .map_err(|_| CodecError::MalformedToken("group exceeds 32 bits".to_string()))?;

        // A group of k characters carries k - 1 bytes; the rest was padding.
        let bytes = &value.to_be_bytes()[..chunk.len() - 1];
        if chunk.len() < 5 && encode_group(bytes)[..chunk.len()] != *chunk {
            return Err(CodecError::MalformedToken(
                "non-canonical final group".to_string(),
            ));
        }
        out.extend_from_slice(bytes);
    }

    Ok(out)
}
