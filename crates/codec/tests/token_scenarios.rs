#![allow(clippy::unwrap_used, clippy::expect_used)]
use {
    masksmith_codec::{
        CodecError, Engine, Envelope, derive_from_password,
        envelope::VERSION_OFFSET,
        token::{self, find_all},
        z85,
    },
    regex::Regex,
};

#[test]
fn hello_token_has_documented_shape() {
    let engine = Engine::new();
    let (key, id) = derive_from_password("p@ss");
    let wrapped = token::wrap(&engine.seal("hello", &key, id).unwrap());

    let shape = Regex::new(r"^<!MASK-SMITH:[A-Za-z0-9.\-:+=^!/*?&<_()\[\]{}@%$#]+>$").unwrap();
    assert!(shape.is_match(&wrapped), "unexpected token {wrapped}");

    let inner = token::unwrap(&wrapped).unwrap();
    assert_eq!(engine.open(inner, &key).unwrap(), "hello");
}

#[test]
fn token_names_its_key() {
    let engine = Engine::new();
    let (key, id) = derive_from_password("p@ss");
    let (_, wrong_id) = derive_from_password("wrong");

    let envelope = Envelope::deserialize(&engine.seal("hello", &key, id).unwrap()).unwrap();
    assert_eq!(envelope.key_id, id);
    assert_ne!(envelope.key_id, wrong_id);
}

#[test]
fn hello_token_length_is_fixed_by_layout() {
    let engine = Engine::new();
    let (key, id) = derive_from_password("p@ss");
    let token = engine.seal("hello", &key, id).unwrap();
    // 16 header bytes + 5 plaintext bytes + 16 tag bytes.
    assert_eq!(token.len(), z85::encoded_len(37));
}

#[test]
fn version_one_token_is_rejected() {
    let engine = Engine::new();
    let (key, id) = derive_from_password("p@ss");
    let mut bytes = engine.encrypt("hello", &key, id).unwrap().to_bytes();
    bytes[VERSION_OFFSET] = 0x01;

    let result = engine.open(&z85::encode(&bytes), &key);
    assert_eq!(result, Err(CodecError::UnsupportedVersion(0x01)));
}

#[test]
fn documents_survive_a_full_round_trip() {
    let engine = Engine::new();
    let (key, id) = derive_from_password("p@ss");
    let secrets = ["alpha", "", "gamma > delta", "ε"];

    let doc = secrets
        .iter()
        .map(|s| token::wrap(&engine.seal(s, &key, id).unwrap()))
        .collect::<Vec<_>>()
        .join(" | ");

    let found = find_all(&doc);
    assert_eq!(found.len(), secrets.len());
    for (m, expected) in found.iter().zip(secrets) {
        assert_eq!(engine.open(m.token, &key).unwrap(), expected);
    }
}
