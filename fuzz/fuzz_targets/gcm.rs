//! Fuzz target for GCM seal/open
//!
//! Tests that open handles arbitrary input without panicking and that seal
//! output always opens again, on both the backend and block-cipher paths.

#![no_main]

use arbitrary::Arbitrary;
use carapace_crypto::{Aead, Gcm};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct GcmInput {
    key: [u8; 32],
    nonce: Vec<u8>,
    plaintext: Vec<u8>,
    aad: Vec<u8>,
    garbage: Vec<u8>,
}

fn exercise(gcm: &mut Gcm, nonce: &[u8], input: &GcmInput) {
    let sealed = gcm
        .seal(nonce, &input.plaintext, &input.aad)
        .expect("seal failed");
    let opened = gcm.open(nonce, &sealed, &input.aad).expect("open of sealed data failed");
    assert_eq!(opened, input.plaintext);

    // Arbitrary ciphertext must be rejected, never panic
    let mut dst = Vec::new();
    if gcm.open_append(&mut dst, nonce, &input.garbage, &input.aad).is_err() {
        assert!(dst.is_empty());
    }
}

fuzz_target!(|input: GcmInput| {
    let Ok(cipher) = carapace_crypto::new_aes_cipher(&input.key) else {
        return;
    };

    let mut standard = cipher.new_gcm_standard().expect("standard GCM");
    let mut nonce = [0u8; 12];
    let n = input.nonce.len().min(12);
    nonce[..n].copy_from_slice(&input.nonce[..n]);
    exercise(&mut standard, &nonce, &input);

    if !input.nonce.is_empty() && input.nonce.len() != 12 && input.nonce.len() <= 256 {
        let mut block = cipher.new_gcm(input.nonce.len(), 16).expect("block GCM");
        exercise(&mut block, &input.nonce, &input);
    }
});
