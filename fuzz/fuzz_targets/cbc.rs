//! Fuzz target for CBC
//!
//! Tests that CBC round-trips arbitrary whole-block input.

#![no_main]

use arbitrary::Arbitrary;
use carapace_crypto::BlockMode;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct CbcInput {
    key: [u8; 16],
    iv: [u8; 16],
    data: Vec<u8>,
}

fuzz_target!(|input: CbcInput| {
    let Ok(cipher) = carapace_crypto::new_aes_cipher(&input.key) else {
        return;
    };
    let len = input.data.len() - input.data.len() % 16;
    let plaintext = &input.data[..len];

    let mut ciphertext = vec![0u8; len];
    cipher
        .new_cbc_encrypter(&input.iv)
        .crypt_blocks(&mut ciphertext, plaintext)
        .expect("encrypt failed");

    let mut decrypted = ciphertext.clone();
    cipher
        .new_cbc_decrypter(&input.iv)
        .crypt_blocks_in_place(&mut decrypted)
        .expect("decrypt failed");
    assert_eq!(decrypted, plaintext);
});
