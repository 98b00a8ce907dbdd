//! Digest primitives shared by the keyed-digest mechanisms.
//!
//! CRAM-MD5 uses [`hmac_md5`], DIGEST-MD5 uses the MD5 helpers, NTLM uses the
//! MD4/DES password-hash and challenge-encryption functions. All of them are
//! small pure functions over byte slices.

use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};
use des::Des;
use hmac::{Hmac, Mac};
use md4::Md4;
use md5::{Digest, Md5};

/// 16 octet MD5 hash of `data`.
pub fn md5(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

/// MD5 hash of `data` as 32 lowercase hex digits, the `HEX(H(s))` of RFC 2831.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5(data))
}

/// HMAC-MD5 keyed digest (RFC 2104), as used by CRAM-MD5.
pub fn hmac_md5(key: &[u8], message: &[u8]) -> [u8; 16] {
    let mut mac =
        <Hmac<Md5> as Mac>::new_from_slice(key).expect("HMAC-MD5 accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// NTLM password hash: MD4 of the UTF-16LE encoded password.
pub fn ntlm_hash(password: &str) -> [u8; 16] {
    let bytes: Vec<u8> = password.encode_utf16().flat_map(u16::to_le_bytes).collect();
    Md4::digest(&bytes).into()
}

/// LanManager password hash: the uppercased password, padded to 14 bytes,
/// split in two 7-byte DES keys each encrypting the fixed string `KGS!@#$%`.
pub fn lm_hash(password: &str) -> [u8; 16] {
    const LM_PLAINTEXT: [u8; 8] = *b"KGS!@#$%";

    let mut padded = [0u8; 14];
    for (dst, src) in padded.iter_mut().zip(password.to_uppercase().bytes()) {
        *dst = src;
    }

    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&des_encrypt(padded[..7].try_into().unwrap(), &LM_PLAINTEXT));
    out[8..].copy_from_slice(&des_encrypt(padded[7..].try_into().unwrap(), &LM_PLAINTEXT));
    out
}

/// The NTLMv1 `DESL` operation: the 16-byte hash is padded with five zero
/// bytes and split into three 7-byte DES keys, each encrypting the 8-byte
/// server challenge; the three ciphertexts are concatenated.
pub fn des_long(key: &[u8; 16], data: &[u8; 8]) -> [u8; 24] {
    let mut padded = [0u8; 21];
    padded[..16].copy_from_slice(key);

    let mut out = [0u8; 24];
    for i in 0..3 {
        let k7: [u8; 7] = padded[i * 7..(i + 1) * 7].try_into().unwrap();
        out[i * 8..(i + 1) * 8].copy_from_slice(&des_encrypt(k7, data));
    }
    out
}

fn des_encrypt(key7: [u8; 7], data: &[u8; 8]) -> [u8; 8] {
    let des = Des::new(&GenericArray::from(expand_des_key(key7)));
    let mut block = GenericArray::from(*data);
    des.encrypt_block(&mut block);
    block.into()
}

/// Spread a 56-bit key over 8 bytes, 7 key bits per byte. The low (parity)
/// bit of each byte is discarded by DES key schedule so it is left clear.
fn expand_des_key(k: [u8; 7]) -> [u8; 8] {
    [
        k[0],
        (k[0] << 7) | (k[1] >> 1),
        (k[1] << 6) | (k[2] >> 2),
        (k[2] << 5) | (k[3] >> 3),
        (k[3] << 4) | (k[4] >> 4),
        (k[4] << 3) | (k[5] >> 5),
        (k[5] << 2) | (k[6] >> 6),
        k[6] << 1,
    ]
}
