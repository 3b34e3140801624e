//! initfs decryption using AES-128-CBC.
//!
//! The initfs payload is encrypted with the per-install key, which doubles as
//! the IV, and PKCS#7 padded.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// AES block size.
pub const BLOCK_SIZE: usize = 16;

/// Decrypt to a new buffer with the padding removed.
pub fn decrypt(data: &[u8], key: &[u8; 16]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::Decryption(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
            data.len()
        )));
    }

    let key = GenericArray::from_slice(key);
    let decryptor = Aes128CbcDec::new(key, key);

    let mut buffer = data.to_vec();
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| Error::Decryption("bad padding, wrong key?".to_string()))?
        .len();
    buffer.truncate(len);
    Ok(buffer)
}

/// Encrypt with PKCS#7 padding. Inverse of [`decrypt`].
pub fn encrypt(data: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let key = GenericArray::from_slice(key);
    let encryptor = Aes128CbcEnc::new(key, key);

    encryptor.encrypt_padded_vec_mut::<Pkcs7>(data)
}
