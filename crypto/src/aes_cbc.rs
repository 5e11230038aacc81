use crate::error::CryptoError;
use crate::{CipherProvider, EncryptedPayload};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use topology::EncryptionProfile;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Default `CipherProvider`, implementing the `aes-256-cbc` profile
/// scenario S5 requires: a 32-byte key (64 hex chars), a random IV of
/// `ivLength` bytes base64-encoded onto the message.
#[derive(Debug, Default)]
pub struct Aes256CbcProvider;

fn decode_key(profile: &EncryptionProfile) -> Result<[u8; 32], CryptoError> {
    let bytes = hex::decode(&profile.key).map_err(|_| CryptoError::InvalidKeyLength)?;
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength)
}

impl CipherProvider for Aes256CbcProvider {
    fn encrypt(&self, profile: &EncryptionProfile, plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError> {
        if profile.algorithm != "aes-256-cbc" {
            return Err(CryptoError::UnsupportedAlgorithm(profile.algorithm.clone()));
        }
        let key = decode_key(profile)?;
        if profile.iv_length == 0 {
            return Err(CryptoError::InvalidIv);
        }

        let mut iv = vec![0u8; profile.iv_length];
        rand::rng().fill_bytes(&mut iv);
        let iv16: [u8; 16] = iv
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidIv)?;

        let ciphertext = Aes256CbcEnc::new(&key.into(), &iv16.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(EncryptedPayload {
            ciphertext,
            iv_base64: BASE64.encode(&iv),
        })
    }

    fn decrypt(&self, profile: &EncryptionProfile, iv_base64: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if profile.algorithm != "aes-256-cbc" {
            return Err(CryptoError::UnsupportedAlgorithm(profile.algorithm.clone()));
        }
        let key = decode_key(profile)?;
        let iv = BASE64.decode(iv_base64).map_err(|_| CryptoError::InvalidIv)?;
        let iv16: [u8; 16] = iv.as_slice().try_into().map_err(|_| CryptoError::InvalidIv)?;

        Aes256CbcDec::new(&key.into(), &iv16.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(key_hex: &str) -> EncryptionProfile {
        EncryptionProfile {
            name: "default".to_string(),
            key: key_hex.to_string(),
            iv_length: 16,
            algorithm: "aes-256-cbc".to_string(),
        }
    }

    #[test]
    fn round_trips_plaintext() {
        let key_hex = "0".repeat(64);
        let profile = profile(&key_hex);
        let provider = Aes256CbcProvider;

        let encrypted = provider.encrypt(&profile, b"test message").unwrap();
        assert_eq!(BASE64.decode(&encrypted.iv_base64).unwrap().len(), 16);

        let decrypted = provider
            .decrypt(&profile, &encrypted.iv_base64, &encrypted.ciphertext)
            .unwrap();
        assert_eq!(decrypted, b"test message");
    }

    #[test]
    fn rejects_short_key() {
        let profile = profile("deadbeef");
        let provider = Aes256CbcProvider;
        let err = provider.encrypt(&profile, b"hi").unwrap_err();
        assert_eq!(err, CryptoError::InvalidKeyLength);
    }
}
