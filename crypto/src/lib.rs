mod aes_cbc;
mod error;

pub use aes_cbc::Aes256CbcProvider;
pub use error::CryptoError;

use topology::EncryptionProfile;

/// Result of an `encrypt` call: the ciphertext plus the base64-encoded
/// IV that must be stamped onto `rascal.encryption.iv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv_base64: String,
}

/// A pluggable symmetric cipher, resolved per publication/subscription
/// from its `EncryptionProfile`. `broker` calls this at the point of
/// publish/deliver; it never inspects key material itself.
pub trait CipherProvider: Send + Sync {
    fn encrypt(&self, profile: &EncryptionProfile, plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError>;
    fn decrypt(&self, profile: &EncryptionProfile, iv_base64: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
