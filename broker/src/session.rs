use anyhow::{anyhow, Context, Result};
use crypto::CipherProvider;
use lapin::types::{AMQPValue, FieldTable};
use lapin::Consumer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use topology::EncryptionProfile;

/// The live consumer resulting from a successful `subscribe` (spec.md
/// §4.4). `cancel()` is idempotent and safe to call concurrently with
/// delivery; `unsubscribe_all` relies on that.
pub struct Session {
    pub name: String,
    pub subscription: String,
    consumer: Consumer,
    cancelled: Arc<AtomicBool>,
    max_defer_close_channel: Duration,
    encryption: Option<EncryptionProfile>,
    cipher: Arc<dyn CipherProvider>,
}

impl Session {
    pub fn new(
        name: String,
        subscription: String,
        consumer: Consumer,
        max_defer_close_channel: Duration,
        encryption: Option<EncryptionProfile>,
        cipher: Arc<dyn CipherProvider>,
    ) -> Self {
        Self {
            name,
            subscription,
            consumer,
            cancelled: Arc::new(AtomicBool::new(false)),
            max_defer_close_channel,
            encryption,
            cipher,
        }
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// Decrypts `body` against this session's subscription's encryption
    /// profile, reading the IV the publishing side stamped onto
    /// `rascal.encryption.iv` (spec.md §4.3/§6). Returns `body` unchanged
    /// when the subscription has no encryption profile resolved.
    pub fn decrypt(&self, headers: &FieldTable, body: &[u8]) -> Result<Vec<u8>> {
        decrypt_body(self.cipher.as_ref(), self.encryption.as_ref(), headers, body)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn max_defer_close_channel_timeout(&self) -> Duration {
        self.max_defer_close_channel
    }

    /// Idempotent: a second call observes `cancelled` already set and
    /// is a no-op.
    pub async fn cancel(&self) -> Result<()> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.consumer
            .cancel()
            .await
            .with_context(|| format!("failed to cancel session {}", self.name))?;
        Ok(())
    }
}

/// Pure decryption step, factored out of `Session::decrypt` so it has direct
/// unit coverage without a live consumer. Passes `body` through unchanged
/// when there's no encryption profile to apply.
fn decrypt_body(
    cipher: &dyn CipherProvider,
    profile: Option<&EncryptionProfile>,
    headers: &FieldTable,
    body: &[u8],
) -> Result<Vec<u8>> {
    let Some(profile) = profile else {
        return Ok(body.to_vec());
    };
    let iv = header_string(headers, "rascal.encryption.iv")
        .ok_or_else(|| anyhow!("encrypted delivery is missing the rascal.encryption.iv header"))?;
    cipher
        .decrypt(profile, &iv, body)
        .map_err(|e| anyhow!("decryption failed: {e}"))
}

fn header_string(headers: &FieldTable, key: &str) -> Option<String> {
    headers.inner().iter().find_map(|(k, v)| {
        if k.to_string() != key {
            return None;
        }
        match v {
            AMQPValue::LongString(s) => Some(s.to_string()),
            AMQPValue::ShortString(s) => Some(s.to_string()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::Aes256CbcProvider;

    fn profile() -> EncryptionProfile {
        EncryptionProfile {
            name: "default".to_string(),
            key: "0".repeat(64),
            iv_length: 16,
            algorithm: "aes-256-cbc".to_string(),
        }
    }

    #[test]
    fn passes_through_unencrypted_bodies() {
        let cipher = Aes256CbcProvider;
        let headers = FieldTable::default();
        let body = decrypt_body(&cipher, None, &headers, b"plain").unwrap();
        assert_eq!(body, b"plain");
    }

    #[test]
    fn decrypts_when_subscription_has_a_profile() {
        let cipher = Aes256CbcProvider;
        let profile = profile();
        let encrypted = cipher.encrypt(&profile, b"secret payload").unwrap();

        let mut headers = FieldTable::default();
        headers.insert(
            "rascal.encryption.iv".into(),
            AMQPValue::LongString(encrypted.iv_base64.as_str().into()),
        );

        let body = decrypt_body(&cipher, Some(&profile), &headers, &encrypted.ciphertext).unwrap();
        assert_eq!(body, b"secret payload");
    }

    #[test]
    fn missing_iv_header_is_a_hard_error() {
        let cipher = Aes256CbcProvider;
        let profile = profile();
        let headers = FieldTable::default();
        assert!(decrypt_body(&cipher, Some(&profile), &headers, b"ciphertext").is_err());
    }
}
