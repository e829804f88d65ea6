//! Reversible URL obfuscation for client-facing manifests.
//!
//! Rewritten manifests must not expose origin hosts or access tokens,
//! so every proxied URL is XORed against a per-process random key and
//! emitted as unpadded URL-safe base64. This is obfuscation against
//! casual inspection, not encryption; the key lives only in memory, so
//! tokens from a previous process run stop decoding after a restart.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

use crate::error::{Error, Result};

/// Key length in bytes. The key cycles over inputs of any length.
pub const KEY_LEN: usize = 64;

pub struct TokenCodec {
    key: [u8; KEY_LEN],
}

impl TokenCodec {
    /// Generate a fresh random key. Called once per process.
    pub fn new() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Construct with a fixed key. Tests use this for determinism.
    pub fn with_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Obfuscate a plaintext URL into an opaque URL-safe token.
    pub fn encode(&self, plaintext: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.xor(plaintext.as_bytes()))
    }

    /// Recover the plaintext URL from a token produced by [`encode`].
    ///
    /// Fails with [`Error::Decode`] if the token is not valid unpadded
    /// URL-safe base64 or the XORed bytes are not valid UTF-8.
    ///
    /// [`encode`]: TokenCodec::encode
    pub fn decode(&self, token: &str) -> Result<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| Error::Decode(e.to_string()))?;
        String::from_utf8(self.xor(&bytes)).map_err(|e| Error::Decode(e.to_string()))
    }

    // XOR is self-inverse, so the same pass encodes and decodes.
    fn xor(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .zip(self.key.iter().cycle())
            .map(|(byte, key)| byte ^ key)
            .collect()
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new()
    }
}
