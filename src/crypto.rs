//! 암호화 모듈 - X25519 키 교환 + ChaCha20-Poly1305 청크 암호화
//!
//! 흐름:
//! 1. 양측이 X25519 임시 키쌍 생성
//! 2. 공개키 교환
//! 3. 공유 비밀(shared secret) 계산
//! 4. ChaCha20-Poly1305로 청크 단위 암호화/복호화
//!
//! 코어 스트리밍 계층은 이 모듈을 직접 호출하지 않는다.
//! Session 구현이 encrypt/decrypt 기능을 붙일 때만 사용된다.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::{Error, Result};

/// X25519 공개키 크기 (바이트)
pub const PUBLIC_KEY_SIZE: usize = 32;

/// ChaCha20-Poly1305 nonce 크기 (바이트)
pub const NONCE_SIZE: usize = 12;

/// ChaCha20-Poly1305 태그 크기 (바이트)
pub const TAG_SIZE: usize = 16;

/// 임시 키쌍 (일회성 세션용)
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// 새 임시 키쌍 생성
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// 공개키를 바이트로 변환
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// 상대방 공개키로 공유 비밀 계산 (소비됨)
    pub fn compute_shared_secret(self, peer_public: &[u8; PUBLIC_KEY_SIZE]) -> [u8; 32] {
        let peer_public = PublicKey::from(*peer_public);
        let shared = self.secret.diffie_hellman(&peer_public);
        *shared.as_bytes()
    }
}

/// 청크 암호화기
///
/// 전송당 하나. nonce는 카운터 기반으로 생성해 ciphertext 앞에 붙인다.
/// ciphertext 길이 = 평문 + NONCE_SIZE + TAG_SIZE. 진행률 집계는
/// 평문 기준이므로 이 팽창은 호출측에 보이지 않는다.
pub struct TransferCipher {
    cipher: ChaCha20Poly1305,
    nonce_counter: u64,
}

impl TransferCipher {
    /// 공유 비밀로 암호화기 생성
    pub fn new(shared_secret: &[u8; 32]) -> Self {
        let cipher = ChaCha20Poly1305::new_from_slice(shared_secret)
            .expect("Invalid key size");
        Self {
            cipher,
            nonce_counter: 0,
        }
    }

    /// 다음 nonce 생성 (카운터 기반)
    fn next_nonce(&mut self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..8].copy_from_slice(&self.nonce_counter.to_le_bytes());
        self.nonce_counter += 1;
        nonce
    }

    /// 청크 암호화
    /// 반환: nonce(12) + ciphertext(원본 + 16바이트 태그)
    pub fn encrypt_chunk(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = self.next_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// 청크 복호화
    /// 입력: nonce(12) + ciphertext
    pub fn decrypt_chunk(&self, encrypted: &[u8]) -> Result<Vec<u8>> {
        if encrypted.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Decryption("데이터가 너무 짧음".into()));
        }

        let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
        let ciphertext = &encrypted[NONCE_SIZE..];

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| Error::Decryption(e.to_string()))
    }
}

/// 키 교환으로 양쪽 암호화기 쌍 생성 (테스트/루프백용)
pub fn paired_ciphers() -> (TransferCipher, TransferCipher) {
    let alice = EphemeralKeyPair::generate();
    let bob = EphemeralKeyPair::generate();

    let alice_public = alice.public_key_bytes();
    let bob_public = bob.public_key_bytes();

    let alice_shared = alice.compute_shared_secret(&bob_public);
    let bob_shared = bob.compute_shared_secret(&alice_public);

    (TransferCipher::new(&alice_shared), TransferCipher::new(&bob_shared))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_exchange() {
        let alice = EphemeralKeyPair::generate();
        let bob = EphemeralKeyPair::generate();

        let alice_public = alice.public_key_bytes();
        let bob_public = bob.public_key_bytes();

        // 양측이 같은 공유 비밀을 얻어야 함
        let alice_shared = alice.compute_shared_secret(&bob_public);
        let bob_shared = bob.compute_shared_secret(&alice_public);

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (mut enc, dec) = paired_ciphers();

        let plaintext = b"Hello, PSP! This is encrypted chunk data.";
        let encrypted = enc.encrypt_chunk(plaintext).unwrap();
        assert_eq!(encrypted.len(), plaintext.len() + NONCE_SIZE + TAG_SIZE);

        let decrypted = dec.decrypt_chunk(&encrypted).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (mut enc, dec) = paired_ciphers();

        let mut encrypted = enc.encrypt_chunk(b"authentic data").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xFF;

        let err = dec.decrypt_chunk(&encrypted).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_large_chunk_encryption() {
        let (mut enc, dec) = paired_ciphers();

        let plaintext: Vec<u8> = (0..65536).map(|i| (i % 256) as u8).collect();
        let encrypted = enc.encrypt_chunk(&plaintext).unwrap();
        let decrypted = dec.decrypt_chunk(&encrypted).unwrap();

        assert_eq!(plaintext, decrypted);
    }
}
