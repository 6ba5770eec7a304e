//! 세션 인터페이스
//!
//! Session은 외부(호스트)가 소유하는 능력 묶음이다: 전송 출력,
//! 프로듀서 등록/해제, 선택적 암호화 원시 함수. 코어는 세션을
//! 소유하지 않고 한 전송 동안 빌려 쓴다.

use bytes::Bytes;

use crate::crypto::TransferCipher;
use crate::{Error, Result};

/// 전송 세션 능력
///
/// encrypt/decrypt는 선택 사항이며 기본 구현은 실패한다.
/// Encrypting/Decrypting 데코레이터를 쓰려면 세션이 이를 제공해야 한다.
pub trait Session {
    /// 인코딩된 프레임 바이트를 전송 경로에 기록
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// 프로듀서 등록 (pull 루프 시작을 호스트에 알림)
    fn register_producer(&mut self);

    /// 프로듀서 해제 (소스 소진, pull 루프 종료)
    fn unregister_producer(&mut self);

    /// 프로듀서 등록 여부
    fn producer_registered(&self) -> bool;

    /// 청크 암호화 (선택)
    fn encrypt(&mut self, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CryptoUnavailable)
    }

    /// 청크 복호화 (선택)
    fn decrypt(&mut self, _ciphertext: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CryptoUnavailable)
    }
}

/// 인메모리 세션 (루프백/테스트용)
///
/// write 호출을 그대로 누적한다. 호출 경계가 보존되므로
/// 수신측에 임의 청킹으로 다시 먹일 수 있다.
pub struct MemorySession {
    writes: Vec<Bytes>,
    registered: bool,
    cipher: Option<TransferCipher>,
}

impl MemorySession {
    /// 암호화 기능 없는 세션 생성
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            registered: false,
            cipher: None,
        }
    }

    /// 암호화기를 붙인 세션 생성
    pub fn with_cipher(cipher: TransferCipher) -> Self {
        Self {
            writes: Vec::new(),
            registered: false,
            cipher: Some(cipher),
        }
    }

    /// 기록된 write 호출 목록
    pub fn writes(&self) -> &[Bytes] {
        &self.writes
    }

    /// 기록된 모든 바이트를 하나로 연결
    pub fn written_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for w in &self.writes {
            out.extend_from_slice(w);
        }
        out
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writes.push(Bytes::copy_from_slice(data));
        Ok(())
    }

    fn register_producer(&mut self) {
        self.registered = true;
    }

    fn unregister_producer(&mut self) {
        self.registered = false;
    }

    fn producer_registered(&self) -> bool {
        self.registered
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match &mut self.cipher {
            Some(cipher) => cipher.encrypt_chunk(plaintext),
            None => Err(Error::CryptoUnavailable),
        }
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match &self.cipher {
            Some(cipher) => cipher.decrypt_chunk(ciphertext),
            None => Err(Error::CryptoUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paired_ciphers;

    #[test]
    fn test_memory_session_preserves_write_boundaries() {
        let mut session = MemorySession::new();
        session.write(b"abc").unwrap();
        session.write(b"de").unwrap();

        assert_eq!(session.writes().len(), 2);
        assert_eq!(session.written_bytes(), b"abcde");
    }

    #[test]
    fn test_register_unregister() {
        let mut session = MemorySession::new();
        assert!(!session.producer_registered());
        session.register_producer();
        assert!(session.producer_registered());
        session.unregister_producer();
        assert!(!session.producer_registered());
    }

    #[test]
    fn test_crypto_unavailable_without_cipher() {
        let mut session = MemorySession::new();
        assert!(matches!(
            session.encrypt(b"x").unwrap_err(),
            Error::CryptoUnavailable
        ));
    }

    #[test]
    fn test_cipher_backed_session() {
        let (enc, dec) = paired_ciphers();
        let mut sender = MemorySession::with_cipher(enc);
        let mut receiver = MemorySession::with_cipher(dec);

        let ciphertext = sender.encrypt(b"secret").unwrap();
        let plaintext = receiver.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, b"secret");
    }
}
