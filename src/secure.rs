//! 암호화 데코레이터
//!
//! 임의의 소스/싱크를 감싸 콘텐츠 프레임을 세션의 encrypt/decrypt로
//! 투명하게 변환한다. 프레이밍과 진행률 집계는 안쪽 구현 그대로:
//! 진행률은 항상 평문 바이트 기준이므로 ciphertext 팽창이
//! 보고되는 진행률을 흔들지 않는다.
//!
//! 파일 헤더와 종료 마커는 기본적으로 암호화를 우회한다. 파일
//! 길이의 기밀성이 필요하면 encrypt_headers를 켜되, 양측이 같은
//! 선택을 해야 한다 (사전 합의 사항).

use bytes::Bytes;

use crate::config::Config;
use crate::progress::Progress;
use crate::session::Session;
use crate::sink::StreamSink;
use crate::source::{SourceFrame, StreamSource};
use crate::Result;

/// 암호화 소스 데코레이터
///
/// 안쪽 소스가 내놓은 콘텐츠 청크를 session.encrypt에 통과시켜
/// ciphertext를 프레이밍하게 한다.
pub struct EncryptingSource<P> {
    inner: P,
    encrypt_headers: bool,
}

impl<P: StreamSource> EncryptingSource<P> {
    /// 새 암호화 소스 생성 (헤더는 평문 유지)
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            encrypt_headers: false,
        }
    }

    /// 파일 헤더 payload까지 암호화하는 소스 생성
    pub fn with_header_encryption(inner: P) -> Self {
        Self {
            inner,
            encrypt_headers: true,
        }
    }

    /// 설정의 encrypt_headers 플래그에 따라 소스 생성
    pub fn from_config(inner: P, config: &Config) -> Self {
        Self {
            inner,
            encrypt_headers: config.encrypt_headers,
        }
    }
}

impl<P: StreamSource> StreamSource for EncryptingSource<P> {
    fn pull_frame(&mut self, session: &mut dyn Session) -> Result<SourceFrame> {
        match self.inner.pull_frame(session)? {
            SourceFrame::Content(chunk) => {
                let ciphertext = session.encrypt(&chunk)?;
                Ok(SourceFrame::Content(Bytes::from(ciphertext)))
            }
            SourceFrame::FileHeader(len) if self.encrypt_headers => {
                let ciphertext = session.encrypt(&len.to_be_bytes())?;
                Ok(SourceFrame::Content(Bytes::from(ciphertext)))
            }
            other => Ok(other),
        }
    }

    fn progress(&self) -> Progress {
        self.inner.progress()
    }

    fn finished(&self) -> bool {
        self.inner.finished()
    }

    fn abort(&mut self) {
        self.inner.abort();
    }
}

/// 복호화 싱크 데코레이터
///
/// 안쪽 싱크에 닿기 전에 모든 콘텐츠 프레임 payload를
/// session.decrypt로 교체한다. 복호화 실패 시 어떤 평문도 안쪽
/// handle_frame에 노출되지 않는다.
pub struct DecryptingSink<K> {
    inner: K,
    decrypt_headers: bool,
}

impl<K: StreamSink> DecryptingSink<K> {
    /// 새 복호화 싱크 생성 (헤더는 평문으로 간주)
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            decrypt_headers: false,
        }
    }

    /// 파일 헤더 payload까지 복호화하는 싱크 생성
    pub fn with_header_decryption(inner: K) -> Self {
        Self {
            inner,
            decrypt_headers: true,
        }
    }

    /// 설정의 encrypt_headers 플래그에 따라 싱크 생성
    pub fn from_config(inner: K, config: &Config) -> Self {
        Self {
            inner,
            decrypt_headers: config.encrypt_headers,
        }
    }

    /// 안쪽 싱크 참조 (결과 조회용)
    pub fn inner(&self) -> &K {
        &self.inner
    }
}

impl<K: StreamSink> StreamSink for DecryptingSink<K> {
    fn handle_frame(&mut self, session: &mut dyn Session, payload: Bytes) -> Result<()> {
        if self.inner.expects_header() && !self.decrypt_headers {
            return self.inner.handle_frame(session, payload);
        }
        let plaintext = session.decrypt(&payload)?;
        self.inner.handle_frame(session, Bytes::from(plaintext))
    }

    fn finalize(&mut self) -> Result<()> {
        self.inner.finalize()
    }

    fn progress(&self) -> Progress {
        self.inner.progress()
    }

    fn finalized(&self) -> bool {
        self.inner.finalized()
    }

    fn expects_header(&self) -> bool {
        self.inner.expects_header()
    }

    fn abort(&mut self) {
        self.inner.abort();
    }
}
