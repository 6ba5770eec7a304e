//! TCP 전송 호스트
//!
//! 코어 소스/싱크는 동기·협조적이다. 이 모듈은 tokio TCP 스트림
//! 위에서 pull 루프(송신)와 push 루프(수신)를 돌려 한 전송을
//! 호스팅한다. 일시 중단 지점은 produce_more/consume에서 돌아오는
//! 것뿐이며, 블로킹 대기는 없다.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::crypto::TransferCipher;
use crate::session::Session;
use crate::sink::{Consumer, StreamSink};
use crate::source::StreamSource;
use crate::{Error, Result};

/// 수신 read 버퍼 크기
const READ_BUF_SIZE: usize = 64 * 1024;

/// TCP 스트림을 등에 업은 세션
///
/// write는 내부 버퍼에 쌓이고, 호스트 루프가 produce_more 호출
/// 사이마다 스트림으로 내보낸다 (전송 주도 백프레셔).
pub struct TcpSession {
    outbuf: BytesMut,
    registered: bool,
    cipher: Option<TransferCipher>,
}

impl TcpSession {
    /// 암호화 기능 없는 세션 생성
    pub fn new() -> Self {
        Self {
            outbuf: BytesMut::new(),
            registered: false,
            cipher: None,
        }
    }

    /// 암호화기를 붙인 세션 생성
    pub fn with_cipher(cipher: TransferCipher) -> Self {
        Self {
            outbuf: BytesMut::new(),
            registered: false,
            cipher: Some(cipher),
        }
    }

    /// 쌓인 출력 바이트 회수
    fn take_pending(&mut self) -> Bytes {
        self.outbuf.split().freeze()
    }
}

impl Default for TcpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for TcpSession {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.outbuf.extend_from_slice(data);
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

/// 소스를 스트림으로 내보내는 pull 루프
///
/// 소스가 프로듀서를 해제할 때까지 produce_more를 반복 호출하고,
/// 호출마다 쌓인 출력을 스트림에 밀어 넣는다.
pub async fn send_source<P: StreamSource>(
    stream: &mut TcpStream,
    session: &mut TcpSession,
    source: &mut P,
) -> Result<()> {
    session.register_producer();

    while session.producer_registered() {
        source.produce_more(session)?;

        let pending = session.take_pending();
        if !pending.is_empty() {
            stream.write_all(&pending).await?;
        }
    }
    stream.flush().await?;

    info!("전송 완료: {} bytes", source.progress().bytes_moved());
    Ok(())
}

/// 스트림을 싱크로 밀어 넣는 push 루프
///
/// finalize까지 읽어서 consume에 넘긴다. finalize 전에 연결이
/// 끊기면 싱크를 abort하고 IO 에러를 전파한다.
pub async fn receive_sink<K: StreamSink>(
    stream: &mut TcpStream,
    session: &mut TcpSession,
    consumer: &mut Consumer<K>,
) -> Result<()> {
    let mut buf = vec![0u8; READ_BUF_SIZE];

    while !consumer.finalized() {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            consumer.abort();
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "finalize 전에 연결 종료",
            )));
        }
        debug!("수신: {} bytes", n);
        consumer.consume(session, &buf[..n])?;
    }

    info!("수신 완료: {} bytes", consumer.progress().bytes_moved());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paired_ciphers;
    use crate::secure::{DecryptingSink, EncryptingSource};
    use crate::sink::BufferSink;
    use crate::source::BufferSource;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_buffer_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let expected = data.clone();

        let sender = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut session = TcpSession::new();
            let mut source = BufferSource::new(data, 1024);
            send_source(&mut stream, &mut session, &mut source)
                .await
                .unwrap();
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut session = TcpSession::new();
        let mut consumer = Consumer::new(BufferSink::new(), 64 * 1024);
        receive_sink(&mut stream, &mut session, &mut consumer)
            .await
            .unwrap();

        sender.await.unwrap();
        assert_eq!(consumer.sink().result().unwrap().as_ref(), &expected[..]);
    }

    #[tokio::test]
    async fn test_tcp_encrypted_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (enc, dec) = paired_ciphers();
        let data = vec![0x42u8; 10_000];
        let expected = data.clone();

        let sender = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut session = TcpSession::with_cipher(enc);
            let mut source = EncryptingSource::new(BufferSource::new(data, 512));
            send_source(&mut stream, &mut session, &mut source)
                .await
                .unwrap();
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut session = TcpSession::with_cipher(dec);
        let mut consumer = Consumer::new(DecryptingSink::new(BufferSink::new()), 64 * 1024);
        receive_sink(&mut stream, &mut session, &mut consumer)
            .await
            .unwrap();

        sender.await.unwrap();
        assert_eq!(
            consumer.sink().inner().result().unwrap().as_ref(),
            &expected[..]
        );
    }

    #[tokio::test]
    async fn test_tcp_disconnect_before_terminal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let sender = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            // 콘텐츠 프레임만 보내고 종료 마커 없이 끊음
            let frame = crate::frame::encode_frame(b"partial");
            stream.write_all(&frame).await.unwrap();
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut session = TcpSession::new();
        let mut consumer = Consumer::new(BufferSink::new(), 64 * 1024);
        let err = receive_sink(&mut stream, &mut session, &mut consumer)
            .await
            .unwrap_err();

        sender.await.unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
        assert!(!consumer.finalized());
    }
}
