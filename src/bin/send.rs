//! PSP 송신 바이너리 - Payload Stream Protocol
//!
//! 파일 집합을 길이 접두 프레임으로 잘라 TCP로 내보낸다.
//! - 파일마다 8바이트 길이 헤더 + 콘텐츠 프레임
//! - X25519 + ChaCha20-Poly1305 암호화 지원 (선택)
//!
//! 사용법:
//!   cargo run --release --bin psp-send -- [OPTIONS]
//!
//! 예시:
//!   # 기본 전송
//!   cargo run --release --bin psp-send -- --connect 127.0.0.1:9000 --file data.bin
//!
//!   # 암호화 전송
//!   cargo run --release --bin psp-send -- -c 127.0.0.1:9000 -f a.bin -f b.bin --encrypt

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use psp::crypto::{EphemeralKeyPair, TransferCipher, PUBLIC_KEY_SIZE};
use psp::{
    send_source, Config, EncryptingSource, FileSetSource, StreamSource, TcpSession,
};

/// 송신 설정
struct SendConfig {
    connect_addr: SocketAddr,
    files: Vec<PathBuf>,
    config: Config,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            connect_addr: "127.0.0.1:9000".parse().unwrap(),
            files: Vec::new(),
            config: Config::default(),
        }
    }
}

fn parse_args() -> SendConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SendConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--connect" | "-c" => {
                if i + 1 < args.len() {
                    config.connect_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.files.push(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--chunk-size" => {
                if i + 1 < args.len() {
                    config.config.chunk_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--encrypt" | "-e" => {
                config.config.encryption_enabled = true;
            }
            "--encrypt-headers" => {
                config.config.encryption_enabled = true;
                config.config.encrypt_headers = true;
            }
            "--help" | "-h" => {
                println!(
                    r#"PSP Send - Payload Stream Protocol 송신기

파일 집합을 길이 접두 프레임으로 잘라 TCP로 전송

사용법:
  cargo run --release --bin psp-send -- [OPTIONS]

옵션:
  -c, --connect <ADDR>    수신측 주소 (기본: 127.0.0.1:9000)
  -f, --file <PATH>       전송할 파일 (반복 가능, 순서 유지)
  -e, --encrypt           암호화 활성화 (X25519 + ChaCha20-Poly1305)
  --encrypt-headers       파일 길이 헤더까지 암호화 (수신측과 합의 필요)
  --chunk-size <SIZE>     청크 크기 바이트 (기본: 10240)
  -h, --help              이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

/// 공개키를 교환해 전송 암호화기 생성
async fn exchange_keys(stream: &mut TcpStream) -> std::io::Result<TransferCipher> {
    let keypair = EphemeralKeyPair::generate();
    stream.write_all(&keypair.public_key_bytes()).await?;

    let mut peer_public = [0u8; PUBLIC_KEY_SIZE];
    stream.read_exact(&mut peer_public).await?;

    let shared = keypair.compute_shared_secret(&peer_public);
    Ok(TransferCipher::new(&shared))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let send_config = parse_args();
    if send_config.files.is_empty() {
        eprintln!("전송할 파일 없음: --file로 하나 이상 지정");
        std::process::exit(1);
    }

    info!("PSP Send starting...");
    info!("Target: {}", send_config.connect_addr);
    info!("Files: {}", send_config.files.len());
    info!("Chunk size: {} bytes", send_config.config.chunk_size);
    info!("Encryption: {}", send_config.config.encryption_enabled);

    let mut stream = TcpStream::connect(send_config.connect_addr).await?;
    info!("Connected to {}", send_config.connect_addr);

    let start = std::time::Instant::now();

    if send_config.config.encryption_enabled {
        let cipher = exchange_keys(&mut stream).await?;
        let mut session = TcpSession::with_cipher(cipher);
        let mut source = EncryptingSource::from_config(
            FileSetSource::new(&send_config.files, send_config.config.chunk_size)?,
            &send_config.config,
        );
        send_source(&mut stream, &mut session, &mut source).await?;
        report(&start, source.progress().bytes_moved());
    } else {
        let mut session = TcpSession::new();
        let mut source =
            FileSetSource::new(&send_config.files, send_config.config.chunk_size)?;
        send_source(&mut stream, &mut session, &mut source).await?;
        report(&start, source.progress().bytes_moved());
    }

    Ok(())
}

fn report(start: &std::time::Instant, bytes: u64) {
    let elapsed = start.elapsed();
    let throughput = bytes as f64 / elapsed.as_secs_f64().max(1e-9) / 1_000_000.0;
    info!("Transfer complete!");
    info!("  Bytes: {}", bytes);
    info!("  Time: {:.2}s", elapsed.as_secs_f64());
    info!("  Throughput: {:.2} MB/s", throughput);
}
