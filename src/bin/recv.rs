//! PSP 수신 바이너리 - Payload Stream Protocol
//!
//! TCP로 도착한 프레임 스트림을 파일 집합으로 재조립한다.
//! - 종료 마커까지 수신 후 finalize
//! - X25519 + ChaCha20-Poly1305 복호화 지원 (선택)
//!
//! 사용법:
//!   cargo run --release --bin psp-recv -- [OPTIONS]
//!
//! 예시:
//!   # 파일 두 개 수신
//!   cargo run --release --bin psp-recv -- --bind 0.0.0.0:9000 -n out1 -n out2 --out ./recv

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use psp::crypto::{EphemeralKeyPair, TransferCipher, PUBLIC_KEY_SIZE};
use psp::{
    receive_sink, Config, Consumer, DecryptingSink, FileSetSink, StreamSink, TcpSession,
};

/// 수신 설정
struct RecvConfig {
    bind_addr: SocketAddr,
    output_dir: PathBuf,
    output_names: Vec<String>,
    config: Config,
}

impl Default for RecvConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            output_dir: PathBuf::from("."),
            output_names: Vec::new(),
            config: Config::default(),
        }
    }
}

fn parse_args() -> RecvConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RecvConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    config.output_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--name" | "-n" => {
                if i + 1 < args.len() {
                    config.output_names.push(args[i + 1].clone());
                    i += 1;
                }
            }
            "--max-frame" => {
                if i + 1 < args.len() {
                    config.config.max_frame_size = args[i + 1].parse().expect("유효한 숫자 필요");
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
                    r#"PSP Recv - Payload Stream Protocol 수신기

TCP 프레임 스트림을 파일 집합으로 재조립

사용법:
  cargo run --release --bin psp-recv -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 0.0.0.0:9000)
  -o, --out <DIR>         출력 디렉터리 (기본: .)
  -n, --name <NAME>       출력 파일 이름 (반복 가능, 송신측 파일 수와 일치해야 함)
  -e, --encrypt           복호화 활성화 (X25519 + ChaCha20-Poly1305)
  --encrypt-headers       파일 길이 헤더까지 복호화 (송신측과 합의 필요)
  --max-frame <SIZE>      최대 프레임 크기 바이트 (기본: 4MB)
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

/// 공개키를 교환해 전송 복호화기 생성
async fn exchange_keys(stream: &mut TcpStream) -> std::io::Result<TransferCipher> {
    let mut peer_public = [0u8; PUBLIC_KEY_SIZE];
    stream.read_exact(&mut peer_public).await?;

    let keypair = EphemeralKeyPair::generate();
    stream.write_all(&keypair.public_key_bytes()).await?;

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

    let recv_config = parse_args();
    if recv_config.output_names.is_empty() {
        eprintln!("출력 이름 없음: --name으로 송신측 파일 수만큼 지정");
        std::process::exit(1);
    }
    std::fs::create_dir_all(&recv_config.output_dir)?;

    info!("PSP Recv starting...");
    info!("Bind address: {}", recv_config.bind_addr);
    info!("Output dir: {:?}", recv_config.output_dir);
    info!("Expected files: {}", recv_config.output_names.len());
    info!("Encryption: {}", recv_config.config.encryption_enabled);

    let listener = TcpListener::bind(recv_config.bind_addr).await?;
    let (mut stream, peer) = listener.accept().await?;
    info!("Connection from {}", peer);

    let sink = FileSetSink::new(recv_config.output_names.clone(), &recv_config.output_dir);

    if recv_config.config.encryption_enabled {
        let cipher = exchange_keys(&mut stream).await?;
        let mut session = TcpSession::with_cipher(cipher);
        let mut consumer = Consumer::new(
            DecryptingSink::from_config(sink, &recv_config.config),
            recv_config.config.max_frame_size,
        );
        receive_sink(&mut stream, &mut session, &mut consumer).await?;
        for path in consumer.sink().inner().written_files() {
            info!("Written: {:?}", path);
        }
        info!("Progress: {} %", consumer.sink().progress().percent());
    } else {
        let mut session = TcpSession::new();
        let mut consumer = Consumer::new(sink, recv_config.config.max_frame_size);
        receive_sink(&mut stream, &mut session, &mut consumer).await?;
        for path in consumer.sink().written_files() {
            info!("Written: {:?}", path);
        }
        info!("Progress: {} %", consumer.sink().progress().percent());
    }

    Ok(())
}
