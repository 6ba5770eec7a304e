//! # PSP (Payload Stream Protocol)
//!
//! P2P 분산 계산 노드용 청크 스트리밍 전송
//!
//! ## 핵심 특징
//! - **길이 접두 프레이밍**: 4바이트 big-endian 길이 + payload, 길이 0은 종료 마커
//! - **Pull 기반 송신**: 전송이 produce_more를 부를 때만 프레임 하나 기록 (백프레셔)
//! - **Push 기반 수신**: 임의 청킹으로 도착한 바이트에서 프레임 경계 복원
//! - **파일 집합 전송**: 파일마다 8바이트 길이 헤더 + 콘텐츠 프레임
//! - **투명 암호화**: 소스/싱크 데코레이터가 세션의 encrypt/decrypt를 적용
//! - **평문 기준 진행률**: ciphertext 팽창과 무관하게 안정적인 percent
//! - **주변 모듈**: 피어 디스크립터(Node), 로컬 태스크 러너, TCP 호스트 루프

pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod node;
pub mod progress;
pub mod runner;
pub mod secure;
pub mod session;
pub mod sink;
pub mod source;
pub mod transport;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use frame::{encode_frame, encode_terminal, FrameDecoder};
pub use node::{AddressProbe, Node};
pub use progress::Progress;
pub use runner::{LocalRunner, RunReport, TaskExecutor, TaskOutput};
pub use secure::{DecryptingSink, EncryptingSource};
pub use session::{MemorySession, Session};
pub use sink::{BufferSink, Consumer, FileSetSink, StreamSink};
pub use source::{BufferSource, FileSetSource, SourceFrame, StreamSource};
pub use transport::{receive_sink, send_source, TcpSession};

/// 기본 청크 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 10240;

/// 기본 최대 프레임 payload 크기 (바이트)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;
