//! 에러 타입 정의

use thiserror::Error;

/// 에러 대분류
///
/// 개별 variant를 세밀하게 매칭하지 않는 호출자를 위한 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 와이어 프로토콜 위반
    Protocol,
    /// 암호화/복호화 실패
    Crypto,
    /// 파일시스템/네트워크 IO 실패
    Io,
    /// 태스크 실행 실패
    Task,
}

/// PSP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("프레임 크기 초과: 최대 {max_size}, got {got}")]
    FrameTooLarge { max_size: usize, got: usize },

    #[error("유효하지 않은 파일 헤더: 8바이트 필요, got {got}")]
    InvalidFileHeader { got: usize },

    #[error("파일 수 초과: 출력 이름 {expected}개, 헤더 {got}개째 수신")]
    TooManyFiles { expected: usize, got: usize },

    #[error("콘텐츠 오버런: 남은 {remaining} 바이트에 {got} 바이트 수신")]
    ContentOverrun { remaining: u64, got: usize },

    #[error("전송 잘림: {remaining} 바이트 수신 전 종료 마커 도착")]
    TruncatedTransfer { remaining: u64 },

    #[error("finalize 이후 consume 호출")]
    ConsumeAfterFinalize,

    #[error("암호화 에러: {0}")]
    Encryption(String),

    #[error("복호화 에러: {0}")]
    Decryption(String),

    #[error("세션에 암호화 기능 없음")]
    CryptoUnavailable,

    #[error("태스크 실행 실패: {0}")]
    TaskFailed(String),

    #[error("태스크 결과 없음")]
    EmptyTaskResult,
}

impl Error {
    /// 에러 대분류 반환
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::FrameTooLarge { .. }
            | Error::InvalidFileHeader { .. }
            | Error::TooManyFiles { .. }
            | Error::ContentOverrun { .. }
            | Error::TruncatedTransfer { .. }
            | Error::ConsumeAfterFinalize => ErrorKind::Protocol,
            Error::Encryption(_) | Error::Decryption(_) | Error::CryptoUnavailable => {
                ErrorKind::Crypto
            }
            Error::TaskFailed(_) | Error::EmptyTaskResult => ErrorKind::Task,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
