//! 프로토콜 설정
//!
//! 전역 가변 상태 대신 설정값을 한 번 읽어 각 소스/싱크 생성자에
//! 명시적으로 넘긴다.

use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FRAME_SIZE};

/// PSP 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 청크 크기 (바이트, 평문 기준)
    pub chunk_size: usize,

    /// 허용하는 최대 프레임 payload 크기 (바이트)
    ///
    /// 암호화 시 ciphertext 팽창(nonce + 태그)이 있으므로
    /// chunk_size보다 넉넉해야 한다.
    pub max_frame_size: usize,

    /// 암호화 데코레이터 사용 여부
    pub encryption_enabled: bool,

    /// 파일 헤더 프레임도 암호화할지 여부
    ///
    /// 파일 길이의 기밀성이 필요할 때만 켠다. 양측이 사전에
    /// 합의해야 하는 값이다.
    pub encrypt_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            encryption_enabled: false,
            encrypt_headers: false,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 전체 크기에 필요한 콘텐츠 프레임 수 계산
    pub fn chunks_for(&self, total_bytes: u64) -> u64 {
        total_bytes.div_ceil(self.chunk_size as u64)
    }

    /// 저사양 기기용 설정
    pub fn low_memory() -> Self {
        Self {
            chunk_size: 4096,                    // 4KB
            max_frame_size: 256 * 1024,          // 256KB
            encryption_enabled: false,
            encrypt_headers: false,
        }
    }

    /// 대용량 벌크 전송용 설정
    pub fn bulk_transfer() -> Self {
        Self {
            chunk_size: 65536,                   // 64KB
            max_frame_size: 16 * 1024 * 1024,    // 16MB
            encryption_enabled: false,
            encrypt_headers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_for() {
        let config = Config {
            chunk_size: 32,
            ..Config::default()
        };
        assert_eq!(config.chunks_for(0), 0);
        assert_eq!(config.chunks_for(31), 1);
        assert_eq!(config.chunks_for(32), 1);
        assert_eq!(config.chunks_for(33), 2);
    }

    #[test]
    fn test_max_frame_covers_encrypted_chunk() {
        for config in [Config::default(), Config::low_memory(), Config::bulk_transfer()] {
            let expanded = config.chunk_size + crate::crypto::NONCE_SIZE + crate::crypto::TAG_SIZE;
            assert!(config.max_frame_size >= expanded);
        }
    }
}
