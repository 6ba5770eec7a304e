//! 전송 진행률 집계
//!
//! 진행률은 항상 평문 바이트 기준으로 계산한다. 암호화로 인한
//! ciphertext 팽창은 집계에 반영되지 않는다.

/// 전송 진행 상태
///
/// bytes_moved는 단조 비감소. percent는 종료 전에는 99를 넘지 않고,
/// 종료 마커 시점에 정확히 한 번 100이 된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 이동한 평문 바이트 수
    bytes_moved: u64,

    /// 알려진 전체 바이트 수 (모르면 0)
    total_known: u64,

    /// 종료 마커 도달 여부
    complete: bool,
}

impl Progress {
    /// 새 진행 상태 생성
    pub fn new(total_known: u64) -> Self {
        Self {
            bytes_moved: 0,
            total_known,
            complete: false,
        }
    }

    /// 이동 바이트 추가
    pub fn advance(&mut self, bytes: u64) {
        self.bytes_moved += bytes;
    }

    /// 알려진 전체 바이트 수 증가 (수신측이 헤더로 길이를 알게 될 때)
    pub fn extend_total(&mut self, bytes: u64) {
        self.total_known += bytes;
    }

    /// 종료 마커 도달 - percent를 100으로 고정
    pub fn force_complete(&mut self) {
        self.complete = true;
    }

    /// 이동한 평문 바이트 수
    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved
    }

    /// 알려진 전체 바이트 수
    pub fn total_known(&self) -> u64 {
        self.total_known
    }

    /// 완료 여부
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// 진행 퍼센트 (0 ~ 100)
    ///
    /// floor(100 * moved / max(total, 1)), 단 완료 전에는 99로 클램프.
    pub fn percent(&self) -> u8 {
        if self.complete {
            return 100;
        }
        let computed = 100 * self.bytes_moved / self.total_known.max(1);
        computed.min(99) as u8
    }
}
