//! 프레임 코덱 - 길이 접두 프레임 인코딩/디코딩
//!
//! 와이어 포맷:
//! - length: 4바이트 big-endian (payload 바이트 수)
//! - payload: length 바이트
//!
//! length == 0 인 프레임은 전송 종료 마커(terminal marker)로 예약됨.
//! 디코더는 전송 상태를 갖지 않으며, 배달 경계와 프레임 경계가
//! 어긋나는 임의 청킹을 허용한다.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// 길이 접두 크기 (바이트)
pub const LEN_PREFIX_SIZE: usize = 4;

/// 파일 헤더 프레임 payload 크기 (바이트)
pub const FILE_HEADER_SIZE: usize = 8;

/// payload를 길이 접두 프레임으로 인코딩
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(LEN_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// 종료 마커 프레임 (payload 없음)
pub fn encode_terminal() -> Bytes {
    encode_frame(&[])
}

/// 수신 바이트 누적기 + 프레임 추출기
///
/// 소켓에서 도착한 바이트를 누적하고, 완성된 프레임 payload를
/// 도착 순서대로 꺼낸다. 불완전한 꼬리 바이트는 다음 feed까지 유지.
pub struct FrameDecoder {
    buffer: BytesMut,
    max_frame_size: usize,
}

impl FrameDecoder {
    /// 새 디코더 생성
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_frame_size,
        }
    }

    /// 바이트 추가 후 완성된 프레임 payload 목록 반환
    ///
    /// 종료 마커는 빈 payload로 나타난다. 선언된 길이가
    /// max_frame_size를 넘으면 프로토콜 위반.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();

        loop {
            if self.buffer.len() < LEN_PREFIX_SIZE {
                break;
            }

            let declared = u32::from_be_bytes([
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ]) as usize;

            if declared > self.max_frame_size {
                return Err(Error::FrameTooLarge {
                    max_size: self.max_frame_size,
                    got: declared,
                });
            }

            if self.buffer.len() < LEN_PREFIX_SIZE + declared {
                break;
            }

            let _ = self.buffer.split_to(LEN_PREFIX_SIZE);
            frames.push(self.buffer.split_to(declared).freeze());
        }

        Ok(frames)
    }

    /// 누적된 미완성 바이트 수
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(16 * 1024 * 1024)
    }

    #[test]
    fn test_encode_prepends_be_length() {
        let frame = encode_frame(b"abcde");
        assert_eq!(&frame[..4], &5u32.to_be_bytes());
        assert_eq!(&frame[4..], b"abcde");
    }

    #[test]
    fn test_single_frame_roundtrip() {
        let mut dec = decoder();
        let frames = dec.feed(&encode_frame(b"hello")).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"hello");
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn test_multiple_frames_in_one_delivery() {
        let mut dec = decoder();
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode_frame(b"one"));
        wire.extend_from_slice(&encode_frame(b"two"));
        wire.extend_from_slice(&encode_terminal());

        let frames = dec.feed(&wire).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref(), b"one");
        assert_eq!(frames[1].as_ref(), b"two");
        assert!(frames[2].is_empty());
    }

    #[test]
    fn test_frame_split_across_deliveries() {
        let mut dec = decoder();
        let wire = encode_frame(b"fragmented payload");

        // 길이 접두 중간에서 한 번, payload 중간에서 한 번 자름
        assert!(dec.feed(&wire[..2]).unwrap().is_empty());
        assert!(dec.feed(&wire[2..10]).unwrap().is_empty());
        let frames = dec.feed(&wire[10..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"fragmented payload");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut dec = decoder();
        let wire = encode_frame(b"hi");
        let mut collected = Vec::new();
        for b in wire.iter() {
            collected.extend(dec.feed(&[*b]).unwrap());
        }
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].as_ref(), b"hi");
    }

    #[test]
    fn test_terminal_marker_is_empty_frame() {
        let mut dec = decoder();
        let frames = dec.feed(&encode_terminal()).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut dec = FrameDecoder::new(100);
        let mut wire = Vec::new();
        wire.extend_from_slice(&1000u32.to_be_bytes());
        let err = dec.feed(&wire).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { got: 1000, .. }));
    }
}
