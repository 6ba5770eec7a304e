//! 수신측 싱크 (push 기반 컨슈머)
//!
//! - 전송이 도착한 바이트를 임의 청킹으로 consume에 밀어 넣음
//! - Consumer가 프레임 경계를 복원해 싱크에 디스패치
//! - 종료 마커에서 finalize: 결과 공개, percent 100 고정
//! - finalize 이후의 consume은 프로토콜 위반

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::frame::FrameDecoder;
use crate::progress::Progress;
use crate::session::Session;
use crate::{Error, Result};

/// 스트림 싱크 계약
///
/// 프레임 단위 계약. 바이트 단위 수신은 Consumer가 담당한다.
pub trait StreamSink {
    /// 완성된 프레임 payload 하나 처리 (종료 마커 제외)
    fn handle_frame(&mut self, session: &mut dyn Session, payload: Bytes) -> Result<()>;

    /// 종료 마커 처리 - ResultArea 공개, 진행률 100 고정
    fn finalize(&mut self) -> Result<()>;

    /// 진행 상태 (평문 바이트 기준)
    fn progress(&self) -> Progress;

    /// finalize 완료 여부
    fn finalized(&self) -> bool;

    /// 다음 프레임이 파일 헤더 차례인지 (복호화 데코레이터가 참조)
    fn expects_header(&self) -> bool {
        false
    }

    /// 취소 훅 - 열린 파일 핸들을 즉시 해제 (부분 파일은 그대로 둠)
    fn abort(&mut self) {}
}

/// 바이트 수신 드라이버
///
/// 내부 누적기로 프레임을 복원해 싱크에 순서대로 디스패치한다.
/// 에러 시 싱크의 abort를 호출해 자원을 해제한 뒤 전파한다.
pub struct Consumer<K> {
    decoder: FrameDecoder,
    sink: K,
}

impl<K: StreamSink> Consumer<K> {
    /// 새 드라이버 생성
    pub fn new(sink: K, max_frame_size: usize) -> Self {
        Self {
            decoder: FrameDecoder::new(max_frame_size),
            sink,
        }
    }

    /// 도착한 바이트 처리
    ///
    /// 배달 경계는 프레임 경계와 무관하다. finalize 이후의 호출,
    /// 또는 종료 마커 뒤에 이어지는 프레임은 프로토콜 위반.
    pub fn consume(&mut self, session: &mut dyn Session, raw: &[u8]) -> Result<()> {
        if self.sink.finalized() {
            return Err(Error::ConsumeAfterFinalize);
        }

        let result = self.dispatch(session, raw);
        if result.is_err() {
            self.sink.abort();
        }
        result
    }

    fn dispatch(&mut self, session: &mut dyn Session, raw: &[u8]) -> Result<()> {
        for payload in self.decoder.feed(raw)? {
            if self.sink.finalized() {
                return Err(Error::ConsumeAfterFinalize);
            }
            if payload.is_empty() {
                self.sink.finalize()?;
                debug!("수신 완료: {} bytes", self.sink.progress().bytes_moved());
            } else {
                self.sink.handle_frame(session, payload)?;
            }
        }
        Ok(())
    }

    /// 진행 상태
    pub fn progress(&self) -> Progress {
        self.sink.progress()
    }

    /// finalize 완료 여부
    pub fn finalized(&self) -> bool {
        self.sink.finalized()
    }

    /// 취소 훅
    pub fn abort(&mut self) {
        self.sink.abort();
    }

    /// 내부 싱크 참조 (결과 조회용)
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// 내부 싱크 회수
    pub fn into_sink(self) -> K {
        self.sink
    }
}

/// 단일 버퍼 재조립 싱크
pub struct BufferSink {
    acc: BytesMut,
    result: Option<Bytes>,
    progress: Progress,
}

impl BufferSink {
    /// 새 버퍼 싱크 생성
    pub fn new() -> Self {
        Self {
            acc: BytesMut::new(),
            result: None,
            progress: Progress::new(0),
        }
    }

    /// 재조립된 결과 (finalize 전에는 None)
    pub fn result(&self) -> Option<&Bytes> {
        self.result.as_ref()
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSink for BufferSink {
    fn handle_frame(&mut self, _session: &mut dyn Session, payload: Bytes) -> Result<()> {
        self.progress.advance(payload.len() as u64);
        self.acc.extend_from_slice(&payload);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.result = Some(self.acc.split().freeze());
        self.progress.force_complete();
        Ok(())
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn finalized(&self) -> bool {
        self.result.is_some()
    }
}

/// 파일 수신 상태
enum SinkState {
    /// 다음 파일의 8바이트 길이 헤더 대기
    AwaitingHeader,
    /// 현재 파일 콘텐츠 수신 중
    Receiving {
        file: File,
        path: PathBuf,
        remaining: u64,
    },
    /// finalize 또는 abort 완료
    Closed,
}

/// 순서 있는 파일 집합 재조립 싱크
///
/// 호출자가 준 출력 이름 순서대로 output_dir 아래에 파일을 쓴다.
/// 상태 기계: AwaitingHeader <-> Receiving(remaining).
pub struct FileSetSink {
    output_names: Vec<String>,
    output_dir: PathBuf,
    index: usize,
    written: Vec<PathBuf>,
    state: SinkState,
    finalized: bool,
    progress: Progress,
}

impl FileSetSink {
    /// 새 파일 집합 싱크 생성
    pub fn new<S: Into<String>>(output_names: Vec<S>, output_dir: &Path) -> Self {
        Self {
            output_names: output_names.into_iter().map(Into::into).collect(),
            output_dir: output_dir.to_path_buf(),
            index: 0,
            written: Vec::new(),
            state: SinkState::AwaitingHeader,
            finalized: false,
            progress: Progress::new(0),
        }
    }

    /// 완전히 기록을 마친 파일 경로들 (소스 순서)
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }
}

impl StreamSink for FileSetSink {
    fn handle_frame(&mut self, _session: &mut dyn Session, payload: Bytes) -> Result<()> {
        match std::mem::replace(&mut self.state, SinkState::AwaitingHeader) {
            SinkState::AwaitingHeader => {
                if payload.len() != crate::frame::FILE_HEADER_SIZE {
                    return Err(Error::InvalidFileHeader { got: payload.len() });
                }
                if self.index >= self.output_names.len() {
                    return Err(Error::TooManyFiles {
                        expected: self.output_names.len(),
                        got: self.index + 1,
                    });
                }

                let mut len_bytes = [0u8; 8];
                len_bytes.copy_from_slice(&payload);
                let len = u64::from_be_bytes(len_bytes);

                let path = self.output_dir.join(&self.output_names[self.index]);
                let file = File::create(&path)?;
                self.progress.extend_total(len);
                debug!("파일 수신 시작: {:?}, {} bytes", path, len);

                if len == 0 {
                    self.written.push(path);
                    self.index += 1;
                } else {
                    self.state = SinkState::Receiving {
                        file,
                        path,
                        remaining: len,
                    };
                }
                Ok(())
            }

            SinkState::Receiving {
                mut file,
                path,
                remaining,
            } => {
                if payload.len() as u64 > remaining {
                    return Err(Error::ContentOverrun {
                        remaining,
                        got: payload.len(),
                    });
                }

                file.write_all(&payload)?;
                self.progress.advance(payload.len() as u64);

                let remaining = remaining - payload.len() as u64;
                if remaining == 0 {
                    self.written.push(path);
                    self.index += 1;
                } else {
                    self.state = SinkState::Receiving {
                        file,
                        path,
                        remaining,
                    };
                }
                Ok(())
            }

            SinkState::Closed => Err(Error::ConsumeAfterFinalize),
        }
    }

    fn finalize(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SinkState::Closed) {
            SinkState::AwaitingHeader => {
                self.finalized = true;
                self.progress.force_complete();
                Ok(())
            }
            // 파일 중간에 종료 마커 - 잘린 전송
            SinkState::Receiving { remaining, .. } => {
                Err(Error::TruncatedTransfer { remaining })
            }
            SinkState::Closed => Err(Error::ConsumeAfterFinalize),
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn finalized(&self) -> bool {
        self.finalized
    }

    fn expects_header(&self) -> bool {
        matches!(self.state, SinkState::AwaitingHeader)
    }

    fn abort(&mut self) {
        // 쓰다 만 파일은 디스크에 그대로 남긴다
        self.state = SinkState::Closed;
    }
}
