//! 송신측 소스 (pull 기반 프로듀서)
//!
//! - 전송(transport)이 출력 여유가 생길 때마다 produce_more를 호출
//! - 호출당 최대 한 프레임만 기록 (백프레셔는 호출 주기가 결정)
//! - 평문 소진 시 종료 마커를 정확히 한 번 쓰고 프로듀서 해제

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::frame::{encode_frame, encode_terminal};
use crate::progress::Progress;
use crate::session::Session;
use crate::Result;

/// 한 번의 pull이 내놓는 논리 프레임
#[derive(Debug)]
pub enum SourceFrame {
    /// 다음 파일의 바이트 길이를 알리는 헤더
    FileHeader(u64),
    /// 콘텐츠 청크
    Content(Bytes),
    /// 전송 종료
    Terminal,
}

/// 스트림 소스 계약
///
/// 전송 계획(TransferPlan)은 생성 시 한 번 계산되고 전송 동안 불변.
/// 인스턴스는 종료 상태에 도달하면 재사용 불가.
pub trait StreamSource {
    /// 다음 논리 프레임 하나를 꺼냄
    ///
    /// 소진되면 Terminal을 반환하고 이후 finished()가 참이 된다.
    /// session은 데코레이터가 암호화 원시 함수를 쓸 때만 사용된다.
    fn pull_frame(&mut self, session: &mut dyn Session) -> Result<SourceFrame>;

    /// 진행 상태 (평문 바이트 기준)
    fn progress(&self) -> Progress;

    /// 종료 상태 도달 여부
    fn finished(&self) -> bool;

    /// 취소 훅 - 열린 파일 핸들을 즉시 해제
    fn abort(&mut self) {}

    /// 전송의 pull 콜백
    ///
    /// 호출당 최대 한 프레임을 인코딩해 session.write로 기록한다.
    /// Terminal 기록 시 unregister_producer를 호출하며, 이후의
    /// produce_more는 no-op. 에러 시 프로듀서를 해제하고 전파한다.
    fn produce_more(&mut self, session: &mut dyn Session) -> Result<()> {
        if self.finished() {
            return Ok(());
        }

        let result = self.pull_frame(session).and_then(|frame| match frame {
            SourceFrame::FileHeader(len) => {
                session.write(&encode_frame(&len.to_be_bytes()))
            }
            SourceFrame::Content(chunk) => session.write(&encode_frame(&chunk)),
            SourceFrame::Terminal => {
                session.write(&encode_terminal())?;
                session.unregister_producer();
                debug!("송신 완료: {} bytes", self.progress().bytes_moved());
                Ok(())
            }
        });

        // pull이든 write든 실패하면 같은 정리 경로를 탄다
        if let Err(e) = result {
            self.abort();
            session.unregister_producer();
            return Err(e);
        }

        Ok(())
    }
}

/// 단일 인메모리 버퍼 소스
pub struct BufferSource {
    data: Bytes,
    pos: usize,
    chunk_size: usize,
    progress: Progress,
    done: bool,
}

impl BufferSource {
    /// 새 버퍼 소스 생성
    ///
    /// chunk_size는 0보다 커야 한다.
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size는 0보다 커야 함");
        let data = data.into();
        let total = data.len() as u64;
        Self {
            data,
            pos: 0,
            chunk_size,
            progress: Progress::new(total),
            done: false,
        }
    }
}

impl StreamSource for BufferSource {
    fn pull_frame(&mut self, _session: &mut dyn Session) -> Result<SourceFrame> {
        if self.pos < self.data.len() {
            let end = (self.pos + self.chunk_size).min(self.data.len());
            let chunk = self.data.slice(self.pos..end);
            self.progress.advance(chunk.len() as u64);
            self.pos = end;
            Ok(SourceFrame::Content(chunk))
        } else {
            self.done = true;
            self.progress.force_complete();
            Ok(SourceFrame::Terminal)
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn finished(&self) -> bool {
        self.done
    }

    fn abort(&mut self) {
        self.done = true;
    }
}

/// 파일 전송 상태
#[derive(Debug)]
enum FileState {
    /// 다음 파일의 헤더 프레임 차례
    NextHeader,
    /// 현재 파일의 콘텐츠 전송 중
    Sending { file: File, remaining: u64 },
    /// 종료 마커까지 기록 완료
    Done,
}

/// 순서 있는 파일 목록 소스
///
/// 파일마다 8바이트 big-endian 길이 헤더 프레임을 먼저 내보내고,
/// 그 길이만큼의 콘텐츠 프레임을 이어서 내보낸다. 길이는 생성 시
/// 파일시스템에서 한 번만 읽는다. 진행률은 콘텐츠 바이트만 센다.
#[derive(Debug)]
pub struct FileSetSource {
    plan: Vec<(PathBuf, u64)>,
    index: usize,
    state: FileState,
    chunk_size: usize,
    progress: Progress,
}

impl FileSetSource {
    /// 새 파일 목록 소스 생성
    ///
    /// 각 파일의 길이를 지금 읽어 전송 계획을 고정한다.
    pub fn new<P: AsRef<Path>>(paths: &[P], chunk_size: usize) -> Result<Self> {
        assert!(chunk_size > 0, "chunk_size는 0보다 커야 함");

        let mut plan = Vec::with_capacity(paths.len());
        let mut total = 0u64;
        for path in paths {
            let len = std::fs::metadata(path.as_ref())?.len();
            total += len;
            plan.push((path.as_ref().to_path_buf(), len));
        }

        debug!("파일 전송 계획: {}개 파일, {} bytes", plan.len(), total);

        Ok(Self {
            plan,
            index: 0,
            state: FileState::NextHeader,
            chunk_size,
            progress: Progress::new(total),
        })
    }

    /// 고정된 전송 계획 (경로, 길이) 목록
    pub fn plan(&self) -> &[(PathBuf, u64)] {
        &self.plan
    }
}

impl StreamSource for FileSetSource {
    fn pull_frame(&mut self, _session: &mut dyn Session) -> Result<SourceFrame> {
        match std::mem::replace(&mut self.state, FileState::NextHeader) {
            FileState::NextHeader => {
                if self.index >= self.plan.len() {
                    self.state = FileState::Done;
                    self.progress.force_complete();
                    return Ok(SourceFrame::Terminal);
                }

                let (path, len) = &self.plan[self.index];
                let len = *len;
                if len == 0 {
                    // 빈 파일은 헤더만 내보내고 바로 다음 파일로
                    self.index += 1;
                } else {
                    let file = File::open(path)?;
                    self.state = FileState::Sending {
                        file,
                        remaining: len,
                    };
                }
                Ok(SourceFrame::FileHeader(len))
            }

            FileState::Sending {
                mut file,
                remaining,
            } => {
                let want = (self.chunk_size as u64).min(remaining) as usize;
                let mut buf = vec![0u8; want];
                // 계획 수립 후 파일이 줄어들었으면 IO 에러 전파
                file.read_exact(&mut buf)?;

                let remaining = remaining - want as u64;
                self.progress.advance(want as u64);

                if remaining == 0 {
                    self.index += 1;
                } else {
                    self.state = FileState::Sending { file, remaining };
                }
                Ok(SourceFrame::Content(Bytes::from(buf)))
            }

            FileState::Done => {
                self.state = FileState::Done;
                Ok(SourceFrame::Terminal)
            }
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn finished(&self) -> bool {
        matches!(self.state, FileState::Done)
    }

    fn abort(&mut self) {
        // 열린 파일 핸들을 지금 닫는다
        self.state = FileState::Done;
    }
}
