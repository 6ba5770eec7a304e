//! 로컬 태스크 실행 오케스트레이터
//!
//! 한 번의 로컬 태스크 실행을 조율한다: 루트 아래 임시/리소스
//! 디렉터리를 비우고 다시 만들고, 추가 리소스 파일을 복사해 넣고,
//! 호스트가 제공한 샌드박스 실행기를 부르고, 실행 시간을 잰다.
//! 샌드박스 자체(컨테이너, 격리)는 이 크레이트 밖의 일이다.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{Error, Result};

/// 기본 실패 경고 메시지
pub const DEFAULT_WARNING: &str = "Computation failed";

/// 태스크 실행 결과물
#[derive(Debug)]
pub struct TaskOutput {
    /// 생성된 결과 파일들
    pub files: Vec<PathBuf>,
}

/// 실행 컨텍스트 (실행기에 넘겨짐)
pub struct RunContext {
    /// 입력 리소스 디렉터리
    pub resource_dir: PathBuf,

    /// 결과물을 쓸 임시 디렉터리
    pub tmp_dir: PathBuf,

    /// 실행기가 갱신하는 진행률 핸들
    pub progress: ProgressHandle,
}

/// 스레드 간 공유 가능한 진행률 핸들 (0.0 ~ 1.0)
#[derive(Clone, Default)]
pub struct ProgressHandle(Arc<Mutex<f64>>);

impl ProgressHandle {
    /// 진행률 갱신
    pub fn set(&self, value: f64) {
        *self.0.lock() = value.clamp(0.0, 1.0);
    }

    /// 현재 진행률
    pub fn get(&self) -> f64 {
        *self.0.lock()
    }
}

/// 샌드박스 실행 인터페이스 (구현은 호스트 몫)
pub trait TaskExecutor {
    /// resource_dir의 입력으로 tmp_dir에 결과를 생성
    fn execute(&mut self, ctx: &RunContext) -> Result<TaskOutput>;
}

/// 실행 보고
#[derive(Debug)]
pub struct RunReport {
    /// 결과물
    pub output: TaskOutput,

    /// 실행에 걸린 시간
    pub elapsed: Duration,
}

/// 로컬 태스크 러너
///
/// 인스턴스는 재사용 가능하며, run 호출마다 작업 디렉터리를
/// 깨끗하게 다시 준비한다.
pub struct LocalRunner {
    root_path: PathBuf,
    failed_warning: String,
    additional_resources: Vec<PathBuf>,
    progress: ProgressHandle,
    failed: bool,
}

impl LocalRunner {
    /// 새 러너 생성
    pub fn new(root_path: &Path) -> Self {
        Self {
            root_path: root_path.to_path_buf(),
            failed_warning: DEFAULT_WARNING.to_string(),
            additional_resources: Vec::new(),
            progress: ProgressHandle::default(),
            failed: false,
        }
    }

    /// 실패 경고 메시지 교체
    pub fn with_failure_warning(mut self, warning: impl Into<String>) -> Self {
        self.failed_warning = warning.into();
        self
    }

    /// 리소스 디렉터리에 복사할 추가 파일 등록
    pub fn add_resource(&mut self, path: &Path) {
        self.additional_resources.push(path.to_path_buf());
    }

    /// 진행률 질의 핸들 (다른 스레드에서 관찰용)
    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// 현재 진행률 (실패한 실행은 0.0)
    pub fn progress(&self) -> f64 {
        if self.failed {
            warn!("{}", self.failed_warning);
            return 0.0;
        }
        self.progress.get()
    }

    /// 태스크 한 번 실행
    ///
    /// 결과 파일이 하나도 없으면 실패로 취급한다.
    pub fn run(&mut self, executor: &mut dyn TaskExecutor) -> Result<RunReport> {
        let start = Instant::now();
        self.failed = false;
        self.progress.set(0.0);

        let tmp_dir = self.prepare_dir("tmp")?;
        let resource_dir = self.prepare_dir("resources")?;

        for res in &self.additional_resources {
            let name = res.file_name().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("리소스 경로에 파일 이름 없음: {res:?}"),
                ))
            })?;
            std::fs::copy(res, resource_dir.join(name))?;
        }

        let ctx = RunContext {
            resource_dir,
            tmp_dir,
            progress: self.progress.clone(),
        };

        match executor.execute(&ctx) {
            Ok(output) if output.files.is_empty() => {
                self.failed = true;
                warn!("{}", self.failed_warning);
                Err(Error::EmptyTaskResult)
            }
            Ok(output) => {
                let elapsed = start.elapsed();
                info!(
                    "Task computation success! ({:.2}s, {} files)",
                    elapsed.as_secs_f64(),
                    output.files.len()
                );
                Ok(RunReport { output, elapsed })
            }
            Err(e) => {
                self.failed = true;
                warn!("{}: {}", self.failed_warning, e);
                Err(e)
            }
        }
    }

    /// 루트 아래 작업 디렉터리를 비우고 다시 만든다
    fn prepare_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root_path.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WritingExecutor {
        content: &'static [u8],
    }

    impl TaskExecutor for WritingExecutor {
        fn execute(&mut self, ctx: &RunContext) -> Result<TaskOutput> {
            ctx.progress.set(0.5);
            let out = ctx.tmp_dir.join("result.bin");
            std::fs::write(&out, self.content)?;
            ctx.progress.set(1.0);
            Ok(TaskOutput { files: vec![out] })
        }
    }

    struct FailingExecutor;

    impl TaskExecutor for FailingExecutor {
        fn execute(&mut self, _ctx: &RunContext) -> Result<TaskOutput> {
            Err(Error::TaskFailed("sandbox crashed".into()))
        }
    }

    #[test]
    fn test_successful_run() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = LocalRunner::new(root.path());
        let mut executor = WritingExecutor { content: b"output" };

        let report = runner.run(&mut executor).unwrap();
        assert_eq!(report.output.files.len(), 1);
        assert_eq!(std::fs::read(&report.output.files[0]).unwrap(), b"output");
        assert_eq!(runner.progress(), 1.0);
    }

    #[test]
    fn test_failed_run_reports_zero_progress() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = LocalRunner::new(root.path());

        let err = runner.run(&mut FailingExecutor).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Task);
        assert_eq!(runner.progress(), 0.0);
    }

    #[test]
    fn test_empty_result_is_failure() {
        struct EmptyExecutor;
        impl TaskExecutor for EmptyExecutor {
            fn execute(&mut self, _ctx: &RunContext) -> Result<TaskOutput> {
                Ok(TaskOutput { files: vec![] })
            }
        }

        let root = tempfile::tempdir().unwrap();
        let mut runner = LocalRunner::new(root.path());
        let err = runner.run(&mut EmptyExecutor).unwrap_err();
        assert!(matches!(err, Error::EmptyTaskResult));
    }

    #[test]
    fn test_additional_resources_copied() {
        let root = tempfile::tempdir().unwrap();
        let res = tempfile::tempdir().unwrap();
        let res_file = res.path().join("model.dat");
        std::fs::write(&res_file, b"weights").unwrap();

        struct CheckingExecutor;
        impl TaskExecutor for CheckingExecutor {
            fn execute(&mut self, ctx: &RunContext) -> Result<TaskOutput> {
                let copied = ctx.resource_dir.join("model.dat");
                assert_eq!(std::fs::read(&copied)?, b"weights");
                let out = ctx.tmp_dir.join("ok");
                std::fs::write(&out, b"1")?;
                Ok(TaskOutput { files: vec![out] })
            }
        }

        let mut runner = LocalRunner::new(root.path());
        runner.add_resource(&res_file);
        runner.run(&mut CheckingExecutor).unwrap();
    }

    #[test]
    fn test_dirs_wiped_between_runs() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = LocalRunner::new(root.path());

        let mut executor = WritingExecutor { content: b"first" };
        let report = runner.run(&mut executor).unwrap();
        let stale = report.output.files[0].clone();
        assert!(stale.exists());

        // 두 번째 실행 준비 과정에서 이전 결과물이 치워져야 함
        let mut executor = WritingExecutor { content: b"second" };
        let report = runner.run(&mut executor).unwrap();
        assert_eq!(std::fs::read(&report.output.files[0]).unwrap(), b"second");
    }
}
