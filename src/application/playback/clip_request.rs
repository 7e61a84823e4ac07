//! Clip Request - 单个片段的异步获取与解码
//!
//! 构造即启动后台任务：获取字节 → 阻塞线程解码。
//! 结果只通过状态查询暴露，从不同步报错；调度器轮询 `is_done`。

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::application::ports::{AudioBuffer, ClipDecoderPort, ClipError, ClipSourcePort};

/// 片段请求
///
/// 状态: Pending → Done(成功，持有缓冲区) | Done(失败)。
/// 丢弃请求会中止后台任务。
pub struct ClipRequest {
    path: String,
    delay: f32,
    receiver: oneshot::Receiver<Result<AudioBuffer, ClipError>>,
    task: JoinHandle<()>,
    outcome: Option<Result<AudioBuffer, ClipError>>,
}

impl ClipRequest {
    /// 启动请求；必须在 tokio 运行时内调用
    pub fn spawn(
        path: String,
        delay: f32,
        source: Arc<dyn ClipSourcePort>,
        decoder: Arc<dyn ClipDecoderPort>,
    ) -> Self {
        let (sender, receiver) = oneshot::channel();
        let task_path = path.clone();

        let task = tokio::spawn(async move {
            let result = load(&task_path, source, decoder).await;
            // 接收端已丢弃说明请求被取消，结果直接丢弃
            let _ = sender.send(result);
        });

        Self {
            path,
            delay,
            receiver,
            task,
            outcome: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 该片段之前累计的静音（秒）
    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// 是否已完成（成功或不可恢复的失败）
    pub fn is_done(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(result) => {
                self.outcome = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.outcome = Some(Err(ClipError::Cancelled));
                true
            }
        }
    }

    /// 成功时的缓冲区
    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.outcome.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// 取出结果；未完成时返回 None
    pub fn take(&mut self) -> Option<Result<AudioBuffer, ClipError>> {
        if self.is_done() {
            self.outcome.take()
        } else {
            None
        }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ClipRequest {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn load(
    path: &str,
    source: Arc<dyn ClipSourcePort>,
    decoder: Arc<dyn ClipDecoderPort>,
) -> Result<AudioBuffer, ClipError> {
    let data = source.fetch(path).await?;
    tokio::task::spawn_blocking(move || decoder.decode(&data))
        .await
        .map_err(|e| ClipError::Decode(format!("decoder task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeClipSource, SymphoniaDecoder};
    use std::time::Duration;

    async fn wait_done(request: &mut ClipRequest) {
        for _ in 0..200 {
            if request.is_done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("request {} never completed", request.path());
    }

    #[tokio::test]
    async fn test_successful_request_exposes_buffer() {
        let source = Arc::new(FakeClipSource::new().with_clip("hello", 0.5, 0));
        let mut request = ClipRequest::spawn(
            "vox/hello.mp3".to_string(),
            0.25,
            source,
            Arc::new(SymphoniaDecoder::new()),
        );
        wait_done(&mut request).await;

        let buffer = request.buffer().expect("buffer");
        assert!((buffer.duration() - 0.5).abs() < 1e-6);
        assert_eq!(request.delay(), 0.25);
        assert!(matches!(request.take(), Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_missing_clip_is_done_without_buffer() {
        let source = Arc::new(FakeClipSource::new());
        let mut request = ClipRequest::spawn(
            "vox/nothing.mp3".to_string(),
            0.0,
            source,
            Arc::new(SymphoniaDecoder::new()),
        );
        wait_done(&mut request).await;

        assert!(request.buffer().is_none());
        assert!(matches!(request.take(), Some(Err(ClipError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_cancelled_request_reports_cancelled() {
        let source = Arc::new(FakeClipSource::new().with_clip("slow", 0.5, 10_000));
        let mut request = ClipRequest::spawn(
            "vox/slow.mp3".to_string(),
            0.0,
            source,
            Arc::new(SymphoniaDecoder::new()),
        );
        assert!(!request.is_done());

        request.cancel();
        wait_done(&mut request).await;
        assert!(matches!(request.take(), Some(Err(ClipError::Cancelled))));
    }
}
