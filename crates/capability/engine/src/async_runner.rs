use appng_telemetry::{record_async_task_failed, record_async_task_started};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 后台任务在产出结果前中止（panic 或被运行时取消）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("background task '{task}' aborted: {message}")]
pub struct TaskAborted {
    pub task: String,
    pub message: String,
}

/// 后台任务执行器。
///
/// 每次调用独立 spawn；不提供取消与超时，结果只经由完成回调送出。
/// 任务本身在内层 spawn 中运行，panic 也会以 `TaskAborted` 交给完成回调。
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncTaskRunner;

impl AsyncTaskRunner {
    pub fn new() -> Self {
        Self
    }

    /// 在 tokio 运行时上执行 `task`，完成后以结果调用 `completion`。
    pub fn spawn<T, F, C>(&self, name: impl Into<String>, task: F, completion: C) -> TaskHandle
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        C: FnOnce(Result<T, TaskAborted>) + Send + 'static,
    {
        let name = name.into();
        record_async_task_started();
        info!(target: "appng.engine", task = %name, "async_task_started");
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let result = tokio::spawn(task).await.map_err(|err| TaskAborted {
                task: task_name.clone(),
                message: err.to_string(),
            });
            if let Err(aborted) = &result {
                record_async_task_failed();
                error!(
                    target: "appng.engine",
                    task = %task_name,
                    error = %aborted.message,
                    "async_task_aborted"
                );
            }
            completion(result);
            info!(target: "appng.engine", task = %task_name, "async_task_completed");
        });
        TaskHandle { name, handle }
    }
}

/// 后台任务句柄；可 await 等待完成回调执行结束。
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for TaskHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(()),
            Poll::Ready(Err(err)) => {
                record_async_task_failed();
                error!(target: "appng.engine", task = %self.name, error = %err, "async_completion_aborted");
                Poll::Ready(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn completion_receives_result() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let handle = AsyncTaskRunner::new().spawn("sum", async { 40 + 2 }, move |value| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(value);
            }
        });
        assert_eq!(handle.name(), "sum");
        handle.await;
        assert_eq!(*seen.lock().expect("lock"), Some(Ok(42)));
    }

    #[tokio::test]
    async fn panicking_task_still_reaches_completion() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let values: Vec<u32> = Vec::new();
        let handle = AsyncTaskRunner::new().spawn(
            "index",
            async move { values[0] },
            move |value| {
                if let Ok(mut slot) = sink.lock() {
                    *slot = Some(value);
                }
            },
        );
        handle.await;
        let result = seen.lock().expect("lock").clone().expect("completion ran");
        let aborted = result.expect_err("aborted");
        assert_eq!(aborted.task, "index");
    }
}
