//! 控制器层
//!
//! 所有控制器都在 UI 循环上被驱动：后台任务只负责网络请求，
//! 完成后把事件发回 UI 循环，由控制器的 `handle` 应用到状态上。

pub mod debounce;
pub mod directory;
pub mod dismiss;
pub mod mutation;
pub mod routes;
pub mod search;
pub mod stamp;

use std::sync::Arc;
use tokio::sync::mpsc;

/// 后台任务向 UI 循环回送完成事件的出口
///
/// 控制器只认识自己的事件类型，由创建方决定如何包装进全局事件通道。
pub struct Emitter<T> {
    sink: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: Send + 'static> Emitter<T> {
    pub fn new<M, F>(tx: mpsc::UnboundedSender<M>, wrap: F) -> Self
    where
        M: Send + 'static,
        F: Fn(T) -> M + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(move |evt| {
                // UI 已退出时接收端关闭，丢弃即可
                let _ = tx.send(wrap(evt));
            }),
        }
    }

    pub fn emit(&self, evt: T) {
        (self.sink)(evt)
    }

    #[cfg(test)]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, |evt| evt), rx)
    }
}

/// 控制器处理完成事件后给界面的反馈
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    /// 写入日志面板
    Error(String),
    /// 弹窗，按任意键关闭
    Blocking(String),
}
