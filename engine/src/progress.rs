//! 进度事件
//!
//! 核心不假设任何 UI 线程模型：调用方通过 channel 拉取事件，
//! 不提供接收端时行为完全一致。

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 0.0 ..= 100.0
    pub percent: f64,
    pub message: String,
}

/// 进度事件的发送端。
///
/// 接收端被丢弃后发送失败会被忽略，不影响加解密本身。
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<Sender<ProgressEvent>>,
}

impl ProgressSink {
    /// 丢弃所有事件。
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// 创建一对发送端 / 接收端，调用方自行消费 `Receiver`。
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// 是否有接收端；为 false 时调用方可跳过消息的格式化。
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn emit(&self, percent: f64, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                percent: percent.clamp(0.0, 100.0),
                message: message.into(),
            });
        }
    }
}

/// `done / total` 映射到 `[start, end]` 区间内的百分比。
pub(crate) fn scaled(start: f64, end: f64, done: u64, total: u64) -> f64 {
    if total == 0 {
        return end;
    }
    start + (end - start) * (done as f64 / total as f64)
}
