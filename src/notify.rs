//! 通知（トースト）連携
//!
//! オーケストレーターは操作ごとに1回だけ `notify` を呼ぶ。
//! 戻り値はなく、表示の成否は関知しない。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Error,
}

impl NotifyKind {
    fn icon(&self) -> &'static str {
        match self {
            NotifyKind::Info => "ℹ",
            NotifyKind::Success => "✔",
            NotifyKind::Error => "✖",
        }
    }
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyKind::Info => write!(f, "info"),
            NotifyKind::Success => write!(f, "success"),
            NotifyKind::Error => write!(f, "error"),
        }
    }
}

pub trait Notifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str);
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        (**self).notify(kind, title, message)
    }
}

/// 端末に表示する通知
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        tracing::debug!(%kind, title, message, "notify");
        match kind {
            NotifyKind::Error => eprintln!("{} {}: {}", kind.icon(), title, message),
            _ => println!("{} {}: {}", kind.icon(), title, message),
        }
    }
}
