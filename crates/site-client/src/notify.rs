use async_trait::async_trait;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

/// Transient message sink (a toast in the dashboard, stderr in the CLI).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn success(&self, message: &str) {
        self.notify(Notice::new(Severity::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notice::new(Severity::Error, message));
    }
}

/// Yes/no gate in front of destructive actions.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Error => error!(event = "notice", severity = notice.severity.as_str(), message = %notice.message),
            Severity::Success | Severity::Info => {
                info!(event = "notice", severity = notice.severity.as_str(), message = %notice.message)
            }
        }
    }
}

/// Forwards notices to the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notice>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer(pub bool);

#[async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug)]
pub struct ConfirmRequest {
    pub prompt: String,
    pub reply: oneshot::Sender<bool>,
}

/// Asks the UI loop and waits for its answer. A closed channel means "no".
#[derive(Debug, Clone)]
pub struct ChannelConfirmer {
    tx: mpsc::Sender<ConfirmRequest>,
}

impl ChannelConfirmer {
    pub fn new(tx: mpsc::Sender<ConfirmRequest>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Confirmer for ChannelConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = ConfirmRequest {
            prompt: prompt.to_string(),
            reply,
        };
        if self.tx.send(request).await.is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}
