use booking_rules_domain::ID;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub task_id: ID,
    pub userid: i64,
    pub subject: String,
    pub message: String,
}

#[async_trait::async_trait]
pub trait IMailer: Send + Sync {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// Hands mails over to the log. The host system picks them up from there
/// until a transport is configured.
pub struct LogMailer {}

#[async_trait::async_trait]
impl IMailer for LogMailer {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        info!(
            task_id = %mail.task_id,
            user_id = mail.userid,
            subject = %mail.subject,
            "Sending notification"
        );
        Ok(())
    }
}

/// Records sent mails, optionally failing every send
pub struct InMemoryMailer {
    sent: Mutex<Vec<Mail>>,
    failing: bool,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IMailer for InMemoryMailer {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("Mail transport is down");
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
