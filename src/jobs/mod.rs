use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    api::error,
    clients::{
        blob::BlobStore,
        mailer::{EmailMessage, Mailer},
    },
    modules::verification::repository::PasswordChangeRepository,
};

#[derive(Debug)]
pub enum Job {
    SendEmail(EmailMessage),
    MirrorBlob { key: String, bytes: Vec<u8> },
    CompletePasswordChange { change_id: Uuid, user_id: Uuid },
}

impl Job {
    fn kind(&self) -> &'static str {
        match self {
            Job::SendEmail(_) => "send_email",
            Job::MirrorBlob { .. } => "mirror_blob",
            Job::CompletePasswordChange { .. } => "complete_password_change",
        }
    }
}

/// Handle for fire-and-forget side effects. Cloning is cheap; every clone
/// feeds the same worker.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobQueue { tx }, rx)
    }

    pub fn start(runner: JobRunner) -> Self {
        let (queue, rx) = Self::channel();
        tokio::spawn(Arc::new(runner).run(rx));
        queue
    }

    pub fn enqueue(&self, job: Job) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            log::error!("Job worker is gone, dropping {} job", job.kind());
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff_ms: u64) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(initial_backoff_ms),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Runs `op` until it succeeds or the policy gives up, sleeping with
/// exponential backoff between attempts. Returns the last error.
pub async fn execute_with_retry<F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<(), error::SystemError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), error::SystemError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt);
                tracing::warn!("{label} failed on attempt {attempt}: {e}; retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

pub struct JobRunner {
    mailer: Arc<dyn Mailer>,
    blobs: Vec<Arc<dyn BlobStore>>,
    changes: Arc<dyn PasswordChangeRepository + Send + Sync>,
    policy: RetryPolicy,
}

impl JobRunner {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        blobs: Vec<Arc<dyn BlobStore>>,
        changes: Arc<dyn PasswordChangeRepository + Send + Sync>,
        policy: RetryPolicy,
    ) -> Self {
        JobRunner { mailer, blobs, changes, policy }
    }

    async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Job>) {
        tracing::info!("Job worker started with {} blob store(s)", self.blobs.len());
        while let Some(job) = rx.recv().await {
            let runner = self.clone();
            tokio::spawn(async move { runner.process(job).await });
        }
        tracing::info!("Job queue closed, worker exiting");
    }

    /// Failures end here: logged, never returned.
    pub async fn process(&self, job: Job) {
        let kind = job.kind();
        match job {
            Job::SendEmail(message) => {
                let result = execute_with_retry(self.policy, kind, || self.mailer.send(&message)).await;
                if let Err(e) = result {
                    log::error!("Giving up on mail to {}: {e}", message.to);
                }
            }
            Job::MirrorBlob { key, bytes } => {
                for store in &self.blobs {
                    let label = format!("{kind}:{}", store.name());
                    let result =
                        execute_with_retry(self.policy, &label, || store.put(&key, &bytes)).await;
                    match result {
                        Ok(()) => tracing::info!("Mirrored {key} to {}", store.name()),
                        Err(e) => log::error!("Giving up mirroring {key} to {}: {e}", store.name()),
                    }
                }
            }
            Job::CompletePasswordChange { change_id, user_id } => {
                let changes = &self.changes;
                let result = execute_with_retry(self.policy, kind, move || async move {
                    if !changes.complete_change(&change_id, &user_id).await? {
                        tracing::warn!("Password change {change_id} was already completed");
                    }
                    Ok::<(), error::SystemError>(())
                })
                .await;
                if let Err(e) = result {
                    log::error!("Giving up completing password change {change_id}: {e}");
                }
            }
        }
    }
}
