//! Post retention.
//!
//! Posts live for 24 hours. Two mechanisms enforce that:
//! - every created post yields an [`ExpiryCheck`] that the [`ExpiryQueue`]
//!   worker holds in [`PendingChecks`] and fires at the post's deadline;
//! - a periodic sweep ([`cleanup_old_posts`]) catches anything the queue
//!   missed, e.g. checks lost across a restart.
//!
//! Both paths re-read the post's age before deleting, so a late or early
//! timer never removes a post that is still within its window.

use std::{cmp::Reverse, collections::BinaryHeap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    db_helpers::{PostStore, Store},
    errors::RequestError,
    models::Post,
};

pub const RETENTION_HOURS: i64 = 24;

pub fn retention() -> Duration {
    Duration::hours(RETENTION_HOURS)
}

pub fn expires_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + retention()
}

pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at >= retention()
}

/// Request to re-check a post once its retention window has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryCheck {
    pub post_id: i64,
    pub due_at: DateTime<Utc>,
}

impl ExpiryCheck {
    pub fn for_post(post: &Post) -> Self {
        Self {
            post_id: post.id,
            due_at: expires_at(post.created_at),
        }
    }
}

/// Deletes the post if it is expired at `now`. Returns whether a post was deleted.
///
/// A post that no longer exists is not an error.
pub async fn run_expiry_check<S>(store: &S, post_id: i64, now: DateTime<Utc>) -> Result<bool, RequestError>
where
    S: PostStore + ?Sized,
{
    let post = match store.get_post(post_id).await? {
        Some(post) => post,
        None => {
            tracing::debug!(post_id, "Expiry check for missing post");
            return Ok(false);
        }
    };
    if !is_expired(post.created_at, now) {
        tracing::debug!(post_id, "Post not yet expired, skipping");
        return Ok(false);
    }
    store.delete_post(post_id).await
}

/// Deletes every expired post and returns how many were removed.
pub async fn cleanup_old_posts<S>(store: &S, now: DateTime<Utc>) -> Result<usize, RequestError>
where
    S: PostStore + ?Sized,
{
    let mut deleted = 0;
    for (post_id, created_at) in store.list_post_ages().await? {
        if is_expired(created_at, now) && store.delete_post(post_id).await? {
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// Sending half of the deferred expiry checks.
#[derive(Debug, Clone)]
pub struct ExpiryQueue {
    sender: mpsc::UnboundedSender<ExpiryCheck>,
}

impl ExpiryQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExpiryCheck>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn schedule(&self, check: ExpiryCheck) {
        if self.sender.send(check).is_err() {
            // The periodic sweep still covers this post.
            tracing::warn!(post_id = check.post_id, "Expiry worker is gone, check dropped");
        }
    }
}

/// Checks waiting for their deadline, earliest first.
///
/// One entry per post created in the last 24 hours. Entries for posts deleted
/// by hand stay until their deadline and then resolve to a no-op.
#[derive(Debug, Default)]
pub struct PendingChecks {
    heap: BinaryHeap<Reverse<(DateTime<Utc>, i64)>>,
}

impl PendingChecks {
    pub fn push(&mut self, check: ExpiryCheck) {
        self.heap.push(Reverse((check.due_at, check.post_id)));
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse((due_at, _))| *due_at)
    }

    /// Removes and returns every check due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<ExpiryCheck> {
        let mut due = Vec::new();
        while let Some(Reverse((due_at, post_id))) = self.heap.peek().copied() {
            if due_at > now {
                break;
            }
            self.heap.pop();
            due.push(ExpiryCheck { post_id, due_at });
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

async fn sleep_until(due_at: Option<DateTime<Utc>>) {
    match due_at {
        Some(due_at) => {
            let delay = (due_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delay).await;
        }
        None => std::future::pending().await,
    }
}

/// Single task that runs each received check at its deadline.
pub fn spawn_expiry_worker(
    store: Arc<dyn Store>,
    mut receiver: mpsc::UnboundedReceiver<ExpiryCheck>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pending = PendingChecks::default();
        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(check) => pending.push(check),
                    None => break,
                },
                _ = sleep_until(pending.next_due()) => {
                    for check in pending.pop_due(Utc::now()) {
                        match run_expiry_check(&*store, check.post_id, Utc::now()).await {
                            Ok(true) => tracing::info!(post_id = check.post_id, "Expired post deleted"),
                            Ok(false) => {}
                            Err(e) => {
                                tracing::error!(post_id = check.post_id, error = %e, "Expiry check failed")
                            }
                        }
                    }
                }
            }
        }
        tracing::info!(pending = pending.len(), "Expiry queue closed, worker stopping");
    })
}

/// Runs [`cleanup_old_posts`] immediately and then every `every`.
pub fn spawn_cleanup_sweep(store: Arc<dyn Store>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match cleanup_old_posts(&*store, Utc::now()).await {
                Ok(0) => tracing::debug!("Cleanup sweep found no expired posts"),
                Ok(deleted) => tracing::info!(deleted, "Cleanup sweep deleted expired posts"),
                Err(e) => tracing::error!(error = %e, "Cleanup sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn boundary_at_twenty_four_hours() {
        let created_at = created();
        let just_before = created_at + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
        assert!(!is_expired(created_at, just_before));
        assert!(is_expired(created_at, created_at + Duration::hours(24)));
        assert!(is_expired(created_at, created_at + Duration::hours(25)));
    }

    #[test]
    fn fresh_post_is_not_expired() {
        let created_at = created();
        assert!(!is_expired(created_at, created_at));
        assert!(!is_expired(created_at, created_at + Duration::hours(23)));
    }

    #[test]
    fn check_is_due_at_deadline() {
        let post = Post {
            id: 9,
            title: "t".into(),
            body: "b".into(),
            user_id: 1,
            created_at: created(),
            updated_at: created(),
        };
        let check = ExpiryCheck::for_post(&post);
        assert_eq!(check.post_id, 9);
        assert_eq!(check.due_at, created() + Duration::hours(24));
    }

    #[tokio::test]
    async fn queue_delivers_checks() {
        let (queue, mut receiver) = ExpiryQueue::new();
        let check = ExpiryCheck {
            post_id: 3,
            due_at: created(),
        };
        queue.schedule(check);
        assert_eq!(receiver.recv().await, Some(check));
    }

    #[test]
    fn pending_checks_pop_in_deadline_order() {
        let mut pending = PendingChecks::default();
        let base = created();
        for (post_id, hours) in [(1, 3), (2, 1), (3, 2)] {
            pending.push(ExpiryCheck {
                post_id,
                due_at: base + Duration::hours(hours),
            });
        }
        assert_eq!(pending.next_due(), Some(base + Duration::hours(1)));

        assert!(pending.pop_due(base).is_empty());
        let due: Vec<i64> = pending
            .pop_due(base + Duration::hours(2))
            .iter()
            .map(|check| check.post_id)
            .collect();
        assert_eq!(due, vec![2, 3]);
        assert_eq!(pending.len(), 1);

        assert_eq!(pending.pop_due(base + Duration::hours(5)).len(), 1);
        assert!(pending.is_empty());
        assert_eq!(pending.next_due(), None);
    }

    #[tokio::test]
    async fn scheduling_after_worker_stopped_does_not_panic() {
        let (queue, receiver) = ExpiryQueue::new();
        drop(receiver);
        queue.schedule(ExpiryCheck {
            post_id: 1,
            due_at: created(),
        });
    }
}
