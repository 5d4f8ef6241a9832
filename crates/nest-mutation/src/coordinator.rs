use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nest_fetch::FetchQuiescer;
use nest_select::FeedQuerySelector;
use nest_store::{FeedCacheStore, FeedCacheStoreExt, StoreError};
use nest_types::{Author, FeedKey, PostId, PostRecord, TempId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::{MutationConfig, OverlapPolicy};
use crate::context::{MutationContext, MutationSnapshot, MutationState};
use crate::error::{MutationError, MutationResult};
use crate::transport::{CreatePostRequest, PostTransport};

/// A post the user asked to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitPost {
    /// The acting user; becomes the placeholder's author and drives feed
    /// selection.
    pub author: Author,
    pub content: String,
    /// Already-uploaded media, in display order.
    pub media_ids: Vec<String>,
}

impl SubmitPost {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            media_ids: Vec::new(),
        }
    }

    pub fn with_media(mut self, media_ids: Vec<String>) -> Self {
        self.media_ids = media_ids;
        self
    }
}

/// What commit did to one feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The placeholder was replaced by the server's record.
    Replaced,
    /// The placeholder was no longer in the view (e.g. the first page was
    /// refetched); nothing was inserted.
    Stale,
    /// The view itself was dropped from the store meanwhile.
    ViewGone,
}

/// Per-feed result of a commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub feeds: Vec<(FeedKey, Reconciliation)>,
}

impl CommitReport {
    pub fn replaced(&self) -> usize {
        self.feeds
            .iter()
            .filter(|(_, r)| *r == Reconciliation::Replaced)
            .count()
    }

    pub fn stale_keys(&self) -> Vec<&FeedKey> {
        self.feeds
            .iter()
            .filter(|(_, r)| *r != Reconciliation::Replaced)
            .map(|(k, _)| k)
            .collect()
    }
}

/// The two observable results of a submit.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The server accepted the post and the cached feeds were reconciled.
    Settled {
        post: PostRecord,
        temp_id: TempId,
        report: CommitReport,
    },
    /// The post was not created. `restored` lists the feeds that were
    /// rolled back; it is empty when the submit was rejected before any
    /// feed was touched.
    Failed {
        error: MutationError,
        temp_id: Option<TempId>,
        restored: Vec<FeedKey>,
    },
}

impl MutationOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Orchestrates optimistic post creation across every affected feed.
pub struct OptimisticMutationCoordinator {
    store: Arc<dyn FeedCacheStore>,
    selector: Arc<FeedQuerySelector>,
    quiescer: Arc<dyn FetchQuiescer>,
    transport: Arc<dyn PostTransport>,
    config: MutationConfig,
    queues: Mutex<HashMap<FeedKey, Arc<AsyncMutex<()>>>>,
    pending: AtomicUsize,
}

impl OptimisticMutationCoordinator {
    pub fn new(
        store: Arc<dyn FeedCacheStore>,
        selector: Arc<FeedQuerySelector>,
        quiescer: Arc<dyn FetchQuiescer>,
        transport: Arc<dyn PostTransport>,
        config: MutationConfig,
    ) -> Self {
        Self {
            store,
            selector,
            quiescer,
            transport,
            config,
            queues: Mutex::new(HashMap::new()),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Number of attempts between `begin` and settlement.
    pub fn pending_mutations(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.pending_mutations() == 0
    }

    /// Run one full attempt: begin, call the transport, then commit or roll
    /// back.
    ///
    /// Dropping the returned future after the placeholder is applied rolls
    /// the attempt back.
    pub async fn submit(&self, submit: SubmitPost) -> MutationOutcome {
        if let Err(error) = self.validate(&submit) {
            return rejected(&submit, error);
        }
        // Under `Serialized` the placeholder goes only to the feeds whose
        // queues are held, even if more feeds were cached while waiting.
        let (keys, _queue_guards) = match self.config.overlap {
            OverlapPolicy::Stacked => match self.affected_keys(&submit.author.id) {
                Ok(keys) => (keys, Vec::new()),
                Err(error) => return rejected(&submit, error),
            },
            OverlapPolicy::Serialized => match self.enter_queues(&submit.author.id).await {
                Ok(entered) => entered,
                Err(error) => return rejected(&submit, error),
            },
        };

        let mut attempt = match self.apply(&submit, keys).await {
            Ok(ctx) => PendingAttempt { coord: self, ctx },
            Err(error) => return rejected(&submit, error),
        };
        let temp_id = attempt.ctx.temp_id();

        let request = CreatePostRequest {
            content: submit.content,
            media_ids: submit.media_ids,
        };
        match self.transport.create_post(&request).await {
            Ok(post) => match self.commit(&mut attempt.ctx, post.clone()) {
                Ok(report) => MutationOutcome::Settled {
                    post,
                    temp_id,
                    report,
                },
                Err(error) => MutationOutcome::Failed {
                    error,
                    temp_id: Some(temp_id),
                    restored: Vec::new(),
                },
            },
            Err(transport_error) => {
                warn!(temp_id = %temp_id, error = %transport_error, "create-post failed");
                match self.rollback(&mut attempt.ctx) {
                    Ok(restored) => MutationOutcome::Failed {
                        error: MutationError::Transport(transport_error),
                        temp_id: Some(temp_id),
                        restored,
                    },
                    Err(error) => MutationOutcome::Failed {
                        error,
                        temp_id: Some(temp_id),
                        restored: Vec::new(),
                    },
                }
            }
        }
    }

    /// Reject a submit that must not reach the feeds.
    pub fn validate(&self, submit: &SubmitPost) -> MutationResult<()> {
        if submit.content.trim().is_empty() && submit.media_ids.is_empty() {
            return Err(MutationError::EmptyPost);
        }
        if submit.media_ids.len() > self.config.max_attachments {
            return Err(MutationError::TooManyAttachments {
                count: submit.media_ids.len(),
                max: self.config.max_attachments,
            });
        }
        let mut seen = HashSet::new();
        for id in &submit.media_ids {
            if !seen.insert(id.as_str()) {
                return Err(MutationError::DuplicateMedia(id.clone()));
            }
        }
        if let Some(max) = self.config.max_content_chars {
            let len = submit.content.chars().count();
            if len > max {
                return Err(MutationError::ContentTooLong { len, max });
            }
        }
        Ok(())
    }

    /// Cached feeds that a post by `author_id` affects, ordered by key.
    pub fn affected_keys(&self, author_id: &str) -> MutationResult<Vec<FeedKey>> {
        let predicate = self.selector.for_author(author_id);
        Ok(self
            .store
            .query(&|key| predicate.matches(key))?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Select, quiesce, snapshot, and apply the placeholder.
    ///
    /// Feeds that are not cached are skipped, never created. The snapshot of
    /// each feed and the placeholder insert happen in one store update, so
    /// nothing can land between them.
    pub async fn begin(&self, submit: &SubmitPost) -> MutationResult<MutationContext> {
        self.validate(submit)?;
        let keys = self.affected_keys(&submit.author.id)?;
        self.apply(submit, keys).await
    }

    /// Quiesce, snapshot, and apply the placeholder to exactly `keys`.
    async fn apply(&self, submit: &SubmitPost, keys: Vec<FeedKey>) -> MutationResult<MutationContext> {
        for key in &keys {
            if self.quiescer.quiesce(key).await {
                debug!(key = %key, "in-flight fetch quiesced");
            }
        }

        let temp_id = TempId::new();
        let placeholder = PostRecord::placeholder(
            temp_id,
            submit.author.clone(),
            submit.content.clone(),
            &submit.media_ids,
        );
        let mut ctx = MutationContext::new(placeholder.clone(), temp_id);

        for key in keys {
            let mut snapshot = None;
            let post = placeholder.clone();
            let applied = self.store.modify(&key, |view| {
                let before = view.clone();
                let inserted = view.prepend_to_first_page(post);
                if inserted {
                    snapshot = Some(before);
                }
                inserted
            });
            match applied {
                Ok(_) => {
                    if let Some(view) = snapshot {
                        ctx.push_snapshot(MutationSnapshot::new(key, view));
                    }
                }
                Err(e) => {
                    // Undo the feeds already touched before reporting.
                    if let Err(undo) = self.restore(&ctx) {
                        warn!(temp_id = %temp_id, error = %undo, "partial apply could not be undone");
                    }
                    return Err(e.into());
                }
            }
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        info!(
            temp_id = %temp_id,
            author = %submit.author.id,
            feeds = ctx.snapshots().len(),
            "placeholder applied"
        );
        Ok(ctx)
    }

    /// Swap the placeholder for the server's record in every affected feed.
    ///
    /// A feed whose placeholder is gone is left alone. Calling this again
    /// for an already committed context changes nothing.
    pub fn commit(&self, ctx: &mut MutationContext, post: PostRecord) -> MutationResult<CommitReport> {
        match ctx.state() {
            MutationState::Pending | MutationState::Committed => {}
            actual => {
                return Err(MutationError::InvalidState {
                    expected: "pending or committed",
                    actual,
                })
            }
        }

        let temp = PostId::Temp(ctx.temp_id());
        let mut report = CommitReport::default();
        for snapshot in ctx.snapshots() {
            let key = snapshot.key();
            let reconciliation = match self
                .store
                .modify(key, |view| view.replace_post(&temp, post.clone()))?
            {
                Some(true) => Reconciliation::Replaced,
                Some(false) => Reconciliation::Stale,
                None => Reconciliation::ViewGone,
            };
            if reconciliation != Reconciliation::Replaced {
                debug!(key = %key, temp_id = %temp, ?reconciliation, "stale reconciliation");
            }
            report.feeds.push((key.clone(), reconciliation));
        }

        if ctx.state() == MutationState::Pending {
            ctx.set_state(MutationState::Committed);
            self.pending.fetch_sub(1, Ordering::SeqCst);
            info!(
                temp_id = %temp,
                post_id = %post.id,
                replaced = report.replaced(),
                "mutation committed"
            );
        }
        Ok(report)
    }

    /// Take this attempt's placeholder back out of every affected feed.
    ///
    /// A feed that holds exactly its snapshot plus the placeholder is
    /// restored to the snapshot. Otherwise other attempts have settled or
    /// stacked on top since `begin`, and only the placeholder is removed so
    /// their edits survive. Feeds dropped from the store stay dropped.
    pub fn rollback(&self, ctx: &mut MutationContext) -> MutationResult<Vec<FeedKey>> {
        if ctx.state() != MutationState::Pending {
            return Err(MutationError::InvalidState {
                expected: "pending",
                actual: ctx.state(),
            });
        }
        let restored = self.restore(ctx)?;
        ctx.set_state(MutationState::RolledBack);
        self.pending.fetch_sub(1, Ordering::SeqCst);
        warn!(temp_id = %ctx.temp_id(), feeds = restored.len(), "mutation rolled back");
        Ok(restored)
    }

    fn restore(&self, ctx: &MutationContext) -> MutationResult<Vec<FeedKey>> {
        let temp = PostId::Temp(ctx.temp_id());
        let mut restored = Vec::new();
        let mut first_error = None;
        for snapshot in ctx.snapshots() {
            let mut expected = snapshot.view().clone();
            expected.prepend_to_first_page(ctx.placeholder().clone());
            let mut changed = false;
            let result = self.store.update_with(snapshot.key(), |current| {
                let mut current = current?;
                if current == expected {
                    changed = true;
                    return Some(snapshot.view().clone());
                }
                changed = current.remove_post(&temp).is_some();
                Some(current)
            });
            match result {
                Ok(Some(_)) if changed => restored.push(snapshot.key().clone()),
                Ok(Some(_)) => debug!(key = %snapshot.key(), temp_id = %temp, "placeholder already gone"),
                Ok(None) => debug!(key = %snapshot.key(), "view gone, not restored"),
                Err(e) => {
                    warn!(key = %snapshot.key(), error = %e, "restore failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(restored),
        }
    }

    /// Wait for every earlier submission touching the same feeds, returning
    /// the feeds whose queues are now held.
    ///
    /// Queues are taken in key order so two submissions can never hold
    /// each other's queues.
    async fn enter_queues(
        &self,
        author_id: &str,
    ) -> MutationResult<(Vec<FeedKey>, Vec<OwnedMutexGuard<()>>)> {
        let keys = self.affected_keys(author_id)?;
        let queues: Vec<Arc<AsyncMutex<()>>> = {
            let mut map = self
                .queues
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            keys.iter()
                .map(|key| Arc::clone(map.entry(key.clone()).or_default()))
                .collect()
        };
        let mut guards = Vec::with_capacity(queues.len());
        for queue in queues {
            guards.push(queue.lock_owned().await);
        }
        Ok((keys, guards))
    }
}

fn rejected(submit: &SubmitPost, error: MutationError) -> MutationOutcome {
    warn!(author = %submit.author.id, error = %error, "submit rejected");
    MutationOutcome::Failed {
        error,
        temp_id: None,
        restored: Vec::new(),
    }
}

/// An applied attempt owned by a running `submit`. If the future is dropped
/// before the attempt settles, the placeholder is rolled back here.
struct PendingAttempt<'a> {
    coord: &'a OptimisticMutationCoordinator,
    ctx: MutationContext,
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        if self.ctx.state() != MutationState::Pending {
            return;
        }
        warn!(temp_id = %self.ctx.temp_id(), "submit abandoned, rolling back");
        if let Err(e) = self.coord.rollback(&mut self.ctx) {
            warn!(temp_id = %self.ctx.temp_id(), error = %e, "abandoned submit could not be rolled back");
        }
    }
}

impl std::fmt::Debug for OptimisticMutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticMutationCoordinator")
            .field("config", &self.config)
            .field("pending", &self.pending_mutations())
            .finish()
    }
}
