use nest_types::{CachedFeedView, FeedKey, PostRecord, TempId};

/// Where one mutation attempt is in its lifecycle.
///
/// An attempt with no context is idle; [`OptimisticMutationCoordinator::begin`]
/// creates the context in `Pending`.
///
/// [`OptimisticMutationCoordinator::begin`]: crate::OptimisticMutationCoordinator::begin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// Copy of one feed view taken just before the placeholder was applied.
///
/// Immutable once taken; only read by rollback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationSnapshot {
    key: FeedKey,
    view: CachedFeedView,
}

impl MutationSnapshot {
    pub(crate) fn new(key: FeedKey, view: CachedFeedView) -> Self {
        Self { key, view }
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn view(&self) -> &CachedFeedView {
        &self.view
    }
}

/// Everything commit and rollback need to know about one attempt.
///
/// The context is passed explicitly into [`commit`] and [`rollback`]; the
/// coordinator keeps no per-attempt state of its own.
///
/// [`commit`]: crate::OptimisticMutationCoordinator::commit
/// [`rollback`]: crate::OptimisticMutationCoordinator::rollback
#[derive(Debug)]
pub struct MutationContext {
    temp_id: TempId,
    placeholder: PostRecord,
    snapshots: Vec<MutationSnapshot>,
    state: MutationState,
}

impl MutationContext {
    pub(crate) fn new(placeholder: PostRecord, temp_id: TempId) -> Self {
        Self {
            temp_id,
            placeholder,
            snapshots: Vec::new(),
            state: MutationState::Pending,
        }
    }

    pub(crate) fn push_snapshot(&mut self, snapshot: MutationSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub(crate) fn set_state(&mut self, state: MutationState) {
        self.state = state;
    }

    pub fn temp_id(&self) -> TempId {
        self.temp_id
    }

    pub fn placeholder(&self) -> &PostRecord {
        &self.placeholder
    }

    pub fn snapshots(&self) -> &[MutationSnapshot] {
        &self.snapshots
    }

    /// Feeds that received the placeholder.
    pub fn affected_keys(&self) -> Vec<FeedKey> {
        self.snapshots.iter().map(|s| s.key.clone()).collect()
    }

    pub fn state(&self) -> MutationState {
        self.state
    }
}
