use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nest_fetch::{FetchError, FetchResult, PageFetcher};
use nest_mutation::{CreatePostRequest, PostTransport, TransportError};
use nest_types::{Author, Cursor, FeedKey, MediaRef, Page, PostId, PostRecord};
use tracing::debug;

/// Default number of posts per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

const MEDIA_BASE_URL: &str = "https://media.socialnest.app";

/// In-process stand-in for the SocialNest API.
///
/// Serves `home` (every post) and `profile:<user>` (that user's posts),
/// newest first, with offset cursors. Posts created through
/// [`PostTransport`] are authored by the session user and get a
/// server-assigned id. Failures and latency can be injected to exercise the
/// client's error paths.
///
/// Offsets shift when posts are created, so a page fetched after a create
/// can repeat the last post of the previous page; the feed view drops such
/// duplicates on append.
pub struct InMemoryFeedBackend {
    session: Author,
    posts: RwLock<Vec<PostRecord>>,
    page_size: usize,
    next_id: AtomicU64,
    latency_ms: AtomicU64,
    fail_fetches: AtomicBool,
    fail_creates: AtomicBool,
    fetch_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryFeedBackend {
    /// A backend where `session` is the signed-in user.
    pub fn new(session: Author) -> Self {
        Self::with_page_size(session, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(session: Author, page_size: usize) -> Self {
        Self {
            session,
            posts: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
            next_id: AtomicU64::new(1),
            latency_ms: AtomicU64::new(0),
            fail_fetches: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn session(&self) -> &Author {
        &self.session
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Record a post as if created by another client. Becomes the newest post.
    pub fn publish(&self, author: &Author, content: impl Into<String>) -> Result<PostRecord, TransportError> {
        let post = PostRecord {
            id: PostId::canonical(self.assign_id()),
            content: content.into(),
            created_at: Utc::now(),
            author: author.clone(),
            media: Vec::new(),
        };
        self.posts
            .write()
            .map_err(|e| TransportError::new(e.to_string()))?
            .insert(0, post.clone());
        Ok(post)
    }

    /// Total posts held by the backend.
    pub fn post_count(&self) -> usize {
        self.posts.read().map(|p| p.len()).unwrap_or_default()
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn assign_id(&self) -> String {
        format!("post-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delay(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

fn parse_offset(cursor: Option<&Cursor>) -> FetchResult<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .as_str()
            .parse()
            .map_err(|_| FetchError::Remote(format!("invalid cursor: {}", c.as_str()))),
    }
}

#[async_trait]
impl PageFetcher for InMemoryFeedBackend {
    async fn fetch_page(&self, key: &FeedKey, cursor: Option<&Cursor>) -> FetchResult<Page> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(FetchError::Remote("service unavailable".into()));
        }

        let offset = parse_offset(cursor)?;
        let posts = self
            .posts
            .read()
            .map_err(|e| FetchError::Internal(e.to_string()))?;
        let matching: Vec<&PostRecord> = match (key.kind(), key.scope()) {
            ("home", None) => posts.iter().collect(),
            ("profile", Some(user)) => posts.iter().filter(|p| p.author.id == user).collect(),
            _ => return Err(FetchError::UnknownFeed(key.clone())),
        };

        let end = offset.saturating_add(self.page_size).min(matching.len());
        let page_posts: Vec<PostRecord> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|p| (*p).clone())
            .collect();
        let next_cursor = (end < matching.len()).then(|| Cursor::new(end.to_string()));
        debug!(key = %key, offset, returned = page_posts.len(), terminal = next_cursor.is_none(), "page served");
        Ok(Page::new(page_posts, next_cursor))
    }
}

#[async_trait]
impl PostTransport for InMemoryFeedBackend {
    async fn create_post(&self, request: &CreatePostRequest) -> Result<PostRecord, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(TransportError::new("create-post rejected by server"));
        }

        let post = PostRecord {
            id: PostId::canonical(self.assign_id()),
            content: request.content.clone(),
            created_at: Utc::now(),
            author: self.session.clone(),
            media: request
                .media_ids
                .iter()
                .map(|id| MediaRef {
                    media_id: id.clone(),
                    url: Some(format!("{MEDIA_BASE_URL}/{id}")),
                })
                .collect(),
        };
        self.posts
            .write()
            .map_err(|e| TransportError::new(e.to_string()))?
            .insert(0, post.clone());
        debug!(post_id = %post.id, media = post.media.len(), "post created");
        Ok(post)
    }
}

impl std::fmt::Debug for InMemoryFeedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFeedBackend")
            .field("session", &self.session.id)
            .field("posts", &self.post_count())
            .field("page_size", &self.page_size)
            .finish()
    }
}
