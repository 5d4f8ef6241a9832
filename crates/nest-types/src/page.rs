use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::post::{PostId, PostRecord};

/// Opaque pagination token handed out by the feed source.
///
/// The client never parses a cursor; it only stores it and sends it back.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fetched page of a feed. `next_cursor == None` marks the last page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub posts: Vec<PostRecord>,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn new(posts: Vec<PostRecord>, next_cursor: Option<Cursor>) -> Self {
        Self { posts, next_cursor }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// All fetched pages of one feed, in fetch order.
///
/// `page_params[i]` is the cursor that was sent to obtain `pages[i]`; the
/// first entry is always `None` (the newest page). The two sequences always
/// have the same length.
///
/// Invariants maintained by every mutating method:
/// - post ids are unique across the concatenation of all pages;
/// - earlier pages are never reordered when a page is appended;
/// - the cursor list only grows through [`Self::append_page`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFeedView {
    pages: Vec<Page>,
    page_params: Vec<Option<Cursor>>,
}

impl CachedFeedView {
    /// Start a view from its first (newest) page.
    pub fn from_first_page(page: Page) -> Self {
        let mut view = Self {
            pages: Vec::with_capacity(1),
            page_params: Vec::with_capacity(1),
        };
        let page = view.without_known_posts(page).0;
        view.pages.push(page);
        view.page_params.push(None);
        view
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_params(&self) -> &[Option<Cursor>] {
        &self.page_params
    }

    pub fn first_page(&self) -> Option<&Page> {
        self.pages.first()
    }

    pub fn last_page(&self) -> Option<&Page> {
        self.pages.last()
    }

    /// All posts across all pages, flattened in display order.
    pub fn posts(&self) -> impl Iterator<Item = &PostRecord> {
        self.pages.iter().flat_map(|p| p.posts.iter())
    }

    pub fn post_count(&self) -> usize {
        self.pages.iter().map(|p| p.posts.len()).sum()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.posts().any(|p| &p.id == id)
    }

    /// Number of placeholder posts currently in the view.
    pub fn placeholder_count(&self) -> usize {
        self.posts().filter(|p| p.is_placeholder()).count()
    }

    /// Cursor for the next page, taken from the last fetched page.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|p| p.next_cursor.as_ref())
    }

    pub fn has_next_page(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// Append a page fetched with `cursor` to the tail of the view.
    ///
    /// Posts already present in the view are dropped from the incoming page
    /// so ids stay unique. Returns the number of dropped posts.
    pub fn append_page(&mut self, cursor: Cursor, page: Page) -> usize {
        let (page, dropped) = self.without_known_posts(page);
        self.pages.push(page);
        self.page_params.push(Some(cursor));
        dropped
    }

    /// Insert `post` at the head of the first page.
    ///
    /// Returns `false` (and leaves the view untouched) if the view has no
    /// pages or already contains a post with the same id.
    pub fn prepend_to_first_page(&mut self, post: PostRecord) -> bool {
        if self.contains(&post.id) {
            return false;
        }
        match self.pages.first_mut() {
            Some(first) => {
                first.posts.insert(0, post);
                true
            }
            None => false,
        }
    }

    /// Replace the post identified by `id` in place with `replacement`.
    ///
    /// If a post with the replacement's id already exists elsewhere in the
    /// view, the post at `id` is removed instead so ids stay unique.
    /// Returns `false` when `id` is not present; the view is unchanged then.
    pub fn replace_post(&mut self, id: &PostId, replacement: PostRecord) -> bool {
        let Some((page_idx, post_idx)) = self.position(id) else {
            return false;
        };
        let duplicate = &replacement.id != id && self.contains(&replacement.id);
        let posts = &mut self.pages[page_idx].posts;
        if duplicate {
            posts.remove(post_idx);
        } else {
            posts[post_idx] = replacement;
        }
        true
    }

    /// Remove the post identified by `id`, wherever it is.
    pub fn remove_post(&mut self, id: &PostId) -> Option<PostRecord> {
        let (page_idx, post_idx) = self.position(id)?;
        Some(self.pages[page_idx].posts.remove(post_idx))
    }

    fn position(&self, id: &PostId) -> Option<(usize, usize)> {
        self.pages.iter().enumerate().find_map(|(page_idx, page)| {
            page.posts
                .iter()
                .position(|p| &p.id == id)
                .map(|post_idx| (page_idx, post_idx))
        })
    }

    fn without_known_posts(&self, mut page: Page) -> (Page, usize) {
        let mut seen: HashSet<PostId> = self.posts().map(|p| p.id.clone()).collect();
        let before = page.posts.len();
        page.posts.retain(|p| seen.insert(p.id.clone()));
        let dropped = before - page.posts.len();
        (page, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Author, TempId};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn post(id: &str) -> PostRecord {
        PostRecord {
            id: PostId::canonical(id),
            content: format!("content of {id}"),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            author: Author::new("u1", "alice", "Alice"),
            media: Vec::new(),
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Page {
        Page::new(ids.iter().map(|id| post(id)).collect(), next.map(Cursor::new))
    }

    fn ids(view: &CachedFeedView) -> Vec<String> {
        view.posts().map(|p| p.id.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Construction and reads
    // -----------------------------------------------------------------------

    #[test]
    fn first_page_has_null_param() {
        let view = CachedFeedView::from_first_page(page(&["p1", "p2"], Some("c1")));
        assert_eq!(view.pages().len(), 1);
        assert_eq!(view.page_params(), &[None]);
        assert_eq!(view.next_cursor(), Some(&Cursor::new("c1")));
        assert!(view.has_next_page());
        assert_eq!(view.post_count(), 2);
    }

    #[test]
    fn first_page_deduplicates_within_itself() {
        let view = CachedFeedView::from_first_page(page(&["p1", "p1", "p2"], None));
        assert_eq!(ids(&view), vec!["p1", "p2"]);
        assert!(!view.has_next_page());
    }

    // -----------------------------------------------------------------------
    // Append
    // -----------------------------------------------------------------------

    #[test]
    fn append_extends_pages_and_params() {
        let mut view = CachedFeedView::from_first_page(page(&["p1", "p2"], Some("c1")));
        let dropped = view.append_page(Cursor::new("c1"), page(&["p3"], None));
        assert_eq!(dropped, 0);
        assert_eq!(view.pages().len(), 2);
        assert_eq!(view.page_params(), &[None, Some(Cursor::new("c1"))]);
        assert_eq!(ids(&view), vec!["p1", "p2", "p3"]);
        assert!(!view.has_next_page());
    }

    #[test]
    fn append_drops_posts_already_present() {
        let mut view = CachedFeedView::from_first_page(page(&["p1", "p2"], Some("c1")));
        let dropped = view.append_page(Cursor::new("c1"), page(&["p2", "p3"], Some("c2")));
        assert_eq!(dropped, 1);
        assert_eq!(ids(&view), vec!["p1", "p2", "p3"]);
    }

    // -----------------------------------------------------------------------
    // Optimistic edits
    // -----------------------------------------------------------------------

    #[test]
    fn prepend_touches_only_first_page() {
        let mut view = CachedFeedView::from_first_page(page(&["p1"], Some("c1")));
        view.append_page(Cursor::new("c1"), page(&["p2"], None));
        let second_before = view.pages()[1].clone();

        let t = TempId::new();
        let placeholder = PostRecord::placeholder(t, Author::new("u1", "a", "A"), "hi", &[]);
        assert!(view.prepend_to_first_page(placeholder));

        assert_eq!(view.pages()[0].posts[0].id, PostId::Temp(t));
        assert_eq!(view.pages()[1], second_before);
        assert_eq!(view.page_params().len(), 2);
        assert_eq!(view.placeholder_count(), 1);
    }

    #[test]
    fn prepend_rejects_duplicate_id() {
        let mut view = CachedFeedView::from_first_page(page(&["p1"], None));
        assert!(!view.prepend_to_first_page(post("p1")));
        assert_eq!(view.post_count(), 1);
    }

    #[test]
    fn replace_in_place_on_any_page() {
        let mut view = CachedFeedView::from_first_page(page(&["p1"], Some("c1")));
        view.append_page(Cursor::new("c1"), page(&["p2", "p3"], None));

        assert!(view.replace_post(&PostId::canonical("p2"), post("p9")));
        assert_eq!(ids(&view), vec!["p1", "p9", "p3"]);
    }

    #[test]
    fn replace_missing_is_noop() {
        let mut view = CachedFeedView::from_first_page(page(&["p1"], None));
        let before = view.clone();
        assert!(!view.replace_post(&PostId::Temp(TempId::new()), post("p9")));
        assert_eq!(view, before);
    }

    #[test]
    fn replace_with_existing_id_removes_instead() {
        let t = TempId::new();
        let mut view = CachedFeedView::from_first_page(page(&["p1", "p9"], None));
        view.prepend_to_first_page(PostRecord::placeholder(
            t,
            Author::new("u1", "a", "A"),
            "x",
            &[],
        ));

        assert!(view.replace_post(&PostId::Temp(t), post("p9")));
        assert_eq!(ids(&view), vec!["p1", "p9"]);
        assert_eq!(view.placeholder_count(), 0);
    }

    #[test]
    fn remove_post_anywhere() {
        let mut view = CachedFeedView::from_first_page(page(&["p1"], Some("c1")));
        view.append_page(Cursor::new("c1"), page(&["p2"], None));
        let removed = view.remove_post(&PostId::canonical("p2")).unwrap();
        assert_eq!(removed.id, PostId::canonical("p2"));
        assert_eq!(ids(&view), vec!["p1"]);
        assert!(view.remove_post(&PostId::canonical("p2")).is_none());
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn ids_stay_unique_after_appends(
            pages in prop::collection::vec(prop::collection::vec(0u8..20, 0..8), 1..6)
        ) {
            let mk = |ids: &Vec<u8>, next: Option<String>| Page::new(
                ids.iter().map(|i| post(&format!("p{i}"))).collect(),
                next.map(Cursor::new),
            );
            let mut view = CachedFeedView::from_first_page(mk(&pages[0], Some("c0".into())));
            for (i, ids) in pages.iter().enumerate().skip(1) {
                let earlier: Vec<Page> = view.pages().to_vec();
                view.append_page(Cursor::new(format!("c{}", i - 1)), mk(ids, Some(format!("c{i}"))));
                prop_assert_eq!(&view.pages()[..earlier.len()], &earlier[..]);
            }

            let all: Vec<&PostId> = view.posts().map(|p| &p.id).collect();
            let unique: HashSet<&PostId> = all.iter().copied().collect();
            prop_assert_eq!(all.len(), unique.len());
            prop_assert_eq!(view.pages().len(), view.page_params().len());
        }
    }
}
