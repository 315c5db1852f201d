//! Per-story view state: load the thread, hold the result, track collapses.
//!
//! A [`Session`] walks one state machine per load:
//!
//! ```text
//! Idle ─activate─▶ FetchingPost ─kids─▶ FetchingComments ─barrier─▶ Ready
//!                       │
//!                       └─post fetch/decode error─▶ Failed (no comments)
//! ```
//!
//! There are two ways to drive it:
//!
//! - [`Session::load`] awaits the whole pipeline in place.
//! - [`Session::spawn_load`] runs the pipeline on a tokio task and reports
//!   back with [`SessionEvent`]s over a channel, which the owner of the
//!   session feeds to [`Session::apply`]. Each load bumps a generation
//!   counter; events from an older load, or for another story, are ignored.
//!   If the receiving side is gone the task just drops its result.

use crate::api::{FetchError, ItemSource};
use crate::model::{decode, Comment, CommentId, DecodeError, ItemId, ItemKind, Post};
use crate::thread::{aggregate_report, ItemError, ThreadReport};
use crate::util::relative_time;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The story itself could not be loaded.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("Failed to fetch post: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to decode post: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Default)]
pub enum LoadState {
    #[default]
    Idle,
    FetchingPost,
    FetchingComments,
    Ready(Vec<Comment>),
    Failed(PostError),
}

/// Messages from a spawned load back to the session that started it.
#[derive(Debug)]
pub enum SessionEvent {
    /// The story decoded; its comments are now being fetched.
    PostResolved {
        post_id: ItemId,
        generation: u64,
        comment_count: usize,
    },
    /// The load finished, one way or the other.
    Loaded {
        post_id: ItemId,
        generation: u64,
        outcome: Result<ThreadReport, PostError>,
    },
}

impl SessionEvent {
    fn key(&self) -> (ItemId, u64) {
        match self {
            SessionEvent::PostResolved {
                post_id,
                generation,
                ..
            }
            | SessionEvent::Loaded {
                post_id,
                generation,
                ..
            } => (*post_id, *generation),
        }
    }
}

/// Collapsed comment ids. Collapsing hides a comment's body, not its header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityState {
    collapsed: HashSet<CommentId>,
}

impl VisibilityState {
    /// Flip `id` and return whether it is now collapsed.
    pub fn toggle(&mut self, id: CommentId) -> bool {
        if self.collapsed.remove(&id) {
            false
        } else {
            self.collapsed.insert(id);
            true
        }
    }

    pub fn is_collapsed(&self, id: CommentId) -> bool {
        self.collapsed.contains(&id)
    }

    pub fn clear(&mut self) {
        self.collapsed.clear();
    }
}

/// What the display layer gets for each comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedComment {
    pub id: CommentId,
    pub author: String,
    /// e.g. "3 hours ago"
    pub relative_time: String,
    /// Markdown-flavored body. Present even when collapsed.
    pub text: String,
    pub collapsed: bool,
}

/// State for one story's comment view.
#[derive(Debug)]
pub struct Session {
    post_id: ItemId,
    concurrency: Option<usize>,
    state: LoadState,
    visibility: VisibilityState,
    failures: Vec<(CommentId, ItemError)>,
    generation: u64,
}

impl Session {
    /// A session for `post_id`. `concurrency` caps in-flight comment fetches
    /// (`None` = unbounded).
    pub fn new(post_id: ItemId, concurrency: Option<usize>) -> Self {
        Self {
            post_id,
            concurrency,
            state: LoadState::Idle,
            visibility: VisibilityState::default(),
            failures: Vec::new(),
            generation: 0,
        }
    }

    pub fn post_id(&self) -> ItemId {
        self.post_id
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ordered comments. Empty unless the session is `Ready`.
    pub fn comments(&self) -> &[Comment] {
        match &self.state {
            LoadState::Ready(comments) => comments,
            _ => &[],
        }
    }

    /// Ids from the story's `kids` that were dropped by the last load.
    pub fn dropped(&self) -> Vec<CommentId> {
        self.failures.iter().map(|(id, _)| *id).collect()
    }

    /// Why each dropped comment was dropped.
    pub fn failures(&self) -> &[(CommentId, ItemError)] {
        &self.failures
    }

    /// Comments prepared for display, with timestamps relative to `now`.
    pub fn rendered_comments(&self, now: DateTime<Utc>) -> Vec<RenderedComment> {
        self.comments()
            .iter()
            .map(|c| RenderedComment {
                id: c.id,
                author: c.author.clone(),
                relative_time: relative_time(c.time, now),
                text: c.text.clone(),
                collapsed: self.visibility.is_collapsed(c.id),
            })
            .collect()
    }

    /// Body to show for `id`: `None` if collapsed or not loaded.
    pub fn visible_text(&self, id: CommentId) -> Option<&str> {
        if self.visibility.is_collapsed(id) {
            return None;
        }
        self.comments()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.text.as_str())
    }

    /// Flip the collapsed flag for `id`; returns the new value.
    pub fn toggle_collapsed(&mut self, id: CommentId) -> bool {
        self.visibility.toggle(id)
    }

    pub fn is_collapsed(&self, id: CommentId) -> bool {
        self.visibility.is_collapsed(id)
    }

    /// Load the thread in place, ending in `Ready` or `Failed`.
    pub async fn load<S: ItemSource>(&mut self, source: &S) {
        self.begin_load();

        let kids = match fetch_kids(source, self.post_id).await {
            Ok(kids) => kids,
            Err(e) => {
                self.finish(Err(e));
                return;
            }
        };

        self.state = LoadState::FetchingComments;
        let report = aggregate_report(source, &kids, self.concurrency).await;
        self.finish(Ok(report));
    }

    /// Start a load on a background task. Progress arrives on `events`;
    /// feed it to [`Session::apply`].
    pub fn spawn_load<S>(&mut self, source: S, events: mpsc::Sender<SessionEvent>) -> JoinHandle<()>
    where
        S: ItemSource + 'static,
    {
        let generation = self.begin_load();
        let post_id = self.post_id;
        let concurrency = self.concurrency;

        tokio::spawn(async move {
            let outcome = match fetch_kids(&source, post_id).await {
                Ok(kids) => {
                    let resolved = SessionEvent::PostResolved {
                        post_id,
                        generation,
                        comment_count: kids.len(),
                    };
                    if events.send(resolved).await.is_err() {
                        tracing::debug!(post_id, generation, "Session closed, abandoning load");
                        return;
                    }
                    Ok(aggregate_report(&source, &kids, concurrency).await)
                }
                Err(e) => Err(e),
            };

            let loaded = SessionEvent::Loaded {
                post_id,
                generation,
                outcome,
            };
            if events.send(loaded).await.is_err() {
                tracing::debug!(post_id, generation, "Session closed, discarding loaded thread");
            }
        })
    }

    /// Apply an event from [`Session::spawn_load`]. Returns `false` for
    /// stale events, which leave the session untouched.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let (post_id, generation) = event.key();
        if post_id != self.post_id || generation != self.generation {
            tracing::debug!(
                post_id,
                generation,
                current = self.generation,
                "Ignoring stale session event"
            );
            return false;
        }

        match event {
            SessionEvent::PostResolved { comment_count, .. } => {
                if matches!(self.state, LoadState::FetchingPost) {
                    tracing::debug!(post_id, comment_count, "Fetching comments");
                    self.state = LoadState::FetchingComments;
                }
            }
            SessionEvent::Loaded { outcome, .. } => self.finish(outcome),
        }
        true
    }

    fn begin_load(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.visibility.clear();
        self.failures.clear();
        self.state = LoadState::FetchingPost;
        self.generation
    }

    fn finish(&mut self, outcome: Result<ThreadReport, PostError>) {
        match outcome {
            Ok(report) => {
                self.failures = report.failures;
                self.state = LoadState::Ready(report.comments);
            }
            Err(e) => {
                tracing::warn!(post_id = self.post_id, error = %e, "Failed to load story");
                self.state = LoadState::Failed(e);
            }
        }
    }
}

/// Fetch a story and return its direct child ids.
pub async fn fetch_kids<S: ItemSource>(
    source: &S,
    post_id: ItemId,
) -> Result<Vec<CommentId>, PostError> {
    let bytes = source.fetch_item(post_id, ItemKind::Post).await?;
    let post: Post = decode(&bytes)?;
    Ok(post.kids)
}
