//! Concurrent fan-out/fan-in over a list of item ids.
//!
//! Every id gets its own fetch → decode → sanitize task. Tasks complete in
//! whatever order the network dictates; each returns `(id, outcome)` by
//! value to a single collector that keys outcomes by id. Only once *every*
//! task has finished does the collector walk the original id list and emit
//! results in that order. Output order is therefore always input order,
//! never completion order.
//!
//! Failures are per item: a comment that fails to fetch, decode or sanitize
//! is left out and recorded in [`ThreadReport::failures`]; its siblings are
//! unaffected.

use crate::api::{FetchError, ItemSource};
use crate::model::{decode, Comment, CommentId, DecodeError, ItemId, ItemKind, Story};
use crate::sanitize::{self, SanitizeError};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use thiserror::Error;

/// Why a single item was left out of a result.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
}

/// Outcome of aggregating a comment thread.
#[derive(Debug, Default)]
pub struct ThreadReport {
    /// Sanitized comments, in input order.
    pub comments: Vec<Comment>,
    /// Ids that were dropped and why, in input order.
    pub failures: Vec<(CommentId, ItemError)>,
}

impl ThreadReport {
    pub fn failed_ids(&self) -> Vec<CommentId> {
        self.failures.iter().map(|(id, _)| *id).collect()
    }
}

/// Fetch, decode and sanitize every comment in `ids`, returning the
/// survivors in `ids` order.
///
/// `concurrency` caps in-flight requests; `None` launches every fetch at once.
pub async fn aggregate<S: ItemSource>(
    source: &S,
    ids: &[CommentId],
    concurrency: Option<usize>,
) -> Vec<Comment> {
    aggregate_report(source, ids, concurrency).await.comments
}

/// Like [`aggregate`], but also reports which ids were dropped and why.
///
/// Duplicate ids are fetched once and appear once, at their first position.
pub async fn aggregate_report<S: ItemSource>(
    source: &S,
    ids: &[CommentId],
    concurrency: Option<usize>,
) -> ThreadReport {
    let outcomes = fan_out(ids, concurrency, |id| load_comment(source, id)).await;

    let mut report = ThreadReport::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(comment) => report.comments.push(comment),
            Err(e) => {
                tracing::debug!(id, error = %e, "Dropping comment");
                report.failures.push((id, e));
            }
        }
    }

    tracing::info!(
        requested = ids.len(),
        loaded = report.comments.len(),
        dropped = report.failures.len(),
        "Comment thread aggregated"
    );
    report
}

/// Fetch the title lines for `ids`, in `ids` order, skipping any that fail.
pub async fn top_stories<S: ItemSource>(
    source: &S,
    ids: &[ItemId],
    concurrency: Option<usize>,
) -> Vec<Story> {
    let outcomes = fan_out(ids, concurrency, |id| load_story(source, id)).await;

    outcomes
        .into_iter()
        .filter_map(|(id, outcome)| match outcome {
            Ok(story) => Some(story),
            Err(e) => {
                tracing::debug!(id, error = %e, "Dropping story");
                None
            }
        })
        .collect()
}

async fn load_comment<S: ItemSource>(source: &S, id: CommentId) -> Result<Comment, ItemError> {
    let bytes = source.fetch_item(id, ItemKind::Comment).await?;
    let mut comment: Comment = decode(&bytes)?;
    comment.text = sanitize::render(&comment.text)?;
    Ok(comment)
}

async fn load_story<S: ItemSource>(source: &S, id: ItemId) -> Result<Story, ItemError> {
    let bytes = source.fetch_item(id, ItemKind::Post).await?;
    Ok(decode(&bytes)?)
}

/// Run `load` for each distinct id and return `(id, outcome)` pairs in
/// first-occurrence order, after all loads have finished.
async fn fan_out<T, E, F, Fut>(
    ids: &[ItemId],
    concurrency: Option<usize>,
    load: F,
) -> Vec<(ItemId, Result<T, E>)>
where
    F: Fn(ItemId) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut seen = HashSet::with_capacity(ids.len());
    let unique: Vec<ItemId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.is_empty() {
        return Vec::new();
    }

    let limit = concurrency.unwrap_or(unique.len()).max(1);

    // Completion order; each task owns its key so there are no write conflicts
    let mut by_id: HashMap<ItemId, Result<T, E>> = stream::iter(unique.clone())
        .map(|id| {
            let task = load(id);
            async move { (id, task.await) }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    unique
        .into_iter()
        .filter_map(|id| by_id.remove(&id).map(|outcome| (id, outcome)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeSource;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ids_of(comments: &[Comment]) -> Vec<CommentId> {
        comments.iter().map(|c| c.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_follows_input_not_completion() {
        // Later ids finish first
        let source = FakeSource::new()
            .comment(1, 300, "one")
            .comment(2, 200, "two")
            .comment(3, 100, "three");

        let comments = aggregate(&source, &[1, 2, 3], None).await;
        assert_eq!(ids_of(&comments), vec![1, 2, 3]);
        assert_eq!(comments[0].text, "one");
        assert_eq!(comments[2].author, "user3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_omitted() {
        let source = FakeSource::new()
            .comment(111, 30, "a")
            .status(222, 10, 500)
            .comment(333, 20, "c");

        let report = aggregate_report(&source, &[111, 222, 333], None).await;
        assert_eq!(ids_of(&report.comments), vec![111, 333]);
        assert_eq!(report.failed_ids(), vec![222]);
        assert!(matches!(
            report.failures[0].1,
            ItemError::Fetch(FetchError::HttpStatus(500))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_isolation_matches_aggregate_without_it() {
        let source = FakeSource::new()
            .comment(1, 50, "a")
            .body(2, 10, r#"{"id": 2, "deleted": true}"#)
            .comment(3, 5, "c")
            .comment(4, 40, "d");

        let with_bad = aggregate(&source, &[1, 2, 3, 4], None).await;
        let without = aggregate(&source, &[1, 3, 4], None).await;
        assert_eq!(with_bad, without);
    }

    #[tokio::test]
    async fn test_decode_and_sanitize_failures_reported() {
        let source = FakeSource::new()
            .body(1, 0, "not json")
            .comment(2, 0, "bad &#xD800; entity")
            .comment(3, 0, "fine");

        let report = aggregate_report(&source, &[1, 2, 3], None).await;
        assert_eq!(ids_of(&report.comments), vec![3]);
        assert!(matches!(report.failures[0], (1, ItemError::Decode(_))));
        assert!(matches!(report.failures[1], (2, ItemError::Sanitize(_))));
    }

    #[tokio::test]
    async fn test_text_is_sanitized() {
        let source = FakeSource::new().comment(7, 0, "a &amp; b<p><i>c</i>");
        let comments = aggregate(&source, &[7], None).await;
        assert_eq!(comments[0].text, "a & b\n\n*c*");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let source = FakeSource::new();
        let report = aggregate_report(&source, &[], None).await;
        assert!(report.comments.is_empty());
        assert!(report.failures.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_fetched_once() {
        let source = FakeSource::new().comment(1, 0, "a").comment(2, 0, "b");
        let comments = aggregate(&source, &[2, 1, 2], None).await;
        assert_eq!(ids_of(&comments), vec![2, 1]);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_launches_everything_at_once() {
        let mut source = FakeSource::new();
        let ids: Vec<CommentId> = (1..=25).collect();
        for &id in &ids {
            source = source.comment(id, 100, "x");
        }

        aggregate(&source, &ids, None).await;
        assert_eq!(source.max_in_flight(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_respected() {
        let mut source = FakeSource::new();
        let ids: Vec<CommentId> = (1..=25).collect();
        for &id in &ids {
            source = source.comment(id, 100 - id, "x");
        }

        let comments = aggregate(&source, &ids, Some(4)).await;
        assert_eq!(source.max_in_flight(), 4);
        assert_eq!(ids_of(&comments), ids);
    }

    #[tokio::test]
    async fn test_zero_cap_treated_as_one() {
        let source = FakeSource::new().comment(1, 0, "a").comment(2, 0, "b");
        let comments = aggregate(&source, &[1, 2], Some(0)).await;
        assert_eq!(ids_of(&comments), vec![1, 2]);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_stories_in_rank_order() {
        let source = FakeSource::new()
            .body(9, 30, r#"{"id": 9, "title": "Nine", "url": "https://nine.example"}"#)
            .body(3, 10, r#"{"id": 3, "title": "Three"}"#)
            .status(5, 0, 404)
            .body(7, 20, r#"{"id": 7, "title": "Seven"}"#);

        let stories = top_stories(&source, &[9, 3, 5, 7], None).await;
        let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Nine", "Three", "Seven"]);
        assert!(source.calls().iter().all(|(_, kind)| *kind == ItemKind::Post));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_order_invariant_under_random_delays(
            delays in proptest::collection::vec(0u64..500, 1..30),
            failing in proptest::collection::vec(any::<bool>(), 30),
        ) {
            let ids: Vec<CommentId> = (0..delays.len() as u64).map(|i| 1000 + i * 7).collect();
            let mut source = FakeSource::new();
            for (i, (&id, &delay)) in ids.iter().zip(&delays).enumerate() {
                source = if failing[i] {
                    source.status(id, delay, 503)
                } else {
                    source.comment(id, delay, "body")
                };
            }

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let comments = runtime.block_on(aggregate(&source, &ids, None));

            let expected: Vec<CommentId> = ids
                .iter()
                .enumerate()
                .filter(|(i, _)| !failing[*i])
                .map(|(_, id)| *id)
                .collect();
            prop_assert_eq!(ids_of(&comments), expected);
        }
    }
}
