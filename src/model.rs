//! Typed records decoded from the Hacker News item endpoint.
//!
//! The API serves every item (story, comment, job, poll) from the same
//! `/item/{id}.json` shape and includes far more fields than we consume.
//! Unknown fields are ignored by serde; only the fields each record needs
//! are declared, and only the ones a record cannot live without are required.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Server-assigned item id. Stories and comments share one id space.
pub type ItemId = u64;

/// Id of a comment item. Also the key for collapse state.
pub type CommentId = ItemId;

/// What an item fetch is expected to yield.
///
/// Both kinds hit the same endpoint; the kind only labels logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Post,
    Comment,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Post => f.write_str("post"),
            ItemKind::Comment => f.write_str("comment"),
        }
    }
}

/// Malformed or incomplete JSON for the expected record shape.
#[derive(Debug, Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// A story as seen by the comment pipeline: just its ordered child ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Post {
    /// Direct children in server order. Missing or `null` means no comments.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kids: Vec<CommentId>,
}

/// A single comment, before or after sanitizing depending on where it sits.
///
/// Records coming out of [`decode`] carry the raw HTML body; the thread
/// aggregator replaces `text` with the sanitized rendering before a comment
/// is ever handed to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    #[serde(rename = "by")]
    pub author: String,
    /// Unix time in seconds.
    pub time: i64,
}

/// Title line of a story for the top-stories listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Story {
    pub id: ItemId,
    pub title: String,
    /// External link. Absent for Ask HN and text posts.
    #[serde(default)]
    pub url: Option<String>,
}

impl Story {
    /// Where the story points: its external URL, or its discussion page.
    pub fn link(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("https://news.ycombinator.com/item?id={}", self.id),
        }
    }
}

/// Decode raw response bytes into a typed record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CommentId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CommentId>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_with_kids() {
        let post: Post = decode(br#"{"id": 1, "kids": [3, 2, 5], "title": "x"}"#).unwrap();
        assert_eq!(post.kids, vec![3, 2, 5]);
    }

    #[test]
    fn test_post_without_kids_is_empty() {
        let post: Post = decode(br#"{"id": 1, "type": "story"}"#).unwrap();
        assert!(post.kids.is_empty());
    }

    #[test]
    fn test_post_null_kids_is_empty() {
        let post: Post = decode(br#"{"id": 1, "kids": null}"#).unwrap();
        assert!(post.kids.is_empty());
    }

    #[test]
    fn test_post_null_body_is_error() {
        assert!(decode::<Post>(b"null").is_err());
    }

    #[test]
    fn test_comment_full() {
        let comment: Comment = decode(
            br#"{"by":"pg","id":111,"kids":[5],"parent":1,"text":"Hi &amp; bye","time":1685900000,"type":"comment"}"#,
        )
        .unwrap();
        assert_eq!(comment.id, 111);
        assert_eq!(comment.author, "pg");
        assert_eq!(comment.text, "Hi &amp; bye");
        assert_eq!(comment.time, 1685900000);
    }

    #[test]
    fn test_deleted_comment_is_error() {
        // Deleted comments come back without `by` and `text`
        let result = decode::<Comment>(br#"{"id":111,"deleted":true,"time":1685900000}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_comment_wrong_type_is_error() {
        let result = decode::<Comment>(br#"{"id":"111","by":"a","text":"t","time":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(decode::<Comment>(b"{\"id\": 1,").is_err());
    }

    #[test]
    fn test_story_link_falls_back_to_discussion() {
        let story: Story = decode(br#"{"id": 42, "title": "Ask HN: ?"}"#).unwrap();
        assert_eq!(story.link(), "https://news.ycombinator.com/item?id=42");

        let story: Story =
            decode(br#"{"id": 43, "title": "Show", "url": "https://example.com"}"#).unwrap();
        assert_eq!(story.link(), "https://example.com");
    }
}
