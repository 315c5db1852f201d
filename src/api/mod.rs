//! HTTP access to the Hacker News JSON API.
//!
//! - [`ItemSource`] - the seam the pipeline fetches through; one GET per item
//! - [`HnClient`] - the `reqwest`-backed implementation
//!
//! Every item kind is served from `/item/{id}.json`; the story listing from
//! `/topstories.json`. Requests are single-shot: there are no retries at this
//! layer, and callers decide what a failure means for them.

mod client;

pub use client::{ClientError, FetchError, HnClient, ItemSource, DEFAULT_BASE_URL};
