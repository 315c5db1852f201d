//! Hacker News comment threads, fetched concurrently and rendered as markdown.
//!
//! The pipeline for one story:
//!
//! 1. [`api::ItemSource`] fetches the story and reads its `kids`
//! 2. [`thread::aggregate`] fetches every comment at once, decodes it and
//!    runs its body through [`sanitize::render`]
//! 3. Results come back in `kids` order no matter which request finished
//!    first; comments that fail anywhere along the way are left out
//! 4. [`session::Session`] holds the result plus which comments the reader
//!    has collapsed

pub mod api;
pub mod config;
pub mod model;
pub mod sanitize;
pub mod session;
pub mod thread;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_helpers;
