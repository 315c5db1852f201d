//! In-memory [`ItemSource`] for driving the pipeline without a network.

use crate::api::{FetchError, ItemSource};
use crate::model::{ItemId, ItemKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

/// Serves canned bodies after per-id delays and records what was asked.
#[derive(Default)]
pub(crate) struct FakeSource {
    items: HashMap<ItemId, (Duration, Canned)>,
    calls: Mutex<Vec<(ItemId, ItemKind)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn body(mut self, id: ItemId, delay_ms: u64, body: impl Into<String>) -> Self {
        self.items.insert(
            id,
            (Duration::from_millis(delay_ms), Canned::Body(body.into())),
        );
        self
    }

    /// A well-formed comment whose text is `text`.
    pub(crate) fn comment(self, id: ItemId, delay_ms: u64, text: &str) -> Self {
        let body = serde_json::json!({
            "id": id,
            "by": format!("user{id}"),
            "text": text,
            "time": 1_685_900_000 + id as i64,
            "type": "comment",
        });
        self.body(id, delay_ms, body.to_string())
    }

    pub(crate) fn post(self, id: ItemId, kids: &[ItemId]) -> Self {
        let body = serde_json::json!({ "id": id, "kids": kids, "type": "story" });
        self.body(id, 0, body.to_string())
    }

    pub(crate) fn status(mut self, id: ItemId, delay_ms: u64, status: u16) -> Self {
        self.items.insert(
            id,
            (Duration::from_millis(delay_ms), Canned::Status(status)),
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<(ItemId, ItemKind)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ItemSource for FakeSource {
    async fn fetch_item(&self, id: ItemId, kind: ItemKind) -> Result<Vec<u8>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((id, kind));
        }
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let (delay, canned) = self
            .items
            .get(&id)
            .cloned()
            .unwrap_or((Duration::ZERO, Canned::Status(404)));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match canned {
            Canned::Body(body) => Ok(body.into_bytes()),
            Canned::Status(status) => Err(FetchError::HttpStatus(status)),
        }
    }
}
