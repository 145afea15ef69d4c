//! Shared in-flight loads
//!
//! A ticket wraps one backend load in a [`Shared`] future. Every caller that
//! asks for the same id while the load is running clones the completion and
//! awaits it, so the backend is called once and all callers see the same
//! outcome.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::asset::Asset;
use crate::error::AssetError;
use crate::types::{AssetKind, Priority};

/// Outcome every joined caller observes
pub type LoadOutcome = Result<Asset, AssetError>;

/// Completion handle shared by every waiter of a ticket
pub type LoadCompletion = Shared<BoxFuture<'static, LoadOutcome>>;

/// One in-flight load
pub struct LoadTicket {
    pub priority: Priority,
    pub kind: Option<AssetKind>,
    pub started: Instant,
    completion: LoadCompletion,
}

impl LoadTicket {
    pub fn new(
        priority: Priority,
        kind: Option<AssetKind>,
        load: BoxFuture<'static, LoadOutcome>,
    ) -> Self {
        Self {
            priority,
            kind,
            started: Instant::now(),
            completion: load.shared(),
        }
    }

    /// Attach another waiter
    pub fn join(&self) -> LoadCompletion {
        self.completion.clone()
    }
}

impl std::fmt::Debug for LoadTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadTicket")
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .field("started", &self.started)
            .finish()
    }
}
