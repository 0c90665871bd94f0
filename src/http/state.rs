//! Application state and configuration for the receiver.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cases::ReceiverBehavior;
use crate::storage::BatchStore;

/// Write rejection settings for retry scenarios.
///
/// Counts requests across all handler tasks so exactly the first `reject_first`
/// writes are refused, no matter how many connections the sender opens.
#[derive(Clone, Default)]
pub struct RejectConfig {
    /// Number of leading write requests to refuse
    pub reject_first: usize,
    /// Write requests seen so far
    seen: Arc<AtomicUsize>,
}

impl RejectConfig {
    /// Create a new rejection configuration.
    ///
    /// # Parameters
    ///
    /// - `reject_first` - Number of leading write requests answered with `500`
    pub fn new(reject_first: usize) -> Self {
        Self { reject_first, seen: Arc::new(AtomicUsize::new(0)) }
    }

    /// Register an incoming write and decide whether to refuse it.
    ///
    /// # Returns
    ///
    /// Returns `true` if the request is one of the first `reject_first` writes.
    pub fn should_reject(&self) -> bool {
        self.seen.fetch_add(1, Ordering::SeqCst) < self.reject_first
    }

    /// Number of write requests seen so far.
    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Batches received during the current test case
    pub batches: Arc<dyn BatchStore>,
    /// Fault injection for retry scenarios
    pub reject: RejectConfig,
}

impl AppState {
    /// Create new application state.
    ///
    /// # Parameters
    ///
    /// - `batches` - Store receiving decoded batches
    /// - `behavior` - How the receiver treats writes for the current case
    ///
    /// # Returns
    ///
    /// Returns configured `AppState` instance.
    pub fn new(batches: Arc<dyn BatchStore>, behavior: ReceiverBehavior) -> Self {
        Self { batches, reject: RejectConfig::new(behavior.reject_first) }
    }

    /// Get a builder for configuring application state step by step.
    ///
    /// # Returns
    ///
    /// Returns an `AppStateBuilder` for fluent configuration.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

/// Builder for constructing AppState with fluent interface.
#[derive(Default)]
pub struct AppStateBuilder {
    batches: Option<Arc<dyn BatchStore>>,
    behavior: Option<ReceiverBehavior>,
}

impl AppStateBuilder {
    /// Create a new builder with default values.
    ///
    /// # Returns
    ///
    /// Returns a new `AppStateBuilder` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch store.
    ///
    /// # Parameters
    ///
    /// - `batches` - Store to append decoded batches to
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_batches(mut self, batches: Arc<dyn BatchStore>) -> Self {
        self.batches = Some(batches);
        self
    }

    /// Set the receiver behavior of the running case.
    ///
    /// # Parameters
    ///
    /// - `behavior` - Rejection settings
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_behavior(mut self, behavior: ReceiverBehavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Build the final AppState with validation.
    ///
    /// # Errors
    ///
    /// Returns error if no batch store is provided.
    pub fn build(self) -> io::Result<AppState> {
        let batches = self.batches.ok_or(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Batch store is required for AppState",
        ))?;

        Ok(AppState::new(batches, self.behavior.unwrap_or_default()))
    }
}
