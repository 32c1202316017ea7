//! Progress sink adapter: publishes round-lifecycle events onto the shared
//! in-memory event bus.

use crate::ports::outbound::ProgressSink;
use async_trait::async_trait;
use shared_bus::{EventPublisher, InMemoryEventBus, MiningEvent};
use std::sync::Arc;

/// Progress sink backed by [`shared_bus::InMemoryEventBus`]. Publishing
/// never fails: a bus with no subscribers is a normal, silent no-op.
pub struct EventBusProgressSink {
    bus: Arc<InMemoryEventBus>,
}

impl EventBusProgressSink {
    /// Wrap an existing bus so other subscribers (a TUI, a log adapter)
    /// can share it with the engine.
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ProgressSink for EventBusProgressSink {
    async fn publish(&self, event: MiningEvent) {
        self.bus.publish(event).await;
    }
}
