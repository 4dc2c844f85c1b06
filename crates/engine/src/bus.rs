use tokio::sync::broadcast;

/// Side effects reported by the remote delegate. Consumers (a future UI
/// layer, the CLI) subscribe to refresh their own views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// The delegate created one or more entities on the user's behalf.
    EntitiesCreated { summaries: Vec<String> },
    DocumentGenerated,
    PriorityStreamCreated,
    MilestonesCreated,
}

/// Fire-and-forget broadcast channel for delegate side effects.
///
/// Publishing never fails from the caller's point of view: a send with
/// no live subscribers is dropped silently.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<BusEvent>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: BusEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(16)
    }
}
