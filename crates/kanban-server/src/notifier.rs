use kanban_domain::BoardEvent;

/// Post-commit change fan-out.
///
/// Delivery is best effort: no acknowledgement, no retry, and a failure to
/// deliver never reaches the operation that produced the event.
#[cfg_attr(test, mockall::automock)]
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: BoardEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, event: BoardEvent) {
        tracing::trace!(kind = ?event.kind, board_id = %event.board_id, "event discarded");
    }
}
