//! Publishes core match notices onto the [`EventBus`].

use std::sync::Arc;

use troth_core::matching::{MatchNotice, MatchNotifier};
use troth_core::types::DbId;

use crate::bus::{EventBus, PlatformEvent};

/// [`MatchNotifier`] that turns each notice into a [`PlatformEvent`].
#[derive(Clone)]
pub struct EventBusNotifier {
    bus: Arc<EventBus>,
}

impl EventBusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl MatchNotifier for EventBusNotifier {
    fn notify(&self, notice: MatchNotice) {
        match to_event(&notice) {
            Ok(event) => self.bus.publish(event),
            Err(e) => tracing::error!(
                error = %e,
                event_type = notice.event_type(),
                "Failed to encode match notice"
            ),
        }
    }
}

/// Build the bus envelope for a notice. The full notice is the payload.
pub fn to_event(notice: &MatchNotice) -> Result<PlatformEvent, serde_json::Error> {
    let (entity_type, entity_id, actor) = provenance(notice);
    Ok(PlatformEvent::new(notice.event_type(), notice.recipient())
        .with_source(entity_type, entity_id)
        .with_actor(actor)
        .with_payload(serde_json::to_value(notice)?))
}

/// Source entity and acting user of a notice.
fn provenance(notice: &MatchNotice) -> (&'static str, DbId, DbId) {
    use MatchNotice as N;

    match *notice {
        N::RequestReceived {
            request_id,
            from_id,
            ..
        }
        | N::RequestWithdrawn {
            request_id,
            from_id,
            ..
        } => ("connection_request", request_id, from_id),
        N::RequestAccepted {
            request_id, to_id, ..
        }
        | N::RequestDeclined {
            request_id, to_id, ..
        } => ("connection_request", request_id, to_id),
        N::LockWithdrawn {
            lock_id,
            withdrawn_by: actor,
            ..
        }
        | N::MarriageConfirmationRequested {
            lock_id,
            notifier_id: actor,
            ..
        }
        | N::MarriageConfirmed {
            lock_id,
            confirmed_by: actor,
            ..
        }
        | N::MarriageDeclined {
            lock_id,
            declined_by: actor,
            ..
        }
        | N::RejectConfirmationRequested {
            lock_id,
            rejector_id: actor,
            ..
        }
        | N::RejectConfirmed {
            lock_id,
            confirmed_by: actor,
            ..
        }
        | N::RejectCancelled {
            lock_id,
            cancelled_by: actor,
            ..
        } => ("lock", lock_id, actor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notice_is_published_to_its_recipient() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let notifier = EventBusNotifier::new(bus.clone());

        notifier.notify(MatchNotice::RequestReceived {
            request_id: 11,
            from_id: 1,
            to_id: 2,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "request.received");
        assert_eq!(event.recipient_user_id, 2);
        assert_eq!(event.actor_user_id, Some(1));
        assert_eq!(event.source_entity_type.as_deref(), Some("connection_request"));
        assert_eq!(event.source_entity_id, Some(11));
        assert_eq!(event.payload["type"], "request.received");
    }

    #[test]
    fn lock_notices_name_the_acting_party() {
        let event = to_event(&MatchNotice::RejectConfirmationRequested {
            lock_id: 5,
            rejector_id: 3,
            counterpart_id: 4,
        })
        .unwrap();
        assert_eq!(event.recipient_user_id, 4);
        assert_eq!(event.actor_user_id, Some(3));
        assert_eq!(event.source_entity_type.as_deref(), Some("lock"));
        assert_eq!(event.payload["rejector_id"], 3);
    }

    #[test]
    fn accepted_request_comes_from_the_recipient_of_the_request() {
        let event = to_event(&MatchNotice::RequestAccepted {
            request_id: 8,
            lock_id: 9,
            from_id: 1,
            to_id: 2,
        })
        .unwrap();
        assert_eq!(event.recipient_user_id, 1);
        assert_eq!(event.actor_user_id, Some(2));
    }
}
