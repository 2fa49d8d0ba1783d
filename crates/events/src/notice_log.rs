//! Background subscriber that writes every bus event to the tracing log.

use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Long-lived delivery task. Exits when the bus is dropped.
pub struct NoticeLog;

impl NoticeLog {
    /// Returns the number of events written.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>) -> u64 {
        let mut delivered = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        recipient_user_id = event.recipient_user_id,
                        actor_user_id = ?event.actor_user_id,
                        source_entity_type = ?event.source_entity_type,
                        source_entity_id = ?event.source_entity_id,
                        "Match notice delivered"
                    );
                    delivered += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notice log lagged, some notices were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(delivered, "Event bus closed, notice log shutting down");
                    break;
                }
            }
        }
        delivered
    }
}
