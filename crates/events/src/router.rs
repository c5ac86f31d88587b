//! Event-to-notification routing.
//!
//! [`NotificationRouter`] subscribes to the bus, works out who should hear
//! about each event and writes one `notifications` row per recipient.

use propdesk_core::types::DbId;
use propdesk_db::models::notification::CreateNotification;
use propdesk_db::repositories::{
    InspectionRepo, JobRepo, NotificationRepo, ServiceRequestRepo, SubscriptionRepo,
};
use propdesk_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::types::*;

pub struct NotificationRouter {
    pool: DbPool,
}

impl NotificationRouter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Consume events until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route one event. Returns the number of notifications written.
    pub async fn route(&self, event: &PlatformEvent) -> Result<usize, sqlx::Error> {
        let Some((title, body)) = notification_text(event) else {
            tracing::debug!(event_type = %event.event_type, "No notification for event type");
            return Ok(0);
        };

        let recipients = self.recipients(event).await?;
        for &user_id in &recipients {
            NotificationRepo::create(
                &self.pool,
                &CreateNotification {
                    user_id,
                    event_type: event.event_type.clone(),
                    title: title.clone(),
                    body: body.clone(),
                    entity_type: event.source_entity_type.clone(),
                    entity_id: event.source_entity_id,
                },
            )
            .await?;
        }

        if !recipients.is_empty() {
            tracing::debug!(
                event_type = %event.event_type,
                recipients = recipients.len(),
                "Notifications created"
            );
        }
        Ok(recipients.len())
    }

    /// Resolve recipients from the source entity. An event without a source
    /// id, or whose entity has no one to notify, yields nobody.
    async fn recipients(&self, event: &PlatformEvent) -> Result<Vec<DbId>, sqlx::Error> {
        let Some(entity_id) = event.source_entity_id else {
            return Ok(Vec::new());
        };

        let pool = &self.pool;
        let recipient = match event.event_type.as_str() {
            SERVICE_REQUEST_SUBMITTED => {
                ServiceRequestRepo::property_manager_of(pool, entity_id).await?
            }
            SERVICE_REQUEST_REVIEWED => ServiceRequestRepo::requester_of(pool, entity_id).await?,
            JOB_ASSIGNED => JobRepo::assignee_of(pool, entity_id).await?,
            JOB_COMPLETED => JobRepo::property_manager_of(pool, entity_id).await?,
            INSPECTION_SCHEDULED => InspectionRepo::unit_tenant_of(pool, entity_id).await?,
            SUBSCRIPTION_CHANGED => SubscriptionRepo::owner_of(pool, entity_id).await?,
            _ => None,
        };
        Ok(recipient.into_iter().collect())
    }
}

/// Title and body for an event, or `None` for event types that do not
/// notify anyone.
pub fn notification_text(event: &PlatformEvent) -> Option<(String, Option<String>)> {
    let subject = event.payload_str("title").map(str::to_string);
    let status = event.payload_str("status");

    let title = match event.event_type.as_str() {
        SERVICE_REQUEST_SUBMITTED => "New service request".to_string(),
        SERVICE_REQUEST_REVIEWED => match status {
            Some(s) => format!("Service request {}", s.to_lowercase().replace('_', " ")),
            None => "Service request reviewed".to_string(),
        },
        JOB_ASSIGNED => "Job assigned to you".to_string(),
        JOB_COMPLETED => "Job completed".to_string(),
        INSPECTION_SCHEDULED => "Inspection scheduled".to_string(),
        SUBSCRIPTION_CHANGED => {
            return Some((
                "Subscription updated".to_string(),
                event
                    .payload_str("plan")
                    .map(|plan| format!("Your plan is now {plan}")),
            ));
        }
        _ => return None,
    };
    Some((title, subject))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn review_title_includes_outcome() {
        let event = PlatformEvent::new(SERVICE_REQUEST_REVIEWED)
            .with_payload(json!({"title": "Broken heater", "status": "APPROVED"}));
        let (title, body) = notification_text(&event).unwrap();
        assert_eq!(title, "Service request approved");
        assert_eq!(body.as_deref(), Some("Broken heater"));
    }

    #[test]
    fn subscription_body_names_plan() {
        let event =
            PlatformEvent::new(SUBSCRIPTION_CHANGED).with_payload(json!({"plan": "professional"}));
        let (_, body) = notification_text(&event).unwrap();
        assert_eq!(body.as_deref(), Some("Your plan is now professional"));
    }

    #[test]
    fn unknown_events_are_silent() {
        assert!(notification_text(&PlatformEvent::new("property.created")).is_none());
    }
}
