//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

use crate::domain::entities::NewClick;

/// A resolved redirect waiting to be written to the click ledger.
///
/// Created by [`crate::application::services::LinkService::resolve`] after the
/// cache hit and handed to [`crate::domain::click_worker::run_click_worker`]
/// through a bounded channel, so the redirect never waits on the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub token: String,
    pub ip_address: String,
    pub clicked_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates an event stamped with the current time.
    pub fn new(token: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ip_address: ip_address.into(),
            clicked_at: Utc::now(),
        }
    }
}

impl From<ClickEvent> for NewClick {
    fn from(event: ClickEvent) -> Self {
        NewClick {
            token: event.token,
            ip_address: event.ip_address,
            clicked_at: event.clicked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_event_creation() {
        let before = Utc::now();
        let event = ClickEvent::new("0a1b2c3d", "192.168.1.1");

        assert_eq!(event.token, "0a1b2c3d");
        assert_eq!(event.ip_address, "192.168.1.1");
        assert!(event.clicked_at >= before);
    }

    #[test]
    fn test_into_new_click_keeps_timestamp() {
        let event = ClickEvent::new("0a1b2c3d", "10.0.0.1");
        let at = event.clicked_at;

        let click: NewClick = event.into();

        assert_eq!(click.token, "0a1b2c3d");
        assert_eq!(click.ip_address, "10.0.0.1");
        assert_eq!(click.clicked_at, at);
    }
}
