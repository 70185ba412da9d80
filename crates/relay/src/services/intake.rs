//! Classification of verified Slack event envelopes.

use chatops_core::{ChannelId, UserId};

use crate::slack::{EventPayload, EventType, InboundEvent};

/// A user message accepted for background processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Channel the reply is posted to.
    pub channel: ChannelId,
    /// Author of the message.
    pub user: Option<UserId>,
    /// Free-text request.
    pub text: String,
    /// Slack timestamp of the message.
    pub ts: Option<String>,
}

/// What the webhook does with an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// Echo the challenge back to Slack.
    Challenge(String),
    /// Acknowledge and process the message in the background.
    Dispatch(Job),
    /// Acknowledge without doing anything.
    Ignore(&'static str),
}

/// Decide how to handle a verified envelope.
///
/// Only new, non-empty, human-authored `message` and `app_mention` events
/// are dispatched.
#[must_use]
pub fn classify(event: InboundEvent) -> Intake {
    match event {
        InboundEvent::UrlVerification {
            challenge: Some(challenge),
        } => Intake::Challenge(challenge),
        InboundEvent::UrlVerification { challenge: None } => {
            Intake::Ignore("url_verification without challenge")
        }
        InboundEvent::EventCallback { event: Some(event) } => classify_event(event),
        InboundEvent::EventCallback { event: None } => Intake::Ignore("event_callback without event"),
        InboundEvent::Other => Intake::Ignore("unhandled envelope type"),
    }
}

fn classify_event(event: EventPayload) -> Intake {
    if !matches!(event.event_type, EventType::Message | EventType::AppMention) {
        return Intake::Ignore("unsubscribed event type");
    }
    if event.is_bot() {
        return Intake::Ignore("bot message");
    }
    if !event.is_user_authored() {
        return Intake::Ignore("system message subtype");
    }
    if event.text.trim().is_empty() {
        return Intake::Ignore("message without text");
    }
    let Some(channel) = event.channel else {
        return Intake::Ignore("message without channel");
    };

    Intake::Dispatch(Job {
        channel,
        user: event.user,
        text: event.text,
        ts: event.ts,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn callback(event: serde_json::Value) -> InboundEvent {
        serde_json::from_value(json!({"type": "event_callback", "event": event})).unwrap()
    }

    #[test]
    fn test_challenge_is_echoed() {
        let event = serde_json::from_value(json!({
            "type": "url_verification",
            "challenge": "abc123"
        }))
        .unwrap();
        assert_eq!(classify(event), Intake::Challenge("abc123".to_string()));
    }

    #[test]
    fn test_message_is_dispatched() {
        let intake = classify(callback(json!({
            "type": "message",
            "user": "U1",
            "channel": "C1",
            "text": "list errors in proj-1",
            "ts": "1700000000.000100"
        })));

        assert_eq!(
            intake,
            Intake::Dispatch(Job {
                channel: ChannelId::new("C1"),
                user: Some(UserId::new("U1")),
                text: "list errors in proj-1".to_string(),
                ts: Some("1700000000.000100".to_string()),
            })
        );
    }

    #[test]
    fn test_app_mention_is_dispatched() {
        let intake = classify(callback(json!({
            "type": "app_mention", "user": "U1", "channel": "C9", "text": "<@B1> hi"
        })));
        assert!(matches!(intake, Intake::Dispatch(job) if job.channel == ChannelId::new("C9")));
    }

    #[test]
    fn test_bot_messages_are_ignored() {
        let with_bot_id = classify(callback(json!({
            "type": "message", "channel": "C1", "text": "🚨 Error Report", "bot_id": "B1"
        })));
        assert_eq!(with_bot_id, Intake::Ignore("bot message"));

        let bot_subtype = classify(callback(json!({
            "type": "message", "subtype": "bot_message", "channel": "C1", "text": "hi"
        })));
        assert_eq!(bot_subtype, Intake::Ignore("bot message"));
    }

    #[test]
    fn test_edits_and_deletions_are_ignored() {
        let edited = classify(callback(json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "C1",
            "hidden": true,
            "message": {"type": "message", "user": "U1", "text": "list errors in proj-2"},
            "previous_message": {"type": "message", "user": "U1", "text": "list errors in proj-1"}
        })));
        assert_eq!(edited, Intake::Ignore("system message subtype"));

        let deleted = classify(callback(json!({
            "type": "message",
            "subtype": "message_deleted",
            "channel": "C1",
            "hidden": true,
            "deleted_ts": "1700000000.000100"
        })));
        assert_eq!(deleted, Intake::Ignore("system message subtype"));

        let joined = classify(callback(json!({
            "type": "message", "subtype": "channel_join", "user": "U2", "channel": "C1",
            "text": "<@U2> has joined the channel"
        })));
        assert_eq!(joined, Intake::Ignore("system message subtype"));
    }

    #[test]
    fn test_blank_messages_are_ignored() {
        for text in [json!(null), json!(""), json!("  \n ")] {
            let mut event = json!({"type": "message", "user": "U1", "channel": "C1"});
            if !text.is_null() {
                event["text"] = text;
            }
            assert_eq!(classify(callback(event)), Intake::Ignore("message without text"));
        }
    }

    #[test]
    fn test_thread_broadcast_is_dispatched() {
        let intake = classify(callback(json!({
            "type": "message", "subtype": "thread_broadcast", "user": "U1", "channel": "C1",
            "text": "list errors in proj-1"
        })));
        assert!(matches!(intake, Intake::Dispatch(_)));
    }

    #[test]
    fn test_other_events_are_ignored() {
        let reaction = classify(callback(json!({"type": "reaction_added", "user": "U1"})));
        assert_eq!(reaction, Intake::Ignore("unsubscribed event type"));

        let no_channel = classify(callback(json!({"type": "message", "user": "U1", "text": "hi"})));
        assert_eq!(no_channel, Intake::Ignore("message without channel"));

        let rate_limited =
            serde_json::from_value(json!({"type": "app_rate_limited", "minute_rate_limited": 1}))
                .unwrap();
        assert_eq!(classify(rate_limited), Intake::Ignore("unhandled envelope type"));

        let empty = serde_json::from_value(json!({"type": "event_callback"})).unwrap();
        assert_eq!(classify(empty), Intake::Ignore("event_callback without event"));
    }
}
