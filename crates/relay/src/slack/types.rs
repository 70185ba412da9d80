//! Slack wire types.
//!
//! Outbound: the subset of Block Kit used by error reports, plus the
//! `chat.postMessage` request and response. Inbound: the Events API
//! envelope and the message events the relay reacts to.
//!
//! See: <https://api.slack.com/block-kit> and <https://api.slack.com/apis/events-api>

use chatops_core::{ChannelId, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Block Kit
// =============================================================================

/// Block Kit block types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Header block with large plain text.
    Header { text: Text },
    /// Section block with a text body, a two-column field grid, or both.
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Text>>,
    },
    /// Context block with small muted text.
    Context { elements: Vec<Text> },
    /// Divider block (horizontal line).
    Divider,
}

impl Block {
    /// Header block.
    #[must_use]
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header {
            text: Text::plain(text),
        }
    }

    /// Section with a single markdown body.
    #[must_use]
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Some(Text::mrkdwn(text)),
            fields: None,
        }
    }

    /// Section laid out as a grid of markdown fields.
    #[must_use]
    pub fn fields(fields: impl IntoIterator<Item = String>) -> Self {
        Self::Section {
            text: None,
            fields: Some(fields.into_iter().map(Text::mrkdwn).collect()),
        }
    }

    /// Context line with a single markdown element.
    #[must_use]
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![Text::mrkdwn(text)],
        }
    }
}

/// Text object types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String, emoji: bool },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a plain text object.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    /// The raw text content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

// =============================================================================
// Outbound messages
// =============================================================================

/// A message ready for delivery: plain text or blocks, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Plain text message.
    Text(String),
    /// Block Kit message.
    Blocks(Vec<Block>),
}

impl OutboundMessage {
    /// Whether this message carries blocks.
    #[must_use]
    pub const fn is_blocks(&self) -> bool {
        matches!(self, Self::Blocks(_))
    }
}

/// `chat.postMessage` request body.
#[derive(Debug, Serialize)]
pub struct PostMessage<'a> {
    /// Channel ID to post to.
    pub channel: &'a str,
    /// Plain text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    /// Block Kit body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<&'a [Block]>,
}

impl<'a> PostMessage<'a> {
    /// Build the request body for a message.
    #[must_use]
    pub fn new(channel: &'a ChannelId, message: &'a OutboundMessage) -> Self {
        let (text, blocks) = match message {
            OutboundMessage::Text(text) => (Some(text.as_str()), None),
            OutboundMessage::Blocks(blocks) => (None, Some(blocks.as_slice())),
        };
        Self {
            channel: channel.as_str(),
            text,
            blocks,
        }
    }
}

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error code if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Successful delivery receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Channel the message landed in, as reported by Slack.
    pub channel: Option<String>,
    /// Timestamp of the posted message.
    pub ts: Option<String>,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
}

// =============================================================================
// Events API
// =============================================================================

/// Outer envelope of an Events API request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Endpoint ownership check sent when the request URL is configured.
    UrlVerification {
        #[serde(default)]
        challenge: Option<String>,
    },
    /// A subscribed event occurred.
    EventCallback {
        #[serde(default)]
        event: Option<EventPayload>,
    },
    /// Any other envelope type (`app_rate_limited`, ...).
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Message subtype (`bot_message`, `message_changed`, ...).
    #[serde(default)]
    pub subtype: Option<String>,
    /// User who sent the message.
    #[serde(default)]
    pub user: Option<UserId>,
    /// Channel the message was sent in.
    #[serde(default)]
    pub channel: Option<ChannelId>,
    /// Message text.
    #[serde(default)]
    pub text: String,
    /// Message timestamp.
    #[serde(default)]
    pub ts: Option<String>,
    /// Set when the message was posted by a bot (including this one).
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl EventPayload {
    /// Whether the message came from a bot.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }

    /// Whether this is a new message written by a person.
    ///
    /// Edits, deletions, joins and other system subtypes are not.
    #[must_use]
    pub fn is_user_authored(&self) -> bool {
        !self.is_bot()
            && self
                .subtype
                .as_deref()
                .is_none_or(|subtype| USER_SUBTYPES.contains(&subtype))
    }
}

/// Message subtypes that still carry a person's new message.
const USER_SUBTYPES: &[&str] = &["thread_broadcast", "file_share", "me_message"];

/// Event types the relay distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A message posted to a channel the bot is in.
    Message,
    /// A message mentioning the bot.
    AppMention,
    /// Anything else.
    #[serde(other)]
    Other,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_message_text_only() {
        let channel = ChannelId::new("C123");
        let message = OutboundMessage::Text("hello".to_string());
        let json = serde_json::to_value(PostMessage::new(&channel, &message)).unwrap();

        assert_eq!(json, json!({"channel": "C123", "text": "hello"}));
    }

    #[test]
    fn test_post_message_blocks_only() {
        let channel = ChannelId::new("C123");
        let message = OutboundMessage::Blocks(vec![Block::header("Title"), Block::Divider]);
        let json = serde_json::to_value(PostMessage::new(&channel, &message)).unwrap();

        assert!(json.get("text").is_none());
        assert_eq!(json["blocks"][0]["type"], "header");
        assert_eq!(json["blocks"][0]["text"]["type"], "plain_text");
        assert_eq!(json["blocks"][1], json!({"type": "divider"}));
    }

    #[test]
    fn test_section_serialization() {
        let json = serde_json::to_value(Block::section("*bold*")).unwrap();
        assert_eq!(
            json,
            json!({"type": "section", "text": {"type": "mrkdwn", "text": "*bold*"}})
        );

        let json = serde_json::to_value(Block::fields(["a".to_string(), "b".to_string()])).unwrap();
        assert!(json.get("text").is_none());
        assert_eq!(json["fields"][1]["text"], "b");
    }

    #[test]
    fn test_outbound_message_kind_tag() {
        let json = serde_json::to_value(OutboundMessage::Text("hi".to_string())).unwrap();
        assert_eq!(json, json!({"kind": "text", "body": "hi"}));
    }

    #[test]
    fn test_parse_url_verification() {
        let event: InboundEvent = serde_json::from_value(json!({
            "token": "Jhj5dZrVaK7ZwHHjRyZWjbDl",
            "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P",
            "type": "url_verification"
        }))
        .unwrap();

        assert!(matches!(
            event,
            InboundEvent::UrlVerification { challenge: Some(c) }
                if c == "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
        ));
    }

    #[test]
    fn test_parse_message_event() {
        let event: InboundEvent = serde_json::from_value(json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {
                "type": "message",
                "user": "U1",
                "channel": "C1",
                "text": "list errors in proj-1",
                "ts": "1700000000.000100"
            }
        }))
        .unwrap();

        let InboundEvent::EventCallback { event: Some(event) } = event else {
            panic!("expected event callback");
        };
        assert_eq!(event.event_type, EventType::Message);
        assert_eq!(event.channel, Some(ChannelId::new("C1")));
        assert_eq!(event.text, "list errors in proj-1");
        assert!(!event.is_bot());
    }

    #[test]
    fn test_bot_messages_detected() {
        let with_bot_id: EventPayload = serde_json::from_value(json!({
            "type": "message", "channel": "C1", "text": "hi", "bot_id": "B1"
        }))
        .unwrap();
        assert!(with_bot_id.is_bot());

        let bot_subtype: EventPayload = serde_json::from_value(json!({
            "type": "message", "subtype": "bot_message", "channel": "C1", "text": "hi"
        }))
        .unwrap();
        assert!(bot_subtype.is_bot());
    }

    #[test]
    fn test_unknown_types_are_tolerated() {
        let envelope: InboundEvent =
            serde_json::from_value(json!({"type": "app_rate_limited", "minute_rate_limited": 1}))
                .unwrap();
        assert!(matches!(envelope, InboundEvent::Other));

        let event: EventPayload =
            serde_json::from_value(json!({"type": "reaction_added", "user": "U1"})).unwrap();
        assert_eq!(event.event_type, EventType::Other);
    }
}
