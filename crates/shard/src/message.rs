//! A single chat turn.
//!
//! Built from the request's query parameters, filled in by the message router,
//! serialised back as the response body, then discarded.

use serde::{Deserialize, Serialize};

use crate::trigger_cache::{CacheReply, MenuItem};
use crate::{ContextId, DiscourseType, UserId};

/// One chat message and everything the gateway produced for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// User the message belongs to.
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Conversation context; empty means the initial context.
    #[serde(default)]
    pub ctx: String,
    #[serde(default)]
    pub discourse: DiscourseType,
    #[serde(default)]
    pub lang: String,
    /// Free-text input.
    #[serde(rename = "t")]
    pub input: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    /// Natural-language restatement of what was committed.
    #[serde(rename = "restate", default, skip_serializing_if = "String::is_empty")]
    pub restatement: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(rename = "geo", default, skip_serializing_if = "Vec::is_empty")]
    pub geo_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub quest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub menu: Vec<MenuItem>,
    /// Raw graph interpretation returned by the linguistic service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interp: String,
}

impl Message {
    /// Creates a message in `ctx` with the given input.
    pub fn new(ctx: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            ctx: ctx.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    /// Context the message was sent in, defaulting to the initial context.
    pub fn context(&self) -> ContextId {
        ContextId::new(self.ctx.trim()).unwrap_or_else(ContextId::initial)
    }

    /// Copies a cached reply into the message's output fields.
    pub fn apply_reply(&mut self, reply: CacheReply) {
        self.body = reply.body;
        self.quest = reply.quest;
        self.menu = reply.menu;
        self.resources = reply.resources;
        self.geo_tags = reply.geo_tags;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_context_means_initial_context() {
        assert_eq!(Message::new("", "hi").context(), ContextId::initial());
        assert_eq!(Message::new(" quiz ", "hi").context().as_str(), "quiz");
    }

    #[test]
    fn empty_outputs_are_not_serialised() {
        let json = serde_json::to_value(Message::new("init", "hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ctx": "init",
                "discourse": "unclassified",
                "lang": "",
                "t": "hi"
            })
        );
    }

    #[test]
    fn query_parameters_deserialise_into_message() {
        let message: Message = serde_json::from_str(r#"{ "t": "hello", "ctx": "quiz" }"#).unwrap();
        assert_eq!(message.input, "hello");
        assert_eq!(message.ctx, "quiz");
        assert_eq!(message.discourse, DiscourseType::Unclassified);
    }
}
