//! Chat message routing.
//!
//! For each message:
//!
//! 1. Resolve the locale from the session (first accepted language, primary
//!    subtag, default `en`).
//! 2. Try the trigger cache in the message's context. A hit is answered from
//!    the cached script and never reaches the linguistic service.
//! 3. Otherwise decode the text. A decode failure aborts the message.
//! 4. Branch on the discourse type: statements are committed to the authority
//!    and restated; queries and themes pass through; anything else is
//!    returned as decoded.

use std::sync::Arc;

use shard::{
    gsl, ChatSession, DiscourseType, LinguisticError, LinguisticService, Locale, Message,
    TriggerCache,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::commit::{CommitError, CommitForwarder};

/// Why a chat message produced no reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The linguistic service could not decode the input.
    #[error("Failed to decode message: {0}")]
    Decode(#[source] LinguisticError),

    /// The committed statement could not be encoded back to text.
    #[error("Failed to encode restatement: {0}")]
    Encode(#[source] LinguisticError),

    /// A statement arrived on a session with no registered user.
    #[error("Statement requires an identified user")]
    AnonymousStatement,

    /// The authority did not accept the statement.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Routes chat messages through the trigger cache or the linguistic service.
#[derive(Clone)]
pub struct MessageRouter {
    cache: Arc<TriggerCache>,
    linguistic: Arc<dyn LinguisticService>,
    forwarder: CommitForwarder,
}

impl MessageRouter {
    pub fn new(
        cache: Arc<TriggerCache>,
        linguistic: Arc<dyn LinguisticService>,
        forwarder: CommitForwarder,
    ) -> Self {
        Self {
            cache,
            linguistic,
            forwarder,
        }
    }

    /// Produces the reply for one message.
    #[instrument(skip_all, fields(ctx = %message.context()))]
    pub async fn process(
        &self,
        session: &ChatSession,
        mut message: Message,
    ) -> Result<Message, MessageError> {
        let locale = session.locale();
        message.lang = locale.to_string();
        message.user_id = session.user_id.clone();

        if let Some(reply) = self.cache.lookup(&message.context(), &message.input, &locale) {
            debug!(script = %reply.script, "Answered from trigger cache");
            message.apply_reply(reply);
            return Ok(message);
        }

        let decoded = self
            .linguistic
            .decode(&message.input, &locale)
            .await
            .map_err(|err| {
                warn!(error = %err, "Decode failed");
                MessageError::Decode(err)
            })?;
        message.discourse = DiscourseType::parse(&decoded.discourse_type);
        message.interp = decoded.graph;

        match message.discourse {
            DiscourseType::Stm => self.commit_statement(session, &locale, &mut message).await?,
            DiscourseType::Query | DiscourseType::Theme => {
                debug!(discourse = %message.discourse, interp = %message.interp, "Passing decoded message through");
            }
            DiscourseType::Unclassified => {
                debug!(raw = %decoded.discourse_type, "No action for discourse type");
            }
        }
        Ok(message)
    }

    async fn commit_statement(
        &self,
        session: &ChatSession,
        locale: &Locale,
        message: &mut Message,
    ) -> Result<(), MessageError> {
        let user_id = session
            .user_id
            .as_ref()
            .ok_or(MessageError::AnonymousStatement)?;
        let task = gsl::statement_task(user_id, &message.interp);
        let committed = self.forwarder.forward(&task).await?;
        info!(user = %user_id, "Statement committed");

        message.restatement = self
            .linguistic
            .encode(&committed, locale)
            .await
            .map_err(MessageError::Encode)?;
        Ok(())
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("phrases", &self.cache.phrase_count())
            .finish_non_exhaustive()
    }
}
