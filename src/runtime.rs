//! Long-poll loop: fetch updates, dispatch each one, deliver the replies.

use crate::dispatch::{Dispatcher, Inbound, InboundKind};
use crate::flows::Reply;
use crate::telegram::{BotApi, TelegramError, Update};
use std::time::Duration;

/// Backoff for retryable poll failures without a server-advertised delay
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Where the replies for one update should land
#[allow(clippy::struct_field_names)] // id suffix is meaningful
struct ReplyContext {
    chat_id: Option<i64>,
    message_id: Option<i64>,
    callback_id: Option<String>,
}

pub struct BotRuntime {
    api: BotApi,
    dispatcher: Dispatcher,
    offset: i64,
    poll_timeout_secs: u64,
    session_ttl: chrono::Duration,
}

impl BotRuntime {
    pub fn new(
        api: BotApi,
        dispatcher: Dispatcher,
        poll_timeout_secs: u64,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            api,
            dispatcher,
            offset: 0,
            poll_timeout_secs,
            session_ttl,
        }
    }

    /// Poll until cancelled. Retryable transport failures back off and
    /// continue; anything else (bad token, revoked bot) aborts.
    pub async fn run(&mut self) -> Result<(), TelegramError> {
        loop {
            self.dispatcher.evict_idle_sessions(self.session_ttl);

            let updates = match self.api.get_updates(self.offset, self.poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(e) if e.kind.is_retryable() => {
                    let delay = e.retry_after.unwrap_or(RETRY_DELAY);
                    tracing::warn!(
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "poll failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            for update in updates {
                self.offset = self.offset.max(update.update_id + 1);
                self.process(update).await;
            }
        }
    }

    /// One update is fully handled, replies delivered, before the next
    async fn process(&mut self, update: Update) {
        let update_id = update.update_id;
        let Some((inbound, context)) = convert(update) else {
            tracing::debug!(update_id, "ignoring update without routable content");
            return;
        };

        for reply in self.dispatcher.handle(&inbound) {
            // A lost reply is not worth crashing or retrying over
            if let Err(e) = self.deliver(&context, reply).await {
                tracing::warn!(update_id, error = %e, "failed to deliver reply");
            }
        }
    }

    async fn deliver(&self, context: &ReplyContext, reply: Reply) -> Result<(), TelegramError> {
        let Some(chat_id) = context.chat_id else {
            if let (Reply::AckCallback { text }, Some(id)) = (&reply, &context.callback_id) {
                return self.api.answer_callback_query(id, text.as_deref()).await;
            }
            tracing::debug!("dropping reply with no destination chat");
            return Ok(());
        };

        match reply {
            Reply::Send { text, markup } => {
                self.api.send_message(chat_id, &text, markup.as_ref()).await
            }
            Reply::Edit { text } => match context.message_id {
                Some(message_id) => {
                    self.api
                        .edit_message_text(chat_id, message_id, &text)
                        .await
                }
                None => self.api.send_message(chat_id, &text, None).await,
            },
            Reply::AckCallback { text } => match &context.callback_id {
                Some(id) => self.api.answer_callback_query(id, text.as_deref()).await,
                None => Ok(()),
            },
        }
    }
}

/// Pull the routable content out of an update. Media messages and other
/// update kinds are dropped here.
fn convert(update: Update) -> Option<(Inbound, ReplyContext)> {
    if let Some(message) = update.message {
        let from = message.from?;
        let text = message.text?;
        let inbound = Inbound {
            telegram_id: from.id,
            username: from.username,
            first_name: Some(from.first_name),
            kind: InboundKind::Text(text),
        };
        let context = ReplyContext {
            chat_id: Some(message.chat.id),
            message_id: None,
            callback_id: None,
        };
        return Some((inbound, context));
    }

    if let Some(callback) = update.callback_query {
        let inbound = Inbound {
            telegram_id: callback.from.id,
            username: callback.from.username,
            first_name: Some(callback.from.first_name),
            // Missing data still gets routed so the button stops spinning
            kind: InboundKind::Callback(callback.data.unwrap_or_default()),
        };
        let context = ReplyContext {
            chat_id: callback.message.as_ref().map(|m| m.chat.id),
            message_id: callback.message.as_ref().map(|m| m.message_id),
            callback_id: Some(callback.id),
        };
        return Some((inbound, context));
    }

    None
}
