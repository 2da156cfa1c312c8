use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::bot::engine::ConversationEngine;
use crate::bot::event::{Action, ActorId, Event, Reply};
use crate::bot::views;
use crate::telegram::{Message, TelegramClient, Update};

const RETRY_DELAY: Duration = Duration::from_secs(3);
/// Rejections queued beyond this are dropped without a reply.
const REJECTION_BACKLOG: usize = 64;

/// One update reduced to what the engine and the reply path need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub actor: ActorId,
    pub chat_id: i64,
    pub callback_id: Option<String>,
    pub event: Event,
}

impl Inbound {
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map_or(query.from.id, |message| message.chat.id);
            let event = query
                .data
                .as_deref()
                .and_then(Action::parse)
                .map_or(Event::Unsupported, Event::Button);
            return Some(Self {
                actor: query.from.id,
                chat_id,
                callback_id: Some(query.id),
                event,
            });
        }

        let message = update.message?;
        let actor = message.from.as_ref()?.id;
        Some(Self {
            actor,
            chat_id: message.chat.id,
            callback_id: None,
            event: message_event(message),
        })
    }
}

fn message_event(message: Message) -> Event {
    if let Some(text) = message.text.as_deref() {
        return Event::from_text(text);
    }
    if let Some(document) = &message.document {
        return Event::Document {
            reference: document.file_id.clone(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.clone(),
        };
    }
    match message.attachment_reference() {
        Some(reference) => Event::Photo {
            reference: reference.to_owned(),
        },
        None => Event::Unsupported,
    }
}

/// Long-polls the Bot API and feeds updates to the engine.
///
/// Each authorized actor gets a worker task fed by a channel, so its updates
/// are handled in arrival order. Everyone else shares one rejection task and
/// never gets a worker or a session.
pub struct Poller {
    client: Arc<TelegramClient>,
    engine: Arc<ConversationEngine>,
    timeout_secs: u64,
    workers: HashMap<ActorId, mpsc::UnboundedSender<Inbound>>,
    rejections: Option<mpsc::Sender<Inbound>>,
}

impl Poller {
    pub fn new(
        client: Arc<TelegramClient>,
        engine: Arc<ConversationEngine>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            engine,
            timeout_secs,
            workers: HashMap::new(),
            rejections: None,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        if let Err(err) = self.client.drop_pending_updates().await {
            tracing::warn!(?err, "failed to drop pending updates");
        }
        tracing::info!(timeout_secs = self.timeout_secs, "polling for updates");

        let mut offset = None;
        loop {
            let updates = match self.client.get_updates(offset, self.timeout_secs).await {
                Ok(updates) => updates,
                Err(err) => {
                    tracing::warn!(?err, "getUpdates failed; retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                offset = Some(update.update_id + 1);
                let update_id = update.update_id;
                match Inbound::from_update(update) {
                    Some(inbound) => self.dispatch(inbound),
                    None => tracing::debug!(update_id, "ignoring update"),
                }
            }
        }
    }

    fn dispatch(&mut self, inbound: Inbound) {
        let actor = inbound.actor;
        if let Err(err) = self.engine.guard().check(actor) {
            tracing::warn!(actor, %err, "rejected update from unauthorized actor");
            self.reject(inbound);
            return;
        }
        let inbound = match self.workers.get(&actor) {
            Some(sender) => match sender.send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::SendError(inbound)) => inbound,
            },
            None => inbound,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(actor_worker(
            Arc::clone(&self.client),
            Arc::clone(&self.engine),
            receiver,
        ));
        if sender.send(inbound).is_err() {
            tracing::error!(actor, "actor worker closed before its first update");
            return;
        }
        self.workers.insert(actor, sender);
    }

    fn reject(&mut self, inbound: Inbound) {
        let sender = self.rejections.get_or_insert_with(|| {
            let (sender, receiver) = mpsc::channel(REJECTION_BACKLOG);
            tokio::spawn(rejection_worker(Arc::clone(&self.client), receiver));
            sender
        });
        match sender.try_send(inbound) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(inbound)) => {
                tracing::debug!(actor = inbound.actor, "rejection backlog full; dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!("rejection worker closed");
                self.rejections = None;
            }
        }
    }
}

async fn rejection_worker(client: Arc<TelegramClient>, mut receiver: mpsc::Receiver<Inbound>) {
    let denied = Reply::text(views::ACCESS_DENIED);
    while let Some(inbound) = receiver.recv().await {
        if let Some(callback_id) = &inbound.callback_id
            && let Err(err) = client.answer_callback_query(callback_id).await
        {
            tracing::warn!(?err, "failed to answer callback query");
        }
        if let Err(err) = client.send_reply(inbound.chat_id, &denied).await {
            tracing::warn!(actor = inbound.actor, ?err, "failed to send access denied");
        }
    }
}

async fn actor_worker(
    client: Arc<TelegramClient>,
    engine: Arc<ConversationEngine>,
    mut receiver: mpsc::UnboundedReceiver<Inbound>,
) {
    while let Some(inbound) = receiver.recv().await {
        if let Some(callback_id) = &inbound.callback_id
            && let Err(err) = client.answer_callback_query(callback_id).await
        {
            tracing::warn!(?err, "failed to answer callback query");
        }

        let turn = engine.handle(inbound.actor, inbound.event).await;
        for reply in &turn.replies {
            if let Err(err) = client.send_reply(inbound.chat_id, reply).await {
                tracing::warn!(actor = inbound.actor, ?err, "failed to send reply");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(value: serde_json::Value) -> Update {
        serde_json::from_value(value).expect("valid update json")
    }

    #[test]
    fn text_messages_become_commands_or_text() {
        let inbound = Inbound::from_update(update(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": { "id": 99 },
                "from": { "id": 42 },
                "text": "/addcomic \"Night Shift\""
            }
        })))
        .expect("inbound");
        assert_eq!(inbound.actor, 42);
        assert_eq!(inbound.chat_id, 99);
        assert_eq!(
            inbound.event,
            Event::Command {
                name: "addcomic".to_owned(),
                args: "\"Night Shift\"".to_owned()
            }
        );
    }

    #[test]
    fn callback_queries_become_buttons() {
        let inbound = Inbound::from_update(update(serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42 },
                "data": "select:2",
                "message": { "message_id": 11, "chat": { "id": 99 } }
            }
        })))
        .expect("inbound");
        assert_eq!(inbound.callback_id.as_deref(), Some("cb-1"));
        assert_eq!(
            inbound.event,
            Event::Button(Action::Select(2))
        );

        let stale = Inbound::from_update(update(serde_json::json!({
            "update_id": 3,
            "callback_query": { "id": "cb-2", "from": { "id": 42 }, "data": "retired_button" }
        })))
        .expect("inbound");
        assert_eq!(stale.event, Event::Unsupported);
        assert_eq!(stale.chat_id, 42);
    }

    #[test]
    fn attachments_become_photos_or_documents() {
        let photo = Inbound::from_update(update(serde_json::json!({
            "update_id": 4,
            "message": {
                "message_id": 12,
                "chat": { "id": 99 },
                "from": { "id": 42 },
                "photo": [{ "file_id": "p-small", "width": 1, "height": 1 },
                          { "file_id": "p-big", "width": 10, "height": 10 }]
            }
        })))
        .expect("inbound");
        assert_eq!(
            photo.event,
            Event::Photo {
                reference: "p-big".to_owned()
            }
        );

        let document = Inbound::from_update(update(serde_json::json!({
            "update_id": 5,
            "message": {
                "message_id": 13,
                "chat": { "id": 99 },
                "from": { "id": 42 },
                "document": { "file_id": "z", "file_name": "chapters.zip", "mime_type": "application/zip" }
            }
        })))
        .expect("inbound");
        assert_eq!(
            document.event,
            Event::Document {
                reference: "z".to_owned(),
                file_name: Some("chapters.zip".to_owned()),
                mime_type: Some("application/zip".to_owned()),
            }
        );
    }

    fn poller_for_admin(admin: ActorId) -> anyhow::Result<Poller> {
        use crate::bot::AdminGuard;
        use crate::config::Settings;
        use crate::notify::MemoryNotifier;
        use crate::objects::MemoryObjectStore;
        use crate::sink::MemoryDocumentSink;
        use crate::store::{ContentStore, StoreLimits};

        let client = Arc::new(TelegramClient::new(&Settings {
            bot_token: "t".to_owned(),
            admin_id: admin,
            channel_id: "c".to_owned(),
            api_base: "http://127.0.0.1:9".to_owned(),
        })?);
        let store = Arc::new(ContentStore::new(
            Arc::new(MemoryDocumentSink::new()),
            Arc::new(MemoryNotifier::new()),
            StoreLimits::default(),
        ));
        let engine = Arc::new(ConversationEngine::new(
            AdminGuard::new(admin),
            store,
            Arc::new(MemoryObjectStore::new()),
        ));
        Ok(Poller::new(client, engine, 1))
    }

    fn text_from(actor: ActorId) -> Inbound {
        Inbound {
            actor,
            chat_id: actor,
            callback_id: None,
            event: Event::Text("hello".to_owned()),
        }
    }

    #[tokio::test]
    async fn strangers_never_get_a_worker() -> anyhow::Result<()> {
        let mut poller = poller_for_admin(1)?;
        for actor in 2..5_002 {
            poller.dispatch(text_from(actor));
        }
        assert!(poller.workers.is_empty());
        assert!(poller.rejections.is_some());

        poller.dispatch(text_from(1));
        poller.dispatch(text_from(1));
        assert_eq!(poller.workers.len(), 1);
        assert!(poller.workers.contains_key(&1));
        Ok(())
    }

    #[test]
    fn channel_posts_without_sender_are_ignored() {
        let inbound = Inbound::from_update(update(serde_json::json!({
            "update_id": 6,
            "message": { "message_id": 14, "chat": { "id": -100 }, "text": "hi" }
        })));
        assert_eq!(inbound, None);
    }
}
