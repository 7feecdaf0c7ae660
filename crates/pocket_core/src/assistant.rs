//! The assistant engine.
//!
//! Wraps the pure [`Router`] with everything impure: it loads and stores
//! sessions, performs the requested effect through the service adapters and
//! hands replies to the transport. Messages of different conversations are
//! processed concurrently; messages of the same conversation one at a time
//! and, when fed through [`Assistant::serve`], in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::router::Router;
use crate::services::Services;
use crate::store::SessionStore;
use crate::transport::Transport;
use crate::types::{ConversationId, InboundMessage, Outbound};

pub struct Assistant {
    router: Router,
    store: SessionStore,
    services: Services,
    transport: Arc<dyn Transport>,
    in_flight: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl Assistant {
    pub fn new(
        router: Router,
        store: SessionStore,
        services: Services,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            router,
            store,
            services,
            transport,
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one inbound message end to end.
    ///
    /// Returns the replies that were handed to the transport. Never fails:
    /// adapter failures become replies and delivery failures are logged.
    pub async fn handle(&self, message: InboundMessage) -> Vec<Outbound> {
        let id = message.identity;
        let lock = self.in_flight.entry(id).or_default().clone();

        let delivered = {
            let _guard = lock.lock().await;
            self.process(&message).await
        };

        drop(lock);
        self.in_flight
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        delivered
    }

    async fn process(&self, message: &InboundMessage) -> Vec<Outbound> {
        let id = message.identity;
        let session = self.store.get(&id);
        let transition = self.router.route(&session, message);

        debug_assert!(transition.session.is_consistent());
        if transition.session != session {
            self.store.put(id, transition.session.clone());
        }

        let mut delivered = Vec::new();
        for reply in transition.replies {
            self.deliver(message, &reply).await;
            delivered.push(reply);
        }

        if let Some(effect) = transition.effect {
            let outcome = self.services.perform(&effect).await;
            for reply in self.router.render(&effect, &outcome) {
                self.deliver(message, &reply).await;
                delivered.push(reply);
            }
        }
        delivered
    }

    async fn deliver(&self, message: &InboundMessage, reply: &Outbound) {
        if let Err(e) = self.transport.send(message.chat(), reply).await {
            warn!(conversation = %message.identity, error = %e, "Failed to deliver reply");
        }
    }

    /// Consume inbound messages until the channel closes.
    ///
    /// Each conversation gets one worker task that handles its messages in
    /// arrival order; different conversations run concurrently. In-flight
    /// workers are awaited before returning.
    pub async fn serve(self: Arc<Self>, mut inbound: mpsc::Receiver<InboundMessage>) {
        info!("Assistant ready; session state is kept in memory and lost on restart");
        let mut workers: HashMap<ConversationId, Mailbox> = HashMap::new();
        let mut tasks: JoinSet<Drained> = JoinSet::new();

        loop {
            tokio::select! {
                received = inbound.recv() => match received {
                    Some(message) => {
                        debug!(conversation = %message.identity, "Inbound message");
                        self.dispatch(message, &mut workers, &mut tasks);
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    self.reap(joined, &mut workers, &mut tasks);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            self.reap(joined, &mut workers, &mut tasks);
        }
        info!("Inbound stream closed, assistant stopped");
    }

    /// Queue `message` behind the conversation's running worker, or start one.
    fn dispatch(
        self: &Arc<Self>,
        message: InboundMessage,
        workers: &mut HashMap<ConversationId, Mailbox>,
        tasks: &mut JoinSet<Drained>,
    ) {
        let id = message.identity;
        let message = match workers.get(&id) {
            Some(mailbox) => match mailbox.send(message) {
                Ok(()) => return,
                // The worker panicked and dropped its queue.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let (mailbox, queue) = mpsc::unbounded_channel();
        workers.insert(id, mailbox);
        tasks.spawn(Arc::clone(self).drain(id, message, queue));
    }

    /// Handle `first`, then whatever queued up behind it, and hand the queue back.
    async fn drain(
        self: Arc<Self>,
        id: ConversationId,
        first: InboundMessage,
        mut queue: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Drained {
        self.handle(first).await;
        while let Ok(message) = queue.try_recv() {
            self.handle(message).await;
        }
        (id, queue)
    }

    /// A worker finished. Messages that arrived after it checked its queue are
    /// still there, so it is restarted for them; otherwise the mailbox goes.
    fn reap(
        self: &Arc<Self>,
        joined: Result<Drained, JoinError>,
        workers: &mut HashMap<ConversationId, Mailbox>,
        tasks: &mut JoinSet<Drained>,
    ) {
        match joined {
            Ok((id, mut queue)) => match queue.try_recv() {
                Ok(next) => {
                    tasks.spawn(Arc::clone(self).drain(id, next, queue));
                }
                Err(_) => {
                    workers.remove(&id);
                }
            },
            Err(e) => error!(error = %e, "Conversation worker panicked"),
        }
    }
}

/// Sender side of a conversation worker's queue.
type Mailbox = mpsc::UnboundedSender<InboundMessage>;

/// What a worker returns when its queue runs dry.
type Drained = (ConversationId, mpsc::UnboundedReceiver<InboundMessage>);

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("store", &self.store)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
