//! Serialized application of registry mutations.
//!
//! # Responsibilities
//! - Own the [`ConfigStore`], [`EndpointRouter`] and [`ChangeBroadcaster`]
//! - Apply each mutation to the store, then the router, as one unit
//! - Broadcast the committed snapshot, then acknowledge the requester
//! - Publish the latest snapshot for lock-free readers
//!
//! # Design Decisions
//! - A single task consumes an mpsc command queue; commands never interleave
//! - [`apply_mutation`] is a plain function, so nothing can suspend between
//!   the store and router steps
//! - Session connects also go through the queue, so a joining session can
//!   never be handed a snapshot older than a broadcast it missed

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use crate::control::broadcaster::{ChangeBroadcaster, SESSION_QUEUE_CAPACITY};
use crate::control::message::{
    display_timestamp, MutationOutcome, MutationRequest, ServerEvent, SessionId,
};
use crate::observability::metrics;
use crate::routing::EndpointRouter;
use crate::store::{ConfigStore, Snapshot, StoreError};

/// Errors returned to callers of the [`Orchestrator`] handle.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Orchestrator is not running")]
    Closed,
}

/// A connected observer: its id and the queue of events addressed to it.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub events: mpsc::Receiver<ServerEvent>,
}

enum Command {
    Connect {
        session: SessionId,
        events: mpsc::Sender<ServerEvent>,
    },
    Disconnect {
        session: SessionId,
    },
    Submit {
        session: SessionId,
        request: MutationRequest,
    },
    Mutate {
        request: MutationRequest,
        reply: oneshot::Sender<Result<MutationOutcome, StoreError>>,
    },
    Routes {
        reply: oneshot::Sender<Vec<String>>,
    },
    Sessions {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to the orchestrator task.
#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::UnboundedSender<Command>,
    published: Arc<ArcSwap<Snapshot>>,
}

impl Orchestrator {
    /// Create the handle and the task that must be driven with [`OrchestratorTask::run`].
    pub fn new(store: ConfigStore, router: EndpointRouter) -> (Self, OrchestratorTask) {
        let (commands, queue) = mpsc::unbounded_channel();
        let published = Arc::new(ArcSwap::new(store.get_all()));

        let handle = Self {
            commands,
            published: Arc::clone(&published),
        };
        let task = OrchestratorTask {
            store,
            router,
            broadcaster: ChangeBroadcaster::new(),
            published,
            queue,
        };
        (handle, task)
    }

    /// Last committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    /// Register a new session. Its first event is the current snapshot.
    ///
    /// The session's queue holds [`SESSION_QUEUE_CAPACITY`] events; a session
    /// that falls that far behind is detached and its queue closed.
    pub fn connect(&self) -> Result<Session, ControlError> {
        let (events, receiver) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let id = Uuid::new_v4();
        self.send(Command::Connect {
            session: id,
            events,
        })?;
        Ok(Session {
            id,
            events: receiver,
        })
    }

    pub fn disconnect(&self, session: SessionId) {
        let _ = self.send(Command::Disconnect { session });
    }

    /// Queue a mutation on behalf of a session. The outcome arrives on the
    /// session's event queue.
    pub fn submit(&self, session: SessionId, request: MutationRequest) -> Result<(), ControlError> {
        self.send(Command::Submit { session, request })
    }

    /// Apply a mutation and wait for its outcome. Connected sessions still
    /// receive the broadcast.
    pub async fn mutate(&self, request: MutationRequest) -> Result<MutationOutcome, ControlError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Mutate { request, reply })?;
        let outcome = response.await.map_err(|_| ControlError::Closed)?;
        Ok(outcome?)
    }

    /// Names of the endpoints currently bound in the router.
    pub async fn registered_routes(&self) -> Result<Vec<String>, ControlError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Routes { reply })?;
        response.await.map_err(|_| ControlError::Closed)
    }

    pub async fn session_count(&self) -> Result<usize, ControlError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Sessions { reply })?;
        response.await.map_err(|_| ControlError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), ControlError> {
        self.commands.send(command).map_err(|_| ControlError::Closed)
    }
}

/// The task that owns all mutable registry state.
pub struct OrchestratorTask {
    store: ConfigStore,
    router: EndpointRouter,
    broadcaster: ChangeBroadcaster,
    published: Arc<ArcSwap<Snapshot>>,
    queue: mpsc::UnboundedReceiver<Command>,
}

impl OrchestratorTask {
    /// Process commands until every handle is dropped or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(endpoints = self.store.len(), "Orchestrator started");
        metrics::record_endpoints(self.store.len());

        loop {
            tokio::select! {
                command = self.queue.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Orchestrator received shutdown signal");
                    break;
                }
            }
        }

        tracing::info!("Orchestrator stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { session, events } => {
                self.broadcaster.attach(session, events, self.store.get_all());
            }
            Command::Disconnect { session } => {
                self.broadcaster.detach(session);
            }
            Command::Submit { session, request } => {
                let event = match self.process(&request) {
                    Ok(outcome) => outcome.ack(display_timestamp()),
                    Err(e) => request.error_event(&e),
                };
                self.broadcaster.send_to(session, event);
            }
            Command::Mutate { request, reply } => {
                let _ = reply.send(self.process(&request));
            }
            Command::Routes { reply } => {
                let _ = reply.send(self.router.registered_routes());
            }
            Command::Sessions { reply } => {
                let _ = reply.send(self.broadcaster.session_count());
            }
        }
    }

    /// Apply, publish and broadcast one mutation.
    fn process(&mut self, request: &MutationRequest) -> Result<MutationOutcome, StoreError> {
        let kind = request.kind();
        let result = apply_mutation(&mut self.store, &mut self.router, request);

        match &result {
            Ok(_) => {
                let snapshot = self.store.get_all();
                self.published.store(Arc::clone(&snapshot));
                self.broadcaster.push_all(snapshot);
                metrics::record_mutation(kind.as_str(), "ok");
                metrics::record_endpoints(self.store.len());
            }
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "Mutation rejected");
                metrics::record_mutation(kind.as_str(), e.kind());
            }
        }

        result
    }
}

/// Apply one mutation to the store and then the router.
///
/// On a store error nothing else happens. The router always receives the
/// config as it reads back from the store after the change.
pub fn apply_mutation(
    store: &mut ConfigStore,
    router: &mut EndpointRouter,
    request: &MutationRequest,
) -> Result<MutationOutcome, StoreError> {
    match request {
        MutationRequest::Add { endpoint, config } => {
            store.add(endpoint, config.clone())?;
            router.register(endpoint, store.get(endpoint));
            Ok(MutationOutcome::Added {
                endpoint: endpoint.clone(),
            })
        }
        MutationRequest::Update { changes } => {
            store.update_many(changes.clone())?;
            for name in changes.keys() {
                router.update_endpoint(name, store.get(name));
            }
            Ok(MutationOutcome::Updated {
                endpoint: changes.keys().next().cloned().unwrap_or_default(),
            })
        }
        MutationRequest::Remove { endpoint } => {
            store.remove(endpoint)?;
            router.unregister(endpoint);
            Ok(MutationOutcome::Removed {
                endpoint: endpoint.clone(),
            })
        }
        MutationRequest::Rename { old_name, new_name } => {
            store.rename(old_name, new_name)?;
            router.unregister(old_name);
            router.register(new_name, store.get(new_name));
            Ok(MutationOutcome::Renamed {
                old_name: old_name.clone(),
                new_name: new_name.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteTable;
    use crate::store::{EndpointChanges, EndpointDraft, Method};
    use serde_json::json;
    use std::time::Duration;

    fn draft(value: serde_json::Value) -> EndpointDraft {
        serde_json::from_value(value).unwrap()
    }

    fn registry() -> (ConfigStore, EndpointRouter, Arc<RouteTable>) {
        let mut store = ConfigStore::in_memory(Snapshot::new());
        store.add("a", draft(json!({"statusCode": 201}))).unwrap();
        store.add("b", EndpointDraft::default()).unwrap();

        let table = Arc::new(RouteTable::new());
        let mut router = EndpointRouter::new(table.clone());
        router.initialize(&store.get_all());
        (store, router, table)
    }

    fn spawn() -> (Orchestrator, Arc<RouteTable>, broadcast::Sender<()>) {
        let (store, router, table) = registry();
        let (orchestrator, task) = Orchestrator::new(store, router);
        let (shutdown, rx) = broadcast::channel(1);
        tokio::spawn(task.run(rx));
        (orchestrator, table, shutdown)
    }

    async fn next_event(session: &mut Session) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(2), session.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("session closed")
    }

    #[test]
    fn test_rename_rebinds_route() {
        let (mut store, mut router, table) = registry();
        let request = MutationRequest::Rename {
            old_name: "a".into(),
            new_name: "z".into(),
        };

        apply_mutation(&mut store, &mut router, &request).unwrap();
        assert!(table.lookup(Method::Get, "/a").is_none());
        let handler = table.lookup(Method::Get, "/z").unwrap();
        assert_eq!(handler.config().unwrap().status_code, 201);
        assert_eq!(router.registered_routes(), vec!["b", "z"]);
    }

    #[test]
    fn test_failed_rename_touches_nothing() {
        let (mut store, mut router, table) = registry();
        let request = MutationRequest::Rename {
            old_name: "a".into(),
            new_name: "b".into(),
        };

        let err = apply_mutation(&mut store, &mut router, &request).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get("a").unwrap().status_code, 201);
        assert!(table.lookup(Method::Get, "/a").is_some());
        assert!(table.lookup(Method::Get, "/b").is_some());
    }

    #[test]
    fn test_update_rebinds_with_merged_config() {
        let (mut store, mut router, table) = registry();
        let mut changes = EndpointChanges::new();
        changes.insert("a".to_string(), draft(json!({"method": "PATCH"})));

        apply_mutation(&mut store, &mut router, &MutationRequest::Update { changes }).unwrap();
        assert!(table.lookup(Method::Get, "/a").is_none());
        let handler = table.lookup(Method::Patch, "/a").unwrap();
        assert_eq!(handler.config().unwrap().status_code, 201);
    }

    #[test]
    fn test_update_ack_names_first_key_sent() {
        let (mut store, mut router, _table) = registry();
        let mut changes = EndpointChanges::new();
        changes.insert("b".to_string(), draft(json!({"delay": 5})));
        changes.insert("a".to_string(), draft(json!({"delay": 5})));

        let outcome =
            apply_mutation(&mut store, &mut router, &MutationRequest::Update { changes }).unwrap();
        assert_eq!(outcome, MutationOutcome::Updated { endpoint: "b".into() });
    }

    #[test]
    fn test_remove_missing_leaves_router_alone() {
        let (mut store, mut router, table) = registry();
        let request = MutationRequest::Remove {
            endpoint: "missing".into(),
        };

        let err = apply_mutation(&mut store, &mut router, &request).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(table.len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_connect_receives_current_snapshot() {
        let (orchestrator, _table, _shutdown) = spawn();
        let mut session = orchestrator.connect().unwrap();

        match next_event(&mut session).await {
            ServerEvent::ConfigUpdate(snapshot) => {
                assert_eq!(snapshot.len(), 2);
                assert!(snapshot.contains_key("a"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_broadcasts_then_acks() {
        let (orchestrator, table, _shutdown) = spawn();
        let mut requester = orchestrator.connect().unwrap();
        let mut observer = orchestrator.connect().unwrap();
        next_event(&mut requester).await;
        next_event(&mut observer).await;

        orchestrator
            .submit(
                requester.id,
                MutationRequest::Add {
                    endpoint: "c".into(),
                    config: draft(json!({"method": "POST"})),
                },
            )
            .unwrap();

        match next_event(&mut requester).await {
            ServerEvent::ConfigUpdate(snapshot) => assert!(snapshot.contains_key("c")),
            other => panic!("unexpected: {:?}", other),
        }
        match next_event(&mut requester).await {
            ServerEvent::AddSuccess { endpoint, timestamp } => {
                assert_eq!(endpoint, "c");
                assert_eq!(timestamp.len(), 8);
            }
            other => panic!("unexpected: {:?}", other),
        }
        match next_event(&mut observer).await {
            ServerEvent::ConfigUpdate(snapshot) => assert!(snapshot.contains_key("c")),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(table.lookup(Method::Post, "/c").is_some());
        assert!(orchestrator.snapshot().contains_key("c"));
    }

    #[tokio::test]
    async fn test_errors_go_to_requester_only() {
        let (orchestrator, _table, _shutdown) = spawn();
        let mut requester = orchestrator.connect().unwrap();
        let mut observer = orchestrator.connect().unwrap();
        next_event(&mut requester).await;
        next_event(&mut observer).await;

        orchestrator
            .submit(
                requester.id,
                MutationRequest::Add {
                    endpoint: "a".into(),
                    config: EndpointDraft::default(),
                },
            )
            .unwrap();

        match next_event(&mut requester).await {
            ServerEvent::AddError { endpoint, message } => {
                assert_eq!(endpoint, "a");
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        // a follow-up query is answered only after the failed add was handled
        assert_eq!(orchestrator.session_count().await.unwrap(), 2);
        assert!(observer.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcasts_follow_commit_order() {
        let (orchestrator, _table, _shutdown) = spawn();
        let mut observer = orchestrator.connect().unwrap();
        next_event(&mut observer).await;

        let first = orchestrator.clone();
        let second = orchestrator.clone();
        let (r1, r2) = tokio::join!(
            first.mutate(MutationRequest::Add {
                endpoint: "x".into(),
                config: EndpointDraft::default(),
            }),
            second.mutate(MutationRequest::Add {
                endpoint: "y".into(),
                config: EndpointDraft::default(),
            }),
        );
        r1.unwrap();
        r2.unwrap();

        let mut sizes = Vec::new();
        for _ in 0..2 {
            match next_event(&mut observer).await {
                ServerEvent::ConfigUpdate(snapshot) => sizes.push(snapshot.len()),
                other => panic!("unexpected: {:?}", other),
            }
        }
        assert_eq!(sizes, vec![3, 4]);

        let latest = orchestrator.snapshot();
        assert!(latest.contains_key("x") && latest.contains_key("y"));
    }

    #[tokio::test]
    async fn test_mutate_returns_typed_errors() {
        let (orchestrator, _table, _shutdown) = spawn();
        let err = orchestrator
            .mutate(MutationRequest::Remove {
                endpoint: "missing".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Store(StoreError::NotFound(_))));

        let routes = orchestrator.registered_routes().await.unwrap();
        assert_eq!(routes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_session_that_stops_reading_is_detached() {
        let (orchestrator, _table, _shutdown) = spawn();
        let mut stalled = orchestrator.connect().unwrap();

        for i in 0..SESSION_QUEUE_CAPACITY {
            orchestrator
                .mutate(MutationRequest::Add {
                    endpoint: format!("e{}", i),
                    config: EndpointDraft::default(),
                })
                .await
                .unwrap();
        }
        assert_eq!(orchestrator.session_count().await.unwrap(), 0);

        // everything queued before the detach is delivered, then the queue ends
        let mut received = 0;
        while stalled.events.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, SESSION_QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn test_disconnect_stops_delivery() {
        let (orchestrator, _table, _shutdown) = spawn();
        let session = orchestrator.connect().unwrap();
        orchestrator.disconnect(session.id);
        assert_eq!(orchestrator.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_handles() {
        let (orchestrator, _table, shutdown) = spawn();
        shutdown.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = orchestrator.session_count().await.unwrap_err();
        assert!(matches!(err, ControlError::Closed));
    }
}
