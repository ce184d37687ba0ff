//! Session controller
//!
//! Runs one user turn end to end:
//!
//! ```text
//! Idle -> Submitted -> Dispatched -> Completed -> Idle
//! ```
//!
//! The user turn is persisted before the router is called, so a crash while
//! waiting for the reply keeps the user's half of the exchange. The router
//! runs on a spawned task and its result is delivered exactly once as
//! [`TurnEvent::Reply`]. Only one turn may be outstanding at a time.

use crate::error::{ChatfolioError, Result};
use crate::router::QueryRouter;
use crate::session::{SessionDescriptor, SessionLog, Transcript, Turn};

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Where the controller is in the turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for a new message
    Idle,
    /// User turn recorded, router not yet started
    Submitted,
    /// Router call in flight
    Dispatched,
}

/// Notifications for the interaction loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Placeholder shown while the reply is produced
    Thinking,
    /// The assistant's reply; replaces the placeholder
    Reply(String),
}

/// Result of [`SessionController::submit`]
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Input was empty after trimming; nothing happened
    Ignored,
    /// The turn was dispatched; the handle resolves after the reply is
    /// persisted and emitted
    Dispatched(JoinHandle<()>),
}

struct Inner {
    log: SessionLog,
    pending: Vec<Turn>,
    transcript: Transcript,
    state: TurnState,
}

impl Inner {
    fn persist(&mut self) {
        let Self { log, pending, .. } = self;
        if let Err(e) = log.append(pending) {
            tracing::error!(
                "Failed to persist {} turn(s), keeping them for the next write: {:#}",
                pending.len(),
                e
            );
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state != TurnState::Idle {
            return Err(ChatfolioError::TurnInProgress.into());
        }
        Ok(())
    }
}

/// Sequences user turns for one profile
///
/// Cloning yields another handle on the same session.
#[derive(Clone)]
pub struct SessionController {
    router: Arc<QueryRouter>,
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<TurnEvent>,
}

impl SessionController {
    /// Create a controller over an opened session log
    ///
    /// If the log is already bound, its transcript becomes the context of
    /// the next turn. Returns the controller and its event stream.
    pub fn new(
        log: SessionLog,
        router: Arc<QueryRouter>,
    ) -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transcript = log.read_current();
        let controller = Self {
            router,
            inner: Arc::new(Mutex::new(Inner {
                log,
                pending: Vec::new(),
                transcript,
                state: TurnState::Idle,
            })),
            events,
        };
        (controller, rx)
    }

    /// Submit a user message
    ///
    /// Empty or whitespace-only input is ignored. Otherwise the user turn is
    /// persisted, [`TurnEvent::Thinking`] is emitted, and the router is
    /// started on a new task.
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` if the previous turn has not completed
    pub async fn submit(&self, message: &str) -> Result<SubmitOutcome> {
        let text = message.trim();
        if text.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let mut inner = self.inner.lock().await;
        inner.ensure_idle()?;
        inner.state = TurnState::Submitted;

        let turn = Turn::user(text);
        inner.pending.push(turn.clone());
        inner.transcript.push(turn);
        inner.persist();
        let _ = self.events.send(TurnEvent::Thinking);

        let context = inner.transcript.clone();
        inner.state = TurnState::Dispatched;
        drop(inner);

        let router = self.router.clone();
        let shared = self.inner.clone();
        let events = self.events.clone();
        let query = text.to_string();

        let handle = tokio::spawn(async move {
            let reply = router.route(&query, &context).await;

            let mut inner = shared.lock().await;
            let turn = Turn::assistant(reply.clone());
            inner.pending.push(turn.clone());
            inner.transcript.push(turn);
            inner.persist();
            inner.state = TurnState::Idle;
            drop(inner);

            let _ = events.send(TurnEvent::Reply(reply));
        });

        Ok(SubmitOutcome::Dispatched(handle))
    }

    /// Current lifecycle state
    pub async fn state(&self) -> TurnState {
        self.inner.lock().await.state
    }

    /// Turns of the current session known to the controller
    pub async fn transcript(&self) -> Transcript {
        self.inner.lock().await.transcript.clone()
    }

    /// Name of the bound session, if one has been created or resumed
    pub async fn current_session(&self) -> Option<String> {
        self.inner.lock().await.log.current_name()
    }

    /// Sessions of this profile, most recent first
    pub async fn sessions(&self) -> Result<Vec<SessionDescriptor>> {
        self.inner.lock().await.log.list()
    }

    /// Whether the next message would be answered from documents
    pub fn documents_available(&self) -> bool {
        self.router.documents_available()
    }

    /// Start a fresh conversation; the next message creates a new session
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` while a reply is pending, or the write error
    /// if unsaved turns of the current session cannot be flushed
    pub async fn start_new_session(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_idle()?;

        if !inner.pending.is_empty() {
            let Inner { log, pending, .. } = &mut *inner;
            log.append(pending)?;
        }

        inner.log.unbind();
        inner.transcript.clear();
        tracing::debug!("Started a new conversation");
        Ok(())
    }

    /// Resume an existing session and return its transcript
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` while a reply is pending, or
    /// `SessionNotFound` if no such session exists
    pub async fn resume(&self, name: &str) -> Result<Transcript> {
        let mut inner = self.inner.lock().await;
        inner.ensure_idle()?;

        if !inner.pending.is_empty() {
            let Inner { log, pending, .. } = &mut *inner;
            log.append(pending)?;
        }

        inner.log.bind(name)?;
        inner.transcript = inner.log.read_current();
        tracing::info!(
            "Resumed session {} with {} turn(s)",
            name,
            inner.transcript.len()
        );
        Ok(inner.transcript.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::documents::{DocumentIndex, DocumentLibrary, RetrievalEngine};
    use crate::providers::{ChatCompletion, Provider};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    struct GatedProvider {
        gate: Option<Arc<Notify>>,
        calls: StdMutex<Vec<Vec<Turn>>>,
    }

    #[async_trait]
    impl Provider for GatedProvider {
        async fn complete(&self, messages: &[Turn]) -> Result<ChatCompletion> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(messages.to_vec());
                calls.len()
            };
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ChatCompletion::from_text(format!("reply {}", n)))
        }

        fn model(&self) -> &str {
            "gated"
        }
    }

    struct NoIndex;

    #[async_trait]
    impl DocumentIndex for NoIndex {
        async fn index(&self, _path: &Path) -> Result<Arc<dyn RetrievalEngine>> {
            Err(ChatfolioError::Retrieval("not used".to_string()).into())
        }
    }

    struct Harness {
        tmp: TempDir,
        provider: Arc<GatedProvider>,
        controller: SessionController,
        events: mpsc::UnboundedReceiver<TurnEvent>,
    }

    fn harness(gate: Option<Arc<Notify>>) -> Harness {
        let tmp = TempDir::new().unwrap();
        let provider = Arc::new(GatedProvider {
            gate,
            calls: StdMutex::new(Vec::new()),
        });
        let data = tmp.path().join("user_data_storage");
        let router = QueryRouter::new(
            provider.clone(),
            Arc::new(NoIndex),
            DocumentLibrary::with_dirs(&data, data.join("selected_files")),
            &Config::default(),
        );
        let log = SessionLog::open_dir("alice", tmp.path().join("chat_history")).unwrap();
        let (controller, events) = SessionController::new(log, Arc::new(router));
        Harness {
            tmp,
            provider,
            controller,
            events,
        }
    }

    async fn dispatch(controller: &SessionController, message: &str) {
        match controller.submit(message).await.unwrap() {
            SubmitOutcome::Dispatched(handle) => handle.await.unwrap(),
            SubmitOutcome::Ignored => panic!("message was ignored"),
        }
    }

    fn stored(h: &Harness, name: &str) -> Transcript {
        SessionLog::load(&h.tmp.path().join("chat_history").join(format!("{}.json", name)))
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut h = harness(None);
        for input in ["", "   ", "\n\t"] {
            assert!(matches!(
                h.controller.submit(input).await.unwrap(),
                SubmitOutcome::Ignored
            ));
        }
        assert!(h.controller.current_session().await.is_none());
        assert!(h.controller.sessions().await.unwrap().is_empty());
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.controller.state().await, TurnState::Idle);
    }

    #[tokio::test]
    async fn test_user_turn_persisted_before_reply() {
        let gate = Arc::new(Notify::new());
        let mut h = harness(Some(gate.clone()));

        let outcome = h.controller.submit("  hello  ").await.unwrap();
        let SubmitOutcome::Dispatched(handle) = outcome else {
            panic!("expected dispatch");
        };

        let name = h.controller.current_session().await.unwrap();
        assert!(name.starts_with("alice_Session_"));
        assert_eq!(stored(&h, &name), vec![Turn::user("hello")]);
        assert_eq!(h.events.recv().await.unwrap(), TurnEvent::Thinking);

        gate.notify_one();
        handle.await.unwrap();

        assert_eq!(
            h.events.recv().await.unwrap(),
            TurnEvent::Reply("reply 1".to_string())
        );
        assert_eq!(
            stored(&h, &name),
            vec![Turn::user("hello"), Turn::assistant("reply 1")]
        );
        assert_eq!(h.controller.state().await, TurnState::Idle);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_turn_survives_failed_first_write() {
        let gate = Arc::new(Notify::new());
        let h = harness(Some(gate.clone()));
        let history = h.tmp.path().join("chat_history");
        let offline = h.tmp.path().join("chat_history_offline");
        std::fs::rename(&history, &offline).unwrap();

        let SubmitOutcome::Dispatched(handle) = h.controller.submit("hello").await.unwrap() else {
            panic!("expected dispatch");
        };
        assert!(h.controller.current_session().await.is_none());

        std::fs::rename(&offline, &history).unwrap();
        gate.notify_one();
        handle.await.unwrap();

        let name = h.controller.current_session().await.unwrap();
        assert_eq!(
            stored(&h, &name),
            vec![Turn::user("hello"), Turn::assistant("reply 1")]
        );
    }

    #[tokio::test]
    async fn test_second_submit_rejected_while_dispatched() {
        let gate = Arc::new(Notify::new());
        let h = harness(Some(gate.clone()));

        let SubmitOutcome::Dispatched(handle) = h.controller.submit("first").await.unwrap() else {
            panic!("expected dispatch");
        };
        assert_eq!(h.controller.state().await, TurnState::Dispatched);

        let err = h.controller.submit("second").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatfolioError>(),
            Some(ChatfolioError::TurnInProgress)
        ));
        assert!(h.controller.start_new_session().await.is_err());

        gate.notify_one();
        handle.await.unwrap();

        let transcript = h.controller.transcript().await;
        assert_eq!(
            transcript,
            vec![Turn::user("first"), Turn::assistant("reply 1")]
        );
    }

    #[tokio::test]
    async fn test_router_receives_full_transcript() {
        let h = harness(None);
        dispatch(&h.controller, "one").await;
        dispatch(&h.controller, "two").await;

        let calls = h.provider.calls.lock().unwrap();
        assert_eq!(calls[0], vec![Turn::user("one")]);
        assert_eq!(
            calls[1],
            vec![
                Turn::user("one"),
                Turn::assistant("reply 1"),
                Turn::user("two")
            ]
        );
    }

    #[tokio::test]
    async fn test_new_session_starts_new_file() {
        let h = harness(None);
        dispatch(&h.controller, "first conversation").await;
        let first = h.controller.current_session().await.unwrap();

        h.controller.start_new_session().await.unwrap();
        assert!(h.controller.transcript().await.is_empty());
        assert!(h.controller.current_session().await.is_none());

        dispatch(&h.controller, "second conversation").await;
        let second = h.controller.current_session().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(stored(&h, &first).len(), 2);
        assert_eq!(stored(&h, &second)[0], Turn::user("second conversation"));
    }

    #[tokio::test]
    async fn test_resume_continues_session() {
        let h = harness(None);
        dispatch(&h.controller, "remember me").await;
        let name = h.controller.current_session().await.unwrap();
        h.controller.start_new_session().await.unwrap();

        let transcript = h.controller.resume(&name).await.unwrap();
        assert_eq!(transcript.len(), 2);

        dispatch(&h.controller, "again").await;
        assert_eq!(stored(&h, &name).len(), 4);
        assert_eq!(h.provider.calls.lock().unwrap()[1].len(), 3);

        assert!(h.controller.resume("missing").await.is_err());
    }
}
