//! Session lifecycle: turn-taking, quota gate, mode switching and clear.

use std::sync::Arc;

use chrono::Local;
use futures::StreamExt;
use ragchat_core::backend::{HealthReport, QueryAnswer, QueryBackend, QueryRequest, StreamEvent};
use ragchat_core::config::{QueryTransport, Settings};
use ragchat_core::format::format_chat_export;
use ragchat_core::session::{
    GENERIC_FAILURE, Message, QueryMode, QuotaStatus, Session, is_valid_email,
};
use ragchat_core::{RagchatError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What happened to a submitted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing changed.
    Ignored,
    /// An answer was appended.
    Answered,
    /// An error message was appended instead of an answer.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    /// Preparation document generated for the session.
    Preparation,
    /// Summary of the conversation.
    Summary,
}

/// A downloadable PDF known to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Absolute URL or path relative to the backend base URL.
    pub path: String,
}

/// Owns the [`Session`] and drives every state transition on it.
///
/// The controller is the only writer of the session. Callers render from
/// [`session`](ChatController::session) between calls, or from the update
/// callback of [`submit_with`](ChatController::submit_with).
pub struct ChatController {
    backend: Arc<dyn QueryBackend>,
    session: Session,
    transport: QueryTransport,
    max_top_k: u32,
}

impl ChatController {
    /// Creates a controller with a fresh session configured from `settings`.
    pub fn new(backend: Arc<dyn QueryBackend>, settings: &Settings) -> Self {
        Self {
            backend,
            session: Session::new(QueryMode::default(), settings.default_top_k),
            transport: settings.transport,
            max_top_k: settings.max_top_k,
        }
    }

    pub fn with_transport(mut self, transport: QueryTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> QueryTransport {
        self.transport
    }

    pub fn quota_status(&self) -> QuotaStatus {
        QuotaStatus::new(self.session.query_count, self.session.quota_unlocked)
    }

    /// True when the next question must wait for an email address.
    pub fn is_quota_blocked(&self) -> bool {
        self.quota_status().is_blocked()
    }

    pub async fn check_health(&self) -> HealthReport {
        self.backend.check_health().await
    }

    /// Submits a question without intermediate redraws.
    pub async fn submit(&mut self, question: &str) -> Result<SubmitOutcome> {
        self.submit_with(question, |_| {}).await
    }

    /// Submits a question, calling `on_update` after every visible change:
    /// once the user message is appended, after each streamed chunk, and
    /// once the assistant message is final.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` when the free allowance is used up and no email
    /// was captured. The session is left untouched in that case.
    pub async fn submit_with<F>(&mut self, question: &str, mut on_update: F) -> Result<SubmitOutcome>
    where
        F: FnMut(&Session),
    {
        let question = question.trim();
        if question.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let quota = self.quota_status();
        if quota.is_blocked() {
            debug!(used = quota.used, limit = quota.limit, "Submission blocked by quota");
            return Err(RagchatError::QuotaExceeded {
                used: quota.used,
                limit: quota.limit,
            });
        }

        let mode = self.session.selected_mode;
        self.session.push(Message::user(question));
        self.session.query_count += 1;
        on_update(&self.session);

        let request = QueryRequest::new(question, mode)
            .with_top_k(self.session.top_k)
            .with_session_id(self.session.session_id.clone());

        let outcome = match self.transport {
            QueryTransport::Post => {
                let answer = self.backend.query(&request).await;
                self.finish(answer, mode)
            }
            QueryTransport::Get => {
                let answer = self.backend.query_get(&request).await;
                self.finish(answer, mode)
            }
            QueryTransport::Stream => self.consume_stream(&request, mode, &mut on_update).await,
        };

        on_update(&self.session);
        Ok(outcome)
    }

    fn finish(&mut self, answer: Option<QueryAnswer>, mode: QueryMode) -> SubmitOutcome {
        match answer {
            Some(answer) => {
                let message = Message::from_answer(answer, mode);
                self.adopt_session_id(message.session_id.clone());
                self.session.push(message);
                SubmitOutcome::Answered
            }
            None => {
                self.session.push(Message::failure(GENERIC_FAILURE, mode));
                SubmitOutcome::Failed
            }
        }
    }

    async fn consume_stream<F>(
        &mut self,
        request: &QueryRequest,
        mode: QueryMode,
        on_update: &mut F,
    ) -> SubmitOutcome
    where
        F: FnMut(&Session),
    {
        let mut events = self.backend.query_stream(request).await;
        let mut started = false;

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Chunk { content } => {
                    if !started {
                        self.session.push(Message::pending(mode));
                        started = true;
                    }
                    if let Some(message) = self.session.last_message_mut() {
                        message.content.push_str(&content);
                    }
                    on_update(&self.session);
                }
                complete @ StreamEvent::Complete { .. } => {
                    if !started {
                        self.session.push(Message::pending(mode));
                    }
                    let mut session_id = None;
                    if let Some(message) = self.session.last_message_mut() {
                        message.apply_completion(complete);
                        session_id = message.session_id.clone();
                    }
                    self.adopt_session_id(session_id);
                    return SubmitOutcome::Answered;
                }
                StreamEvent::Error { content } => {
                    self.fail_stream(started, mode, &content);
                    return SubmitOutcome::Failed;
                }
            }
        }

        warn!("Answer stream ended without a terminal event");
        self.fail_stream(started, mode, "The answer stream ended unexpectedly.");
        SubmitOutcome::Failed
    }

    /// Finalises the turn as an error, reusing the partial message if one was
    /// already started so the turn still has exactly one assistant message.
    fn fail_stream(&mut self, started: bool, mode: QueryMode, detail: &str) {
        let failure = Message::failure(format!("{} {}", GENERIC_FAILURE, detail), mode);
        match self.session.last_message_mut() {
            Some(message) if started => *message = failure,
            _ => self.session.push(failure),
        }
    }

    /// The backend id is sticky: an answer without one keeps the previous id.
    fn adopt_session_id(&mut self, session_id: Option<String>) {
        if let Some(id) = session_id {
            if self.session.session_id.as_deref() != Some(id.as_str()) {
                info!(session_id = %id, "Backend session assigned");
            }
            self.session.session_id = Some(id);
        }
    }

    /// Lifts the query limit once a valid email address is given.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for blank or malformed input; the session
    /// is not modified.
    pub fn capture_email(&mut self, input: &str) -> Result<()> {
        let email = input.trim();
        if email.is_empty() {
            return Err(RagchatError::validation("Please enter your email address."));
        }
        if !is_valid_email(email) {
            return Err(RagchatError::validation(
                "Please enter a valid email address.",
            ));
        }
        if self.session.quota_unlocked {
            return Ok(());
        }

        self.session.user_email = Some(email.to_string());
        self.session.quota_unlocked = true;
        info!("Email captured, query limit lifted");
        Ok(())
    }

    /// Changes the active mode and announces it.
    ///
    /// A welcome banner for the previous mode at the end of the conversation
    /// is replaced rather than stacked. Returns false if `mode` was already
    /// active.
    pub fn switch_mode(&mut self, mode: QueryMode) -> bool {
        let previous = self.session.selected_mode;
        if previous == mode {
            return false;
        }

        self.session.selected_mode = mode;
        match self.session.last_message_mut() {
            Some(last) if last.welcome == Some(previous) => *last = Message::welcome(mode),
            _ => self.session.push(Message::welcome(mode)),
        }
        debug!(from = %previous, to = %mode, "Mode switched");
        true
    }

    /// Starts over with a single welcome message for the current mode.
    pub fn clear(&mut self) {
        self.session.reset();
        info!("Conversation cleared");
    }

    /// Sets the number of documents requested per query.
    pub fn set_top_k(&mut self, top_k: u32) -> Result<()> {
        if top_k == 0 || top_k > self.max_top_k {
            return Err(RagchatError::validation(format!(
                "Documents per query must be between 1 and {}.",
                self.max_top_k
            )));
        }
        self.session.top_k = top_k;
        Ok(())
    }

    /// PDFs offered by the newest assistant message that has any.
    ///
    /// Falls back to the session's preparation document URL once the backend
    /// has assigned a session id.
    pub fn latest_artifacts(&self) -> Vec<Artifact> {
        let from_messages = self
            .session
            .messages
            .iter()
            .rev()
            .filter(|message| !message.is_user())
            .map(message_artifacts)
            .find(|artifacts| !artifacts.is_empty());

        match from_messages {
            Some(artifacts) => artifacts,
            None => self
                .session
                .session_id
                .as_ref()
                .map(|id| {
                    vec![Artifact {
                        kind: ArtifactKind::Preparation,
                        path: format!("/api/pdf/download/{id}"),
                    }]
                })
                .unwrap_or_default(),
        }
    }

    /// Markdown transcript of the conversation.
    pub fn export_markdown(&self) -> String {
        format_chat_export(&self.session.messages, Local::now())
    }
}

/// Downloadable artifacts advertised on a single message.
pub fn message_artifacts(message: &Message) -> Vec<Artifact> {
    let mut artifacts = Vec::new();
    if message.pdf_available {
        let path = message.pdf_download_url.clone().or_else(|| {
            message
                .session_id
                .as_ref()
                .map(|id| format!("/api/pdf/download/{id}"))
        });
        if let Some(path) = path {
            artifacts.push(Artifact {
                kind: ArtifactKind::Preparation,
                path,
            });
        }
    }
    if message.summary_pdf_available {
        if let Some(path) = message.summary_pdf_download_url.clone() {
            artifacts.push(Artifact {
                kind: ArtifactKind::Summary,
                path,
            });
        }
    }
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use ragchat_core::backend::{EventStream, HealthData};
    use ragchat_core::session::{MessageRole, QUOTA_THRESHOLD};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend double that replays scripted answers and records requests.
    #[derive(Default)]
    struct MockBackend {
        answers: Mutex<VecDeque<Option<QueryAnswer>>>,
        streams: Mutex<VecDeque<Vec<StreamEvent>>>,
        requests: Mutex<Vec<QueryRequest>>,
        get_calls: Mutex<u32>,
    }

    impl MockBackend {
        fn with_answers(answers: Vec<Option<QueryAnswer>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                ..Default::default()
            })
        }

        fn with_streams(streams: Vec<Vec<StreamEvent>>) -> Arc<Self> {
            Arc::new(Self {
                streams: Mutex::new(streams.into()),
                ..Default::default()
            })
        }

        fn requests(&self) -> Vec<QueryRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryBackend for MockBackend {
        async fn check_health(&self) -> HealthReport {
            HealthReport::healthy(HealthData::default())
        }

        async fn query(&self, request: &QueryRequest) -> Option<QueryAnswer> {
            self.requests.lock().unwrap().push(request.clone());
            self.answers.lock().unwrap().pop_front().flatten()
        }

        async fn query_get(&self, request: &QueryRequest) -> Option<QueryAnswer> {
            *self.get_calls.lock().unwrap() += 1;
            self.query(request).await
        }

        async fn query_stream(&self, request: &QueryRequest) -> EventStream {
            self.requests.lock().unwrap().push(request.clone());
            let events = self.streams.lock().unwrap().pop_front().unwrap_or_default();
            stream::iter(events).boxed()
        }
    }

    fn answer(text: &str, session_id: Option<&str>) -> Option<QueryAnswer> {
        Some(QueryAnswer {
            answer: text.to_string(),
            session_id: session_id.map(str::to_string),
            ..Default::default()
        })
    }

    fn controller(backend: Arc<MockBackend>) -> ChatController {
        ChatController::new(backend, &Settings::default())
    }

    #[tokio::test]
    async fn test_successful_submissions_grow_by_two() {
        let backend = MockBackend::with_answers(vec![
            answer("one", Some("s-1")),
            answer("two", None),
            answer("three", None),
        ]);
        let mut controller = controller(backend);
        controller.capture_email("a@b.co").unwrap();
        let initial = controller.session().messages.len();

        for (n, question) in ["q1", "q2", "q3"].iter().enumerate() {
            let outcome = controller.submit(question).await.unwrap();
            assert_eq!(outcome, SubmitOutcome::Answered);
            assert_eq!(controller.session().messages.len(), initial + 2 * (n + 1));
        }

        let messages = &controller.session().messages;
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "q1");
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[2].content, "one");
        assert_eq!(messages[2].mode, Some(QueryMode::Knowledge));
    }

    #[tokio::test]
    async fn test_query_count_counts_failures_too() {
        let backend = MockBackend::with_answers(vec![None, answer("ok", None)]);
        let mut controller = controller(backend);

        assert_eq!(controller.submit("first").await.unwrap(), SubmitOutcome::Failed);
        assert_eq!(controller.session().query_count, 1);
        let failure = controller.session().last_message().unwrap();
        assert!(failure.error);
        assert_eq!(failure.content, GENERIC_FAILURE);

        assert_eq!(controller.submit("second").await.unwrap(), SubmitOutcome::Answered);
        assert_eq!(controller.session().query_count, 2);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let backend = MockBackend::with_answers(vec![]);
        let mut controller = controller(backend.clone());

        assert_eq!(controller.submit("   ").await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(controller.session().query_count, 0);
        assert_eq!(controller.session().messages.len(), 1);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_session_id_is_sticky() {
        let backend = MockBackend::with_answers(vec![
            answer("a", None),
            answer("b", Some("sess-1")),
            answer("c", None),
            None,
        ]);
        let mut controller = controller(backend.clone());
        controller.capture_email("a@b.co").unwrap();

        controller.submit("q1").await.unwrap();
        assert_eq!(controller.session().session_id, None);

        controller.submit("q2").await.unwrap();
        assert_eq!(controller.session().session_id.as_deref(), Some("sess-1"));

        controller.submit("q3").await.unwrap();
        assert_eq!(controller.session().session_id.as_deref(), Some("sess-1"));

        controller.submit("q4").await.unwrap();
        assert_eq!(controller.session().session_id.as_deref(), Some("sess-1"));

        let sent: Vec<Option<String>> = backend
            .requests()
            .into_iter()
            .map(|request| request.session_id)
            .collect();
        assert_eq!(
            sent,
            vec![
                None,
                None,
                Some("sess-1".to_string()),
                Some("sess-1".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_requests_carry_mode_and_top_k() {
        let backend = MockBackend::with_answers(vec![answer("plan", None)]);
        let mut controller = controller(backend.clone());
        controller.switch_mode(QueryMode::Preparation);
        controller.set_top_k(8).unwrap();

        controller.submit("Prepare my review").await.unwrap();

        let request = &backend.requests()[0];
        assert_eq!(request.question, "Prepare my review");
        assert_eq!(request.mode, QueryMode::Preparation);
        assert_eq!(request.top_k, Some(8));
        let reply = controller.session().last_message().unwrap();
        assert_eq!(reply.mode, Some(QueryMode::Preparation));
    }

    #[tokio::test]
    async fn test_quota_blocks_fourth_submission() {
        let backend = MockBackend::with_answers(vec![
            answer("1", None),
            answer("2", None),
            answer("3", None),
            answer("4", None),
        ]);
        let mut controller = controller(backend.clone());

        for question in ["q1", "q2", "q3"] {
            controller.submit(question).await.unwrap();
        }
        assert!(controller.is_quota_blocked());
        let before = controller.session().clone();

        let err = controller.submit("q4").await.unwrap_err();
        assert_eq!(
            err,
            RagchatError::QuotaExceeded {
                used: QUOTA_THRESHOLD,
                limit: QUOTA_THRESHOLD
            }
        );
        assert_eq!(controller.session(), &before);
        assert_eq!(backend.requests().len(), 3);

        controller.capture_email("a@b.co").unwrap();
        assert!(!controller.is_quota_blocked());
        assert_eq!(controller.submit("q4").await.unwrap(), SubmitOutcome::Answered);
        assert_eq!(controller.session().query_count, 4);
    }

    #[tokio::test]
    async fn test_unlocked_quota_is_unbounded() {
        let answers = (0..10).map(|i| answer(&i.to_string(), None)).collect();
        let backend = MockBackend::with_answers(answers);
        let mut controller = controller(backend);
        controller.capture_email("someone@example.com").unwrap();

        for i in 0..10 {
            controller.submit(&format!("q{i}")).await.unwrap();
        }
        assert_eq!(controller.session().query_count, 10);
        assert_eq!(controller.quota_status().remaining(), 0);
    }

    #[test]
    fn test_capture_email() {
        let mut controller = controller(MockBackend::with_answers(vec![]));

        let err = controller.capture_email("not-an-email").unwrap_err();
        assert_eq!(
            err,
            RagchatError::validation("Please enter a valid email address.")
        );
        assert!(!controller.session().quota_unlocked);
        assert_eq!(controller.session().user_email, None);

        let err = controller.capture_email("  ").unwrap_err();
        assert_eq!(err, RagchatError::validation("Please enter your email address."));

        controller.capture_email("a@b.co").unwrap();
        assert!(controller.session().quota_unlocked);
        assert_eq!(controller.session().user_email.as_deref(), Some("a@b.co"));

        controller.capture_email("other@b.co").unwrap();
        assert_eq!(controller.session().user_email.as_deref(), Some("a@b.co"));
    }

    #[tokio::test]
    async fn test_capture_email_keeps_used_slots() {
        let backend = MockBackend::with_answers(vec![answer("1", None), answer("2", None)]);
        let mut controller = controller(backend);
        controller.submit("q1").await.unwrap();
        controller.submit("q2").await.unwrap();

        controller.capture_email("a@b.co").unwrap();

        assert_eq!(controller.session().query_count, 2);
    }

    #[test]
    fn test_mode_switch_replaces_trailing_welcome() {
        let mut controller = controller(MockBackend::with_answers(vec![]));

        assert!(controller.switch_mode(QueryMode::Preparation));
        assert_eq!(controller.session().messages.len(), 1);
        assert_eq!(
            controller.session().messages[0].welcome,
            Some(QueryMode::Preparation)
        );

        assert!(controller.switch_mode(QueryMode::Knowledge));
        assert_eq!(controller.session().messages.len(), 1);
        assert_eq!(
            controller.session().messages[0].welcome,
            Some(QueryMode::Knowledge)
        );

        assert!(!controller.switch_mode(QueryMode::Knowledge));
        assert_eq!(controller.session().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_mode_switch_after_conversation_appends() {
        let backend = MockBackend::with_answers(vec![answer("a", Some("s"))]);
        let mut controller = controller(backend);
        controller.submit("q").await.unwrap();

        controller.switch_mode(QueryMode::Preparation);
        let session = controller.session();
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[3].welcome, Some(QueryMode::Preparation));
        assert_eq!(session.query_count, 1);
        assert_eq!(session.session_id.as_deref(), Some("s"));

        controller.switch_mode(QueryMode::Knowledge);
        controller.switch_mode(QueryMode::Preparation);
        let session = controller.session();
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[3].welcome, Some(QueryMode::Preparation));
        assert_eq!(session.query_count, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_session() {
        let backend = MockBackend::with_answers(vec![answer("a", Some("s-1"))]);
        let mut controller = controller(backend);
        controller.capture_email("a@b.co").unwrap();
        controller.switch_mode(QueryMode::Preparation);
        controller.submit("q").await.unwrap();

        controller.clear();

        let session = controller.session();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].welcome, Some(QueryMode::Preparation));
        assert_eq!(session.query_count, 0);
        assert_eq!(session.session_id, None);
        assert!(!session.quota_unlocked);
        assert_eq!(session.user_email, None);
        assert_eq!(session.selected_mode, QueryMode::Preparation);
    }

    #[tokio::test]
    async fn test_get_transport() {
        let backend = MockBackend::with_answers(vec![answer("via get", None)]);
        let mut controller = controller(backend.clone()).with_transport(QueryTransport::Get);

        assert_eq!(controller.submit("q").await.unwrap(), SubmitOutcome::Answered);
        assert_eq!(*backend.get_calls.lock().unwrap(), 1);
        assert_eq!(controller.session().last_message().unwrap().content, "via get");
    }

    #[tokio::test]
    async fn test_streaming_reconstruction() {
        let backend = MockBackend::with_streams(vec![vec![
            StreamEvent::chunk("Hel"),
            StreamEvent::chunk("lo"),
            StreamEvent::complete(Some("s-7".to_string()), vec!["doc1.pdf".to_string()]),
        ]]);
        let mut controller = controller(backend).with_transport(QueryTransport::Stream);

        let mut snapshots = Vec::new();
        let outcome = controller
            .submit_with("Greet me", |session| {
                snapshots.push(session.last_message().map(|m| m.content.clone()))
            })
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Answered);
        let session = controller.session();
        assert_eq!(session.messages.len(), 3);
        let reply = session.last_message().unwrap();
        assert_eq!(reply.content, "Hello");
        assert_eq!(reply.sources, vec!["doc1.pdf".to_string()]);
        assert!(!reply.error);
        assert_eq!(session.session_id.as_deref(), Some("s-7"));
        assert_eq!(
            snapshots,
            vec![
                Some("Greet me".to_string()),
                Some("Hel".to_string()),
                Some("Hello".to_string()),
                Some("Hello".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_streaming_error_finalises_single_error_message() {
        let backend = MockBackend::with_streams(vec![vec![
            StreamEvent::chunk("partial"),
            StreamEvent::error("model overloaded"),
        ]]);
        let mut controller = controller(backend).with_transport(QueryTransport::Stream);

        let outcome = controller.submit("q").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Failed);
        let session = controller.session();
        assert_eq!(session.messages.len(), 3);
        let reply = session.last_message().unwrap();
        assert!(reply.error);
        assert!(reply.content.starts_with(GENERIC_FAILURE));
        assert!(reply.content.ends_with("model overloaded"));
        assert_eq!(session.query_count, 1);
    }

    #[tokio::test]
    async fn test_streaming_error_before_any_chunk() {
        let backend =
            MockBackend::with_streams(vec![vec![StreamEvent::error("Backend error: HTTP 502")]]);
        let mut controller = controller(backend).with_transport(QueryTransport::Stream);

        assert_eq!(controller.submit("q").await.unwrap(), SubmitOutcome::Failed);
        assert_eq!(controller.session().messages.len(), 3);
        assert!(controller.session().last_message().unwrap().error);
    }

    #[tokio::test]
    async fn test_streaming_without_terminal_event_fails() {
        let backend = MockBackend::with_streams(vec![vec![StreamEvent::chunk("dangling")]]);
        let mut controller = controller(backend).with_transport(QueryTransport::Stream);

        assert_eq!(controller.submit("q").await.unwrap(), SubmitOutcome::Failed);
        assert_eq!(controller.session().messages.len(), 3);
        assert!(controller.session().last_message().unwrap().error);
    }

    #[test]
    fn test_set_top_k_bounds() {
        let mut controller = controller(MockBackend::with_answers(vec![]));
        assert!(controller.set_top_k(0).is_err());
        assert!(controller.set_top_k(21).is_err());
        controller.set_top_k(20).unwrap();
        assert_eq!(controller.session().top_k, 20);
    }

    #[tokio::test]
    async fn test_latest_artifacts() {
        let backend = MockBackend::with_answers(vec![
            Some(QueryAnswer {
                answer: "Here is your plan".to_string(),
                session_id: Some("s-1".to_string()),
                pdf_available: true,
                pdf_download_url: Some("/api/pdf/download/s-1".to_string()),
                summary_pdf_available: true,
                summary_pdf_download_url: Some("/api/pdf/summary/s-1".to_string()),
                ..Default::default()
            }),
            answer("follow-up", None),
        ]);
        let mut controller = controller(backend);
        assert!(controller.latest_artifacts().is_empty());

        controller.submit("plan").await.unwrap();
        controller.submit("more").await.unwrap();

        assert_eq!(
            controller.latest_artifacts(),
            vec![
                Artifact {
                    kind: ArtifactKind::Preparation,
                    path: "/api/pdf/download/s-1".to_string()
                },
                Artifact {
                    kind: ArtifactKind::Summary,
                    path: "/api/pdf/summary/s-1".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_latest_artifacts_falls_back_to_session_pdf() {
        let backend = MockBackend::with_answers(vec![answer("a", Some("s-2"))]);
        let mut controller = controller(backend);
        controller.submit("q").await.unwrap();

        assert_eq!(
            controller.latest_artifacts(),
            vec![Artifact {
                kind: ArtifactKind::Preparation,
                path: "/api/pdf/download/s-2".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_export_markdown() {
        let backend = MockBackend::with_answers(vec![answer("Fire exits are marked green.", None)]);
        let mut controller = controller(backend);
        controller.submit("Where are the fire exits?").await.unwrap();

        let export = controller.export_markdown();
        assert!(export.contains("Total messages: 3"));
        assert!(export.contains("Where are the fire exits?"));
        assert!(export.contains("Fire exits are marked green."));
    }
}
