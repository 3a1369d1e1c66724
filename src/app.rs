use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use guider_core::{
    begin_submission, complete_submission, AdvisorClient, ChatTurn, ClientResult, Config,
    RevealProgress, RevealTimer, Session, SessionId, SessionSummary, Theme, UserProfile,
};

use crate::tui::AppEvent;

/// Shown when a background task dies instead of returning an answer
pub const TASK_FAILED_MESSAGE: &str = "Something went wrong. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    History,
}

/// Result of a history request
#[derive(Debug)]
pub enum HistoryResult {
    Sessions(Vec<SessionSummary>),
    Conversation(SessionId, Vec<ChatTurn>),
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub theme: Theme,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub input_error: Option<String>,
    pub status: Option<String>,

    // Conversation state
    pub session: Session,
    pub loading: bool,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_output: bool,
    pub query_task: Option<JoinHandle<ClientResult<String>>>,
    pub reveal_timer: RevealTimer,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // History sidebar
    pub show_history: bool,
    pub history: Vec<SessionSummary>,
    pub history_state: ListState,
    pub history_task: Option<JoinHandle<ClientResult<HistoryResult>>>,
    pub opening_conversation: bool, // history_task will replace the session

    // Profile popup
    pub show_profile: bool,
    pub profile: UserProfile,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub history_area: Option<Rect>,

    pub client: AdvisorClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, client: AdvisorClient, events: UnboundedSender<AppEvent>) -> Self {
        let profile = UserProfile::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not load profile, using defaults");
            UserProfile::default()
        });

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,
            theme: config.theme(),

            input: String::new(),
            input_cursor: 0,
            input_error: None,
            status: None,

            session: Session::new(),
            loading: false,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_output: true,
            query_task: None,
            reveal_timer: RevealTimer::new(config.reveal_interval()),

            animation_frame: 0,

            show_history: false,
            history: Vec::new(),
            history_state: ListState::default(),
            history_task: None,
            opening_conversation: false,

            show_profile: false,
            profile,

            chat_area: None,
            history_area: None,

            client,
            events,
        }
    }

    /// Sends the current input to the backend, unless a request is in flight
    /// or a stored conversation is about to replace the session
    pub fn submit(&mut self) {
        if self.opening_conversation {
            self.status = Some("Loading conversation...".to_string());
            return;
        }
        if self.query_task.is_some() {
            return;
        }

        let submission = match begin_submission(&mut self.session, &self.input) {
            Ok(submission) => submission,
            Err(message) => {
                self.input_error = Some(message.to_string());
                return;
            }
        };

        self.input.clear();
        self.input_cursor = 0;
        self.input_error = None;
        self.loading = true;
        self.follow_output = true;

        let client = self.client.clone();
        let tx = self.events.clone();
        self.query_task = Some(tokio::spawn(async move {
            let result = client
                .send_message(&submission.session_id, &submission.message)
                .await;
            let _ = tx.send(AppEvent::TaskDone);
            result
        }));
    }

    /// Collects any finished background request
    pub async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                self.loading = false;
                match task.await {
                    Ok(result) => complete_submission(&mut self.session, result),
                    Err(err) => {
                        tracing::error!(error = %err, "chat request task failed");
                        self.session.push_assistant(TASK_FAILED_MESSAGE);
                    }
                }
                self.start_reveal();
            }
        }

        if self.history_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.history_task.take() {
                self.opening_conversation = false;
                match task.await {
                    Ok(Ok(result)) => self.apply_history(result),
                    Ok(Err(err)) => self.status = Some(format!("History unavailable: {}", err)),
                    Err(err) => {
                        tracing::error!(error = %err, "history task failed");
                        self.status = Some(TASK_FAILED_MESSAGE.to_string());
                    }
                }
            }
        }
    }

    /// Arms the reveal timer for the newest assistant turn
    fn start_reveal(&mut self) {
        if self.session.has_unsettled() {
            self.reveal_timer.arm(self.events.clone(), AppEvent::Reveal);
        }
    }

    /// Advances the typewriter by one tick (called by Reveal event)
    pub fn tick_reveal(&mut self) {
        match self.session.advance_reveal() {
            RevealProgress::Advanced => {}
            RevealProgress::Settled | RevealProgress::Idle => {
                if !self.session.has_unsettled() {
                    self.reveal_timer.disarm();
                }
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Clears the conversation and cancels everything tied to it
    pub fn new_chat(&mut self) {
        self.reveal_timer.disarm();
        if let Some(task) = self.query_task.take() {
            task.abort();
        }
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
        self.opening_conversation = false;
        self.session.clear();
        self.loading = false;
        self.chat_scroll = 0;
        self.follow_output = true;
        self.input_error = None;
        self.status = None;
        self.history_state.select(None);
        tracing::info!("started new chat");
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn shutdown(&mut self) {
        self.reveal_timer.disarm();
        if let Some(task) = self.query_task.take() {
            task.abort();
        }
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
        self.opening_conversation = false;
    }

    // History sidebar

    pub fn toggle_history(&mut self) {
        if !self.client.has_auth() {
            self.status = Some("Sign in (set GUIDER_AUTH_TOKEN) to see past chats".to_string());
            return;
        }
        self.show_history = !self.show_history;
        if self.show_history {
            self.focus = FocusPane::History;
            self.refresh_history();
        } else {
            self.focus = FocusPane::Chat;
        }
    }

    pub fn refresh_history(&mut self) {
        if self.history_task.is_some() {
            return;
        }
        let client = self.client.clone();
        let tx = self.events.clone();
        self.history_task = Some(tokio::spawn(async move {
            let result = client.list_sessions().await.map(HistoryResult::Sessions);
            let _ = tx.send(AppEvent::TaskDone);
            result
        }));
    }

    /// Loads the highlighted past conversation into the chat
    pub fn open_selected_history(&mut self) {
        if self.history_task.is_some() || self.query_task.is_some() {
            return;
        }
        let Some(summary) = self
            .history_state
            .selected()
            .and_then(|i| self.history.get(i))
        else {
            return;
        };

        let id = SessionId::from(summary.chat_session_id.clone());
        self.opening_conversation = true;
        let client = self.client.clone();
        let tx = self.events.clone();
        self.history_task = Some(tokio::spawn(async move {
            let result = client
                .fetch_session(&id)
                .await
                .map(|turns| HistoryResult::Conversation(id, turns));
            let _ = tx.send(AppEvent::TaskDone);
            result
        }));
    }

    fn apply_history(&mut self, result: HistoryResult) {
        match result {
            HistoryResult::Sessions(sessions) => {
                self.history = sessions;
                let selected = if self.history.is_empty() { None } else { Some(0) };
                self.history_state.select(selected);
                self.status = None;
            }
            HistoryResult::Conversation(id, turns) => {
                self.reveal_timer.disarm();
                self.session.load(id, turns);
                self.chat_scroll = 0;
                self.follow_output = true;
                self.focus = FocusPane::Chat;
                self.status = None;
            }
        }
    }

    pub fn history_nav_down(&mut self) {
        let len = self.history.len();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        let i = self.history_state.selected().unwrap_or(0);
        self.history_state.select(Some(i.saturating_sub(1)));
    }

    // Chat scrolling

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
        self.follow_output = false;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_output = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_output = true;
    }

    /// Clamps the scroll offset to the rendered height; pins it to the
    /// bottom while following output
    pub fn fit_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow_output || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_output = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = AdvisorClient::new("http://127.0.0.1:9", None);
        (App::new(&Config::default(), client, tx), rx)
    }

    #[tokio::test]
    async fn test_empty_submit_sets_inline_error() {
        let (mut app, _rx) = test_app();
        app.input = "   ".to_string();
        app.submit();
        assert_eq!(app.input_error.as_deref(), Some(guider_core::submit::EMPTY_INPUT_ERROR));
        assert!(app.session.is_empty());
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_reveal_ticks_disarm_when_settled() {
        let (mut app, _rx) = test_app();
        app.session.push_assistant("Hi!");
        app.start_reveal();
        assert!(app.reveal_timer.is_armed());

        for _ in 0..3 {
            app.tick_reveal();
        }
        assert!(!app.session.has_unsettled());
        assert!(!app.reveal_timer.is_armed());
    }

    #[tokio::test]
    async fn test_new_chat_cancels_reveal() {
        let (mut app, _rx) = test_app();
        app.session.push_user("question");
        app.session.push_assistant("a long answer that is still revealing");
        app.start_reveal();

        app.new_chat();
        assert!(!app.reveal_timer.is_armed());
        assert!(app.session.is_empty());
        assert!(app.session.current_id().is_none());
    }

    #[tokio::test]
    async fn test_failed_request_becomes_assistant_turn() {
        let (mut app, mut rx) = test_app();
        app.input = "Is CS8 required?".to_string();
        app.submit();
        assert!(app.loading);

        // Wait for the request task to report back
        while let Some(event) = rx.recv().await {
            if matches!(event, AppEvent::TaskDone) {
                break;
            }
        }
        app.poll_tasks().await;

        assert!(!app.loading);
        assert_eq!(app.session.turns().len(), 2);
        assert!(app
            .session
            .turns()[1]
            .content()
            .starts_with("Could not reach the advising service"));
        assert!(app.reveal_timer.is_armed());
    }

    #[tokio::test]
    async fn test_history_requires_auth() {
        let (mut app, _rx) = test_app();
        app.toggle_history();
        assert!(!app.show_history);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn test_second_submit_ignored_while_in_flight() {
        let (mut app, _rx) = test_app();
        app.input = "first".to_string();
        app.submit();
        assert!(app.query_task.is_some());

        app.input = "second".to_string();
        app.submit();
        assert_eq!(app.session.turns().len(), 1);
        assert_eq!(app.session.turns()[0].content(), "first");
        assert_eq!(app.input, "second");
        assert!(app.query_task.is_some());
    }

    #[tokio::test]
    async fn test_new_chat_aborts_pending_request() {
        let (mut app, _rx) = test_app();
        app.input = "first".to_string();
        app.submit();
        assert!(app.loading);

        app.new_chat();
        assert!(app.query_task.is_none());
        assert!(!app.loading);

        tokio::task::yield_now().await;
        app.poll_tasks().await;
        assert!(app.session.is_empty());
        assert!(app.session.current_id().is_none());
    }

    /// Stands in for `open_selected_history` with a fetch that waits on `gate`
    fn open_gated_conversation(app: &mut App) -> tokio::sync::oneshot::Sender<()> {
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
        app.opening_conversation = true;
        app.history_task = Some(tokio::spawn(async move {
            let _ = gate_rx.await;
            Ok(HistoryResult::Conversation(
                SessionId::from("old-session".to_string()),
                vec![
                    ChatTurn::user("old question"),
                    ChatTurn::settled_assistant("old answer"),
                ],
            ))
        }));
        gate_tx
    }

    #[tokio::test]
    async fn test_submit_waits_for_conversation_load() {
        let (mut app, _rx) = test_app();
        let gate = open_gated_conversation(&mut app);

        app.input = "new question".to_string();
        app.submit();
        assert!(app.query_task.is_none());
        assert!(app.session.is_empty());
        assert_eq!(app.input, "new question");
        assert!(app.status.is_some());

        let _ = gate.send(());
        while !app.history_task.as_ref().is_some_and(|t| t.is_finished()) {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;
        assert!(!app.opening_conversation);
        assert_eq!(app.session.turns().len(), 2);
        assert_eq!(app.session.current_id().map(|id| id.as_str()), Some("old-session"));

        app.submit();
        assert!(app.query_task.is_some());
        assert_eq!(app.session.turns().len(), 3);
        assert_eq!(app.session.turns()[2].content(), "new question");
        assert_eq!(app.session.current_id().map(|id| id.as_str()), Some("old-session"));
        app.shutdown();
    }

    #[tokio::test]
    async fn test_new_chat_aborts_conversation_load() {
        let (mut app, _rx) = test_app();
        let gate = open_gated_conversation(&mut app);

        app.new_chat();
        assert!(app.history_task.is_none());
        assert!(!app.opening_conversation);

        let _ = gate.send(());
        tokio::task::yield_now().await;
        app.poll_tasks().await;
        assert!(app.session.is_empty());
        assert!(app.session.current_id().is_none());
    }

    #[test]
    fn test_fit_scroll_follows_bottom() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let client = AdvisorClient::new("http://127.0.0.1:9", None);
        let mut app = App::new(&Config::default(), client, tx);
        app.chat_height = 10;
        app.fit_scroll(25);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_up(5);
        app.fit_scroll(30);
        assert_eq!(app.chat_scroll, 10);
    }
}
