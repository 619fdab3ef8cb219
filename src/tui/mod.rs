mod ui;
mod widgets;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::api::TrackerApi;
use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, Problem, Registration, User};
use crate::session::{AuthStatus, SessionContext, SessionStore, StoredSession};
use crate::workflow::{
    fetch_snapshot, reconcile_toggle, Dashboard, Snapshot, ToggleOutcome, ToggleStatus,
    TopicRefresh,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Topics,
    Progress,
    Profile,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Topics => View::Progress,
            View::Progress => View::Profile,
            View::Profile => View::Topics,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Topics => View::Profile,
            View::Progress => View::Topics,
            View::Profile => View::Progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Topics,
    Problems,
}

/// Highlight position in a list whose items live elsewhere.
#[derive(Debug, Default)]
pub struct ListCursor {
    pub selected: Option<usize>,
}

impl ListCursor {
    fn next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < len => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self, len: usize) {
        self.selected = if len == 0 { None } else { Some(0) };
    }

    fn last(&mut self, len: usize) {
        self.selected = len.checked_sub(1);
    }

    fn clamp(&mut self, len: usize) {
        self.selected = match self.selected {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Name,
    Email,
    Password,
}

#[derive(Debug)]
pub struct LoginForm {
    pub register: bool,
    pub name: String,
    pub email: String,
    pub password: String,
    pub field: LoginField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            register: false,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            field: LoginField::Email,
            error: None,
            submitting: false,
        }
    }
}

impl LoginForm {
    pub fn fields(&self) -> &'static [LoginField] {
        if self.register {
            &[LoginField::Name, LoginField::Email, LoginField::Password]
        } else {
            &[LoginField::Email, LoginField::Password]
        }
    }

    fn move_field(&mut self, forward: bool) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.field = fields[next];
    }

    fn input_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_mode(&mut self) {
        self.register = !self.register;
        self.field = if self.register {
            LoginField::Name
        } else {
            LoginField::Email
        };
        self.error = None;
    }
}

enum AppEvent {
    SessionChecked(Result<User, ApiError>),
    LoggedIn(Result<AuthResponse, ApiError>),
    Refreshed {
        snapshot: Snapshot,
        refresh: TopicRefresh,
        /// Toggles applied when the refresh was started.
        generation: u64,
    },
    ProblemsLoaded {
        topic_id: String,
        result: Result<Vec<Problem>, ApiError>,
    },
    ToggleFinished(ToggleOutcome),
    ProfileLoaded(Result<User, ApiError>),
}

pub struct App {
    runtime: Handle,
    api: Arc<dyn TrackerApi>,
    session: SessionContext,
    store: SessionStore,
    tx: UnboundedSender<(u64, AppEvent)>,
    rx: UnboundedReceiver<(u64, AppEvent)>,
    /// Bumped on logout; results of work spawned before then are dropped.
    session_epoch: u64,
    /// Number of toggles whose reconciliation has been applied.
    toggle_generation: u64,
    pub auth: AuthStatus,
    pub view: View,
    pub pane: Pane,
    pub dashboard: Dashboard,
    pub topic_cursor: ListCursor,
    pub problem_cursor: ListCursor,
    pub login: LoginForm,
    pub user: Option<User>,
    pub status: Option<String>,
    pub refreshing: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        runtime: Handle,
        api: Arc<dyn TrackerApi>,
        session: SessionContext,
        store: SessionStore,
        user: Option<User>,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let auth = session.initial_status();
        let app = Self {
            runtime,
            api,
            session,
            store,
            tx,
            rx,
            session_epoch: 0,
            toggle_generation: 0,
            auth,
            view: View::Topics,
            pane: Pane::Topics,
            dashboard: Dashboard::new(),
            topic_cursor: ListCursor::default(),
            problem_cursor: ListCursor::default(),
            login: LoginForm::default(),
            user,
            status: None,
            refreshing: false,
            should_quit: false,
        };

        if app.auth == AuthStatus::Unknown {
            app.spawn(|api| async move { AppEvent::SessionChecked(api.profile().await) });
        }
        app
    }

    fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(Arc<dyn TrackerApi>) -> Fut,
        Fut: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let epoch = self.session_epoch;
        let fut = task(Arc::clone(&self.api));
        self.runtime.spawn(async move {
            let _ = tx.send((epoch, fut.await));
        });
    }

    fn start_refresh(&mut self, refresh: TopicRefresh) {
        self.refreshing = true;
        let selected = self.dashboard.selected_topic_id().map(str::to_string);
        let generation = self.toggle_generation;
        self.spawn(move |api| async move {
            let snapshot = fetch_snapshot(api.as_ref(), selected, refresh).await;
            AppEvent::Refreshed {
                snapshot,
                refresh,
                generation,
            }
        });
    }

    fn open_topic(&mut self) {
        let Some(topic_id) = self
            .topic_cursor
            .selected
            .and_then(|i| self.dashboard.topics().get(i))
            .map(|t| t.id.clone())
        else {
            return;
        };

        if self.dashboard.select_topic(&topic_id) {
            self.problem_cursor = ListCursor::default();
            self.spawn(move |api| async move {
                let result = api.problems_for_topic(&topic_id).await;
                AppEvent::ProblemsLoaded { topic_id, result }
            });
        }
        self.pane = Pane::Problems;
    }

    fn toggle_selected_problem(&mut self) {
        let Some(problem_id) = self
            .problem_cursor
            .selected
            .and_then(|i| self.dashboard.problems().get(i))
            .map(|p| p.id.clone())
        else {
            return;
        };

        // Busy rows keep their checkbox disabled until reconciliation lands.
        let Some(pending) = self.dashboard.begin_toggle(&problem_id) else {
            return;
        };
        self.spawn(move |api| async move {
            AppEvent::ToggleFinished(reconcile_toggle(api.as_ref(), pending).await)
        });
    }

    fn submit_login(&mut self) {
        if self.login.submitting {
            return;
        }
        let credentials = match Credentials::new(&self.login.email, &self.login.password) {
            Ok(c) => c,
            Err(e) => {
                self.login.error = Some(e.to_string());
                return;
            }
        };
        let registration = if self.login.register {
            match Registration::new(&self.login.name, &self.login.email, &self.login.password) {
                Ok(r) => Some(r),
                Err(e) => {
                    self.login.error = Some(e.to_string());
                    return;
                }
            }
        } else {
            None
        };

        self.login.error = None;
        self.login.submitting = true;
        self.spawn(move |api| async move {
            if let Some(registration) = registration {
                if let Err(e) = api.register(&registration).await {
                    return AppEvent::LoggedIn(Err(e));
                }
            }
            AppEvent::LoggedIn(api.login(&credentials).await)
        });
    }

    fn enter_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        self.view = view;
        match view {
            View::Topics => {}
            View::Progress => self.start_refresh(TopicRefresh::Reconcile),
            View::Profile => {
                self.spawn(|api| async move { AppEvent::ProfileLoaded(api.profile().await) });
                self.start_refresh(TopicRefresh::Reconcile);
            }
        }
    }

    fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to remove stored session");
        }
        self.session.clear();
        self.session_epoch += 1;
        self.auth = AuthStatus::Unauthenticated;
        self.user = None;
        self.dashboard = Dashboard::new();
        self.topic_cursor = ListCursor::default();
        self.problem_cursor = ListCursor::default();
        self.view = View::Topics;
        self.pane = Pane::Topics;
        self.refreshing = false;
        self.status = None;
        self.login = LoginForm::default();
    }

    fn session_expired(&mut self) {
        info!("session rejected by server, returning to login");
        self.logout();
    }

    fn sync_cursors(&mut self) {
        let selected_index = self
            .dashboard
            .selected_topic_id()
            .and_then(|id| self.dashboard.topics().iter().position(|t| t.id == id));
        match selected_index {
            Some(i) if self.topic_cursor.selected.is_none() => self.topic_cursor.selected = Some(i),
            _ => self.topic_cursor.clamp(self.dashboard.topics().len()),
        }
        self.problem_cursor.clamp(self.dashboard.problems().len());
        if self.dashboard.selected_topic_id().is_none() {
            self.pane = Pane::Topics;
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChecked(Ok(user)) => {
                self.user = Some(user);
                self.auth = AuthStatus::Authenticated;
                self.start_refresh(TopicRefresh::Initial);
            }
            AppEvent::SessionChecked(Err(e)) if e.is_unauthorized() => self.session_expired(),
            AppEvent::SessionChecked(Err(e)) => {
                // Keep the token; reads degrade to stale data until the server is back.
                warn!(error = %e, "could not verify session");
                self.auth = AuthStatus::Authenticated;
                self.start_refresh(TopicRefresh::Initial);
            }
            AppEvent::LoggedIn(result) => {
                self.login.submitting = false;
                match result {
                    Ok(response) => {
                        self.session.set_token(response.token.clone());
                        if let Err(e) = self.store.save(&StoredSession::from_login(&response)) {
                            warn!(error = %e, "failed to persist session");
                        }
                        self.user = Some(response.user);
                        self.auth = AuthStatus::Authenticated;
                        self.login = LoginForm::default();
                        self.dashboard = Dashboard::new();
                        self.start_refresh(TopicRefresh::Initial);
                    }
                    Err(e) => {
                        warn!(error = %e, "login failed");
                        self.login.error = Some(e.user_message());
                    }
                }
            }
            // Anything below only matters while signed in.
            _ if self.auth != AuthStatus::Authenticated => {}
            AppEvent::Refreshed {
                snapshot,
                refresh,
                generation,
            } => {
                self.refreshing = false;
                if snapshot.is_unauthorized() {
                    return self.session_expired();
                }
                if generation == self.toggle_generation {
                    self.dashboard.apply_snapshot(snapshot, refresh);
                } else if let Some((topic_id, result)) = snapshot.problems {
                    // Counts may predate a toggle that has since been reconciled.
                    debug!("refresh overtaken by a toggle, keeping reconciled counts");
                    self.dashboard.apply_problems(&topic_id, result);
                }
                self.sync_cursors();
            }
            AppEvent::ProblemsLoaded { topic_id, result } => {
                if matches!(&result, Err(e) if e.is_unauthorized()) {
                    return self.session_expired();
                }
                self.dashboard.apply_problems(&topic_id, result);
                self.problem_cursor.clamp(self.dashboard.problems().len());
            }
            AppEvent::ToggleFinished(outcome) => {
                if outcome.is_unauthorized() {
                    return self.session_expired();
                }
                let status = self.dashboard.finish_toggle(outcome);
                if status != ToggleStatus::WriteFailed {
                    self.toggle_generation += 1;
                }
                self.status = match status {
                    ToggleStatus::Synced => None,
                    ToggleStatus::Stale => {
                        Some("Saved, but counts may be out of date".to_string())
                    }
                    ToggleStatus::WriteFailed => Some("Could not update problem".to_string()),
                };
                self.sync_cursors();
            }
            AppEvent::ProfileLoaded(Ok(user)) => self.user = Some(user),
            AppEvent::ProfileLoaded(Err(e)) if e.is_unauthorized() => self.session_expired(),
            AppEvent::ProfileLoaded(Err(e)) => warn!(error = %e, "failed to fetch profile"),
        }
    }

    fn receive(&mut self, epoch: u64, event: AppEvent) {
        if epoch != self.session_epoch {
            debug!(epoch, current = self.session_epoch, "dropping result from an earlier session");
            return;
        }
        self.handle_event(event);
    }

    fn drain_events(&mut self) {
        while let Ok((epoch, event)) = self.rx.try_recv() {
            self.receive(epoch, event);
        }
    }

    fn handle_login_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.login.toggle_mode()
            }
            KeyCode::Tab | KeyCode::Down => self.login.move_field(true),
            KeyCode::BackTab | KeyCode::Up => self.login.move_field(false),
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => {
                self.login.input_mut().pop();
                self.login.error = None;
            }
            KeyCode::Char(c) => {
                self.login.input_mut().push(c);
                self.login.error = None;
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.auth {
            AuthStatus::Unknown => return,
            AuthStatus::Unauthenticated => return self.handle_login_key(key, modifiers),
            AuthStatus::Authenticated => {}
        }

        let topics_len = self.dashboard.topics().len();
        let problems_len = self.dashboard.problems().len();

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = None;
                self.start_refresh(TopicRefresh::Reconcile);
            }

            KeyCode::Char('X') => self.logout(),

            KeyCode::Tab => self.enter_view(self.view.next()),
            KeyCode::BackTab => self.enter_view(self.view.prev()),
            KeyCode::Char('1') => self.enter_view(View::Topics),
            KeyCode::Char('2') => self.enter_view(View::Progress),
            KeyCode::Char('3') => self.enter_view(View::Profile),

            // Pane focus within the topics view: h/l like vim
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc if self.view == View::Topics => {
                self.pane = Pane::Topics;
            }
            KeyCode::Char('l') | KeyCode::Right if self.view == View::Topics => {
                match self.pane {
                    Pane::Topics => self.open_topic(),
                    Pane::Problems => {}
                }
            }
            KeyCode::Enter if self.view == View::Topics && self.pane == Pane::Topics => {
                self.open_topic();
            }

            KeyCode::Char('j') | KeyCode::Down => match self.pane {
                Pane::Topics => self.topic_cursor.next(topics_len),
                Pane::Problems => self.problem_cursor.next(problems_len),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.pane {
                Pane::Topics => self.topic_cursor.previous(topics_len),
                Pane::Problems => self.problem_cursor.previous(problems_len),
            },
            KeyCode::Char('g') => match self.pane {
                Pane::Topics => self.topic_cursor.first(topics_len),
                Pane::Problems => self.problem_cursor.first(problems_len),
            },
            KeyCode::Char('G') => match self.pane {
                Pane::Topics => self.topic_cursor.last(topics_len),
                Pane::Problems => self.problem_cursor.last(problems_len),
            },

            KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter
                if self.view == View::Topics && self.pane == Pane::Problems =>
            {
                self.toggle_selected_problem();
            }

            _ => {}
        }
    }
}

pub fn run(
    runtime: Handle,
    api: Arc<dyn TrackerApi>,
    session: SessionContext,
    store: SessionStore,
    user: Option<User>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(runtime, api, session, store, user);

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.drain_events();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
