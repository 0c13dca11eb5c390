mod ui;

use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::{self, stdin, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use quizlock::{
    app_dirs::AppDirs,
    attempt::{AttemptRecord, AttemptRecorder},
    attention::{AttentionSignal, TerminalFocusSource},
    config::{Config, ConfigStore, FileConfigStore},
    error::{SessionError, StoreError},
    history::SqliteAttemptStore,
    logging,
    proctor::ProctorMonitor,
    quiz::QuizCatalog,
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, Runner},
    session::{Phase, QuizSession, SubmitReason},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// proctored, timed quiz taking in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Take a timed quiz in the terminal. Leaving the terminal window raises warnings; too many warnings or running out of time submits the quiz automatically."
)]
pub struct Cli {
    /// id of the quiz to take
    #[clap(short = 'q', long)]
    quiz: Option<String>,

    /// participant identity recorded with the attempt
    #[clap(short = 'u', long)]
    participant: Option<String>,

    /// only list quizzes from this department
    #[clap(short = 'd', long)]
    department: Option<String>,

    /// directory of additional quiz json files
    #[clap(long)]
    quiz_dir: Option<PathBuf>,

    /// attempt database location
    #[clap(long)]
    db: Option<PathBuf>,

    /// list quizzes available to the participant and exit
    #[clap(short = 'l', long)]
    list: bool,

    /// write the participant's attempt history as csv and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// save the effective configuration to the config file and exit
    #[clap(long)]
    init_config: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config
    fn apply_to(&self, config: &mut Config) {
        if let Some(participant) = &self.participant {
            config.participant_id = Some(participant.clone());
        }
        if let Some(department) = &self.department {
            config.department = Some(department.clone());
        }
        if let Some(dir) = &self.quiz_dir {
            config.quiz_dir = Some(dir.clone());
        }
        if let Some(db) = &self.db {
            config.db_path = Some(db.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Intro,
    Quiz,
    ConfirmSubmit,
    Results,
    History,
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The quiz just started; restart the tick cadence
    Started,
    Quit,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub attempts: Vec<AttemptRecord>,
    pub subjects: Vec<String>,
    /// Index into `subjects`; `None` shows every subject
    pub subject_filter: Option<usize>,
    pub scroll_offset: usize,
}

impl HistoryState {
    pub fn selected_subject(&self) -> Option<&str> {
        self.subject_filter
            .and_then(|i| self.subjects.get(i))
            .map(String::as_str)
    }

    fn cycle_subject(&mut self) {
        self.subject_filter = match self.subject_filter {
            None if !self.subjects.is_empty() => Some(0),
            Some(i) if i + 1 < self.subjects.len() => Some(i + 1),
            _ => None,
        };
        self.scroll_offset = 0;
    }
}

pub struct App {
    pub session: QuizSession,
    pub recorder: AttemptRecorder,
    pub state: AppState,
    pub option_cursor: usize,
    pub history: HistoryState,
    pub quiz_titles: HashMap<String, String>,
    /// Last error worth showing to the participant
    pub status: Option<String>,
}

impl App {
    pub fn new(
        session: QuizSession,
        recorder: AttemptRecorder,
        quiz_titles: HashMap<String, String>,
    ) -> Self {
        Self {
            session,
            recorder,
            state: AppState::Intro,
            option_cursor: 0,
            history: HistoryState::default(),
            quiz_titles,
            status: None,
        }
    }

    pub fn on_tick(&mut self, now: Instant) -> Flow {
        self.session.refresh(now);
        let result = self.session.on_tick(&mut self.recorder);
        self.report(result);
        self.follow_phase();
        Flow::Continue
    }

    pub fn on_attention(&mut self, signal: AttentionSignal, now: Instant) -> Flow {
        let result = self.session.on_attention(signal, now, &mut self.recorder);
        self.report(result);
        self.follow_phase();
        Flow::Continue
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            // ctrl+c quits; an attempt in progress is submitted first
            if self.session.phase() == Phase::InProgress {
                self.submit();
            }
            return Flow::Quit;
        }

        let flow = match self.state {
            AppState::Intro => self.on_intro_key(key),
            AppState::Quiz => self.on_quiz_key(key),
            AppState::ConfirmSubmit => self.on_confirm_key(key),
            AppState::Results => self.on_results_key(key),
            AppState::History => self.on_history_key(key),
        };
        self.follow_phase();
        flow
    }

    fn on_intro_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Enter | KeyCode::Char('s') => match self.session.start() {
                Ok(()) => {
                    self.state = AppState::Quiz;
                    self.sync_cursor();
                    Flow::Started
                }
                Err(err) => {
                    self.report::<()>(Err(err));
                    Flow::Continue
                }
            },
            KeyCode::Char('h') => {
                self.open_history();
                Flow::Continue
            }
            KeyCode::Esc | KeyCode::Char('q') => Flow::Quit,
            _ => Flow::Continue,
        }
    }

    fn on_quiz_key(&mut self, key: KeyEvent) -> Flow {
        let option_count = self.session.current_question().option_count();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.option_cursor = self.option_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.option_cursor = (self.option_cursor + 1).min(option_count - 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let result = self.session.select_current(self.option_cursor);
                self.report(result);
            }
            KeyCode::Char(c @ '1'..='9') => {
                let option = c as usize - '1' as usize;
                if option < option_count {
                    self.option_cursor = option;
                    let result = self.session.select_current(option);
                    self.report(result);
                }
            }
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('p') => {
                self.session.previous();
                self.sync_cursor();
            }
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('n') => {
                self.session.next();
                self.sync_cursor();
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.session.go_to_question(0);
                self.sync_cursor();
            }
            KeyCode::End | KeyCode::Char('G') => {
                let count = self.session.quiz().question_count() as isize;
                self.session.go_to_question(count);
                self.sync_cursor();
            }
            KeyCode::Char('s') | KeyCode::Esc => {
                self.state = AppState::ConfirmSubmit;
            }
            _ => {}
        }
        Flow::Continue
    }

    fn on_confirm_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.submit(),
            KeyCode::Char('n') | KeyCode::Esc => self.state = AppState::Quiz,
            _ => {}
        }
        Flow::Continue
    }

    fn on_results_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Char('h') => {
                self.open_history();
                Flow::Continue
            }
            KeyCode::Esc | KeyCode::Char('q') => Flow::Quit,
            _ => Flow::Continue,
        }
    }

    fn on_history_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Up => {
                self.history.scroll_offset = self.history.scroll_offset.saturating_sub(1);
            }
            KeyCode::Down => {
                // Will check max scroll in render function
                self.history.scroll_offset += 1;
            }
            KeyCode::Tab => {
                self.history.cycle_subject();
                if let Err(err) = self.load_history() {
                    error!(%err, "failed to filter attempt history");
                    self.status = Some(format!("could not load history: {err}"));
                }
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                self.state = match self.session.phase() {
                    Phase::Submitted => AppState::Results,
                    _ => AppState::Intro,
                };
            }
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            _ => {}
        }
        Flow::Continue
    }

    fn submit(&mut self) {
        let result = self.session.submit(SubmitReason::Manual, &mut self.recorder);
        self.report(result);
    }

    fn open_history(&mut self) {
        self.history = HistoryState::default();
        match self.load_history() {
            Ok(()) => self.state = AppState::History,
            Err(err) => {
                error!(%err, "failed to load attempt history");
                self.status = Some(format!("could not load history: {err}"));
            }
        }
    }

    /// Query the attempt store for the participant's subjects and the
    /// attempts matching the selected subject filter
    fn load_history(&mut self) -> Result<(), StoreError> {
        let store = self.recorder.store();
        let participant = self.session.participant_id();
        let subjects = store.subjects_for(participant)?;
        let subject = self.history.selected_subject().map(str::to_string);
        let attempts = match &subject {
            Some(subject) => store.attempts_in_subject(participant, subject)?,
            None => store.attempts_for(participant)?,
        };

        // drop the filter if its subject is gone from the store
        self.history.subject_filter = subject.and_then(|s| subjects.iter().position(|x| *x == s));
        self.history.subjects = subjects;
        self.history.attempts = attempts;
        self.history.scroll_offset = 0;
        Ok(())
    }

    /// Leave the quiz screens once the session has been submitted
    fn follow_phase(&mut self) {
        if self.session.phase() == Phase::Submitted
            && matches!(self.state, AppState::Quiz | AppState::ConfirmSubmit)
        {
            self.state = AppState::Results;
        }
    }

    fn sync_cursor(&mut self) {
        self.option_cursor = self.session.current_answer().unwrap_or(0);
    }

    fn report<T>(&mut self, result: Result<T, SessionError>) {
        if let Err(err) = result {
            error!(%err, "session error");
            self.status = Some(err.to_string());
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);
    if let Err(err) = config.validate() {
        Cli::command().error(ErrorKind::InvalidValue, err).exit();
    }

    if cli.init_config {
        config_store.save(&config)?;
        println!("wrote {}", config_store.path().display());
        return Ok(());
    }

    let catalog = match QuizCatalog::load(config.quiz_dir.as_deref()) {
        Ok(catalog) => catalog,
        Err(err) => Cli::command().error(ErrorKind::Io, err).exit(),
    };
    let participant = config.resolved_participant();
    let db = SqliteAttemptStore::open(config.resolved_db_path())?;

    if cli.list {
        print_available(&catalog, &db, &config, &participant)?;
        return Ok(());
    }

    if let Some(path) = &cli.export {
        let written = db.export_csv(&participant, File::create(path)?)?;
        println!("exported {written} attempts to {}", path.display());
        return Ok(());
    }

    let Some(quiz_id) = cli.quiz.clone() else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "no quiz selected; pass --quiz <ID> (see --list)",
            )
            .exit();
    };

    let _log_guard = init_logging(AppDirs::log_dir(), &config.log_level, &mut io::stderr());

    let monitor = ProctorMonitor::new(TerminalFocusSource::new())
        .with_max_warnings(config.max_warnings)
        .with_notice_delay(config.notice_delay());
    let session = match QuizSession::open(&catalog, &quiz_id, participant, monitor) {
        Ok(session) => session,
        Err(err) => Cli::command().error(ErrorKind::InvalidValue, err).exit(),
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let quiz_titles = catalog
        .quizzes()
        .iter()
        .map(|q| (q.id.clone(), q.title.clone()))
        .collect();
    let mut app = App::new(session, AttemptRecorder::new(db), quiz_titles);
    info!(quiz = %quiz_id, "opening quiz");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Some(outcome) = app.session.outcome() {
        println!(
            "{}: {} / {} ({}%), reason: {}",
            app.session.quiz().title,
            outcome.score.score,
            outcome.score.max_score,
            outcome.score.percentage(),
            outcome.reason
        );
    }

    result
}

fn print_available(
    catalog: &QuizCatalog,
    db: &SqliteAttemptStore,
    config: &Config,
    participant: &str,
) -> Result<(), Box<dyn Error>> {
    let attempted = db.attempted_quiz_ids(participant)?;
    let available = catalog.available_for(config.department.as_deref(), &attempted);

    if available.is_empty() {
        println!("no quizzes available");
        return Ok(());
    }
    for quiz in available {
        println!(
            "{:<16} {:<32} {:<20} {:>3} questions {:>4} min",
            quiz.id,
            quiz.title,
            quiz.subject,
            quiz.question_count(),
            quiz.time_limit_minutes
        );
    }
    Ok(())
}

/// Set up file logging. Failure is reported on `err` and the quiz runs without a log.
fn init_logging(
    log_dir: Option<PathBuf>,
    level: &str,
    err: &mut impl Write,
) -> Option<WorkerGuard> {
    let Some(dir) = log_dir else {
        let _ = writeln!(err, "quizlock: logging disabled, no state directory found");
        return None;
    };
    match logging::init(&dir, level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            let _ = writeln!(
                err,
                "quizlock: logging disabled, cannot use {}: {e}",
                dir.display()
            );
            None
        }
    }
}

/// The countdown ticks once per second of wall time; nothing configurable feeds it.
fn countdown_ticker() -> FixedTicker {
    FixedTicker::every_second()
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), countdown_ticker());

    loop {
        terminal.draw(|f| ui(app, f))?;

        let flow = match runner.step() {
            QuizEvent::Tick => app.on_tick(Instant::now()),
            QuizEvent::Attention(signal) => app.on_attention(signal, Instant::now()),
            QuizEvent::Resize => Flow::Continue,
            QuizEvent::Key(key) => app.on_key(key),
        };

        match flow {
            Flow::Continue => {}
            Flow::Started => runner.restart_ticks(),
            Flow::Quit => break,
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.state);
    screen.render(app, f);
}
