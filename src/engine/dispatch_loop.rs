//! # Main Dispatch Loop
//!
//! Produces one command per iteration from, in priority order, a key press,
//! the already-staged command, typed text, or the queue.
//!
//! ## Iteration
//!
//! 1. In string mode, with the device ready, the queue empty and nothing
//!    staged: wait for a typed line.
//! 2. In key or joystick mode: poll one key. A staged key command replaces
//!    whatever was staged; halt and joystick updates are sent at once.
//! 3. Process the staged line: local commands run here, device commands go
//!    to the dispatcher only when the device is ready and otherwise stay
//!    staged.
//! 4. If nothing was staged and no sleep is pending, stage the queue front
//!    for the next iteration.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::dispatcher::CommandDispatcher;
use super::queue::Placement;
use super::shared::SharedState;
use crate::control::console::{KeySource, LineSource};
use crate::control::input_mode::{InputMode, InputState, KeyAction};
use crate::control::keys::KeyEvent;
use crate::help::HELP_TEXT;
use crate::logging::LogLevelHandle;
use crate::protocol::command::{parse, Command, LocalCommand, LogAction, READY_SEQUENCE};
use crate::script::ScriptSource;

/// Line staged when typed input is exhausted.
const END_OF_INPUT: &str = "end";

/// Drives interactive and scripted input into the dispatcher.
pub struct DispatchLoop<L, K> {
    shared: Arc<SharedState>,
    dispatcher: Arc<CommandDispatcher>,
    input: InputState,
    lines: L,
    keys: K,
    scripts: Box<dyn ScriptSource>,
    log_level: Option<LogLevelHandle>,
    staged: Option<String>,
    tick: Duration,
}

impl<L: LineSource, K: KeySource> DispatchLoop<L, K> {
    pub fn new(
        shared: Arc<SharedState>,
        dispatcher: Arc<CommandDispatcher>,
        input: InputState,
        lines: L,
        keys: K,
        scripts: Box<dyn ScriptSource>,
        tick: Duration,
    ) -> Self {
        Self {
            shared,
            dispatcher,
            input,
            lines,
            keys,
            scripts,
            log_level: None,
            staged: None,
            tick,
        }
    }

    /// Let `debug n` change the log filter.
    #[must_use]
    pub fn with_log_level(mut self, handle: Option<LogLevelHandle>) -> Self {
        self.log_level = handle;
        self
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// The command waiting to be processed, if any.
    pub fn staged(&self) -> Option<&str> {
        self.staged.as_deref()
    }

    /// Run iterations until the engine stops.
    pub async fn run(mut self) {
        let mut shutdown = self.shared.shutdown_signal();
        self.keys.set_active(self.input.mode() != InputMode::Text);

        while self.shared.is_running() {
            tokio::select! {
                _ = self.step() => {}
                _ = shutdown.changed() => break,
            }
            if self.shared.is_running() {
                tokio::time::sleep(self.tick).await;
            }
        }

        self.keys.set_active(false);
        debug!("Dispatch loop stopped");
    }

    /// One iteration.
    pub async fn step(&mut self) {
        if self.staged.is_none()
            && self.input.mode() == InputMode::Text
            && self.shared.is_ready()
            && self.shared.queue().is_empty()
        {
            match self.lines.read_line().await {
                Some(line) => self.staged = Some(line),
                None => {
                    info!("End of input");
                    self.staged = Some(END_OF_INPUT.to_string());
                }
            }
        }

        if self.input.mode() != InputMode::Text {
            if let Some(key) = self.keys.poll_key() {
                self.handle_key(key).await;
            }
        }

        if let Some(line) = self.staged.take() {
            self.process(line).await;
        } else if !self.shared.timers().wake_pending() {
            self.staged = self.shared.queue().pop_front();
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let before = self.input.mode();
        match self.input.translate(key) {
            KeyAction::None => {}
            KeyAction::Stage(command) => {
                if let Some(replaced) = self.staged.replace(command) {
                    trace!("Key press replaced staged '{}'", replaced);
                }
            }
            KeyAction::Immediate(command) => {
                if let Err(e) = self.dispatcher.send(&command).await {
                    debug!("Key command not delivered: {}", e);
                }
            }
        }

        if before != InputMode::Text && self.input.mode() == InputMode::Text {
            self.keys.set_active(false);
            info!("{} mode", InputMode::Text);
        }
    }

    async fn process(&mut self, line: String) {
        match parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Local(command))) => self.run_local(command),
            Ok(Some(Command::Device(command))) => {
                if self.shared.is_ready() {
                    // Not retried; the operator or script re-issues it.
                    if let Err(e) = self.dispatcher.send(&command).await {
                        debug!("Command not delivered: {}", e);
                    }
                } else {
                    trace!("Holding '{}' until the device is ready", command);
                    self.staged = Some(command);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    fn set_mode(&mut self, mode: InputMode) {
        self.input.set_mode(mode);
        self.keys.set_active(mode != InputMode::Text);
        info!("{} mode", mode);
    }

    fn run_local(&mut self, command: LocalCommand) {
        debug!("Local command: {:?}", command);
        match command {
            LocalCommand::End => {
                info!("Ending");
                self.shared.stop();
            }
            LocalCommand::Help => self.shared.say(HELP_TEXT),
            LocalCommand::Info => {
                let info = self.shared.device_info();
                self.shared.say(&info.to_string());
            }
            LocalCommand::Mode(mode) => self.set_mode(mode),
            LocalCommand::Distance(requested) => {
                let applied = self.input.set_distance(requested);
                if applied != requested {
                    warn!("Distance {} out of range, using {}", requested, applied);
                } else {
                    info!("Distance {}", applied);
                }
            }
            LocalCommand::Angle(requested) => {
                let applied = self.input.set_angle(requested);
                if applied != requested {
                    warn!("Angle {} out of range, using {}", requested, applied);
                } else {
                    info!("Angle {}", applied);
                }
            }
            LocalCommand::Watch(keys) => {
                if keys.is_empty() {
                    info!("Watch off, printing raw frames");
                } else {
                    info!("Watching {}", keys.join(" "));
                }
                self.shared.watch().set_selection(keys);
            }
            LocalCommand::WatchPeriod(seconds) => {
                let result = self.shared.timers().set_sample_period(seconds, Instant::now());
                match result {
                    Ok(()) => info!("Watch period {}s", seconds),
                    Err(e) => warn!("{}", e),
                }
            }
            LocalCommand::State(frames) => self.shared.request_frames(frames),
            LocalCommand::Log(LogAction::Flush) => match self.shared.flush_watch_log() {
                Ok(count) => debug!("Flushed {} watch records", count),
                Err(e) => warn!("Failed to flush watch log: {}", e),
            },
            LocalCommand::Log(LogAction::Clear) => {
                self.shared.watch().clear();
                info!("Watch log cleared");
            }
            LocalCommand::Sleep(seconds) => {
                let wake = Duration::try_from_secs_f64(seconds)
                    .ok()
                    .and_then(|delay| Instant::now().checked_add(delay));
                match wake {
                    Some(wake) => {
                        self.shared.timers().wake = Some(wake);
                        info!("Sleeping {}s", seconds);
                    }
                    None => warn!("Invalid sleep of {}s", seconds),
                }
            }
            LocalCommand::Script { path, placement } => match self.scripts.load(&path) {
                Ok(lines) => {
                    info!("Loaded {} commands from {}", lines.len(), path);
                    self.shared.queue().load(lines, placement);
                }
                Err(e) => warn!("{}", e),
            },
            LocalCommand::Debug(level) => match &self.log_level {
                Some(handle) => match handle.set_level(level) {
                    Ok(()) => info!("Debug level {}", level),
                    Err(e) => warn!("{}", e),
                },
                None => warn!("Log level cannot be changed in this session"),
            },
            LocalCommand::Ready => {
                self.shared.queue().load(READY_SEQUENCE, Placement::Front);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::console::mocks::{ScriptedKeys, ScriptedLines};
    use crate::engine::shared::mocks::{shared_state, SharedBuffer};
    use crate::error::TelloError;
    use crate::link::transport::mocks::MockLink;
    use crate::script::MockScriptSource;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    type TestLoop = DispatchLoop<ScriptedLines, ScriptedKeys>;

    struct Harness {
        dispatch: TestLoop,
        link: MockLink,
        shared: Arc<SharedState>,
        console: SharedBuffer,
    }

    fn harness_with(lines: &[&str], keys: &[KeyEvent], scripts: MockScriptSource) -> Harness {
        let (shared, console) = shared_state();
        let link = MockLink::new();
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::new(link.clone()),
            shared.clone(),
            Duration::from_secs(10),
        ));
        let dispatch = DispatchLoop::new(
            shared.clone(),
            dispatcher,
            InputState::default(),
            ScriptedLines::new(lines),
            ScriptedKeys::new(keys),
            Box::new(scripts),
            Duration::from_millis(1),
        );
        Harness {
            dispatch,
            link,
            shared,
            console,
        }
    }

    fn harness(lines: &[&str], keys: &[KeyEvent]) -> Harness {
        harness_with(lines, keys, MockScriptSource::new())
    }

    #[tokio::test]
    async fn test_typed_command_sent_when_ready() {
        let mut h = harness(&["takeoff"], &[]);
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["takeoff".to_string()]);
        assert!(!h.shared.is_ready());
    }

    #[tokio::test]
    async fn test_comment_stripped_before_send() {
        let mut h = harness(&["up 50 # climb"], &[]);
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["up 50".to_string()]);
    }

    #[tokio::test]
    async fn test_queue_drained_one_per_ack() {
        let mut h = harness(&[], &[]);
        h.shared.queue().load(["command", "sdk?"], Placement::Back);

        // Stage, then send.
        h.dispatch.step().await;
        assert_eq!(h.dispatch.staged(), Some("command"));
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["command".to_string()]);

        // Next entry is staged but held until the device answers.
        h.dispatch.step().await;
        h.dispatch.step().await;
        assert_eq!(h.dispatch.staged(), Some("sdk?"));
        assert_eq!(h.link.sent().len(), 1);

        h.shared.set_ready(true);
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["command".to_string(), "sdk?".to_string()]);
        assert!(h.shared.queue().is_empty());
    }

    #[tokio::test]
    async fn test_sleep_holds_queue() {
        let mut h = harness(&[], &[]);
        h.shared.queue().load(["sleep 5", "land"], Placement::Back);

        h.dispatch.step().await;
        h.dispatch.step().await;
        assert!(h.shared.timers().wake_pending());

        h.dispatch.step().await;
        assert_eq!(h.dispatch.staged(), None);
        assert_eq!(h.shared.queue().len(), 1);

        h.shared.timers().wake = None;
        h.dispatch.step().await;
        assert_eq!(h.dispatch.staged(), Some("land"));
    }

    #[tokio::test]
    async fn test_end_of_input_stops_engine() {
        let mut h = harness(&[], &[]);
        h.dispatch.step().await;
        assert!(!h.shared.is_running());
    }

    #[tokio::test]
    async fn test_end_command_stops_engine() {
        let mut h = harness(&["end"], &[]);
        h.dispatch.step().await;
        assert!(!h.shared.is_running());
        assert!(h.link.sent().is_empty());
    }

    #[tokio::test]
    async fn test_joystick_keys_send_rc_immediately() {
        let mut h = harness(&["joystick"], &[KeyEvent::Up, KeyEvent::Up, KeyEvent::Up]);
        h.dispatch.step().await;
        assert_eq!(h.dispatch.input().mode(), InputMode::Joystick);

        for _ in 0..3 {
            h.dispatch.step().await;
        }
        assert_eq!(
            h.link.sent(),
            vec!["rc 0 10 0 0".to_string(), "rc 0 20 0 0".to_string(), "rc 0 30 0 0".to_string()]
        );
        assert!(h.shared.is_ready());
    }

    #[tokio::test]
    async fn test_halt_bypasses_readiness() {
        let mut h = harness(&["key"], &[KeyEvent::Char('h')]);
        h.dispatch.step().await;
        h.shared.set_ready(false);

        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["stop".to_string()]);
    }

    #[tokio::test]
    async fn test_key_command_replaces_held_command() {
        let mut h = harness(&["key"], &[KeyEvent::Char('l')]);
        h.dispatch.step().await;

        h.shared.set_ready(false);
        h.shared.queue().push_back("flip f");
        h.dispatch.step().await;
        assert_eq!(h.dispatch.staged(), Some("land"));
        assert_eq!(h.shared.queue().len(), 1);

        h.shared.set_ready(true);
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["land".to_string()]);
    }

    #[tokio::test]
    async fn test_escape_returns_to_string_mode() {
        let mut h = harness(&["key", "battery?"], &[KeyEvent::Escape]);
        h.dispatch.step().await;
        h.dispatch.step().await;
        assert_eq!(h.dispatch.input().mode(), InputMode::Text);

        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["battery?".to_string()]);
    }

    #[tokio::test]
    async fn test_key_mode_move_uses_distance() {
        let mut h = harness(&["dist 70", "key"], &[KeyEvent::Down]);
        h.dispatch.step().await;
        h.dispatch.step().await;
        h.dispatch.step().await;
        h.dispatch.step().await;
        assert_eq!(h.link.sent(), vec!["back 70".to_string()]);
    }

    #[tokio::test]
    async fn test_ready_prepends_sequence() {
        let mut h = harness(&["ready"], &[]);
        h.shared.queue().push_back("takeoff");
        h.shared.set_ready(false);
        h.dispatch.staged = Some("ready".to_string());

        h.dispatch.step().await;
        let queued: Vec<String> = h.shared.queue().iter().map(str::to_string).collect();
        assert_eq!(queued, vec!["rc -100 -100 -100 100", "joystick", "takeoff"]);
    }

    #[tokio::test]
    async fn test_script_loaded_at_front() {
        let mut scripts = MockScriptSource::new();
        scripts
            .expect_load()
            .with(eq("mission.txt"))
            .times(1)
            .returning(|_| Ok(vec!["takeoff".to_string(), "land".to_string()]));

        let mut h = harness_with(&["script mission.txt"], &[], scripts);
        h.shared.queue().push_back("battery?");
        h.shared.set_ready(false);
        h.dispatch.staged = Some("script mission.txt".to_string());

        h.dispatch.step().await;
        let queued: Vec<String> = h.shared.queue().iter().map(str::to_string).collect();
        assert_eq!(queued, vec!["takeoff", "land", "battery?"]);
    }

    #[tokio::test]
    async fn test_unreadable_script_leaves_queue() {
        let mut scripts = MockScriptSource::new();
        scripts.expect_load().returning(|path| {
            Err(TelloError::Script {
                path: PathBuf::from(path),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        });

        let mut h = harness_with(&["script missing.txt replace"], &[], scripts);
        h.shared.queue().push_back("land");
        h.shared.set_ready(false);
        h.dispatch.staged = Some("script missing.txt replace".to_string());

        h.dispatch.step().await;
        assert_eq!(h.shared.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_argument_keeps_setting() {
        let mut h = harness(&["dist far"], &[]);
        h.dispatch.step().await;
        assert_eq!(h.dispatch.input().distance(), 40);
        assert!(h.link.sent().is_empty());
    }

    #[tokio::test]
    async fn test_watch_and_state_commands() {
        let mut h = harness(&["watch bat baro", "state 3", "watchperiod 0.5"], &[]);
        for _ in 0..3 {
            h.dispatch.step().await;
        }
        assert_eq!(h.shared.watch().selection(), ["bat".to_string(), "baro".to_string()]);
        assert_eq!(h.shared.frames_remaining(), 3);
        assert_eq!(h.shared.timers().sample_period, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_oversized_watch_period_keeps_setting() {
        let mut h = harness(&["watchperiod 0.5", "watchperiod 1e300", "watchperiod nan"], &[]);
        for _ in 0..3 {
            h.dispatch.step().await;
        }
        assert!(h.shared.is_running());
        assert_eq!(h.shared.timers().sample_period, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_oversized_sleep_ignored() {
        let mut h = harness(&["sleep 1e300", "sleep 1e19"], &[]);
        h.dispatch.step().await;
        h.dispatch.step().await;
        assert!(!h.shared.timers().wake_pending());
    }

    #[tokio::test]
    async fn test_failed_send_keeps_loop_going() {
        let mut h = harness(&["takeoff", "end"], &[]);
        h.link.set_send_error(std::io::ErrorKind::ConnectionRefused);
        h.dispatch.step().await;
        assert_eq!(h.shared.last_command(), "takeoff");

        h.shared.set_ready(true);
        h.dispatch.step().await;
        assert!(!h.shared.is_running());
    }

    #[tokio::test]
    async fn test_help_and_info_printed() {
        let mut h = harness(&["help", "info"], &[]);
        h.dispatch.step().await;
        h.dispatch.step().await;
        let printed = h.console.contents();
        assert!(printed.contains("Local commands:"));
        assert!(printed.contains("battery=-1%"));
    }

    #[tokio::test]
    async fn test_log_flush_prints_records() {
        let mut h = harness(&["log", "log clear"], &[]);
        {
            let state = h.shared.device().state.clone();
            let mut watch = h.shared.watch();
            watch.set_selection(vec!["bat".into()]);
            watch.record(&state, "takeoff", "1.000".to_string());
        }

        h.dispatch.step().await;
        assert!(h.console.contents().starts_with("watch;time;bat;LastCommand;\n"));

        h.dispatch.step().await;
        assert!(h.shared.watch().records().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_end() {
        let h = harness(&["info", "end"], &[]);
        tokio::time::timeout(Duration::from_secs(1), h.dispatch.run())
            .await
            .expect("dispatch loop did not stop");
        assert!(!h.shared.is_running());
    }
}
