//! Session state machine: one search process lifecycle and its results.
//!
//! States: Idle -> Configuring (start deferred) -> Running -> Settling
//! (interrupt issued, awaiting confirmed termination) -> Idle. A session
//! holds at most one live process handle, and a caller can never observe
//! render state containing output from a process other than the one behind
//! the current invocation: `restart` disables the old process's output
//! channel before interrupting it and waits for confirmed termination before
//! relaunching.

use crate::classify::LineClassifier;
use crate::process::{ProcessEvent, SearchProcess};
use crate::render::RenderModel;
use crate::{InvocationSpec, Result, RgviewError};
use chrono::{DateTime, Utc};
use rgview_types::{ExitOutcome, SearchSettings, SessionKey, SessionState, SessionSummary};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Poll interval while waiting for a settling process to terminate.
const SETTLE_POLL: Duration = Duration::from_millis(100);
/// Upper bound on the settling wait. The output gate is already closed when
/// the wait starts, so proceeding past a straggler is safe.
const SETTLE_CAP: Duration = Duration::from_secs(5);
/// Debounce after termination is observed, so the exit notification has
/// landed before state is torn down.
const SETTLE_DEBOUNCE: Duration = Duration::from_millis(20);

/// Characters of raw first output kept for abnormal-exit diagnostics.
const FIRST_OUTPUT_SNIPPET: usize = 256;

/// One (term, directory) unit of search state.
pub struct Session {
    key: SessionKey,
    pub settings: SearchSettings,
    program: PathBuf,
    state: SessionState,
    process: Option<SearchProcess>,
    events: Option<mpsc::UnboundedReceiver<ProcessEvent>>,
    classifier: LineClassifier,
    render: RenderModel,
    /// Spec behind the current render state, or the deferred preview.
    last_spec: Option<InvocationSpec>,
    /// Raw snippet of the first output, for diagnosing marker mismatches.
    first_output: String,
    last_outcome: Option<ExitOutcome>,
    interrupt_requested: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    /// Create a session. With `deferred` the session stays in Configuring
    /// and only computes an invocation preview; otherwise the search starts
    /// immediately.
    pub fn create(
        key: SessionKey,
        settings: SearchSettings,
        program: PathBuf,
        deferred: bool,
    ) -> Result<Self> {
        let now = Utc::now();
        let mut session = Self {
            key,
            settings,
            program,
            state: SessionState::Idle,
            process: None,
            events: None,
            classifier: LineClassifier::new(),
            render: RenderModel::new(),
            last_spec: None,
            first_output: String::new(),
            last_outcome: None,
            interrupt_requested: false,
            created_at: now,
            last_used_at: now,
        };
        if deferred {
            session.state = SessionState::Configuring;
            session.last_spec = Some(session.build_spec()?);
        } else {
            session.start()?;
        }
        Ok(session)
    }

    fn build_spec(&self) -> Result<InvocationSpec> {
        InvocationSpec::build(
            &self.program,
            &self.settings,
            &self.key.term,
            &self.key.directory,
        )
    }

    /// Launch the search with current settings. Valid from Idle or
    /// Configuring; resets the render state and match counter.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Configuring => {}
            state => {
                return Err(RgviewError::InvalidSessionState {
                    expected: "idle or configuring".into(),
                    actual: format!("{state:?}"),
                });
            }
        }
        let spec = self.build_spec()?;
        self.start_with(spec)
    }

    pub(crate) fn start_with(&mut self, spec: InvocationSpec) -> Result<()> {
        let (process, events) = SearchProcess::spawn(&spec)?;
        info!(
            target: "rgview::session",
            "search started for '{}' in {}",
            self.key.term,
            self.key.directory.display()
        );
        self.process = Some(process);
        self.events = Some(events);
        self.last_spec = Some(spec);
        self.classifier.reset();
        self.render.clear();
        self.first_output.clear();
        self.last_outcome = None;
        self.interrupt_requested = false;
        self.state = SessionState::Running;
        self.last_used_at = Utc::now();
        Ok(())
    }

    /// Return to Configuring with a fresh invocation preview computed from
    /// current settings. Valid from Idle or Configuring; used when a cached
    /// session is reused without launching.
    pub fn reconfigure(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Configuring => {}
            state => {
                return Err(RgviewError::InvalidSessionState {
                    expected: "idle or configuring".into(),
                    actual: format!("{state:?}"),
                });
            }
        }
        self.last_spec = Some(self.build_spec()?);
        self.state = SessionState::Configuring;
        self.last_used_at = Utc::now();
        Ok(())
    }

    /// Restart with current settings.
    ///
    /// Running or Settling: the old process's output channel is disabled
    /// first, then it is interrupted and awaited, so late chunks from it can
    /// never reach the new render state. Configuring: only the deferred
    /// invocation preview is recomputed; nothing launches.
    pub async fn restart(&mut self) -> Result<()> {
        match self.state {
            SessionState::Running | SessionState::Settling => {
                self.settle().await;
                self.start()
            }
            SessionState::Configuring => {
                self.last_spec = Some(self.build_spec()?);
                Ok(())
            }
            SessionState::Idle => self.start(),
        }
    }

    /// Disable output delivery, interrupt the process, and wait (bounded)
    /// for confirmed termination. In-flight output is discarded.
    async fn settle(&mut self) {
        if let Some(process) = self.process.take() {
            self.state = SessionState::Settling;
            process.disable_output();
            process.interrupt();
            self.interrupt_requested = true;

            let start = tokio::time::Instant::now();
            while !process.is_finished() {
                if start.elapsed() >= SETTLE_CAP {
                    warn!(
                        target: "rgview::session",
                        "settling wait capped after {:?}; process output is gated off",
                        SETTLE_CAP
                    );
                    break;
                }
                tokio::time::sleep(SETTLE_POLL).await;
            }
            tokio::time::sleep(SETTLE_DEBOUNCE).await;
        }
        self.events = None;
        self.classifier.reset();
        self.state = SessionState::Idle;
    }

    /// Stop any running process and clear results, keeping settings. Used
    /// when the cache reuses this session for a fresh request.
    pub async fn reset_in_place(&mut self) {
        if matches!(self.state, SessionState::Running | SessionState::Settling) {
            self.settle().await;
        }
        self.render.clear();
        self.first_output.clear();
        self.last_outcome = None;
        self.last_used_at = Utc::now();
    }

    /// Terminate and drop the process outright (cache eviction).
    pub async fn shutdown(&mut self) {
        if matches!(self.state, SessionState::Running | SessionState::Settling) {
            self.settle().await;
        }
        self.render.clear();
    }

    /// Await the next process notification. Returns `None` when no process
    /// is attached or its channel has closed.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Dispatch one process notification.
    pub fn handle_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Output(chunk) => self.on_output(&chunk),
            ProcessEvent::Exited { code, diagnostics } => self.on_terminate(code, &diagnostics),
        }
    }

    /// Feed one output chunk through the classifier into the render model.
    /// Valid only while Running; chunks in any other state are dropped.
    pub fn on_output(&mut self, chunk: &str) {
        if self.state != SessionState::Running {
            debug!(target: "rgview::session", "dropping chunk in state {:?}", self.state);
            return;
        }
        let have = self.first_output.chars().count();
        if have < FIRST_OUTPUT_SNIPPET {
            self.first_output
                .extend(chunk.chars().take(FIRST_OUTPUT_SNIPPET - have));
        }
        for record in self.classifier.feed(chunk, false) {
            self.render.push(record);
        }
    }

    /// Handle process termination. Running or Settling -> Idle. Only an
    /// abnormal outcome carries a user-visible message; normal completion,
    /// zero matches, and interrupts are silent.
    pub fn on_terminate(&mut self, code: Option<i32>, diagnostics: &str) {
        let was_running = self.state == SessionState::Running;
        if !matches!(self.state, SessionState::Running | SessionState::Settling) {
            return;
        }

        // Flush the trailing fragment only for output we were listening to.
        if was_running {
            for record in self.classifier.feed("", true) {
                self.render.push(record);
            }
        } else {
            self.classifier.reset();
        }

        let outcome = self.classify_exit(code, diagnostics);
        if let ExitOutcome::Abnormal { code, detail } = &outcome {
            // Reported once per session, not per line.
            warn!(
                target: "rgview::session",
                "search exited abnormally (code {code:?}): {}",
                detail.trim_end()
            );
        } else {
            debug!(target: "rgview::session", "search finished: {outcome:?}");
        }
        self.last_outcome = Some(outcome);
        self.process = None;
        self.state = SessionState::Idle;
    }

    fn classify_exit(&self, code: Option<i32>, diagnostics: &str) -> ExitOutcome {
        if self.interrupt_requested {
            return ExitOutcome::Interrupted;
        }
        match code {
            Some(0) => ExitOutcome::Normal,
            // Exit 1 means zero matches, but only when nothing was reported;
            // with diagnostic text it is treated as a failure.
            Some(1) if diagnostics.trim().is_empty() => ExitOutcome::ZeroMatches,
            _ => {
                let detail = if diagnostics.trim().is_empty() {
                    format!("first output: {:?}", self.first_output)
                } else {
                    diagnostics.to_string()
                };
                ExitOutcome::Abnormal { code, detail }
            }
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn render(&self) -> &RenderModel {
        &self.render
    }

    /// Mutable render access for visibility toggles.
    pub fn render_mut(&mut self) -> &mut RenderModel {
        &mut self.render
    }

    pub fn match_count(&self) -> u64 {
        self.render.match_count()
    }

    /// The argument list behind the current results, or the deferred
    /// preview while Configuring.
    pub fn invocation(&self) -> Option<&InvocationSpec> {
        self.last_spec.as_ref()
    }

    /// Outcome of the last completed run, if any.
    pub fn last_outcome(&self) -> Option<&ExitOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            key: self.key.clone(),
            state: self.state,
            match_count: self.match_count(),
            last_used_at: self.last_used_at,
        }
    }

    /// Drive the session until its current process terminates.
    pub async fn run_to_completion(&mut self) {
        while self.state == SessionState::Running {
            match self.next_event().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_support::coded_match;

    fn deferred_session(term: &str) -> Session {
        Session::create(
            SessionKey::new(term, "/tmp"),
            SearchSettings::default(),
            PathBuf::from("rg"),
            true,
        )
        .unwrap()
    }

    /// Launch a session whose "search tool" is a shell script, bypassing
    /// the invocation builder.
    fn scripted_session(script: &str) -> Session {
        let mut session = deferred_session("term");
        session
            .start_with(InvocationSpec {
                program: PathBuf::from("sh"),
                args: vec!["-c".into(), script.into()],
            })
            .unwrap();
        session
    }

    #[test]
    fn deferred_create_stays_configuring_with_preview() {
        let session = deferred_session("needle");
        assert_eq!(session.state(), SessionState::Configuring);
        let spec = session.invocation().unwrap();
        assert!(spec.args.iter().any(|a| a == "needle"));
    }

    #[tokio::test]
    async fn restart_in_configuring_recomputes_preview_only() {
        let mut session = deferred_session("needle");
        session.settings.kind = rgview_types::SearchKind::Literal;
        session.restart().await.unwrap();
        assert_eq!(session.state(), SessionState::Configuring);
        assert!(
            session
                .invocation()
                .unwrap()
                .args
                .contains(&"--fixed-strings".to_string())
        );
    }

    #[tokio::test]
    async fn output_feeds_render_model() {
        let line = coded_match("src/a.rs", 3, &[("fn ", false), ("main", true)]);
        let mut session = scripted_session(&format!(
            "printf '{}\\n'",
            line.replace('\x1b', "\\033")
        ));
        session.run_to_completion().await;
        assert_eq!(session.match_count(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_outcome(), Some(&ExitOutcome::Normal));
    }

    #[tokio::test]
    async fn first_output_snippet_is_bounded_in_characters() {
        let long = "é".repeat(FIRST_OUTPUT_SNIPPET + 50);
        let mut session = scripted_session(&format!("printf '{long}\\n'"));
        session.run_to_completion().await;
        assert_eq!(
            session.first_output.chars().count(),
            FIRST_OUTPUT_SNIPPET
        );
    }

    #[tokio::test]
    async fn zero_matches_exit_is_silent_success() {
        let mut session = scripted_session("exit 1");
        session.run_to_completion().await;
        assert_eq!(session.last_outcome(), Some(&ExitOutcome::ZeroMatches));
        assert_eq!(session.match_count(), 0);
    }

    #[tokio::test]
    async fn exit_one_with_diagnostics_is_abnormal() {
        let mut session = scripted_session("echo 'regex parse error' >&2; exit 1");
        session.run_to_completion().await;
        assert!(matches!(
            session.last_outcome(),
            Some(ExitOutcome::Abnormal { code: Some(1), .. })
        ));
    }

    #[tokio::test]
    async fn abnormal_exit_code_is_surfaced() {
        let mut session = scripted_session("exit 2");
        session.run_to_completion().await;
        assert!(session.last_outcome().unwrap().is_abnormal());
    }

    #[tokio::test]
    async fn restart_discards_old_process_output() {
        let line = coded_match("old.rs", 1, &[("stale", true)]);
        // Old process prints its coded line only after a delay, so the
        // restart is already settling or done by the time it would arrive.
        let mut session = scripted_session(&format!(
            "sleep 2; printf '{}\\n'",
            line.replace('\x1b', "\\033")
        ));
        // Restart discipline: gate off, interrupt, await termination, then
        // relaunch. The relaunched "search" finds nothing and exits.
        session.settle().await;
        session
            .start_with(InvocationSpec {
                program: PathBuf::from("sh"),
                args: vec!["-c".into(), "exit 1".into()],
            })
            .unwrap();
        session.run_to_completion().await;
        assert_eq!(session.match_count(), 0);
        assert!(session.render().rows().is_empty());
        assert_eq!(session.last_outcome(), Some(&ExitOutcome::ZeroMatches));
    }

    #[tokio::test]
    async fn interrupted_exit_is_classified_interrupted() {
        let mut session = scripted_session("sleep 30");
        session.settle().await;
        assert_eq!(session.state(), SessionState::Idle);
        // The process was interrupted by us; a subsequent exit event (if the
        // channel were still attached) would classify as interrupted.
        assert!(session.interrupt_requested);
    }
}
