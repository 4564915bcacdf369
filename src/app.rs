//! Orchestrator: owns the tree, the watcher, the VCS snapshot, and the
//! interactive state, and drives the single-threaded render loop.
//!
//! Grounded on the teacher's `app.rs::run` (terminal setup/teardown, the
//! `try_recv`-drain-then-draw-then-poll-keys structure), generalized from
//! "rescan on any filesystem event" to applying normalized, debounced,
//! already-classified `RawEvent`s straight into `TreeState`.

use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::cli::Cli;
use crate::errors::WatchError;
use crate::ignore::IgnoreList;
use crate::layout::{self, LayoutResult};
use crate::renderer;
use crate::tree::TreeState;
use crate::vcs::VcsWatcher;
use crate::watcher::FileWatcher;

const GHOST_TICK: Duration = Duration::from_secs(1);
const KEY_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Main application state and run loop.
pub struct App {
    root_path: PathBuf,
    tree: TreeState,
    ignore: IgnoreList,
    watcher: FileWatcher,
    vcs: VcsWatcher,
    breathe: Duration,
    clock_start: Instant,
    filter_mode: bool,
    filter_pattern: String,
    cursor_index: usize,
    last_error: Option<String>,
}

impl App {
    /// Build a new `App` from parsed CLI arguments. Any failure here is
    /// startup-fatal (§7): the terminal has not been touched yet, so the
    /// caller can print a message and exit without any cleanup.
    pub fn new(cli: &Cli) -> Result<Self> {
        let root_path = cli.path.canonicalize().unwrap_or_else(|_| cli.path.clone());

        if !root_path.is_dir() {
            return Err(WatchError::InvalidRoot { path: root_path }.into());
        }

        let ignore = IgnoreList::new(&cli.ignore_patterns());
        let interval = Duration::from_millis(cli.interval);

        let (watcher, initial) = FileWatcher::new(&root_path, interval, &ignore)
            .map_err(|source| WatchError::Start {
                path: root_path.clone(),
                source,
            })
            .context("failed to start filesystem watcher")?;

        let mut tree = TreeState::new(root_path.clone(), cli.history, cli.ghost_steps);
        for event in initial {
            tree.set_node(&event.path, event.kind, event.event_kind, 0);
        }
        tree.clear_all_events();

        let vcs = VcsWatcher::new(root_path.clone(), !cli.no_git);

        Ok(Self {
            root_path,
            tree,
            ignore,
            watcher,
            vcs,
            breathe: Duration::from_millis(cli.breathe),
            clock_start: Instant::now(),
            filter_mode: false,
            filter_pattern: String::new(),
            cursor_index: 0,
            last_error: None,
        })
    }

    fn now_ms(&self) -> u64 {
        self.clock_start.elapsed().as_millis() as u64
    }

    /// Run the main TUI event loop.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(out);
        let mut terminal = Terminal::new(backend)?;

        let mut last_ghost_tick = Instant::now();
        let mut last_breath_tick = Instant::now();

        let result = self.event_loop(&mut terminal, &mut last_ghost_tick, &mut last_breath_tick);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Recompute the layout for the current tree/VCS/filter state and paint
    /// it. Called only when something that can change what's on screen has
    /// actually happened (§2: "on tick or mutation ... renderer paints"),
    /// not on every poll-loop iteration.
    fn render(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<LayoutResult> {
        let now = self.now_ms();
        let term_rows = terminal.size()?.height;
        let layout_result =
            layout::compute_layout(&mut self.tree, self.vcs.snapshot(), &self.filter_pattern, term_rows, now);

        self.auto_jump_to_sole_match(&layout_result);
        if layout_result.lines.is_empty() {
            self.cursor_index = 0;
        } else {
            self.cursor_index = self.cursor_index.min(layout_result.lines.len() - 1);
        }

        terminal.draw(|frame| {
            renderer::render_ui(
                frame,
                &layout_result,
                self.filter_mode,
                &self.filter_pattern,
                self.cursor_index,
                self.last_error.as_deref(),
            );
        })?;

        Ok(layout_result)
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
        last_ghost_tick: &mut Instant,
        last_breath_tick: &mut Instant,
    ) -> Result<()> {
        // §4.5: "On startup: ... Do an initial render."
        let mut layout_result = self.render(terminal)?;

        loop {
            let mut should_render = false;

            let (raws, errors) = self.watcher.poll(&self.ignore);

            // §7: transient watcher errors are logged and shown, never fatal.
            for err in &errors {
                tracing::warn!(error = %err, "transient filesystem watcher error");
            }
            if let Some(err) = errors.last() {
                self.last_error = Some(format!("watcher error: {err}"));
                should_render = true;
            }

            if !raws.is_empty() {
                let now = self.now_ms();
                for raw in raws {
                    match raw.event_kind {
                        crate::tree::EventKind::Unlink | crate::tree::EventKind::UnlinkDir => {
                            self.tree.remove_node(&raw.path, raw.event_kind, now);
                        }
                        _ => {
                            self.tree.set_node(&raw.path, raw.kind, raw.event_kind, now);
                        }
                    }
                }
                should_render = true;
            }

            if last_ghost_tick.elapsed() >= GHOST_TICK {
                *last_ghost_tick = Instant::now();
                if self.tree.ghost_count() > 0 {
                    self.tree.advance_ghosts();
                    should_render = true;
                }
            }

            if last_breath_tick.elapsed() >= self.breathe {
                *last_breath_tick = Instant::now();
                // Only force a redraw if there's actually decay or a ghost
                // fade still in motion -- an idle, cold tree has nothing new
                // to paint.
                if self.tree.has_hot_items() {
                    should_render = true;
                }
            }

            self.vcs.refresh_if_due();

            if should_render {
                layout_result = self.render(terminal)?;
            }

            if event::poll(KEY_POLL_TIMEOUT)? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                            return Ok(());
                        }
                        if !self.handle_key(key.code, &layout_result) {
                            return Ok(());
                        }
                        layout_result = self.render(terminal)?;
                    }
                    Event::Resize(_, _) => {
                        layout_result = self.render(terminal)?;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Handle one key event. Returns `false` to request a clean exit.
    fn handle_key(&mut self, code: KeyCode, layout: &LayoutResult) -> bool {
        if self.filter_mode {
            match code {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_pattern.clear();
                    self.cursor_index = 0;
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.open_selected(layout);
                }
                KeyCode::Backspace => {
                    self.filter_pattern.pop();
                    self.cursor_index = 0;
                }
                KeyCode::Char(c) => {
                    self.filter_pattern.push(c);
                    self.cursor_index = 0;
                }
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('/') => {
                self.filter_mode = true;
                self.filter_pattern.clear();
                self.cursor_index = 0;
            }
            KeyCode::Esc => self.filter_pattern.clear(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor_index = self.cursor_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !layout.lines.is_empty() {
                    self.cursor_index = (self.cursor_index + 1).min(layout.lines.len() - 1);
                }
            }
            KeyCode::Enter => self.open_selected(layout),
            _ => {}
        }
        true
    }

    /// Auto-jump the cursor to the sole matching line, per §6: "each edit
    /// resets the cursor to 0 and auto-jumps to the single matching line
    /// when the filtered set has size 1."
    fn auto_jump_to_sole_match(&mut self, layout: &LayoutResult) {
        if self.filter_pattern.is_empty() {
            return;
        }
        let matches: Vec<usize> = layout
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.filter_match.is_some())
            .map(|(i, _)| i)
            .collect();
        if let [only] = matches[..] {
            self.cursor_index = only;
        }
    }

    /// Fire-and-forget OS open of the currently selected path (§6/§7: open
    /// failures are silently ignored).
    fn open_selected(&self, layout: &LayoutResult) {
        if let Some(line) = layout.lines.get(self.cursor_index) {
            let _ = open::that(&line.path);
        }
    }
}
