//! App: component-based event loop around the session.
//!
//! Architecture:
//! - `App` owns the `Session` (all client state) and every UI component.
//! - A `tokio::mpsc` channel carries `AppMessage`s in from the terminal reader
//!   and from the session's background tasks.
//! - The loop draws, waits for the next message, drains a burst, repeats.
//! - Components return `Vec<Action>`; `apply_action` maps them onto session
//!   handlers. Session notices are turned into toasts after every message.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use notecast_proto::config::Config;
use notecast_proto::ApiClient;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        header::Header, help_overlay::HelpOverlay, home::HomePanel, library::LibraryPanel,
        log_panel::LogPanel, player::PlayerPanel, player_bar::PlayerBar,
        processing::ProcessingPanel, upload::UploadPanel,
    },
    focus::FocusRing,
    media::MediaEvent,
    mpv::MpvMedia,
    session::{Session, SessionEvent, SessionSettings},
    view::View,
    widgets::{status_bar, toast::ToastManager},
};

const VOLUME_STEP: f32 = 0.05;
const PLAYER_BAR_H: u16 = 3;
const LOG_PANEL_H: u16 = 10;
const LOG_TAIL_LINES: usize = 500;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    Session(SessionEvent),
}

/// Screen rects from the last draw, for mouse hit-testing.
#[derive(Default, Clone, Copy)]
struct PaneAreas {
    header: Rect,
    body: Rect,
    player_bar: Rect,
    log: Rect,
}

/// Every focusable component, addressable by id.
struct Panels {
    home: HomePanel,
    upload: UploadPanel,
    processing: ProcessingPanel,
    library: LibraryPanel,
    player: PlayerPanel,
    player_bar: PlayerBar,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,
}

impl Panels {
    fn new() -> Self {
        Self {
            home: HomePanel::new(),
            upload: UploadPanel::new(),
            processing: ProcessingPanel::new(),
            library: LibraryPanel::new(),
            player: PlayerPanel::new(),
            player_bar: PlayerBar::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
        }
    }

    fn get_mut(&mut self, id: ComponentId) -> &mut dyn Component {
        match id {
            ComponentId::Home => &mut self.home,
            ComponentId::Upload => &mut self.upload,
            ComponentId::Processing => &mut self.processing,
            ComponentId::Library => &mut self.library,
            ComponentId::Player => &mut self.player,
            ComponentId::PlayerBar => &mut self.player_bar,
            ComponentId::LogPanel => &mut self.log_panel,
            ComponentId::HelpOverlay => &mut self.help_overlay,
        }
    }

    fn all_mut(&mut self) -> [&mut dyn Component; 8] {
        [
            &mut self.home,
            &mut self.upload,
            &mut self.processing,
            &mut self.library,
            &mut self.player,
            &mut self.player_bar,
            &mut self.log_panel,
            &mut self.help_overlay,
        ]
    }
}

pub struct App {
    session: Session<ApiClient, MpvMedia>,
    panels: Panels,
    header: Header,
    toast: ToastManager,
    focus: FocusRing,
    /// View the focus ring was last built for.
    focus_view: View,
    show_log_panel: bool,
    tui_log_lines: Vec<String>,
    tui_log_path: PathBuf,
    skip_secs: f64,
    pane_areas: PaneAreas,
    should_quit: bool,
    session_rx: Option<mpsc::Receiver<SessionEvent>>,
    media_rx: Option<mpsc::Receiver<MediaEvent>>,
}

impl App {
    /// Must be called inside the tokio runtime: the mpv player task is
    /// spawned here.
    pub fn new(config: &Config, api: ApiClient, tui_log_path: PathBuf) -> Self {
        let (session_tx, session_rx) = mpsc::channel(256);
        let (media_tx, media_rx) = mpsc::channel(256);
        let media = MpvMedia::spawn(config.player.default_volume, media_tx);
        let session = Session::new(
            Arc::new(api),
            media,
            SessionSettings::from_config(config),
            session_tx,
        );

        Self {
            session,
            panels: Panels::new(),
            header: Header::new(),
            toast: ToastManager::new(),
            focus: FocusRing::new(vec![ComponentId::Home]),
            focus_view: View::Home,
            show_log_panel: false,
            tui_log_lines: Vec::new(),
            tui_log_path,
            skip_secs: config.player.skip_secs,
            pane_areas: PaneAreas::default(),
            should_quit: false,
            session_rx: Some(session_rx),
            media_rx: Some(media_rx),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste
        )?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background tasks: session results and player reports ──────────────
        if let Some(mut session_rx) = self.session_rx.take() {
            let session_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(ev) = session_rx.recv().await {
                    if session_tx.send(AppMessage::Session(ev)).await.is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(mut media_rx) = self.media_rx.take() {
            let media_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(ev) = media_rx.recv().await {
                    let msg = AppMessage::Session(SessionEvent::Media(ev));
                    if media_tx.send(msg).await.is_err() {
                        break;
                    }
                }
            });
        }

        info!("notecast started");
        self.session.load_library();

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // log file tail refresh: every 2s, only when the log panel is open
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg);
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next);
                    }
                    needs_redraw = redraw;
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }

                _ = log_refresh.tick() => {
                    if self.show_log_panel {
                        self.reload_tui_log();
                        needs_redraw = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        info!("notecast exiting");
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableBracketedPaste
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Returns whether the screen needs a redraw.
    fn handle_message(&mut self, msg: AppMessage) -> bool {
        let redraw = match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                for action in self.handle_key(key) {
                    self.dispatch(action);
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                if matches!(mouse.kind, MouseEventKind::Moved) {
                    return false;
                }
                for action in self.handle_mouse(mouse) {
                    self.dispatch(action);
                }
                true
            }
            AppMessage::Event(Event::Paste(text)) => {
                for action in self.handle_paste(&text) {
                    self.dispatch(action);
                }
                true
            }
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,
            AppMessage::Session(ev) => {
                self.session.apply(ev);
                true
            }
        };
        self.flush_notices();
        self.sync_focus();
        redraw
    }

    fn flush_notices(&mut self) {
        for notice in self.session.drain_notices() {
            self.toast.notice(notice);
        }
    }

    /// Rebuild the focus ring for the current layout: the main pane, the
    /// player bar while a podcast is loaded, the log panel while shown.
    /// Entering a new view focuses its main pane.
    fn sync_focus(&mut self) {
        let view = self.session.screen().view();
        let main = ComponentId::for_view(view);
        let mut items = vec![main];
        if self.session.current().is_some() {
            items.push(ComponentId::PlayerBar);
        }
        if self.show_log_panel {
            items.push(ComponentId::LogPanel);
        }
        self.focus.set_items(items);
        if view != self.focus_view {
            self.focus_view = view;
            self.focus.set(main);
        }
    }

    fn focused(&self) -> ComponentId {
        self.focus
            .current()
            .unwrap_or_else(|| ComponentId::for_view(self.session.view()))
    }

    fn typing(&mut self) -> bool {
        let id = self.focused();
        self.panels.get_mut(id).captures_text()
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let typing = self.typing();

        // Global keys: active regardless of focus
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE && !typing => {
                return vec![Action::Quit];
            }
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if !typing => return vec![Action::ToggleHelp],
            KeyCode::Char('L') if !typing => return vec![Action::ToggleLogs],
            _ => {}
        }

        let state = AppState::new(&self.session, &self.tui_log_lines, self.skip_secs);

        // Help overlay captures all keys when visible
        if self.panels.help_overlay.visible {
            let actions = self.panels.help_overlay.handle_key(key, &state);
            if !actions.is_empty() {
                return actions;
            }
            // Any other key closes the overlay
            return vec![Action::ToggleHelp];
        }

        match key.code {
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            _ => {}
        }

        if !typing {
            let volume = state.playback.volume;
            match key.code {
                KeyCode::Char(' ') => return vec![Action::TogglePlay],
                KeyCode::Char('m') => return vec![Action::ToggleMute],
                KeyCode::Char(',') => return vec![Action::Skip(-self.skip_secs)],
                KeyCode::Char('.') => return vec![Action::Skip(self.skip_secs)],
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    return vec![Action::Volume(volume + VOLUME_STEP)];
                }
                KeyCode::Char('-') => return vec![Action::Volume(volume - VOLUME_STEP)],
                KeyCode::Char(c @ '1'..='5') => {
                    let idx = (c as u8 - b'1') as usize;
                    return vec![Action::Navigate(View::TABS[idx])];
                }
                _ => {}
            }
        }

        let id = self.focused();
        self.panels.get_mut(id).handle_key(key, &state)
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_)
                | MouseEventKind::Drag(MouseButton::Left)
                | MouseEventKind::ScrollUp
                | MouseEventKind::ScrollDown
        );
        if !is_click {
            return vec![];
        }
        if self.panels.help_overlay.visible {
            return match event.kind {
                MouseEventKind::Down(_) => vec![Action::ToggleHelp],
                _ => vec![],
            };
        }

        let col = event.column;
        let row = event.row;

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas;
        if hit(areas.header, col, row) {
            return self.header.handle_mouse(event);
        }

        let state = AppState::new(&self.session, &self.tui_log_lines, self.skip_secs);
        let target = if hit(areas.body, col, row) {
            Some((ComponentId::for_view(state.view()), areas.body))
        } else if hit(areas.player_bar, col, row) {
            Some((ComponentId::PlayerBar, areas.player_bar))
        } else if hit(areas.log, col, row) {
            Some((ComponentId::LogPanel, areas.log))
        } else {
            None
        };

        let Some((id, area)) = target else {
            return vec![];
        };
        let mut actions = self.panels.get_mut(id).handle_mouse(event, area, &state);
        // Prepend focus if not already focused
        if !self.focus.is_focused(id) && matches!(event.kind, MouseEventKind::Down(_)) {
            actions.insert(0, Action::FocusPane(id));
        }
        actions
    }

    /// Pastes go to the main pane: a path dropped on the terminal stages it
    /// on the upload screen, text fills an open filter.
    fn handle_paste(&mut self, text: &str) -> Vec<Action> {
        if self.panels.help_overlay.visible {
            return vec![];
        }
        let state = AppState::new(&self.session, &self.tui_log_lines, self.skip_secs);
        let id = ComponentId::for_view(state.view());
        self.panels.get_mut(id).handle_paste(text, &state)
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    fn dispatch(&mut self, action: Action) {
        // Broadcast to all components first
        let secondary: Vec<Action> = {
            let state = AppState::new(&self.session, &self.tui_log_lines, self.skip_secs);
            self.panels
                .all_mut()
                .into_iter()
                .flat_map(|c| c.on_action(&action, &state))
                .collect()
        };

        self.apply_action(action);

        // Secondary actions are applied once, not re-broadcast
        for a in secondary {
            self.apply_action(a);
        }
    }

    fn apply_action(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        match action {
            // ── Navigation ────────────────────────────────────────────────────
            Action::Navigate(view) => {
                if self.session.navigate(view) && view == View::Library {
                    self.session.load_library();
                }
            }
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),

            // ── Upload form ───────────────────────────────────────────────────
            Action::StageFile(path) => self.session.stage_file(path),
            Action::ClearFile => self.session.clear_file(),
            Action::CycleSubject(delta) => self.session.cycle_subject(delta),
            Action::SetChapter(chapter) => self.session.set_chapter(chapter),
            Action::Submit => self.session.submit_upload(),
            Action::TryDemo => self.session.try_demo(),

            // ── Library ───────────────────────────────────────────────────────
            Action::RefreshLibrary => self.session.load_library(),
            Action::PlayPodcast(podcast) => self.session.play_podcast(podcast),
            Action::DeletePodcast(job_id) => self.session.delete_podcast(job_id),
            Action::Download(job_id) => self.session.download_podcast(job_id),
            Action::CopyLink(job_id) => {
                let url = self.session.download_url(&job_id);
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url.clone())) {
                    Ok(()) => self.toast.success(format!("copied: {}", url)),
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            // ── Playback ──────────────────────────────────────────────────────
            Action::TogglePlay => self.session.toggle_play(),
            Action::Skip(delta) => self.session.skip(delta),
            Action::SeekTo(secs) => self.session.seek(secs),
            Action::Volume(volume) => self.session.set_volume(volume),
            Action::ToggleMute => self.session.toggle_mute(),

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleLogs => {
                self.show_log_panel = !self.show_log_panel;
                if self.show_log_panel {
                    self.reload_tui_log();
                }
            }
            // The overlay flips itself in on_action.
            Action::ToggleHelp => {}

            Action::Quit => self.should_quit = true,
        }
    }

    fn reload_tui_log(&mut self) {
        if let Ok(content) = std::fs::read_to_string(&self.tui_log_path) {
            let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            let start = lines.len().saturating_sub(LOG_TAIL_LINES);
            self.tui_log_lines = lines[start..].to_vec();
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let player_h = if self.session.current().is_some() {
            PLAYER_BAR_H
        } else {
            0
        };
        let log_h = if self.show_log_panel { LOG_PANEL_H } else { 0 };

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(player_h),
                Constraint::Length(log_h),
                Constraint::Length(1),
            ])
            .split(area);

        self.pane_areas = PaneAreas {
            header: outer[0],
            body: outer[1],
            player_bar: outer[2],
            log: outer[3],
        };

        let typing = self.typing();
        let focused = self.focused();
        let state = AppState::new(&self.session, &self.tui_log_lines, self.skip_secs);

        self.header.draw(frame, outer[0], &state);

        let main = ComponentId::for_view(state.view());
        self.panels
            .get_mut(main)
            .draw(frame, outer[1], focused == main, &state);

        if player_h > 0 {
            self.panels.player_bar.draw(
                frame,
                outer[2],
                focused == ComponentId::PlayerBar,
                &state,
            );
        }
        if log_h > 0 {
            self.panels.log_panel.draw(
                frame,
                outer[3],
                focused == ComponentId::LogPanel,
                &state,
            );
        }

        status_bar::draw_keys_bar(frame, outer[4], state.view(), typing);

        // Overlays last
        self.panels.help_overlay.draw(frame, area, false, &state);
        self.toast.draw(frame, area);
    }
}
