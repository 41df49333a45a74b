//! Terminal UI for the review session

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use super::form::{EditForm, FieldError, FieldKey};
use super::preview::{CoverPreview, PreviewState};
use super::session::{Action, FormSource, Outcome, ReviewError, ReviewSession, ReviewSummary, allowed_actions};
use super::ImageCheck;
use crate::report::{PostSearch, PreSearch, ReportStatus, ReportStore};
use crate::tagging::TagApplier;
use crate::utils::TuiSwitch;

/// Status messages disappear after this long
const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// Captured log lines kept for the status area
const LOG_LINES: usize = 3;

enum Mode {
    Browse,
    ConfirmDrop,
    Edit {
        form: EditForm,
        focus: usize,
        errors: Vec<FieldError>,
    },
    Help,
}

struct ReviewState {
    mode: Mode,
    status_message: String,
    status_message_time: Option<Instant>,
    log: Vec<String>,
    previewed: Option<String>,
}

impl ReviewState {
    fn new() -> Self {
        Self {
            mode: Mode::Browse,
            status_message: String::new(),
            status_message_time: None,
            log: Vec::new(),
            previewed: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_message_time = Some(Instant::now());
    }

    fn check_status_timeout(&mut self) {
        if let Some(set_at) = self.status_message_time
            && set_at.elapsed() > STATUS_TIMEOUT
        {
            self.status_message.clear();
            self.status_message_time = None;
        }
    }

    fn push_log(&mut self, lines: Vec<String>) {
        self.log.extend(lines);
        let excess = self.log.len().saturating_sub(LOG_LINES);
        self.log.drain(..excess);
    }
}

/// Snapshot of the entry under review, taken once per frame
struct EntryView {
    url: String,
    status: ReportStatus,
    pre: PreSearch,
    post: Option<PostSearch>,
    actions: Vec<Action>,
    position: (usize, usize),
}

impl EntryView {
    fn cover_url(&self) -> Option<&str> {
        self.post
            .as_ref()
            .and_then(|p| p.thumbnail_url.as_deref())
            .or(self.pre.thumbnail_url.as_deref())
    }

    fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Run the review screen until the ledger is exhausted or the operator quits
///
/// The ledger is dumped after every finalized entry and again on exit.
pub async fn run_review<T, P>(
    store: &mut ReportStore,
    tagger: &T,
    images: &P,
    http: reqwest::Client,
    output_dir: &Path,
    switch: &TuiSwitch,
) -> Result<ReviewSummary>
where
    T: TagApplier + ?Sized,
    P: ImageCheck + ?Sized,
{
    let mut guard = store.guard();

    enable_raw_mode()?;
    switch.set_active(true);
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = {
        let mut session = ReviewSession::new(&mut guard, tagger, output_dir);
        let mut preview = CoverPreview::new(http);
        let mut state = ReviewState::new();
        let outcome = review_loop(&mut terminal, &mut state, &mut session, &mut preview, images, switch).await;
        outcome.map(|_| session.summary())
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    switch.set_active(false);

    guard.finish().context("Failed to save report")?;
    result
}

async fn review_loop<T, P>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut ReviewState,
    session: &mut ReviewSession<'_, T>,
    preview: &mut CoverPreview,
    images: &P,
    switch: &TuiSwitch,
) -> Result<()>
where
    T: TagApplier + ?Sized,
    P: ImageCheck + ?Sized,
{
    loop {
        let Some(view) = entry_view(session)? else {
            return Ok(());
        };

        if state.previewed.as_deref() != Some(view.url.as_str()) {
            preview.show(view.cover_url());
            state.previewed = Some(view.url.clone());
        }

        state.push_log(switch.drain());
        state.check_status_timeout();

        let cover = preview.state();
        terminal.draw(|f| draw_ui(f, state, &view, &cover))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let action = match &mut state.mode {
            Mode::Help => {
                state.mode = Mode::Browse;
                continue;
            }
            Mode::ConfirmDrop => {
                state.mode = Mode::Browse;
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => Action::Drop,
                    _ => continue,
                }
            }
            Mode::Edit { form, focus, .. } => {
                let field = FieldKey::ALL[*focus];
                match key.code {
                    KeyCode::Esc => state.mode = Mode::Browse,
                    KeyCode::Up | KeyCode::BackTab => {
                        *focus = focus.checked_sub(1).unwrap_or(FieldKey::ALL.len() - 1);
                    }
                    KeyCode::Down | KeyCode::Tab => *focus = (*focus + 1) % FieldKey::ALL.len(),
                    KeyCode::Backspace => form.pop_char(field),
                    KeyCode::Char(c) => form.push_char(field, c),
                    KeyCode::Enter => {
                        state.set_status("Validating...");
                        terminal.draw(|f| draw_ui(f, state, &view, &cover))?;
                        submit_form(state, session, images).await?;
                    }
                    _ => {}
                }
                continue;
            }
            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
                KeyCode::Char('?') => {
                    state.mode = Mode::Help;
                    continue;
                }
                KeyCode::Char('a') => Action::AcceptResolved,
                KeyCode::Char('o') => Action::AcceptOriginal,
                KeyCode::Char('e') => Action::Edit(FormSource::Pre),
                KeyCode::Char('r') => Action::Edit(FormSource::Post),
                KeyCode::Char('s') | KeyCode::Char('n') | KeyCode::Right => Action::Skip,
                KeyCode::Char('d') => {
                    if view.allows(Action::Drop) {
                        state.mode = Mode::ConfirmDrop;
                    }
                    continue;
                }
                _ => continue,
            },
        };

        if !view.allows(action) {
            state.set_status(format!("Cannot {} a {} entry", action.label(), view.status));
            continue;
        }

        match session.act(action).await {
            Ok(Outcome::Quit) => return Ok(()),
            Ok(outcome) => handle_outcome(state, outcome),
            Err(ReviewError::NotAllowed { action, status }) => {
                state.set_status(format!("Cannot {} a {} entry", action, status));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn entry_view<T: TagApplier + ?Sized>(session: &mut ReviewSession<'_, T>) -> Result<Option<EntryView>> {
    let Some((url, entry)) = session.current() else {
        return Ok(None);
    };
    let mut view = EntryView {
        url: url.to_string(),
        status: entry.status,
        pre: entry.pre_search()?,
        post: entry.post_search()?,
        actions: allowed_actions(entry),
        position: (0, 0),
    };
    view.position = session.progress();
    Ok(Some(view))
}

fn handle_outcome(state: &mut ReviewState, outcome: Outcome) {
    match outcome {
        Outcome::Finalized(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            state.set_status(format!("Saved {}", name));
            state.mode = Mode::Browse;
        }
        Outcome::Skipped => state.set_status("Skipped"),
        Outcome::Dropped => state.set_status("Entry dropped"),
        Outcome::NeedsEdit { form, error } => {
            if let Some(error) = error {
                state.set_status(error);
            }
            state.mode = Mode::Edit {
                form,
                focus: 0,
                errors: Vec::new(),
            };
        }
        Outcome::Quit => {}
    }
}

/// Validate the open form and commit it; invalid fields keep the form open
async fn submit_form<T, P>(
    state: &mut ReviewState,
    session: &mut ReviewSession<'_, T>,
    images: &P,
) -> Result<()>
where
    T: TagApplier + ?Sized,
    P: ImageCheck + ?Sized,
{
    let Mode::Edit { form, focus, errors } = &mut state.mode else {
        return Ok(());
    };

    match form.validate(images).await {
        Err(found) => {
            if let Some(first) = found.first() {
                *focus = FieldKey::ALL.iter().position(|k| *k == first.key).unwrap_or(0);
            }
            *errors = found;
            state.set_status("Fix the highlighted fields");
            Ok(())
        }
        Ok(metadata) => {
            let form = form.clone();
            match session.commit(form, metadata).await {
                Ok(outcome) => {
                    handle_outcome(state, outcome);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn draw_ui(f: &mut Frame, state: &ReviewState, view: &EntryView, cover: &PreviewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                    // Header
            Constraint::Min(10),                      // Entry
            Constraint::Length(3),                    // Cover
            Constraint::Length(LOG_LINES as u16 + 2), // Log
            Constraint::Length(3),                    // Footer/help
        ])
        .split(f.area());

    let (pos, total) = view.position;
    let header = Paragraph::new(format!("Review {}/{}: {} [{}]", pos, total, view.url, view.status))
        .style(Style::default().fg(status_color(view.status)).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    match &state.mode {
        Mode::Edit { form, focus, errors } => draw_form(f, chunks[1], form, *focus, errors),
        _ => draw_entry(f, chunks[1], view),
    }

    let cover_text = match cover {
        PreviewState::Empty => "No cover".to_string(),
        PreviewState::Loading => "Loading cover...".to_string(),
        PreviewState::Ready(summary) => format!(
            "{} {}x{} ({} KB)",
            summary.format,
            summary.width,
            summary.height,
            summary.bytes / 1024
        ),
        PreviewState::Failed(reason) => format!("Cover unavailable: {}", reason),
    };
    let cover_widget = Paragraph::new(cover_text)
        .block(Block::default().title("Cover").borders(Borders::ALL));
    f.render_widget(cover_widget, chunks[2]);

    let log_lines: Vec<Line> = state
        .log
        .iter()
        .map(|msg| Line::styled(msg.clone(), Style::default().fg(Color::Yellow)))
        .collect();
    let log = Paragraph::new(log_lines)
        .block(Block::default().title("Log").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(log, chunks[3]);

    let help_text = match &state.mode {
        Mode::Edit { .. } => "↑/↓: Field | Type to edit | Enter: Validate & save | Esc: Cancel".to_string(),
        Mode::ConfirmDrop => "Drop this entry without saving it? y: Yes | any other key: No".to_string(),
        _ => browse_help(view),
    };
    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, chunks[4]);

    if let Mode::Help = state.mode {
        let help_lines = vec![
            Line::from("Keyboard Shortcuts"),
            Line::from(""),
            Line::from("  a           Accept resolved metadata"),
            Line::from("  o           Accept original metadata"),
            Line::from("  e / r       Edit original / resolved"),
            Line::from("  s, n, →     Skip for now"),
            Line::from("  d           Drop entry"),
            Line::from("  q, Esc      Save and quit"),
            Line::from(""),
            Line::styled("Press any key to close", Style::default().fg(Color::DarkGray)),
        ];
        let popup = Paragraph::new(help_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .style(Style::default().bg(Color::Black)),
        );
        let area = centered_rect(50, 12, f.area());
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(popup, area);
    }

    if !state.status_message.is_empty() {
        let status = Paragraph::new(state.status_message.clone())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL));
        let area = centered_rect(60, 3, f.area());
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(status, area);
    }
}

fn draw_entry(f: &mut Frame, area: Rect, view: &EntryView) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let pre = &view.pre;
    let playlists = pre
        .playlists
        .iter()
        .map(|p| p.name().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let pre_lines = vec![
        field_line("Title", pre.title.as_deref()),
        field_line("Uploader", pre.uploader.as_deref()),
        field_line("Provider", pre.provider.map(|p| p.to_string()).as_deref()),
        field_line("Duration", pre.duration.map(|d| format!("{}:{:02}", d / 60, d % 60)).as_deref()),
        field_line("Genres", pre.genres.as_ref().map(|g| g.join(", ")).as_deref()),
        field_line("Playlists", Some(playlists.as_str()).filter(|p| !p.is_empty())),
        field_line("File", pre.path.as_deref()),
    ];
    let pre_widget = Paragraph::new(pre_lines)
        .block(Block::default().title("Downloaded").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(pre_widget, columns[0]);

    let post_lines = match &view.post {
        Some(post) => vec![
            field_line("Title", post.title.as_deref()),
            field_line("Artist", post.artist.as_deref()),
            field_line("Artists", Some(post.artists.join(", ").as_str()).filter(|a| !a.is_empty())),
            field_line("Album", post.album.as_deref()),
            field_line(
                "Track",
                post.track_num
                    .zip(post.total_tracks)
                    .map(|(n, t)| format!("{}/{}", n, t))
                    .as_deref(),
            ),
            field_line("Released", post.release_date.as_deref()),
            field_line("Single", Some(if post.is_single { "yes" } else { "no" })),
            field_line("MBID", post.mbid.as_deref()),
        ],
        None => vec![Line::styled(
            "Nothing resolved",
            Style::default().fg(Color::DarkGray),
        )],
    };
    let post_widget = Paragraph::new(post_lines)
        .block(Block::default().title("Resolved").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(post_widget, columns[1]);
}

fn draw_form(f: &mut Frame, area: Rect, form: &EditForm, focus: usize, errors: &[FieldError]) {
    let items: Vec<ListItem> = FieldKey::ALL
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let error = errors.iter().find(|e| e.key == *key);
            let cursor = if idx == focus { "█" } else { "" };
            let mut text = format!("{:<28} {}{}", key.label(), form.value(*key), cursor);
            if let Some(error) = error {
                text.push_str(&format!("  ({})", error.message));
            }
            let style = if error.is_some() {
                Style::default().fg(Color::Red)
            } else if idx == focus {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().title("Edit metadata").borders(Borders::ALL));
    f.render_widget(list, area);
}

fn field_line(label: &str, value: Option<&str>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value.unwrap_or("-").to_string()),
    ])
}

fn browse_help(view: &EntryView) -> String {
    let mut keys = Vec::new();
    if view.allows(Action::AcceptResolved) {
        keys.push("a: Accept resolved");
    }
    if view.allows(Action::AcceptOriginal) {
        keys.push("o: Accept original");
    }
    if view.allows(Action::Edit(FormSource::Pre)) {
        keys.push("e: Edit");
    }
    if view.allows(Action::Edit(FormSource::Post)) {
        keys.push("r: Edit resolved");
    }
    keys.extend(["s: Skip", "d: Drop", "?: Help", "q: Quit"]);
    keys.join(" | ")
}

fn status_color(status: ReportStatus) -> Color {
    match status {
        ReportStatus::DownloadFailure => Color::Red,
        ReportStatus::MetadataNotFound | ReportStatus::DownloadSuccess => Color::Yellow,
        ReportStatus::Single | ReportStatus::AlbumFound => Color::Green,
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(status: ReportStatus, actions: Vec<Action>) -> EntryView {
        EntryView {
            url: "u".to_string(),
            status,
            pre: PreSearch {
                url: "u".to_string(),
                thumbnail_url: Some("https://i.ytimg.com/pre.jpg".to_string()),
                ..Default::default()
            },
            post: None,
            actions,
            position: (1, 1),
        }
    }

    #[test]
    fn test_failure_help_hides_accept_keys() {
        let help = browse_help(&view(
            ReportStatus::DownloadFailure,
            vec![Action::Skip, Action::Drop, Action::Quit],
        ));
        assert!(!help.contains("Accept"));
        assert!(help.contains("s: Skip"));
    }

    #[test]
    fn test_cover_prefers_resolved() {
        let mut v = view(ReportStatus::Single, Vec::new());
        assert_eq!(v.cover_url(), Some("https://i.ytimg.com/pre.jpg"));

        v.post = Some(PostSearch {
            thumbnail_url: Some("https://coverartarchive.org/release/r/front-500".to_string()),
            ..Default::default()
        });
        assert_eq!(v.cover_url(), Some("https://coverartarchive.org/release/r/front-500"));
    }

    #[test]
    fn test_log_keeps_latest_lines() {
        let mut state = ReviewState::new();
        state.push_log((0..5).map(|i| format!("warn {}", i)).collect());
        assert_eq!(state.log, vec!["warn 2", "warn 3", "warn 4"]);
    }
}
