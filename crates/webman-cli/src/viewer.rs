use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Terminal;
use tracing::warn;
use webman_core::{Device, MediaSession, Snapshot, Transport};

use crate::report::format_elapsed;

type Reading = fn(&Snapshot) -> Option<f64>;

fn cpu(snapshot: &Snapshot) -> Option<f64> {
    snapshot.cpu_temp()
}

fn rsx(snapshot: &Snapshot) -> Option<f64> {
    snapshot.rsx_temp()
}

fn fan(snapshot: &Snapshot) -> Option<f64> {
    snapshot.fan_speed().map(f64::from)
}

fn target(snapshot: &Snapshot) -> Option<f64> {
    snapshot.target_temp()
}

const METRICS: [(&str, Color, Reading); 4] = [
    ("CPU (C)", Color::Red, cpu),
    ("RSX (C)", Color::Yellow, rsx),
    ("Fan (%)", Color::Cyan, fan),
    ("Target (C)", Color::Magenta, target),
];

struct MetricSeries {
    label: &'static str,
    color: Color,
    reading: Reading,
    points: VecDeque<(f64, f64)>,
}

impl MetricSeries {
    fn push(&mut self, x: f64, snapshot: &Snapshot, window_sec: f64) {
        if let Some(y) = (self.reading)(snapshot) {
            self.points.push_back((x, y));
        }
        while let Some((old_x, _)) = self.points.front() {
            if x - old_x > window_sec {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    fn bounds(&self) -> [f64; 2] {
        if self.points.is_empty() {
            return [0.0, 1.0];
        }
        let (min, max) = self
            .points
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), (_, y)| (min.min(*y), max.max(*y)));
        if (max - min).abs() < f64::EPSILON {
            [min - 1.0, max + 1.0]
        } else {
            let pad = (max - min) * 0.12;
            [min - pad, max + pad]
        }
    }
}

struct ViewerState {
    start: Instant,
    latest: Option<Arc<Snapshot>>,
    series: Vec<MetricSeries>,
}

impl ViewerState {
    fn new() -> Self {
        let series = METRICS
            .iter()
            .map(|(label, color, reading)| MetricSeries {
                label: *label,
                color: *color,
                reading: *reading,
                points: VecDeque::new(),
            })
            .collect();

        Self {
            start: Instant::now(),
            latest: None,
            series,
        }
    }

    fn update(&mut self, snapshot: Arc<Snapshot>, window_sec: f64) {
        let t = self.start.elapsed().as_secs_f64();
        for series in &mut self.series {
            series.push(t, &snapshot, window_sec);
        }
        self.latest = Some(snapshot);
    }
}

pub async fn run_viewer<T: Transport>(device: &Device<T>, window_sec: f64) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = ViewerState::new();
    let mut next_tick = Instant::now();
    let every = device.config().poll_interval;
    let address = device.address().to_string();

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                        break;
                    }
                }
            }

            if Instant::now() >= next_tick {
                let snapshot = match device.poll().await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(error = %err, "poll failed");
                        device.snapshot()
                    }
                };
                state.update(snapshot, window_sec);
                next_tick = Instant::now() + every;
            }

            terminal.draw(|frame| draw_ui(frame.size(), frame, &state, &address, window_sec))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(
    area: Rect,
    frame: &mut ratatui::Frame<'_>,
    state: &ViewerState,
    address: &str,
    window_sec: f64,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    frame.render_widget(render_header(state, address, window_sec), rows[0]);

    let chart_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let now_sec = state.start.elapsed().as_secs_f64();
    let mut series = state.series.iter();
    for row_area in chart_rows.iter().copied() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(row_area);

        for col in cols.iter().copied() {
            match series.next() {
                Some(metric) => render_metric_chart(frame, col, metric, now_sec, window_sec),
                None => frame.render_widget(Paragraph::new(Line::from(" ")), col),
            }
        }
    }
}

fn render_header(state: &ViewerState, address: &str, window_sec: f64) -> Paragraph<'static> {
    let mut lines = Vec::new();
    match &state.latest {
        Some(snapshot) => {
            let fan_mode = snapshot
                .fan_mode()
                .map(|mode| mode.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            let status = format!(
                "power={:?} fan_mode={} firmware={} seq={}",
                snapshot.power_state(),
                fan_mode,
                snapshot.firmware_version().unwrap_or("n/a"),
                snapshot.sequence(),
            );
            lines.push(Line::from(vec![
                Span::styled(
                    "webMAN Viewer  ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(status),
            ]));
            lines.push(Line::from(session_line(snapshot)));
        }
        None => lines.push(Line::from("Waiting first snapshot...")),
    }
    lines.push(Line::from(format!(
        "{address}  window={}s  (press 'q' to quit)",
        window_sec as u64
    )));

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn session_line(snapshot: &Snapshot) -> String {
    match snapshot.media_session() {
        Some(MediaSession::Game {
            game_title,
            game_id,
            playback_elapsed,
            ..
        }) => format!("playing {game_title} [{game_id}] {}", format_elapsed(*playback_elapsed)),
        Some(MediaSession::Media { playback_elapsed }) => {
            format!("playing media {}", format_elapsed(*playback_elapsed))
        }
        None => match snapshot.mounted_gamefile() {
            Some(mounted) => format!("idle, mounted {mounted}"),
            None => "idle".to_string(),
        },
    }
}

fn render_metric_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    series: &MetricSeries,
    now_sec: f64,
    window_sec: f64,
) {
    let points: Vec<(f64, f64)> = series.points.iter().copied().collect();

    let x_min = (now_sec - window_sec).max(0.0);
    let x_max = now_sec.max(window_sec);
    let x_mid = (x_min + x_max) / 2.0;
    let y_bounds = series.bounds();

    let dataset = Dataset::default()
        .name(series.label)
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(series.color))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(series.label))
        .x_axis(
            Axis::default()
                .title("time (s)")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format!("{x_min:.0}")),
                    Span::raw(format!("{x_mid:.0}")),
                    Span::raw(format!("{x_max:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}
