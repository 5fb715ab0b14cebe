// services/asset-dash/src/main.rs
//
// Terminal dashboard for machine, maintenance, spare part and equipment counts
//
// Run with: cargo run --bin asset-dash -- --demo --division D1

use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use svckit::config::ObservabilityConfig;
use svckit::{AssetClient, QueryCache};

mod config;
mod detail;
mod mock;
mod poller;
mod state;
mod tiles;
mod ui;

use crate::config::{load_config, AssetDashConfig};
use detail::DetailView;
use mock::DemoBackend;
use poller::{PollEvent, Poller, Selection};
use state::DashboardState;
use tiles::Section;

const DEMO_SEED: u64 = 20240115;

#[derive(Parser, Debug)]
#[command(name = "asset-dash")]
#[command(about = "Terminal dashboard for machine, maintenance, spare part and equipment counts")]
#[command(version)]
struct Args {
    /// Configuration file (YAML); missing file means defaults
    #[arg(long, short, default_value = "config/asset-dash.yaml")]
    config: String,

    /// Division to scope every tile to
    #[arg(long)]
    division: Option<String>,

    /// Unit to scope every tile to; wins over --division
    #[arg(long)]
    unit: Option<String>,

    /// Serve synthetic data from an in-process backend
    #[arg(long, short)]
    demo: bool,

    /// Fetch every tile once, print the counts and exit
    #[arg(long)]
    once: bool,

    /// UI tick in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    // The TUI owns the terminal, so interactive runs log to a file
    let _guard = init_logging(&config.observability, args.once)?;

    info!("asset-dash {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let client = Arc::new(build_client(&args, &config)?);
    let selection = Selection::new(args.division.clone(), args.unit.clone());

    if args.once {
        return runtime.block_on(run_once(client, &selection));
    }

    let mode = if args.demo { "DEMO" } else { "LIVE" };
    run_tui(&runtime, client, &config, selection, mode, Duration::from_millis(args.tick_ms))
}

fn build_client(args: &Args, config: &AssetDashConfig) -> Result<AssetClient> {
    let client = if args.demo {
        let backend = DemoBackend::new(DEMO_SEED).with_latency(20, 150).with_failures(1, 80);
        AssetClient::with_fetcher(Arc::new(backend), &config.backend, &config.refresh)?
    } else {
        AssetClient::new(&config.backend, &config.refresh)?
    };
    Ok(client)
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

fn fmt_layer<W>(json: bool, writer: W, ansi: bool) -> Box<dyn Layer<FilteredRegistry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn init_logging(observability: &ObservabilityConfig, to_stderr: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "asset_dash={level},svckit={level}",
            level = observability.log_level
        ))
    });

    let (layer, guard) = if to_stderr {
        (fmt_layer(observability.json_logs, std::io::stderr, true), None)
    } else {
        std::fs::create_dir_all(&observability.log_dir)?;
        let appender = tracing_appender::rolling::daily(&observability.log_dir, "asset-dash.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (fmt_layer(observability.json_logs, writer, false), Some(guard))
    };

    tracing_subscriber::registry().with(env_filter).with(layer).init();
    Ok(guard)
}

async fn run_once(client: Arc<AssetClient>, selection: &Selection) -> Result<()> {
    let started = Instant::now();
    let counts = poller::fetch_all_once(client, selection).await;

    println!("{:<24} {:<28} {:>8}", "SECTION", "TILE", "COUNT");
    let mut failed = 0;
    for tile in &counts {
        match &tile.result {
            Ok(count) => println!("{:<24} {:<28} {:>8}", tile.section, tile.title, count),
            Err(e) => {
                failed += 1;
                println!("{:<24} {:<28} {:>8}  {}", tile.section, tile.title, "ERR", e);
            }
        }
    }

    info!("Fetched {} tiles in {:?} ({} failed)", counts.len(), started.elapsed(), failed);
    debug!("Metrics:\n{}", svckit::metrics::render());

    if failed > 0 {
        bail!("{} of {} tiles failed", failed, counts.len());
    }
    Ok(())
}

fn run_tui(
    runtime: &Runtime,
    client: Arc<AssetClient>,
    config: &AssetDashConfig,
    selection: Selection,
    mode: &str,
    tick_rate: Duration,
) -> Result<()> {
    let cache = Arc::new(QueryCache::new());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (selection_tx, selection_rx) = watch::channel(selection.clone());

    let poller = Arc::new(Poller::new(client, cache.clone(), config.refresh.clone(), event_tx));
    runtime.spawn(poller.run(selection_rx));

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let app = App {
        cache,
        selection_tx,
        event_rx,
        stale_after: config.refresh.stale_after(),
        units_stale_after: config.refresh.units_stale_after(),
        mode,
        tick_rate,
    };
    let result = app.run(&mut terminal, selection);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

struct App<'a> {
    cache: Arc<QueryCache>,
    selection_tx: watch::Sender<Selection>,
    event_rx: mpsc::UnboundedReceiver<PollEvent>,
    stale_after: Duration,
    units_stale_after: Duration,
    mode: &'a str,
    tick_rate: Duration,
}

impl App<'_> {
    fn run<B: Backend>(mut self, terminal: &mut Terminal<B>, selection: Selection) -> Result<()> {
        let mut sections = selection.catalog();
        let mut state = DashboardState::new(&selection, tile_count(&sections));
        let mut last_tick = Instant::now();

        state.add_log("INFO", &format!("Dashboard started in {} mode", self.mode));
        if let Some(division) = &selection.division_id {
            state.add_log("INFO", &format!("Division {}", division));
        }

        loop {
            terminal.draw(|frame| {
                let view = ui::View {
                    state: &state,
                    cache: &self.cache,
                    sections: &sections,
                    stale_after: self.stale_after,
                    units_stale_after: self.units_stale_after,
                    mode: self.mode,
                };
                ui::draw_ui(frame, &view)
            })?;

            let timeout = self.tick_rate.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && !self.handle_key(&mut state, &sections, key.code, key.modifiers) {
                        return Ok(());
                    }
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.sync(&mut state);
                last_tick = Instant::now();
            }

            let current = state.selection();
            if current != *self.selection_tx.borrow() {
                sections = current.catalog();
                state.tile_count = tile_count(&sections);
                state.cursor = state.cursor.min(state.tile_count.saturating_sub(1));
                state.detail = None;
                self.selection_tx.send_replace(current);
            }
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&self, state: &mut DashboardState, sections: &[Section], code: KeyCode, modifiers: KeyModifiers) -> bool {
        if let Some(detail) = state.detail.as_mut() {
            if let Some(prompt) = detail.range_prompt_mut() {
                match code {
                    KeyCode::Esc => detail.cancel_range_entry(),
                    KeyCode::Enter => {
                        if let Err(error) = detail.submit_range_entry() {
                            state.add_log("WARN", &format!("Date range: {}", error));
                        }
                    }
                    KeyCode::Tab | KeyCode::BackTab => prompt.switch_field(),
                    KeyCode::Backspace => prompt.backspace(),
                    KeyCode::Char(c) => prompt.push(c),
                    _ => {}
                }
                return true;
            }

            match code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => state.detail = None,
                KeyCode::Right | KeyCode::PageDown => detail.next_page(),
                KeyCode::Left | KeyCode::PageUp => detail.prev_page(),
                KeyCode::Char('d') => detail.cycle_preset(Local::now().date_naive()),
                KeyCode::Char('r') => detail.begin_range_entry(),
                KeyCode::Char('c') => detail.clear_range(),
                KeyCode::Char('e') => state.toggle_errors_only(),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Up => state.cursor_up(),
            KeyCode::Down => state.cursor_down(),
            KeyCode::Char('u') if !modifiers.contains(KeyModifiers::SHIFT) => {
                state.next_unit();
            }
            KeyCode::Char('U') | KeyCode::Char('u') => {
                state.prev_unit();
            }
            KeyCode::Enter => self.open_detail(state, sections),
            KeyCode::Char('e') => state.toggle_errors_only(),
            _ => {}
        }
        true
    }

    fn open_detail(&self, state: &mut DashboardState, sections: &[Section]) {
        let Some(tile) = sections.iter().flat_map(|s| s.tiles.iter()).nth(state.cursor) else {
            return;
        };
        match self.cache.snapshot(&tile.key) {
            Some(data) => state.detail = Some(DetailView::new(tile.title, &tile.key, data)),
            None => state.add_log("WARN", &format!("{} has no data yet", tile.title)),
        }
    }

    /// Pulls finished refreshes, the unit list and the open detail's data
    /// from the cache.
    fn sync(&mut self, state: &mut DashboardState) {
        while let Ok(event) = self.event_rx.try_recv() {
            state.record(event);
        }

        if let Some(division) = state.division_id.clone() {
            if let Some(data) = self.cache.snapshot(&tiles::units_key(&division)) {
                state.set_units(data.units().to_vec());
            }
        }

        if let Some(detail) = state.detail.as_mut() {
            if let Some(data) = self.cache.snapshot(&detail.key) {
                detail.set_data(data);
            }
        }
    }
}

fn tile_count(sections: &[Section]) -> usize {
    sections.iter().map(|s| s.tiles.len()).sum()
}
