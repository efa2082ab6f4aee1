//! alertwatch - manage and watch stock price alerts from the terminal.

mod cli;
mod ui;

use alertwatch::api::ApiClient;
use alertwatch::app::{App, DeleteOutcome, EditForm, Settings, clamp_interval};
use alertwatch::audio::{self, AlertSound};
use alertwatch::config::{self, Config, LoggingConfig};
use alertwatch::export::export_rows;
use anyhow::{Context, Result, bail};
use cli::{Args, Command, WatchArgs};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

type Client = App<ApiClient, ApiClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let command = args.command.clone().unwrap_or_default();
    let init = matches!(command, Command::Init { .. });

    let config = match &args.config {
        Some(path) if path.exists() || !init => Config::load(path)?,
        Some(_) => Config::default(),
        None => Config::load_or_default(),
    };

    if let Command::Init { force } = command {
        return write_config(&args, config, force);
    }

    let interactive = matches!(&command, Command::Watch(watch) if !watch.batch);
    init_logging(&config.logging, args.verbose, interactive)?;

    let Some(user) = args.user_id(&config) else {
        eprintln!("Error: No user configured.");
        eprintln!("Provide a user id via -u flag, ALERTWATCH_USER or the config file.");
        eprintln!();
        eprintln!("Example: alertwatch -u 7 list");
        eprintln!();
        eprintln!("Or run `alertwatch init -u 7` to write a config file.");
        eprintln!();
        eprintln!("Sample config:");
        eprintln!("{}", config::sample_config());
        std::process::exit(1);
    };

    let api_url = args.api_url(&config);
    let client = ApiClient::new(api_url, args.timeout(&config))
        .context("Failed to build HTTP client")?;
    info!(%user, api_url, "starting");

    let mut app = App::new(user, client.clone(), client, Settings::from_config(&config));

    match command {
        Command::List { format } => {
            require_list(&mut app).await?;
            let output = export_rows(&app.rows(), format.into())?;
            println!("{}", output.trim_end());
        }
        Command::Show { id } => {
            let alert = app.fetch(id).await?;
            ui::print_alert(&alert, &app.settings.date_format);
        }
        Command::Create {
            ticker,
            price,
            direction,
        } => {
            app.create(&cli::create_form(&ticker, &price, direction))
                .await?;
            ui::print_notice(&app);
        }
        Command::Edit {
            id,
            ticker,
            price,
            direction,
            notified,
        } => {
            require_list(&mut app).await?;
            let mut form = app
                .list
                .get(id)
                .map(EditForm::from_alert)
                .unwrap_or_default();
            if let Some(ticker) = ticker {
                form.fields.ticker = ticker;
            }
            if let Some(price) = price {
                form.fields.limit_price = price;
            }
            if let Some(direction) = direction {
                form.fields.direction = Some(direction.into());
            }
            form.notified = notified;

            app.edit(id, &form).await?;
            ui::print_notice(&app);
        }
        Command::Delete { id, yes } => {
            require_list(&mut app).await?;
            match app.delete(id, |alert| yes || cli::prompt_delete(alert)).await? {
                DeleteOutcome::Deleted => ui::print_notice(&app),
                DeleteOutcome::Declined => println!("Delete cancelled."),
            }
        }
        Command::Reset { id } => {
            require_list(&mut app).await?;
            app.reset(id).await?;
            ui::print_notice(&app);
        }
        Command::Tickers => {
            app.load_tickers().await;
            if app.tickers.is_empty() {
                println!("No active tickers.");
            }
            for ticker in &app.tickers {
                println!("{:<8} - {}", ticker.symbol, ticker.name);
            }
        }
        Command::Open { index } => {
            require_list(&mut app).await?;
            match app.open_ticker(index) {
                Some(route) => println!("{route}"),
                None => bail!("No alert at row {index}"),
            }
        }
        Command::Watch(watch) => {
            apply_watch_args(&mut app.settings, &watch);
            if app.settings.batch_mode {
                run_batch(&mut app).await?;
            } else {
                run_interactive(&mut app).await?;
            }
        }
        // Written before a user is required
        Command::Init { .. } => {}
    }

    Ok(())
}

/// Set up tracing. The interactive view owns the terminal, so it only logs
/// to a file or when `RUST_LOG` asks for it.
fn init_logging(logging: &LoggingConfig, verbose: bool, interactive: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let requested = std::env::var_os("RUST_LOG").is_some();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = &logging.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if !interactive || requested {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

/// `init`: write the effective configuration to disk.
fn write_config(args: &Args, mut config: Config, force: bool) -> Result<()> {
    let path = args
        .config
        .clone()
        .or_else(Config::default_config_path)
        .context("Could not determine the config directory")?;

    if path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(user) = args.user {
        config.user.id = Some(user);
    }
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.api.timeout = timeout;
    }

    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn apply_watch_args(settings: &mut Settings, watch: &WatchArgs) {
    if let Some(delay) = watch.delay {
        settings.refresh_interval = clamp_interval(delay);
    }
    settings.max_iterations = watch.iterations;
    settings.batch_mode = watch.batch;
    settings.audio_alerts |= watch.audio_alerts;
}

/// Fetch the list for a one-shot command, failing if it cannot be loaded.
async fn require_list(app: &mut Client) -> Result<()> {
    app.refresh().await;
    if let Some(error) = app.list.error() {
        bail!("{error}");
    }
    Ok(())
}

/// Refresh and ring the bell for newly notified alerts.
async fn poll(app: &mut Client) {
    let fired = app.refresh().await;
    if app.settings.audio_alerts {
        if let Some(sound) = AlertSound::for_count(fired.len()) {
            audio::play_sound_async(sound);
        }
    }
}

/// Run in batch mode (non-interactive, like top -b).
async fn run_batch(app: &mut Client) -> Result<()> {
    loop {
        poll(app).await;
        ui::render_batch(app);

        if app.should_quit() {
            break;
        }

        tokio::time::sleep(app.settings.refresh_interval).await;
    }

    Ok(())
}

/// Run in interactive mode with TUI.
async fn run_interactive(app: &mut Client) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    poll(app).await;

    let result = run_app(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut Client) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                handle_key_event(app, key.code, key.modifiers).await;
            }
        }

        if app.should_quit() {
            break;
        }

        if app.needs_refresh() {
            poll(app).await;
        }
    }

    Ok(())
}

/// Handle keyboard input.
async fn handle_key_event(app: &mut Client, code: KeyCode, modifiers: KeyModifiers) {
    if app.pending_delete.is_some() {
        let confirmed = match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        if let Some(Err(e)) = app.answer_delete(confirmed).await {
            warn!(error = %e, "delete from view failed");
        }
        return;
    }

    // Close help overlay on any key
    if app.show_help {
        app.show_help = false;
        return;
    }

    match code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_up(),
        KeyCode::Down | KeyCode::Char('j') => app.select_down(),
        KeyCode::Home | KeyCode::Char('g') => app.select_top(),
        KeyCode::End | KeyCode::Char('G') => app.select_bottom(),

        // Alert actions
        KeyCode::Char('r') => {
            if let Some(Err(e)) = app.reset_selected().await {
                warn!(error = %e, "reset from view failed");
            }
        }
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Enter => app.open_selected(),

        KeyCode::Char('x') => app.dismiss_notice(),
        KeyCode::Char('h') | KeyCode::Char('?') => app.toggle_help(),

        // Refresh
        KeyCode::Char(' ') | KeyCode::Char('R') => app.force_refresh(),

        _ => {}
    }
}
