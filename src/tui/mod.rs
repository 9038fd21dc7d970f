pub mod app;
pub mod ui;

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, error, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::commands::Context;
use crate::config::{data_dir, UpdateConfig};
use crate::error::Result;
use crate::update::{current_version, UpdateChecker, UpdateStatus, POLL_INTERVAL};
use app::App;
use ui::ui;

const TICK: Duration = Duration::from_millis(250);

pub fn run_tui(ctx: Context) -> Result<()> {
    logging_to_file();
    let updates = spawn_update_poll(&ctx.config.update);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(ctx);
    let res = run_app(&mut terminal, &mut app, updates.as_ref());

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("TUI stopped: {}", err);
    }
    res
}

fn logging_to_file() {
    let dir = data_dir();
    if let Err(e) = crate::logging::init_file(&dir) {
        eprintln!("Logging disabled: {}", e);
    }
}

/// Polls the release feed in the background until the UI goes away.
fn spawn_update_poll(config: &UpdateConfig) -> Option<Receiver<UpdateStatus>> {
    if !config.enabled {
        debug!("Update check disabled");
        return None;
    }
    let checker = match UpdateChecker::new(config.url.clone(), current_version()) {
        Ok(checker) => checker,
        Err(e) => {
            info!("Update check unavailable: {}", e);
            return None;
        }
    };
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || loop {
        if tx.send(checker.check_quietly()).is_err() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    });
    Some(rx)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    updates: Option<&Receiver<UpdateStatus>>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Some(rx) = updates {
            while let Ok(status) = rx.try_recv() {
                app.set_update(status);
            }
        }

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
