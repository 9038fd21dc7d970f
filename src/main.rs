//! # dailywork
//!
//! A daily work log for the terminal. Fill in the day's form (date, author,
//! department, working hours, up to eight tasks, special notes) and export it
//! as an xlsx workbook built from a fixed template, or as a PDF.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! dailywork
//! # or explicitly
//! dailywork ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `Tab`: Switch between the info, task and notes panels
//! *   `Enter`: Edit the selected field or task
//! *   `a`: Add a task
//! *   `Space`: Toggle task completion
//! *   `d`: Delete task, `y`: Duplicate task
//! *   `K` / `J`: Move task up / down
//! *   `h` / `o`: Toggle half day / oasis
//! *   `x` / `p`: Export xlsx / pdf
//! *   `q`: Quit
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! dailywork new --date 2024-03-05
//! dailywork set --author Kim --department Dev --start 09:00 --end 18:00
//! dailywork task add "Review" --done
//! dailywork export xlsx
//! dailywork import "20240305 일일업무일지_Kim.xlsx"
//! ```
//!
//! ## Data Storage
//!
//! The draft and preferences live in the local data directory
//! (`~/.local/share/dailywork` on Linux). Override with `DAILYWORK_HOME`.
//! Settings are read from `config.toml` there, or from `DAILYWORK_CONFIG`.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::error;

use dailywork::commands::*;
use dailywork::filename::{Block, DateStyle};
use dailywork::logging;
use dailywork::record::Direction;
use dailywork::tui::run_tui;
use dailywork::{Attendance, Result};

#[derive(Parser)]
#[command(name = "dailywork")]
#[command(version, about = "Daily work log with xlsx and pdf export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new work log, replacing the current draft
    New {
        /// Date of the log (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show the current work log
    Show,
    /// Change header fields of the current work log
    Set {
        /// Date, e.g. 2024-03-05 or 2024. 3. 5.
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short = 'D', long)]
        department: Option<String>,
        /// Start time, HH:MM
        #[arg(short, long)]
        start: Option<String>,
        /// End time, HH:MM
        #[arg(short, long)]
        end: Option<String>,
        /// Special notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Set the attendance state
    Attendance {
        #[arg(value_enum)]
        state: AttendanceArg,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Export the current work log
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Replace the current work log with an exported workbook
    Import {
        path: PathBuf,
    },
    /// Remember author, department and working hours
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Customize the export file name
    Filename {
        #[command(subcommand)]
        command: FilenameCommands,
    },
    /// Manage frequently used task descriptions
    Common {
        #[command(subcommand)]
        command: CommonCommands,
    },
    /// Check for a newer release
    CheckUpdate,
    /// Discard the current work log
    Discard {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Clone, Copy, ValueEnum)]
enum AttendanceArg {
    Normal,
    HalfDay,
    Oasis,
}

impl From<AttendanceArg> for Attendance {
    fn from(arg: AttendanceArg) -> Self {
        match arg {
            AttendanceArg::Normal => Attendance::Normal,
            AttendanceArg::HalfDay => Attendance::HalfDay,
            AttendanceArg::Oasis => Attendance::Oasis,
        }
    }
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task
    Add {
        /// What was worked on
        description: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Mark as completed
        #[arg(long)]
        done: bool,
        /// Take the description from a common task (1-based)
        #[arg(short, long)]
        common: Option<usize>,
    },
    /// Edit a task
    Edit {
        /// Task position (1-based)
        position: usize,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Toggle completion of a task
    Toggle { position: usize },
    /// Remove a task
    Remove { position: usize },
    /// Move a task up
    Up { position: usize },
    /// Move a task down
    Down { position: usize },
    /// Append a copy of a task
    Duplicate { position: usize },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export as xlsx
    Xlsx {
        /// Output file or directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Export as pdf
    Pdf {
        /// Output file or directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Build the pdf from a PNG capture instead of the report layout
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save author, department and working hours of the current log
    Save,
    /// Show the saved profile
    Show,
}

#[derive(Subcommand)]
enum FilenameCommands {
    /// List blocks and preview the file name
    Show,
    /// Print the file name for the current log
    Preview {
        #[arg(short, long, default_value = "xlsx")]
        extension: String,
    },
    /// Append a block
    Add {
        #[command(subcommand)]
        block: BlockArg,
    },
    /// Remove a block (1-based)
    Remove { position: usize },
    /// Move a block (1-based positions)
    Move { from: usize, to: usize },
    /// Change the text of a text block (1-based)
    Edit { position: usize, text: String },
    /// Set the date style (yyyymmdd, yymmdd, yyyy-mm-dd, korean)
    Style {
        #[arg(value_parser = parse_date_style)]
        style: DateStyle,
    },
    /// Restore the default file name format
    Reset,
}

#[derive(Subcommand)]
enum BlockArg {
    /// Literal text
    Text { content: String },
    /// Author name
    Author,
    /// Date of the log
    Date,
}

impl From<BlockArg> for Block {
    fn from(arg: BlockArg) -> Self {
        match arg {
            BlockArg::Text { content } => Block::text(content),
            BlockArg::Author => Block::Author,
            BlockArg::Date => Block::Date,
        }
    }
}

#[derive(Subcommand)]
enum CommonCommands {
    /// List common tasks
    List,
    /// Add a common task
    Add {
        description: String,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Remove a common task (1-based)
    Remove { position: usize },
}

fn parse_date_style(s: &str) -> std::result::Result<DateStyle, String> {
    DateStyle::from_name(s).ok_or_else(|| format!("unknown date style '{}'", s))
}

fn run(command: Option<Commands>) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "dailywork", &mut io::stdout());
        return Ok(());
    }

    let mut ctx = Context::open()?;
    match command {
        Some(Commands::New { date }) => cmd_new(&mut ctx, date, false).map(|_| ()),
        Some(Commands::Show) => cmd_show(&ctx),
        Some(Commands::Set { date, author, department, start, end, notes }) => {
            let edit = RecordEdit {
                date,
                author,
                department,
                start_time: start,
                end_time: end,
                special_notes: notes,
            };
            cmd_set(&mut ctx, edit, false)
        }
        Some(Commands::Attendance { state }) => cmd_attendance(&mut ctx, state.into(), false),
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add { description, notes, done, common } => {
                cmd_task_add(&mut ctx, description, notes, done, common, false).map(|_| ())
            }
            TaskCommands::Edit { position, description, notes } => {
                cmd_task_edit(&mut ctx, position, description, notes, false)
            }
            TaskCommands::Toggle { position } => cmd_task_toggle(&mut ctx, position, false).map(|_| ()),
            TaskCommands::Remove { position } => cmd_task_remove(&mut ctx, position, false),
            TaskCommands::Up { position } => {
                cmd_task_move(&mut ctx, position, Direction::Up, false).map(|_| ())
            }
            TaskCommands::Down { position } => {
                cmd_task_move(&mut ctx, position, Direction::Down, false).map(|_| ())
            }
            TaskCommands::Duplicate { position } => {
                cmd_task_duplicate(&mut ctx, position, false).map(|_| ())
            }
        },
        Some(Commands::Export { command }) => match command {
            ExportCommands::Xlsx { out } => cmd_export_xlsx(&ctx, out.as_deref(), false).map(|_| ()),
            ExportCommands::Pdf { out, snapshot } => {
                cmd_export_pdf(&ctx, out.as_deref(), snapshot.as_deref(), false).map(|_| ())
            }
        },
        Some(Commands::Import { path }) => cmd_import(&mut ctx, &path, false).map(|_| ()),
        Some(Commands::Profile { command }) => match command {
            ProfileCommands::Save => cmd_profile_save(&mut ctx, false).map(|_| ()),
            ProfileCommands::Show => cmd_profile_show(&ctx),
        },
        Some(Commands::Filename { command }) => match command {
            FilenameCommands::Show => cmd_filename_show(&ctx),
            FilenameCommands::Preview { extension } => {
                cmd_filename_preview(&ctx, &extension, false).map(|_| ())
            }
            FilenameCommands::Add { block } => cmd_filename_add(&mut ctx, block.into(), false),
            FilenameCommands::Remove { position } => cmd_filename_remove(&mut ctx, position, false),
            FilenameCommands::Move { from, to } => cmd_filename_move(&mut ctx, from, to, false),
            FilenameCommands::Edit { position, text } => {
                cmd_filename_edit(&mut ctx, position, text, false)
            }
            FilenameCommands::Style { style } => cmd_filename_style(&mut ctx, style, false),
            FilenameCommands::Reset => cmd_filename_reset(&mut ctx, false),
        },
        Some(Commands::Common { command }) => match command {
            CommonCommands::List => cmd_common_list(&ctx),
            CommonCommands::Add { description, category } => {
                cmd_common_add(&mut ctx, description, category, false).map(|_| ())
            }
            CommonCommands::Remove { position } => cmd_common_remove(&mut ctx, position, false),
        },
        Some(Commands::CheckUpdate) => cmd_check_update(&ctx, false).map(|_| ()),
        Some(Commands::Discard { force }) => cmd_discard(&mut ctx, force),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => run_tui(ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, Some(Commands::Ui) | None);
    if !interactive {
        logging::init_cli();
    }

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
