mod calendar;
mod cli;
mod codec;
mod commands;
mod help;
mod logging;
mod model;
mod page;
mod picker;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let logging = logging::init();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::List => commands::list(),
        cli::Command::Set { field_id, date } => commands::set(field_id, date),
        cli::Command::Clear { field_id } => commands::clear(field_id),
        cli::Command::Add {
            label,
            id,
            help_title,
            help_text,
        } => commands::add(label, id, help_title, help_text),
        cli::Command::Remove { field_id } => commands::remove(field_id),
        cli::Command::ToDisplay { date } => commands::to_display(date),
        cli::Command::ToCanonical { date } => commands::to_canonical(date),
        cli::Command::Calendar { month } => commands::calendar(month),
        cli::Command::Tui => commands::tui(logging.as_ref().map(|l| l.log_dir())),
    }
}
