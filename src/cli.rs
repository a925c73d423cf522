use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eudate", version, about = "Day-month-year date fields with a calendar picker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project form in the current directory
    Init {
        /// Optional form name
        #[arg(long)]
        name: Option<String>,
    },
    /// List date fields and their values
    List,
    /// Set a field from a DD-MM-YYYY date
    Set {
        /// Field id
        field_id: String,
        /// Date in DD-MM-YYYY (or D-M-YYYY) format
        date: String,
    },
    /// Clear a field's value
    Clear {
        /// Field id
        field_id: String,
    },
    /// Add a new date field
    Add {
        /// Label shown next to the field
        label: String,
        /// Field id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Title of the field's help popover
        #[arg(long)]
        help_title: Option<String>,
        /// Body of the field's help popover
        #[arg(long)]
        help_text: Option<String>,
    },
    /// Remove a date field
    Remove {
        /// Field id
        field_id: String,
    },
    /// Convert YYYY-MM-DD to DD-MM-YYYY
    ToDisplay {
        /// Date in YYYY-MM-DD format
        date: String,
    },
    /// Convert DD-MM-YYYY to YYYY-MM-DD
    ToCanonical {
        /// Date in DD-MM-YYYY format
        date: String,
    },
    /// Print a month grid
    Calendar {
        /// Month to show, YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}
