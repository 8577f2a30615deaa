//! Command-line interface implementation for skel.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for skel.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "skel: create directory trees from JSON structure specs",
    long_about = None
)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory holding the template store and the history
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Append the diagnostic log to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a structure inside OUTPUT_DIR from a spec file or a stored template
    Create(CreateArgs),

    /// Manage stored templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Show past runs or a usage summary
    History(HistoryArgs),
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Directory the structure is created in
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Path to a JSON structure spec
    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with = "template",
        required_unless_present = "template"
    )]
    pub spec: Option<PathBuf>,

    /// Name of a stored template
    #[arg(short, long, value_name = "NAME")]
    pub template: Option<String>,

    /// Always back up a non-empty output directory without asking
    #[arg(long, conflicts_with = "no_backup")]
    pub backup: bool,

    /// Never back up the output directory
    #[arg(long)]
    pub no_backup: bool,

    /// Fail instead of creating a missing output directory
    #[arg(long)]
    pub no_create_root: bool,

    /// Warn about and skip unknown node types instead of rejecting the spec.
    /// Without this flag any unknown type fails the run before anything is created
    #[arg(long)]
    pub allow_unknown: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Open the output directory in the code editor afterwards
    #[arg(long)]
    pub open_editor: bool,

    /// Editor command used with --open-editor
    #[arg(long, value_name = "COMMAND")]
    pub editor: Option<String>,

    /// Open the output directory in the file browser afterwards
    #[arg(long)]
    pub open_explorer: bool,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List stored templates
    List,

    /// Print a stored template
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Store a spec file as a template, replacing any template with the same name
    Save {
        #[arg(value_name = "NAME")]
        name: String,

        /// Path to the JSON structure spec
        #[arg(short, long, value_name = "FILE")]
        spec: PathBuf,

        /// Short description shown by `template list`
        #[arg(short, long, default_value = "")]
        description: String,

        /// Display name recorded in the history (defaults to NAME)
        #[arg(long)]
        title: Option<String>,
    },

    /// Delete a stored template
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Print usage statistics instead of the run list
    #[arg(short, long)]
    pub summary: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingSubcommand
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
