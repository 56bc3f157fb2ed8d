use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ArchiveFormatArg {
    Json,
    Edn,
}

#[derive(Parser, Debug)]
#[command(
    name = "mochi",
    bin_name = "mochi",
    version = get_version(),
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Command-line client for Mochi flashcards", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// API key (overrides profile and environment)
    #[arg(short = 'k', long, global = true, help_heading = "Options")]
    pub api_key: Option<String>,

    /// Profile to use instead of the active one
    #[arg(short, long, global = true, help_heading = "Options")]
    pub profile: Option<String>,

    /// Describe what would change without changing anything
    #[arg(long, global = true, help_heading = "Options")]
    pub dry_run: bool,

    /// Suppress status messages
    #[arg(short, long, global = true, help_heading = "Options")]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text, help_heading = "Options")]
    pub output: OutputFormat,

    /// Print errors as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json_errors: bool,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Study,
    Transfer,
    Misc,
}

impl CommandGroup {
    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Study => "Study Commands:",
            CommandGroup::Transfer => "Transfer Commands:",
            CommandGroup::Misc => "Miscellaneous:",
        }
    }

    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "deck" | "card" | "template" | "due" | "attachment" => Some(CommandGroup::Study),
            "import-export" => Some(CommandGroup::Transfer),
            "config" | "help" => Some(CommandGroup::Misc),
            _ => None,
        }
    }

    pub fn all() -> &'static [CommandGroup] {
        &[
            CommandGroup::Study,
            CommandGroup::Transfer,
            CommandGroup::Misc,
        ]
    }
}

pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let version = cmd.get_version().unwrap_or("unknown");

    let mut output = String::new();
    output.push_str(&format!("mochi {version}\n"));
    output.push_str("Command-line client for Mochi flashcards\n");
    output.push('\n');
    output.push_str("Usage: mochi [OPTIONS] <COMMAND>\n");

    let subcommands: Vec<_> = cmd.get_subcommands().collect();

    for group in CommandGroup::all() {
        let group_cmds: Vec<_> = subcommands
            .iter()
            .filter(|sc| {
                !sc.is_hide_set() && CommandGroup::for_command(sc.get_name()) == Some(*group)
            })
            .collect();

        if !group_cmds.is_empty() {
            output.push('\n');
            output.push_str(&format!("{}\n", group.heading()));
            for sc in group_cmds {
                let name = sc.get_name();
                let about = sc.get_about().map(|s| s.to_string()).unwrap_or_default();
                output.push_str(&format!("  {:<15} {}\n", name, about));
            }
        }
    }

    output.push('\n');
    output.push_str("Options:\n");
    output.push_str("  -k, --api-key <KEY>     API key (overrides profile and environment)\n");
    output.push_str("  -p, --profile <NAME>    Profile to use instead of the active one\n");
    output.push_str("      --dry-run           Describe what would change without changing anything\n");
    output.push_str("  -q, --quiet             Suppress status messages\n");
    output.push_str("      --output <FORMAT>   Output format [text, json]\n");
    output.push_str("      --json-errors       Print errors as JSON\n");
    output.push_str("  -v, --verbose           Verbose output\n");
    output.push_str("  -h, --help              Print help\n");
    output.push_str("  -V, --version           Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

/// Prints help for a command path such as `["import-export", "export"]`,
/// falling back to the grouped help when it names nothing.
pub fn print_help_for_command(path: &[&str]) {
    let mut cmd = Cli::command();
    cmd.build();

    let mut current = &mut cmd;
    for name in path {
        match current.find_subcommand_mut(name) {
            Some(sub) => current = sub,
            None => {
                eprintln!("Unknown command: {}", path.join(" "));
                eprintln!();
                print_grouped_help();
                return;
            }
        }
    }

    if path.is_empty() {
        print_grouped_help();
    } else {
        print!("{}", current.render_help());
    }
}

/// The command path named by a parsed invocation, for `--help`.
pub fn command_path(command: &Option<Commands>) -> Vec<&'static str> {
    match command {
        Some(Commands::Study(c)) => match c {
            StudyCommands::Deck { action } => vec![
                "deck",
                match action {
                    DeckCommands::List => "list",
                    DeckCommands::Get { .. } => "get",
                    DeckCommands::Create { .. } => "create",
                    DeckCommands::Update { .. } => "update",
                    DeckCommands::Delete { .. } => "delete",
                },
            ],
            StudyCommands::Card { action } => vec![
                "card",
                match action {
                    CardCommands::List { .. } => "list",
                    CardCommands::Get { .. } => "get",
                    CardCommands::Create { .. } => "create",
                    CardCommands::Update { .. } => "update",
                    CardCommands::Delete { .. } => "delete",
                    CardCommands::Search { .. } => "search",
                },
            ],
            StudyCommands::Template { action } => vec![
                "template",
                match action {
                    TemplateCommands::List => "list",
                    TemplateCommands::Get { .. } => "get",
                },
            ],
            StudyCommands::Due { action } => vec![
                "due",
                match action {
                    DueCommands::List { .. } => "list",
                    DueCommands::Count { .. } => "count",
                },
            ],
            StudyCommands::Attachment { action } => vec![
                "attachment",
                match action {
                    AttachmentCommands::Add { .. } => "add",
                    AttachmentCommands::Delete { .. } => "delete",
                },
            ],
        },
        Some(Commands::Transfer(TransferCommands::ImportExport { action })) => vec![
            "import-export",
            match action {
                ImportExportCommands::Export { .. } => "export",
                ImportExportCommands::Import { .. } => "import",
                ImportExportCommands::Validate { .. } => "validate",
                ImportExportCommands::ExtractMedia { .. } => "extract-media",
            },
        ],
        Some(Commands::Misc(c)) => match c {
            MiscCommands::Config { action } => vec![
                "config",
                match action {
                    ConfigCommands::Add { .. } => "add",
                    ConfigCommands::Remove { .. } => "remove",
                    ConfigCommands::Use { .. } => "use",
                    ConfigCommands::List => "list",
                    ConfigCommands::Reset => "reset",
                },
            ],
            MiscCommands::Help { .. } => vec!["help"],
        },
        None => Vec::new(),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Study(StudyCommands),

    #[command(flatten)]
    Transfer(TransferCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum StudyCommands {
    /// List, show, create, update and delete decks
    #[command(display_order = 1)]
    Deck {
        #[command(subcommand)]
        action: DeckCommands,
    },

    /// List, show, create, update, delete and search cards
    #[command(display_order = 2)]
    Card {
        #[command(subcommand)]
        action: CardCommands,
    },

    /// List and show templates
    #[command(display_order = 3)]
    Template {
        #[command(subcommand)]
        action: TemplateCommands,
    },

    /// List or count cards due for review
    #[command(display_order = 4)]
    Due {
        #[command(subcommand)]
        action: DueCommands,
    },

    /// Add and delete card attachments
    #[command(display_order = 5)]
    Attachment {
        #[command(subcommand)]
        action: AttachmentCommands,
    },
}

/// `--archive`/`--unarchive` as the optional flag value to send.
pub fn archive_flag(archive: bool, unarchive: bool) -> Option<bool> {
    match (archive, unarchive) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum DeckCommands {
    /// List every deck
    #[command(alias = "ls")]
    List,

    /// Show one deck
    Get { id: String },

    /// Create a deck
    Create {
        name: String,

        /// Parent deck id
        #[arg(long)]
        parent: Option<String>,

        /// Sort position
        #[arg(long)]
        sort: Option<i64>,
    },

    /// Change a deck
    Update {
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New parent deck id (empty to move to the top level)
        #[arg(long)]
        parent: Option<String>,

        /// New sort position
        #[arg(long)]
        sort: Option<i64>,

        /// Archive the deck
        #[arg(long, conflicts_with = "unarchive")]
        archive: bool,

        /// Unarchive the deck
        #[arg(long)]
        unarchive: bool,
    },

    /// Delete a deck
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// List one page of cards
    #[command(alias = "ls")]
    List {
        /// Only cards in this deck
        #[arg(short, long)]
        deck: Option<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Cursor returned by a previous listing
        #[arg(long)]
        bookmark: Option<String>,
    },

    /// Show one card
    Get { id: String },

    /// Create a card
    Create {
        /// Deck to create the card in
        #[arg(short, long)]
        deck: String,

        /// Card name
        #[arg(long)]
        name: Option<String>,

        /// Template id
        #[arg(short, long)]
        template: Option<String>,

        /// Card content (markdown)
        #[arg(short, long, conflicts_with = "stdin", required_unless_present = "stdin")]
        content: Option<String>,

        /// Read the card content from standard input
        #[arg(long)]
        stdin: bool,
    },

    /// Change a card
    Update {
        id: String,

        /// New content (markdown)
        #[arg(short, long, conflicts_with = "stdin")]
        content: Option<String>,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Move the card to this deck
        #[arg(short, long)]
        deck: Option<String>,

        /// New template id
        #[arg(short, long)]
        template: Option<String>,

        /// Archive the card
        #[arg(long, conflicts_with = "unarchive")]
        archive: bool,

        /// Unarchive the card
        #[arg(long)]
        unarchive: bool,

        /// Read the new content from standard input
        #[arg(long)]
        stdin: bool,
    },

    /// Delete a card
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Find cards whose content or name contains a text
    Search {
        query: String,

        /// Only search this deck
        #[arg(short, long)]
        deck: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List every template
    #[command(alias = "ls")]
    List,

    /// Show one template
    Get { id: String },
}

#[derive(Subcommand, Debug)]
pub enum DueCommands {
    /// List cards due for review
    #[command(alias = "ls")]
    List {
        /// Day to check, as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Only cards in this deck
        #[arg(short, long)]
        deck: Option<String>,
    },

    /// Count cards due for review
    Count {
        /// Day to check, as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Only cards in this deck
        #[arg(short, long)]
        deck: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AttachmentCommands {
    /// Upload a file to a card
    Add { card_id: String, file: PathBuf },

    /// Remove an attachment from a card
    #[command(alias = "rm")]
    Delete { card_id: String, file_name: String },
}

#[derive(Subcommand, Debug)]
pub enum TransferCommands {
    /// Import and export .mochi archives
    #[command(alias = "ie", display_order = 10)]
    ImportExport {
        #[command(subcommand)]
        action: ImportExportCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportExportCommands {
    /// Export decks and cards to a .mochi archive
    Export {
        /// Archive to write
        file: PathBuf,

        /// Export only this deck
        #[arg(short, long, conflicts_with = "cards")]
        deck: Option<String>,

        /// Export only these cards (comma separated ids)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        cards: Vec<String>,

        /// File the exported cards under this deck
        #[arg(long, requires = "cards")]
        into_deck: Option<String>,

        /// Archive format
        #[arg(short, long, value_enum)]
        format: Option<ArchiveFormatArg>,

        /// Include review history
        #[arg(long)]
        include_reviews: bool,

        /// Media file to store in the archive (repeatable)
        #[arg(long = "media", value_name = "PATH")]
        media: Vec<PathBuf>,
    },

    /// Import decks and cards from a .mochi archive
    Import {
        file: PathBuf,

        /// Put every card into this deck
        #[arg(short, long)]
        deck: Option<String>,

        /// Apply this template to every card
        #[arg(short, long)]
        template: Option<String>,

        /// Do not extract media files
        #[arg(long)]
        skip_media: bool,

        /// Where to extract media (default: <archive-name>-media)
        #[arg(long)]
        media_dir: Option<PathBuf>,
    },

    /// Validate a .mochi archive without importing it
    Validate {
        file: PathBuf,

        /// Only check that the archive holds a data entry
        #[arg(long)]
        container_only: bool,
    },

    /// Extract the media files of a .mochi archive
    ExtractMedia { file: PathBuf, dest: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Manage API-key profiles
    #[command(display_order = 20)]
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Print help for mochi or a subcommand
    #[command(display_order = 21)]
    Help {
        /// Command path, e.g. `import-export export`
        command: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Add or replace a profile
    Add { name: String, api_key: String },

    /// Remove a profile
    #[command(alias = "rm")]
    Remove { name: String },

    /// Make a profile active
    Use { name: String },

    /// List profiles
    #[command(alias = "ls")]
    List,

    /// Remove every profile
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_import_with_global_flags() {
        let cli = Cli::try_parse_from([
            "mochi",
            "ie",
            "import",
            "deck.mochi",
            "--dry-run",
            "-k",
            "key",
            "--skip-media",
        ])
        .unwrap();

        assert!(cli.dry_run);
        assert_eq!(cli.api_key.as_deref(), Some("key"));
        match cli.command {
            Some(Commands::Transfer(TransferCommands::ImportExport {
                action: ImportExportCommands::Import {
                    file, skip_media, ..
                },
            })) => {
                assert_eq!(file, PathBuf::from("deck.mochi"));
                assert!(skip_media);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_export_card_list_is_comma_separated() {
        let cli = Cli::try_parse_from([
            "mochi",
            "import-export",
            "export",
            "out.mochi",
            "--cards",
            "c1,c2",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Transfer(TransferCommands::ImportExport {
                action: ImportExportCommands::Export { cards, .. },
            })) => assert_eq!(cards, vec!["c1", "c2"]),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_card_create_needs_content_source() {
        assert!(Cli::try_parse_from(["mochi", "card", "create", "--deck", "d1"]).is_err());
        assert!(
            Cli::try_parse_from(["mochi", "card", "create", "--deck", "d1", "--stdin"]).is_ok()
        );
    }

    #[test]
    fn test_grouped_help_lists_every_command() {
        let help = get_grouped_help();
        for name in [
            "deck",
            "card",
            "template",
            "due",
            "attachment",
            "import-export",
            "config",
        ] {
            assert!(help.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_command_path() {
        let cli = Cli::try_parse_from(["mochi", "config", "use", "work"]).unwrap();
        assert_eq!(command_path(&cli.command), vec!["config", "use"]);

        let cli = Cli::try_parse_from(["mochi", "attachment", "rm", "c1", "cat.png"]).unwrap();
        assert_eq!(command_path(&cli.command), vec!["attachment", "delete"]);
    }

    #[test]
    fn test_card_update_archive_flags_conflict() {
        assert!(
            Cli::try_parse_from(["mochi", "card", "update", "c1", "--archive", "--unarchive"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["mochi", "card", "update", "c1", "--unarchive"]).unwrap();
        match cli.command {
            Some(Commands::Study(StudyCommands::Card {
                action:
                    CardCommands::Update {
                        archive, unarchive, ..
                    },
            })) => assert_eq!(archive_flag(archive, unarchive), Some(false)),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_due_date_is_parsed() {
        let cli = Cli::try_parse_from(["mochi", "due", "count", "--date", "2024-05-03"]).unwrap();
        match cli.command {
            Some(Commands::Study(StudyCommands::Due {
                action: DueCommands::Count { date, deck },
            })) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 3));
                assert_eq!(deck, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
        assert!(Cli::try_parse_from(["mochi", "due", "list", "--date", "tomorrow"]).is_err());
    }

    #[test]
    fn test_archive_flag() {
        assert_eq!(archive_flag(true, false), Some(true));
        assert_eq!(archive_flag(false, true), Some(false));
        assert_eq!(archive_flag(false, false), None);
    }
}
