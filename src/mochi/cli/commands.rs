use super::print::{print_cards, print_full_card, print_json, print_messages, print_result};
use super::setup::{
    archive_flag, command_path, print_grouped_help, print_help_for_command, ArchiveFormatArg,
    AttachmentCommands, CardCommands, Cli, Commands, ConfigCommands, DeckCommands, DueCommands,
    ImportExportCommands, MiscCommands, OutputFormat, StudyCommands, TemplateCommands,
    TransferCommands,
};
use chrono::Local;
use clap::Parser;
use mochi::api::{self, default_media_dir, CmdResult, ConfigAction, ExportScope, MochiApi};
use mochi::commands::transfer::{ExportRequest, ImportRequest};
use mochi::config::{self, MochiConfig};
use mochi::error::{MochiError, Result};
use mochi::interchange::{ArchiveFormat, ExportOptions, ImportOptions};
use mochi::model::{CardUpdate, DeckUpdate, NewCard, NewDeck};
use mochi::remote::http::{HttpClient, DEFAULT_BASE_URL};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Options that shape how a failure is reported, known before the command runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorStyle {
    pub json: bool,
}

struct AppContext {
    config_dir: PathBuf,
    api_key: Option<String>,
    profile: Option<String>,
    dry_run: bool,
    quiet: bool,
    output: OutputFormat,
}

impl AppContext {
    fn config(&self) -> Result<MochiConfig> {
        MochiConfig::load(&self.config_dir)
    }

    /// Build the service client, resolving the API key on demand.
    fn api(&self) -> Result<MochiApi<HttpClient>> {
        let key = self
            .config()?
            .resolve_api_key(self.api_key.as_deref(), self.profile.as_deref())?;
        let base_url = config::api_url().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(MochiApi::new(HttpClient::with_base_url(key, &base_url)?))
    }

    /// Ask before a destructive call. `--force`, `--quiet` and `--dry-run`
    /// skip the question.
    fn confirm(&self, force: bool, question: &str) -> Result<bool> {
        if force || self.quiet || self.dry_run {
            return Ok(true);
        }
        print!("{} [y/N] ", question);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn emit(&self, result: &CmdResult) -> Result<()> {
        match self.output {
            OutputFormat::Json => print_json(result)?,
            OutputFormat::Text => print_result(result, self.quiet),
        }
        Ok(())
    }
}

/// Parse arguments and run. Returns how errors should be printed along with
/// the outcome so `main` can report a failure in the requested style.
pub fn run() -> (ErrorStyle, Result<()>) {
    let cli = Cli::parse();
    let style = ErrorStyle {
        json: cli.json_errors,
    };
    init_logging(cli.verbose);
    (style, dispatch(cli))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    if cli.help {
        print_help_for_command(&command_path(&cli.command));
        return Ok(());
    }

    let ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::Study(cmd)) => match cmd {
            StudyCommands::Deck { action } => handle_deck(&ctx, action),
            StudyCommands::Card { action } => handle_card(&ctx, action),
            StudyCommands::Template { action } => handle_template(&ctx, action),
            StudyCommands::Due { action } => handle_due(&ctx, action),
            StudyCommands::Attachment { action } => handle_attachment(&ctx, action),
        },
        Some(Commands::Transfer(TransferCommands::ImportExport { action })) => match action {
            ImportExportCommands::Export {
                file,
                deck,
                cards,
                into_deck,
                format,
                include_reviews,
                media,
            } => {
                let scope = match (deck, cards.is_empty()) {
                    (Some(id), _) => ExportScope::Deck(id),
                    (None, false) => ExportScope::Cards {
                        ids: cards,
                        deck_id: into_deck,
                    },
                    (None, true) => ExportScope::AllDecks,
                };
                handle_export(&ctx, file, scope, format, include_reviews, media)
            }
            ImportExportCommands::Import {
                file,
                deck,
                template,
                skip_media,
                media_dir,
            } => handle_import(&ctx, file, deck, template, skip_media, media_dir),
            ImportExportCommands::Validate {
                file,
                container_only,
            } => ctx.emit(&api::validate_archive(&file, container_only)?),
            ImportExportCommands::ExtractMedia { file, dest } => {
                ctx.emit(&api::extract_media(&file, &dest)?)
            }
        },
        Some(Commands::Misc(cmd)) => match cmd {
            MiscCommands::Config { action } => handle_config(&ctx, action),
            MiscCommands::Help { command } => {
                let path: Vec<&str> = command.iter().map(String::as_str).collect();
                print_help_for_command(&path);
                Ok(())
            }
        },
        None => {
            print_grouped_help();
            Ok(())
        }
    }
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    Ok(AppContext {
        config_dir: config::config_dir()?,
        api_key: cli.api_key.clone(),
        profile: cli.profile.clone(),
        dry_run: cli.dry_run,
        quiet: cli.quiet,
        output: cli.output,
    })
}

fn handle_deck(ctx: &AppContext, action: DeckCommands) -> Result<()> {
    let api = ctx.api()?;
    let result = match action {
        DeckCommands::List => api.list_decks()?,
        DeckCommands::Get { id } => api.get_deck(&id)?,
        DeckCommands::Create { name, parent, sort } => api.create_deck(
            NewDeck {
                name,
                parent_id: parent,
                sort,
            },
            ctx.dry_run,
        )?,
        DeckCommands::Update {
            id,
            name,
            parent,
            sort,
            archive,
            unarchive,
        } => {
            let update = DeckUpdate {
                name,
                parent_id: parent,
                sort,
                archived: archive_flag(archive, unarchive),
            };
            api.update_deck(&id, update, ctx.dry_run)?
        }
        DeckCommands::Delete { id, force } => {
            if !ctx.confirm(force, &format!("Delete deck {}?", id))? {
                println!("Cancelled.");
                return Ok(());
            }
            api.delete_deck(&id, ctx.dry_run)?
        }
    };
    ctx.emit(&result)
}

fn handle_card(ctx: &AppContext, action: CardCommands) -> Result<()> {
    let api = ctx.api()?;
    match action {
        CardCommands::List {
            deck,
            limit,
            bookmark,
        } => {
            let result = api.list_cards(deck.as_deref(), limit, bookmark.as_deref())?;
            ctx.emit(&result)
        }
        CardCommands::Get { id } => {
            let result = api.get_card(&id)?;
            if ctx.output == OutputFormat::Json {
                return ctx.emit(&result);
            }
            for card in &result.cards {
                print_full_card(card);
            }
            print_messages(&result.messages, ctx.quiet);
            Ok(())
        }
        CardCommands::Create {
            deck,
            name,
            template,
            content,
            stdin,
        } => {
            let content = match content {
                Some(text) if !stdin => text,
                _ => read_stdin()?,
            };
            let card = NewCard {
                content,
                deck_id: deck,
                name,
                template_id: template,
                ..Default::default()
            };
            ctx.emit(&api.create_card(card, ctx.dry_run)?)
        }
        CardCommands::Update {
            id,
            content,
            name,
            deck,
            template,
            archive,
            unarchive,
            stdin,
        } => {
            let content = if stdin { Some(read_stdin()?) } else { content };
            let update = CardUpdate {
                content,
                name,
                deck_id: deck,
                template_id: template,
                archived: archive_flag(archive, unarchive),
                ..Default::default()
            };
            ctx.emit(&api.update_card(&id, update, ctx.dry_run)?)
        }
        CardCommands::Delete { id, force } => {
            if !ctx.confirm(force, &format!("Delete card {}?", id))? {
                println!("Cancelled.");
                return Ok(());
            }
            ctx.emit(&api.delete_card(&id, ctx.dry_run)?)
        }
        CardCommands::Search { query, deck } => {
            ctx.emit(&api.search_cards(&query, deck.as_deref())?)
        }
    }
}

fn handle_template(ctx: &AppContext, action: TemplateCommands) -> Result<()> {
    let api = ctx.api()?;
    let result = match action {
        TemplateCommands::List => api.list_templates()?,
        TemplateCommands::Get { id } => api.get_template(&id)?,
    };
    ctx.emit(&result)
}

fn handle_due(ctx: &AppContext, action: DueCommands) -> Result<()> {
    let api = ctx.api()?;
    let today = || Local::now().date_naive();
    match action {
        DueCommands::List { date, deck } => {
            let date = date.unwrap_or_else(today);
            let result = api.due_cards(date, deck.as_deref())?;
            if ctx.output == OutputFormat::Json {
                return ctx.emit(&result);
            }
            // Heading first, then the cards under it.
            print_messages(&result.messages, ctx.quiet);
            print_cards(&result.cards);
            Ok(())
        }
        DueCommands::Count { date, deck } => {
            let date = date.unwrap_or_else(today);
            ctx.emit(&api.count_due(date, deck.as_deref())?)
        }
    }
}

fn handle_attachment(ctx: &AppContext, action: AttachmentCommands) -> Result<()> {
    let api = ctx.api()?;
    let result = match action {
        AttachmentCommands::Add { card_id, file } => {
            api.add_attachment(&card_id, &file, ctx.dry_run)?
        }
        AttachmentCommands::Delete { card_id, file_name } => {
            api.delete_attachment(&card_id, &file_name, ctx.dry_run)?
        }
    };
    ctx.emit(&result)
}

fn handle_export(
    ctx: &AppContext,
    file: PathBuf,
    scope: ExportScope,
    format: Option<ArchiveFormatArg>,
    include_reviews: bool,
    media: Vec<PathBuf>,
) -> Result<()> {
    let format = match format {
        Some(ArchiveFormatArg::Json) => ArchiveFormat::Json,
        Some(ArchiveFormatArg::Edn) => ArchiveFormat::Edn,
        None => match ctx.config()?.default_format {
            Some(name) => name.parse().map_err(MochiError::Config)?,
            None => ArchiveFormat::Json,
        },
    };

    let request = ExportRequest {
        scope,
        path: file,
        options: ExportOptions {
            format,
            include_reviews,
        },
        media,
        dry_run: ctx.dry_run,
    };
    ctx.emit(&ctx.api()?.export(&request)?)
}

fn handle_import(
    ctx: &AppContext,
    file: PathBuf,
    deck: Option<String>,
    template: Option<String>,
    skip_media: bool,
    media_dir: Option<PathBuf>,
) -> Result<()> {
    let media_dir = match media_dir {
        Some(dir) => dir,
        None => default_media_dir(&file, &current_dir()),
    };
    let request = ImportRequest {
        path: file,
        options: ImportOptions {
            deck_id: deck,
            template_id: template,
            skip_media,
            dry_run: ctx.dry_run,
        },
        media_dir,
    };
    ctx.emit(&ctx.api()?.import(&request)?)
}

fn handle_config(ctx: &AppContext, action: ConfigCommands) -> Result<()> {
    let action = match action {
        ConfigCommands::Add { name, api_key } => ConfigAction::Add { name, api_key },
        ConfigCommands::Remove { name } => ConfigAction::Remove(name),
        ConfigCommands::Use { name } => ConfigAction::Use(name),
        ConfigCommands::List => ConfigAction::List,
        ConfigCommands::Reset => ConfigAction::Reset,
    };
    ctx.emit(&api::config(&ctx.config_dir, action)?)
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
}
