//! feedfold - incremental feed harvester CLI
//!
//! Main entry point for the feedfold command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

use feedfold::config::Config;
use feedfold::logging::init_cli_logging;
use feedfold::render::display_link;
use feedfold::tags::{Coverage, TagSession, parse_selection};
use feedfold::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    let colors = config.output.colors && !cli.no_color;
    if !colors {
        colored::control::set_override(false);
    }
    init_cli_logging(
        cli.quiet || config.output.quiet,
        cli.verbose,
        colors,
        cli.log_file.as_ref().map(|p| p.display().to_string()),
    );

    let app = App::new(cli, config);
    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error) {
    if let Some(feed) = err.downcast_ref::<FeedError>() {
        let suggestions: Vec<&str> = feed.suggestion().into_iter().collect();
        let title = format!("{} ({})", feed, feed.outcome_label());
        let context = err.to_string();
        let explanation = if context == feed.to_string() {
            String::new()
        } else {
            context
        };
        eprintln!("{}", format_error(&title, &explanation, &suggestions));
    } else {
        eprintln!("{} {err:#}", "✗".red().bold());
    }
}

/// Status channel rendered as a terminal spinner.
struct SpinnerStatus {
    bar: ProgressBar,
}

impl SpinnerStatus {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {elapsed:.dim}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl StatusSink for SpinnerStatus {
    fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn success(&self, message: &str) {
        debug!(message, "Run succeeded");
        self.bar.finish_and_clear();
    }

    fn failure(&self, label: &str, message: &str) {
        debug!(label, message, "Run failed");
        self.bar.finish_and_clear();
    }
}

struct App {
    cli: Cli,
    config: Config,
    format: OutputFormat,
}

impl App {
    fn new(cli: Cli, config: Config) -> Self {
        let format = cli
            .format
            .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));
        Self {
            cli,
            config,
            format,
        }
    }

    fn store_path(&self) -> PathBuf {
        self.cli
            .store
            .clone()
            .unwrap_or_else(|| self.config.store_path())
    }

    fn output_dir(&self) -> PathBuf {
        self.cli
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output_dir())
    }

    fn tags_path(&self) -> PathBuf {
        self.cli
            .tags
            .clone()
            .unwrap_or_else(|| self.config.tags_path())
    }

    fn quiet(&self) -> bool {
        self.cli.quiet || self.config.output.quiet
    }

    fn harvester(&self) -> Result<Harvester<DirSink>> {
        let store = self.store_path();
        let storage = Storage::open(&store)
            .with_context(|| format!("opening collection store {}", store.display()))?;
        Ok(Harvester::new(storage, DirSink::new(self.output_dir()))
            .with_policy(ExtractPolicy::from(&self.config.extractor))
            .with_tags(self.tags_path()))
    }

    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{json}");
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Extract(args) => self.cmd_extract(args).await,
            Commands::Clear(args) => self.cmd_clear(args),
            Commands::Render(args) => self.cmd_render(args),
            Commands::Stats => self.cmd_stats(),
            Commands::List(args) => self.cmd_list(args),
            Commands::Folder(args) => self.cmd_folder(&args.action),
            Commands::Config(args) => self.cmd_config(args),
            Commands::Completions(args) => {
                cmd_completions(args);
                Ok(())
            }
        }
    }

    async fn cmd_extract(&self, args: &ExtractArgs) -> Result<()> {
        let spec = SurfaceSpec::parse(&args.source, args.base.as_deref(), self.config.http_options())?;
        let mut host = LocalHost::new(spec);

        let mut policy = ExtractPolicy::from(&self.config.extractor);
        if let Some(n) = args.max_rounds {
            policy.max_rounds = (n > 0).then_some(n);
        }
        if let Some(ms) = args.settle_ms {
            policy.settle_delay_ms = ms;
        }
        if let Some(ms) = args.final_settle_ms {
            policy.final_settle_ms = ms;
        }
        if let Some(n) = args.stability_rounds {
            policy.stability_rounds = n;
        }

        let mut harvester = self.harvester()?.with_policy(policy);
        if let Some(title) = &args.title {
            harvester = harvester.with_title(title.clone());
        }

        let status = SpinnerStatus::new(!self.quiet() && !self.format.is_json());
        let report = harvester.run_extraction(&mut host, &status).await?;
        let dangling = harvester.stats()?.dangling_ordinals;

        if self.format.is_json() {
            return self.emit(&report);
        }
        if self.quiet() {
            return Ok(());
        }

        if report.is_noop() {
            println!(
                "{} No new items. Collection holds {} items.",
                "•".cyan(),
                format_number_usize(report.total).bold()
            );
            println!("  Stopped: {} after {} rounds", report.stop, report.rounds);
            return Ok(());
        }

        println!(
            "{} Added {} new items ({} total)",
            "✓".green(),
            format_number_usize(report.added).bold().green(),
            format_number_usize(report.total).bold()
        );
        println!("  Stopped: {} after {} rounds", report.stop, report.rounds);
        println!(
            "  New ordinals: #{}-#{}",
            report.total - report.added + 1,
            report.total
        );
        if let Some(paths) = &report.artifacts {
            println!("  Gallery: {}", paths.document.display().to_string().cyan());
            println!("  Backup:  {}", paths.backup.display());
        }
        if dangling > 0 {
            println!(
                "  {} {} folder entries point past the last item",
                "!".yellow().bold(),
                dangling
            );
        }
        Ok(())
    }

    fn cmd_clear(&self, args: &ClearArgs) -> Result<()> {
        if !args.yes {
            anyhow::bail!(
                "{}",
                format_error(
                    "Refusing to clear without confirmation",
                    "This permanently deletes the stored collection.",
                    &["Re-run with --yes to confirm."],
                )
            );
        }

        let mut harvester = self.harvester()?;
        let report = harvester.clear_all(&NullStatus)?;

        if self.format.is_json() {
            return self.emit(&report);
        }
        if !self.quiet() {
            println!(
                "{} Cleared {} items",
                "✓".green(),
                format_number_usize(report.removed).bold()
            );
            println!(
                "  Folders kept in {}; their ordinals will label whatever is harvested next.",
                self.tags_path().display()
            );
            println!(
                "  Artifacts in {} were not removed.",
                self.output_dir().display()
            );
        }
        Ok(())
    }

    fn cmd_render(&self, args: &RenderArgs) -> Result<()> {
        let mut harvester = self.harvester()?;
        if let Some(title) = &args.title {
            harvester = harvester.with_title(title.clone());
        }
        let paths = harvester.regenerate()?;

        if self.format.is_json() {
            return self.emit(&paths);
        }
        if !self.quiet() {
            println!("{} Rendered gallery", "✓".green());
            println!("  Gallery: {}", paths.document.display().to_string().cyan());
            println!("  Backup:  {}", paths.backup.display());
        }
        Ok(())
    }

    fn cmd_stats(&self) -> Result<()> {
        let stats = self.harvester()?.stats()?;
        let sink = DirSink::new(self.output_dir());

        if self.format.is_json() {
            #[derive(Serialize)]
            struct StatsOutput<'a> {
                #[serde(flatten)]
                stats: &'a CollectionStats,
                store: PathBuf,
                document: PathBuf,
                backup: PathBuf,
                tags: PathBuf,
            }
            return self.emit(&StatsOutput {
                stats: &stats,
                store: self.store_path(),
                document: sink.document_path(),
                backup: sink.backup_path(),
                tags: self.tags_path(),
            });
        }

        let divider = "─".repeat(CONTENT_DIVIDER_WIDTH);
        println!("{}", "Collection Statistics".bold().cyan());
        println!("{divider}");
        println!("  {:<20} {:>10}", "Items:", format_number_usize(stats.total));
        println!(
            "  {:<20} {:>10}",
            "Missing thumbs:",
            format_number_usize(stats.missing_thumbs)
        );
        println!("  {:<20} {:>10}", "Folders:", stats.folders);
        println!("  {:<20} {:>10}", "Tagged ordinals:", stats.tagged_ordinals);
        if stats.dangling_ordinals > 0 {
            println!(
                "  {:<20} {:>10}",
                "Dangling entries:",
                stats.dangling_ordinals.to_string().yellow()
            );
        }
        println!("  {:<20} {:>10}", "Revision:", stats.revision);
        println!(
            "  {:<20} {:>10}",
            "Updated:",
            format_optional_date(stats.updated_at)
        );
        println!("{divider}");
        if let Some(newest) = &stats.newest {
            println!("  Newest: {}", newest.green());
        }
        if let Some(oldest) = &stats.oldest {
            println!("  Oldest: {}", oldest.green());
        }
        println!("  Store:   {}", self.store_path().display());
        print_artifact("Gallery:", &sink.document_path());
        print_artifact("Backup: ", &sink.backup_path());
        println!("  Folders: {}", self.tags_path().display());
        Ok(())
    }

    fn load_session(&self) -> Result<TagSession> {
        let path = self.tags_path();
        let store = TagStore::load(&path)
            .with_context(|| format!("reading folders from {}", path.display()))?;
        Ok(TagSession::new(store))
    }

    fn collection_len(&self) -> Result<usize> {
        Ok(Storage::open(self.store_path())?.load_collection()?.len())
    }

    fn save_session(&self, session: &TagSession) -> Result<()> {
        session.store().save(&self.tags_path())?;
        Ok(())
    }

    fn cmd_list(&self, args: &ListArgs) -> Result<()> {
        let storage = Storage::open(self.store_path())?;
        let collection = storage.load_collection()?;
        let mut session = self.load_session()?;

        if let Some(folder) = &args.folder {
            session
                .filter_by_folder(folder)
                .map_err(|e| self.with_folder_hint(e, &session))?;
        } else if args.from.is_some() || args.to.is_some() {
            session.filter_by_range(args.from, args.to)?;
        }

        #[derive(Serialize)]
        struct Row<'a> {
            ordinal: Ordinal,
            link: &'a str,
            thumb: &'a str,
        }

        let rows: Vec<Row<'_>> = session
            .visible(collection.len())
            .into_iter()
            .filter_map(|ordinal| {
                collection.item_by_ordinal(ordinal).map(|item| Row {
                    ordinal,
                    link: &item.link,
                    thumb: &item.thumb,
                })
            })
            .take(args.limit.unwrap_or(usize::MAX))
            .collect();

        if self.format.is_json() {
            return self.emit(&rows);
        }
        if rows.is_empty() {
            println!("{}", "No items match.".yellow());
            return Ok(());
        }
        for row in &rows {
            println!(
                "{:>6}  {}",
                format!("#{}", row.ordinal).cyan(),
                display_link(row.link)
            );
        }
        if !self.quiet() {
            println!(
                "{}",
                format!("Showing {} of {} items", rows.len(), collection.len()).dimmed()
            );
        }
        Ok(())
    }

    fn with_folder_hint(&self, err: FeedError, session: &TagSession) -> anyhow::Error {
        if let FeedError::FolderNotFound { name } = &err {
            let names: Vec<&str> = session.store().names().collect();
            return anyhow::anyhow!("{}", format_unknown_value_error("folder", name, &names));
        }
        err.into()
    }

    fn cmd_folder(&self, action: &FolderCommand) -> Result<()> {
        let mut session = self.load_session()?;

        match action {
            FolderCommand::Create { name } => {
                session.store_mut().create_folder(name)?;
                self.save_session(&session)?;
                if self.format.is_json() {
                    return self.emit(&serde_json::json!({ "created": name.trim() }));
                }
                println!("{} Created folder {}", "✓".green(), name.trim().bold());
            }
            FolderCommand::Delete { name } => {
                let removed = session
                    .delete_folder(name)
                    .map_err(|e| self.with_folder_hint(e, &session))?;
                self.save_session(&session)?;
                if self.format.is_json() {
                    return self.emit(&serde_json::json!({ "deleted": name, "members": removed }));
                }
                println!(
                    "{} Deleted folder {} ({} entries)",
                    "✓".green(),
                    name.bold(),
                    removed.len()
                );
            }
            FolderCommand::Toggle { ordinals, folders } => {
                let selection = parse_selection(ordinals, self.collection_len()?)?;
                let names: BTreeSet<String> = folders.iter().map(|f| f.trim().to_string()).collect();
                let outcome = session
                    .store_mut()
                    .toggle_membership(&names, &selection)
                    .map_err(|e| self.with_folder_hint(e, &session))?;
                self.save_session(&session)?;
                if self.format.is_json() {
                    return self.emit(&outcome);
                }
                println!(
                    "{} Added {} | Removed {}",
                    "✓".green(),
                    outcome.added.to_string().green(),
                    outcome.removed.to_string().red()
                );
            }
            FolderCommand::Show { name } => {
                let Some(members) = session.store().members(name) else {
                    return Err(self.with_folder_hint(
                        FeedError::FolderNotFound { name: name.clone() },
                        &session,
                    ));
                };
                let mut members = members.to_vec();
                members.sort_unstable();
                let collection = Storage::open(self.store_path())?.load_collection()?;

                if self.format.is_json() {
                    let rows: Vec<_> = members
                        .iter()
                        .map(|&o| {
                            serde_json::json!({
                                "ordinal": o,
                                "link": collection.item_by_ordinal(o).map(|i| i.link.as_str()),
                            })
                        })
                        .collect();
                    return self.emit(&rows);
                }
                println!("{} ({} entries)", name.bold().cyan(), members.len());
                for ordinal in members {
                    let label = collection
                        .item_by_ordinal(ordinal)
                        .map_or_else(|| "(no item)".dimmed().to_string(), |i| display_link(&i.link));
                    println!("{:>6}  {}", format!("#{ordinal}").cyan(), label);
                }
            }
            FolderCommand::List => {
                let folders: Vec<(&str, usize)> = session
                    .store()
                    .names()
                    .map(|n| (n, session.store().members(n).map_or(0, <[_]>::len)))
                    .collect();
                if self.format.is_json() {
                    let map: std::collections::BTreeMap<_, _> = folders.into_iter().collect();
                    return self.emit(&map);
                }
                if folders.is_empty() {
                    println!("{}", "No folders yet. Create one with 'feedfold folder create <NAME>'.".yellow());
                }
                for (name, count) in folders {
                    println!("  {} ({count})", name.bold());
                }
            }
            FolderCommand::Coverage { ordinals } => {
                let selection = parse_selection(ordinals, self.collection_len()?)?;
                let rows: Vec<(&str, Coverage)> = session
                    .store()
                    .names()
                    .map(|n| (n, session.store().coverage(n, &selection)))
                    .collect();
                if self.format.is_json() {
                    let map: std::collections::BTreeMap<_, _> = rows.into_iter().collect();
                    return self.emit(&map);
                }
                for (name, coverage) in rows {
                    let mark = match coverage {
                        Coverage::All => "✔ all".green(),
                        Coverage::Some => "◐ some".yellow(),
                        Coverage::None => "+ none".dimmed(),
                    };
                    println!("  {:<24} {}", name, mark);
                }
            }
        }
        Ok(())
    }

    fn cmd_config(&self, args: &ConfigArgs) -> Result<()> {
        let user_path = Config::user_config_path();

        if args.init {
            let path = user_path.context("could not determine config directory")?;
            if path.exists() && !args.force {
                anyhow::bail!(
                    "{}",
                    format_error(
                        &format!("Config file already exists: {}", path.display()),
                        "",
                        &["Pass --force to overwrite it."],
                    )
                );
            }
            Config::default().save_to(&path)?;
            println!("{} Wrote {}", "✓".green(), path.display());
            return Ok(());
        }

        if let Some(assignment) = &args.set {
            let (key, value) = assignment.split_once('=').ok_or_else(|| {
                FeedError::invalid_argument(format!("expected KEY=VALUE, got '{assignment}'"))
            })?;
            let path = user_path.context("could not determine config directory")?;
            let mut file_config = Config::load_from_file(&path).unwrap_or_default();
            file_config.set_value(key.trim(), value.trim())?;
            file_config.save_to(&path)?;
            println!("{} Set {} in {}", "✓".green(), key.trim().bold(), path.display());
            return Ok(());
        }

        let mut effective = self.config.clone();
        effective.paths.store = Some(self.store_path());
        effective.paths.output_dir = Some(self.output_dir());
        effective.paths.tags = Some(self.tags_path());

        if self.format.is_json() {
            return self.emit(&effective);
        }
        println!("{}", "Current Configuration".bold().cyan());
        if let Some(path) = &user_path {
            let state = if path.exists() { "" } else { " (not present)" };
            println!("  File: {}{}", path.display(), state.dimmed());
        }
        println!();
        print!("{}", toml::to_string_pretty(&effective)?);
        Ok(())
    }
}

fn print_artifact(label: &str, path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => println!(
            "  {label} {} ({})",
            path.display(),
            format_bytes(meta.len())
        ),
        Err(_) => println!("  {label} {} {}", path.display(), "(not written)".dimmed()),
    }
}

fn cmd_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "feedfold", &mut io::stdout());
}
