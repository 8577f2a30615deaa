//! skel's main application entry point.
//! Parses arguments, resolves the configuration and dispatches subcommands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use skel::{
    cli::{get_args, Command, CreateArgs, HistoryArgs, TemplateCommand},
    config::{BackupPolicy, Config, Overrides},
    error::default_error_handler,
    history::HistoryRecorder,
    launcher::{EditorLauncher, ExplorerLauncher, Launcher},
    logger::init_logger,
    materializer::Materializer,
    pipeline::{Pipeline, SpecSource},
    prompt::{DialoguerPrompter, FixedPrompter, Prompter},
    runner::AsyncRunner,
    spec::SpecLoader,
    template::{Template, TemplateStore},
};

/// Main application entry point.
fn main() {
    let args = get_args();

    let config = match Config::load(Overrides {
        home: args.home.clone(),
        editor: None,
        log_file: args.log_file.clone(),
    }) {
        Ok(config) => config,
        Err(err) => default_error_handler(err.into()),
    };

    if let Err(err) = init_logger(args.verbose, config.log_file.as_deref()) {
        eprintln!("{}", err);
    }

    let result = match args.command {
        Command::Create(create) => run_create(config, create),
        Command::Template(command) => run_template(&config, command),
        Command::History(history) => run_history(&config, history),
    };

    if let Err(err) = result {
        default_error_handler(err);
    }
}

/// Creates a structure.
///
/// # Flow
/// 1. Resolves the spec from a file or a stored template
/// 2. Creates the output directory, or backs it up when it has content
/// 3. Materializes the spec on a background worker while a spinner runs
/// 4. Records the run in the history
/// 5. Optionally opens the result in the editor and the file browser
fn run_create(mut config: Config, args: CreateArgs) -> anyhow::Result<()> {
    config.backup = match (args.backup, args.no_backup) {
        (true, _) => BackupPolicy::Always,
        (_, true) => BackupPolicy::Never,
        _ => BackupPolicy::Ask,
    };
    config.create_root = !args.no_create_root;
    config.allow_unknown = args.allow_unknown;
    if let Some(editor) = args.editor {
        config.editor = editor;
    }

    let prompt: Box<dyn Prompter> = if args.yes {
        Box::new(FixedPrompter(true))
    } else {
        Box::new(DialoguerPrompter::new())
    };
    let mut pipeline = Pipeline::new(&config, &*prompt)?;

    let source = match (args.spec, args.template) {
        (Some(path), _) => SpecSource::File(path),
        (None, Some(name)) => SpecSource::Template(name),
        (None, None) => bail!("either --spec or --template is required"),
    };

    let prepared = pipeline.prepare(&args.output_dir, source)?;
    if let Some(backup) = &prepared.backup {
        println!("Backup created: '{}'", backup.display());
    }

    let bar = ProgressBar::new(prepared.spec.node_count() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {wide_msg}")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let progress_bar = bar.clone();
    let materializer = Materializer::new().with_progress(Arc::new(move |line: &str| {
        progress_bar.inc(1);
        progress_bar.set_message(line.to_string());
    }));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the background runtime")?;
    let runner = AsyncRunner::new(runtime.handle().clone());

    let done_bar = bar.clone();
    let handle = runner.run_async(
        &materializer,
        prepared.target_dir.clone(),
        prepared.spec.clone(),
        move |_| done_bar.finish_and_clear(),
    );
    let outcome = runtime.block_on(handle);
    let report = pipeline.finish(prepared, outcome);

    for line in &report.outcome.log {
        println!("{}", line);
    }
    if !report.outcome.ok {
        bail!("{}", report.outcome.message());
    }
    println!(
        "Structure '{}' created successfully in {}.",
        report.name,
        report.target_dir.display()
    );

    if args.open_editor {
        open_with(&EditorLauncher::new(config.editor.as_str()), &report.target_dir);
    }
    if args.open_explorer {
        open_with(&ExplorerLauncher::new(), &report.target_dir);
    }
    Ok(())
}

fn open_with(launcher: &dyn Launcher, path: &Path) {
    if let Err(e) = launcher.open(path) {
        log::warn!("{}", e);
        eprintln!("warning: {}", e);
    }
}

fn run_template(config: &Config, command: TemplateCommand) -> anyhow::Result<()> {
    let mut store = TemplateStore::open(&config.templates_dir)?;

    match command {
        TemplateCommand::List => {
            if store.is_empty() {
                println!("No templates in {}.", store.dir().display());
            }
            for (key, template) in store.list() {
                println!(
                    "{}\t{}\t{} nodes\t{}",
                    key,
                    template.name,
                    template.structure.node_count(),
                    template.description
                );
            }
        }
        TemplateCommand::Show { name } => {
            let template = store.get(&name)?;
            println!("{}", serde_json::to_string_pretty(template)?);
        }
        TemplateCommand::Save { name, spec, description, title } => {
            let structure = SpecLoader::strict()
                .load_file(&spec)
                .with_context(|| format!("cannot save template '{name}'"))?;
            let title = title.unwrap_or_else(|| name.clone());
            let template = Template::new(title, description, structure);
            store.save(&name, template)?;
            println!("Template '{}' saved.", name);
        }
        TemplateCommand::Remove { name } => {
            store.remove(&name)?;
            println!("Template '{}' removed.", name);
        }
    }
    Ok(())
}

fn run_history(config: &Config, args: HistoryArgs) -> anyhow::Result<()> {
    let history = HistoryRecorder::open(&config.history_file)?;

    if !args.summary {
        for entry in history.entries() {
            println!(
                "{}\t{}\t{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.template_name,
                entry.target_directory
            );
        }
        return Ok(());
    }

    let analysis = history.summarize();
    println!("Total structures created: {}", analysis.total_structures);
    match &analysis.most_used_template {
        Some(name) => println!("Most used template: {}", name),
        None => println!("Most used template: -"),
    }
    if let Some(entry) = &analysis.most_recent {
        println!(
            "Most recent: {} ({} in {})",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.template_name,
            entry.target_directory
        );
    }
    if !analysis.template_usage.is_empty() {
        println!("Usage by template:");
        for (name, count) in &analysis.template_usage {
            println!("  {}: {}", name, count);
        }
    }
    if !analysis.monthly_usage.is_empty() {
        println!("Usage by month:");
        for (month, count) in &analysis.monthly_usage {
            println!("  {}: {}", month, count);
        }
    }
    Ok(())
}
