use anyhow::{Context, Result, bail};
use bitview::areas::controller::{
    Controller, DiffTarget, Engine, EngineEvent, HistoryView, SWITCHED_STATUS_PREFIX,
};
use bitview::areas::diff_cache::DiffSnapshot;
use bitview::areas::git::GitProducer;
use bitview::areas::local_changes::Side;
use bitview::areas::model::Selection;
use bitview::artifacts::core::pager::HistoryOutput;
use bitview::artifacts::log::entry::Entry;
use bitview::commands::log::render_history;
use bitview::commands::show::{render_commit, render_local};
use bitview::config::{DEFAULT_BATCH_SIZE, EngineConfig};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bitview",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Browse a repository's commit history",
    long_about = "This command streams the commit history of a repository in batches, \
    draws its ancestry graph and labels commits with their branches and tags. \
    Pending working-tree changes show up as rows above the newest commit.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(index = 1, help = "A path inside the repository (defaults to the current directory)")]
    path: Option<PathBuf>,
    #[arg(short = 'n', long, default_value_t = DEFAULT_BATCH_SIZE, help = "Commits to load per batch")]
    limit: usize,
    #[arg(short, long, help = "Only show commits matching this text")]
    filter: Option<String>,
    #[arg(short, long, value_name = "REV", help = "Show the diff of a listed commit, or of 'unstaged' / 'staged'")]
    show: Option<String>,
    #[arg(long, value_name = "BRANCH", help = "Switch to a branch before loading")]
    switch: Option<String>,
    #[arg(short, long, help = "Keep running and re-render when the repository changes")]
    watch: bool,
    #[arg(long, help = "Write to stdout even on a terminal")]
    no_pager: bool,
    #[arg(long, value_name = "PATH", default_value = "git", help = "The git executable to run")]
    git: PathBuf,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        // the watcher is started once the first listing is out
        EngineConfig {
            auto_reload: false,
            git_binary: self.git.clone(),
            ..EngineConfig::default()
        }
        .with_batch_size(self.limit)
    }
}

enum ShowTarget {
    Commit(String),
    Local(Side),
}

impl ShowTarget {
    fn parse(rev: &str) -> Self {
        match rev {
            "unstaged" => ShowTarget::Local(Side::Unstaged),
            "staged" => ShowTarget::Local(Side::Staged),
            _ => ShowTarget::Commit(rev.to_string()),
        }
    }
}

/// A `--show` target after it was selected
enum Shown {
    Local { side: Side, visible: bool },
    Commit { entry: Arc<Entry>, labels: Vec<String> },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let path = match &cli.path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let config = cli.engine_config();
    let producer = Arc::new(GitProducer::new(config.git_binary.clone()));
    let mut engine = Engine::start(config, producer, &Handle::current());

    let result = browse(&cli, &mut engine, path).await;
    engine.stop().await;

    result
}

async fn browse(cli: &Cli, engine: &mut Engine, path: PathBuf) -> Result<()> {
    engine
        .handle()
        .post(move |this: &mut Controller, handle| this.open(handle, path));
    wait_for_reload(engine)
        .await
        .context("Failed to open repository")?;

    if let Some(branch) = &cli.switch {
        let branch = branch.clone();
        engine
            .handle()
            .post(move |this: &mut Controller, handle| this.switch_branch(handle, &branch));
        wait_for_reload(engine)
            .await
            .context("Failed to switch branch")?;
    }

    if let Some(query) = &cli.filter {
        let query = query.clone();
        engine
            .handle()
            .call(move |this: &mut Controller, handle| this.apply_filter(handle, &query))
            .await;
    }

    let shown = match &cli.show {
        Some(rev) => Some(select_target(engine, ShowTarget::parse(rev)).await?),
        None => None,
    };

    let use_pager = !cli.no_pager && !cli.watch;
    let mut output = HistoryOutput::open(use_pager, "bitview")?;
    let view = current_view(engine).await?;
    render_history(&mut output, &view)?;

    if let Some(shown) = shown {
        writeln!(output)?;
        show(engine, &mut output, shown).await?;
    }
    output.finish()?;

    if cli.watch {
        engine
            .handle()
            .post(|this: &mut Controller, handle| this.set_auto_reload(handle, true));
        watch(engine).await?;
    }

    Ok(())
}

/// Wait for the next fresh list, failing on a status message that is not a
/// branch switch notice
async fn wait_for_reload(engine: &mut Engine) -> Result<()> {
    while let Some(event) = engine.next_event().await {
        match event {
            EngineEvent::Reloaded { .. } => return Ok(()),
            EngineEvent::Status(message) if !message.starts_with(SWITCHED_STATUS_PREFIX) => {
                bail!(message)
            }
            _ => {}
        }
    }

    bail!("history engine stopped")
}

async fn current_view(engine: &Engine) -> Result<HistoryView> {
    engine
        .handle()
        .call(|this: &mut Controller, _| this.view())
        .await
        .context("history engine stopped")
}

/// Select what `--show` names so the list marks it
async fn select_target(engine: &Engine, target: ShowTarget) -> Result<Shown> {
    match target {
        ShowTarget::Local(side) => {
            let visible = engine
                .handle()
                .call(move |this: &mut Controller, handle| {
                    let visible = this.local_changes().is_visible(side);
                    if visible {
                        this.select(handle, Selection::Local(side));
                    }
                    visible
                })
                .await
                .context("history engine stopped")?;

            Ok(Shown::Local { side, visible })
        }
        ShowTarget::Commit(rev) => {
            let prefix = rev.clone();
            let found = engine
                .handle()
                .call(move |this: &mut Controller, handle| {
                    let entry = this.model().find_by_prefix(&prefix).cloned()?;
                    let labels = this.model().labels().get(entry.oid()).to_vec();
                    let hint = this.model().position(entry.oid()).unwrap_or_default();
                    this.select(
                        handle,
                        Selection::Commit {
                            oid: entry.oid().clone(),
                            hint,
                        },
                    );
                    Some((entry, labels))
                })
                .await
                .context("history engine stopped")?;

            let Some((entry, labels)) = found else {
                bail!("unknown revision '{rev}'");
            };
            Ok(Shown::Commit { entry, labels })
        }
    }
}

async fn show(engine: &mut Engine, output: &mut dyn Write, shown: Shown) -> Result<()> {
    match shown {
        Shown::Local { side, visible } => {
            let diff = if visible {
                wait_for_diff(engine, DiffTarget::Local(side)).await?
            } else {
                DiffSnapshot::default()
            };
            render_local(output, side, &diff)
        }
        Shown::Commit { entry, labels } => {
            let diff = wait_for_diff(engine, DiffTarget::Commit(entry.oid().clone())).await?;
            render_commit(output, &entry, &labels, &diff)
        }
    }
}

async fn wait_for_diff(engine: &mut Engine, target: DiffTarget) -> Result<DiffSnapshot> {
    while let Some(event) = engine.next_event().await {
        if let EngineEvent::DiffReady { target: ready, diff } = event
            && ready == target
        {
            return Ok(diff);
        }
    }

    bail!("history engine stopped")
}

/// Re-render on every reload until interrupted
async fn watch(engine: &mut Engine) -> Result<()> {
    tracing::info!("watching for repository changes");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = engine.next_event() => match event {
                Some(EngineEvent::Reloaded { .. }) => {
                    let view = current_view(engine).await?;
                    let mut stdout = std::io::stdout();
                    writeln!(stdout)?;
                    render_history(&mut stdout, &view)?;
                    stdout.flush()?;
                }
                Some(EngineEvent::Status(message)) => eprintln!("{message}"),
                Some(_) => {}
                None => return Ok(()),
            },
        }
    }
}
