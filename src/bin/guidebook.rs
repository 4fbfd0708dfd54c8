// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use guidebook::{
    config::{GuidebookConfig, Token},
    icon::{probe_icons, resolve_icon, FailedIcons},
    nav::{diff_raw, normalize_str, to_document, CategoryId, TagRef, WebsiteId},
    path::{default_config_path, default_document_path},
    store::{NavStore, WebsiteDraft},
    sync::{apply, compare, github::GithubRemote, Comparison, Outcome, Resolution},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Password, Select};
use serde_json::Value;
use std::{
    fs::{read_to_string, write},
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  guidebook [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Path to local navigation document.
    #[arg(long, global = true, value_name = "path")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let env = Env {
            config: self.config,
            db: self.db,
        };

        match self.command {
            Command::Normalize(opts) => run_normalize(opts),
            Command::Clean(opts) => run_clean(opts),
            Command::Diff(opts) => run_diff(opts),
            Command::List(opts) => run_list(&env, opts).await,
            Command::AddCategory(opts) => run_add_category(&env, opts),
            Command::EditCategory(opts) => run_edit_category(&env, opts),
            Command::RemoveCategory(opts) => run_remove_category(&env, opts),
            Command::AddWebsite(opts) => run_add_website(&env, opts),
            Command::EditWebsite(opts) => run_edit_website(&env, opts),
            Command::RemoveWebsite(opts) => run_remove_website(&env, opts),
            Command::MoveWebsite(opts) => run_move_website(&env, opts),
            Command::Status => run_status(&env).await,
            Command::Pull(opts) => run_pull(&env, opts).await,
            Command::Push => run_push(&env).await,
            Command::Sync => run_sync(&env).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Flatten raw navigation document into canonical form.
    #[command(override_usage = "guidebook normalize [options] <input>")]
    Normalize(ConvertOptions),

    /// Normalize navigation document and elide its defaults.
    #[command(override_usage = "guidebook clean [options] <input>")]
    Clean(ConvertOptions),

    /// Compare two navigation documents.
    #[command(override_usage = "guidebook diff [options] <local> <remote>")]
    Diff(DiffOptions),

    /// List categories and websites of local document.
    #[command(override_usage = "guidebook list [options]")]
    List(ListOptions),

    /// Add category to local document.
    #[command(override_usage = "guidebook add-category [options] <title>")]
    AddCategory(AddCategoryOptions),

    /// Rename, re-icon, or reorder category of local document.
    #[command(override_usage = "guidebook edit-category [options] <category_id>")]
    EditCategory(EditCategoryOptions),

    /// Remove category and all of its websites from local document.
    #[command(override_usage = "guidebook remove-category <category_id>")]
    RemoveCategory(RemoveCategoryOptions),

    /// Add website to category of local document.
    #[command(override_usage = "guidebook add-website [options] <category_id> <name> <url>")]
    AddWebsite(AddWebsiteOptions),

    /// Edit fields of website in local document.
    #[command(override_usage = "guidebook edit-website [options] <website_id>")]
    EditWebsite(EditWebsiteOptions),

    /// Remove website from local document.
    #[command(override_usage = "guidebook remove-website <website_id>")]
    RemoveWebsite(RemoveWebsiteOptions),

    /// Move website to another category or position.
    #[command(override_usage = "guidebook move-website [options] <website_id> <category_id>")]
    MoveWebsite(MoveWebsiteOptions),

    /// Show differences between local document and GitHub copy.
    #[command(override_usage = "guidebook status")]
    Status,

    /// Replace local document with GitHub copy.
    #[command(override_usage = "guidebook pull [options]")]
    Pull(PullOptions),

    /// Replace GitHub copy with local document.
    #[command(override_usage = "guidebook push")]
    Push,

    /// Compare with GitHub copy and choose which side wins.
    #[command(override_usage = "guidebook sync")]
    Sync,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ConvertOptions {
    /// Raw navigation document to read.
    #[arg(required = true, value_name = "input")]
    pub input: PathBuf,

    /// Write result to file instead of standard output.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DiffOptions {
    /// Local side of the comparison.
    #[arg(required = true, value_name = "local")]
    pub local: PathBuf,

    /// Remote side of the comparison.
    #[arg(required = true, value_name = "remote")]
    pub remote: PathBuf,

    /// Print differences as JSON.
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Probe remote icons and show fallbacks for the broken ones.
    #[arg(short, long)]
    pub check_icons: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddCategoryOptions {
    /// Title of new category.
    #[arg(required = true, value_name = "title")]
    pub title: String,

    /// Icon URL or emoji.
    #[arg(short, long, value_name = "icon")]
    pub icon: Option<String>,

    /// Position to insert category at, appended when left out.
    #[arg(short, long, value_name = "index")]
    pub position: Option<usize>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EditCategoryOptions {
    /// Id of category to edit.
    #[arg(required = true, value_name = "category_id")]
    pub id: i64,

    /// New title.
    #[arg(short, long, value_name = "title")]
    pub title: Option<String>,

    /// New icon URL or emoji.
    #[arg(short, long, value_name = "icon", group = "icon_change")]
    pub icon: Option<String>,

    /// Remove icon.
    #[arg(long, group = "icon_change")]
    pub no_icon: bool,

    /// Move category to position.
    #[arg(short, long, value_name = "index")]
    pub position: Option<usize>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveCategoryOptions {
    /// Id of category to remove.
    #[arg(required = true, value_name = "category_id")]
    pub id: i64,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddWebsiteOptions {
    /// Id of category to add website to.
    #[arg(required = true, value_name = "category_id")]
    pub category: i64,

    /// Display name of website.
    #[arg(required = true, value_name = "name")]
    pub name: String,

    /// Address of website.
    #[arg(required = true, value_name = "url")]
    pub url: String,

    /// Short description.
    #[arg(short, long, value_name = "text")]
    pub desc: Option<String>,

    /// Icon URL or emoji.
    #[arg(short, long, value_name = "icon")]
    pub icon: Option<String>,

    /// Tag id or name, repeatable.
    #[arg(short, long = "tag", value_name = "tag")]
    pub tags: Vec<String>,

    /// Rating from 0 to 5.
    #[arg(short, long, value_name = "rate", value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rate: Option<u8>,

    /// Pin website to the top.
    #[arg(long)]
    pub top: bool,

    /// Only show website to its owner.
    #[arg(long)]
    pub own_visible: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EditWebsiteOptions {
    /// Id of website to edit.
    #[arg(required = true, value_name = "website_id")]
    pub id: i64,

    /// New display name.
    #[arg(short, long, value_name = "name")]
    pub name: Option<String>,

    /// New address.
    #[arg(short, long, value_name = "url")]
    pub url: Option<String>,

    /// New description.
    #[arg(short, long, value_name = "text")]
    pub desc: Option<String>,

    /// New icon URL or emoji.
    #[arg(short, long, value_name = "icon")]
    pub icon: Option<String>,

    /// New rating from 0 to 5.
    #[arg(short, long, value_name = "rate", value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rate: Option<u8>,

    /// Pin or unpin website.
    #[arg(long, value_name = "bool")]
    pub top: Option<bool>,

    /// Restrict website to owner or show it to everybody.
    #[arg(long, value_name = "bool")]
    pub own_visible: Option<bool>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveWebsiteOptions {
    /// Id of website to remove.
    #[arg(required = true, value_name = "website_id")]
    pub id: i64,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MoveWebsiteOptions {
    /// Id of website to move.
    #[arg(required = true, value_name = "website_id")]
    pub id: i64,

    /// Id of category to move website into.
    #[arg(required = true, value_name = "category_id")]
    pub category: i64,

    /// Position inside target category, appended when left out.
    #[arg(short, long, value_name = "index")]
    pub position: Option<usize>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PullOptions {
    /// Overwrite local document without asking.
    #[arg(short, long)]
    pub force: bool,
}

/// Global options shared by every command.
#[derive(Debug, Clone)]
struct Env {
    config: Option<PathBuf>,
    db: Option<PathBuf>,
}

impl Env {
    fn load_config(&self) -> Result<GuidebookConfig> {
        let (path, explicit) = match &self.config {
            Some(path) => (path.clone(), true),
            None => (default_config_path()?, false),
        };

        match read_to_string(&path) {
            Ok(data) => Ok(data
                .parse::<GuidebookConfig>()
                .with_context(|| format!("invalid configuration at {:?}", path.display()))?),
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {
                debug!("no configuration at {:?}, using defaults", path.display());
                Ok(GuidebookConfig::default())
            }
            Err(err) => Err(err)
                .with_context(|| format!("failed to read configuration at {:?}", path.display())),
        }
    }

    fn document_path(&self, config: &GuidebookConfig) -> Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }

        match &config.store.path {
            Some(path) => Ok(path.as_path().to_path_buf()),
            None => Ok(default_document_path()?),
        }
    }

    fn open_store(&self) -> Result<NavStore> {
        let config = self.load_config()?;
        Ok(NavStore::open(self.document_path(&config)?)?)
    }

    fn connect(&self) -> Result<(NavStore, GithubRemote)> {
        let config = self.load_config()?;
        let store = NavStore::open(self.document_path(&config)?)?;

        let settings = config
            .github
            .ok_or_else(|| anyhow!("no [github] table in configuration, cannot reach remote"))?;
        let token = if settings.token.is_empty() {
            Token::new(
                Password::new("GitHub token")
                    .without_confirmation()
                    .with_help_message("needs read and write access to repository contents")
                    .prompt()?,
            )
        } else {
            settings.token.clone()
        };
        let remote = GithubRemote::new(settings, token)?;

        Ok((store, remote))
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn run_normalize(opts: ConvertOptions) -> Result<()> {
    let doc = normalize_str(read_document(&opts.input)?)
        .with_context(|| format!("{:?} is not a JSON array", opts.input.display()))?;
    emit(opts.output.as_deref(), serde_json::to_string_pretty(&doc)?)
}

fn run_clean(opts: ConvertOptions) -> Result<()> {
    let doc = normalize_str(read_document(&opts.input)?)
        .with_context(|| format!("{:?} is not a JSON array", opts.input.display()))?;
    emit(opts.output.as_deref(), to_document(&doc)?)
}

fn run_diff(opts: DiffOptions) -> Result<()> {
    let local: Vec<Value> = serde_json::from_str(&read_document(&opts.local)?)
        .with_context(|| format!("{:?} is not a JSON array", opts.local.display()))?;
    let remote: Vec<Value> = serde_json::from_str(&read_document(&opts.remote)?)
        .with_context(|| format!("{:?} is not a JSON array", opts.remote.display()))?;

    let result = diff_raw(&local, &remote);
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_empty() {
        info!("no differences");
    } else {
        print!("{result}");
    }

    Ok(())
}

async fn run_list(env: &Env, opts: ListOptions) -> Result<()> {
    let store = env.open_store()?;
    let mut failed = FailedIcons::new();

    if opts.check_icons {
        let client = reqwest::Client::new();
        let count = with_spinner(
            "probing icons",
            probe_icons(&client, store.snapshot(), &mut failed),
        )
        .await?;
        if count > 0 {
            warn!("{count} icons replaced by fallbacks");
        }
    }

    for category in store.snapshot() {
        let icon = resolve_icon(category.icon.as_deref(), &category.title, &failed);
        println!("{icon} {} (category {})", category.title, category.id);

        for website in &category.nav {
            let icon = resolve_icon(website.icon.as_deref(), &website.name, &failed);
            println!(
                "    {icon} {} <{}> (website {})",
                website.name, website.url, website.id
            );
        }
    }

    Ok(())
}

fn run_add_category(env: &Env, opts: AddCategoryOptions) -> Result<()> {
    let mut store = env.open_store()?;
    let id = store.edit(|draft| {
        let id = draft.add_category(opts.title, opts.icon)?;
        if let Some(position) = opts.position {
            draft.reorder_category(id, position)?;
        }

        Ok(id)
    })?;
    store.save()?;
    info!("added category {id}");

    Ok(())
}

fn run_edit_category(env: &Env, opts: EditCategoryOptions) -> Result<()> {
    let id = CategoryId::new(opts.id);
    let mut store = env.open_store()?;
    store.edit(|draft| {
        if let Some(title) = opts.title {
            draft.rename_category(id, title)?;
        }
        if opts.no_icon {
            draft.set_category_icon(id, None)?;
        } else if let Some(icon) = opts.icon {
            draft.set_category_icon(id, Some(icon))?;
        }
        if let Some(position) = opts.position {
            draft.reorder_category(id, position)?;
        }

        Ok(())
    })?;
    store.save()?;
    info!("edited category {id}");

    Ok(())
}

fn run_remove_category(env: &Env, opts: RemoveCategoryOptions) -> Result<()> {
    let mut store = env.open_store()?;
    let removed = store.edit(|draft| draft.remove_category(CategoryId::new(opts.id)))?;
    store.save()?;
    info!(
        "removed category {} with {} websites",
        removed.title,
        removed.nav.len()
    );

    Ok(())
}

fn run_add_website(env: &Env, opts: AddWebsiteOptions) -> Result<()> {
    let mut draft = WebsiteDraft::new(opts.name, opts.url);
    draft.desc = opts.desc.unwrap_or_default();
    draft.icon = opts.icon;
    draft.tags = opts.tags.into_iter().map(parse_tag).collect();
    draft.rate = opts.rate.unwrap_or(draft.rate);
    draft.top = opts.top;
    draft.own_visible = opts.own_visible;

    let mut store = env.open_store()?;
    let id = store.edit(|edit| edit.add_website(CategoryId::new(opts.category), draft))?;
    store.save()?;
    info!("added website {id}");

    Ok(())
}

fn run_edit_website(env: &Env, opts: EditWebsiteOptions) -> Result<()> {
    if opts.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(anyhow!("name must not be empty"));
    }
    if opts.url.as_deref().is_some_and(|url| url.trim().is_empty()) {
        return Err(anyhow!("url must not be empty"));
    }

    let id = WebsiteId::new(opts.id);
    let mut store = env.open_store()?;
    store.edit(|draft| {
        draft.edit_website(id, |website| {
            if let Some(name) = opts.name {
                website.name = name;
            }
            if let Some(url) = opts.url {
                website.url = url;
            }
            if let Some(desc) = opts.desc {
                website.desc = desc;
            }
            if let Some(icon) = opts.icon {
                website.icon = Some(icon);
            }
            if let Some(rate) = opts.rate {
                website.rate = Some(rate);
            }
            if let Some(top) = opts.top {
                website.top = Some(top);
            }
            if let Some(own_visible) = opts.own_visible {
                website.own_visible = Some(own_visible);
            }
        })
    })?;
    store.save()?;
    info!("edited website {id}");

    Ok(())
}

fn run_remove_website(env: &Env, opts: RemoveWebsiteOptions) -> Result<()> {
    let mut store = env.open_store()?;
    let removed = store.edit(|draft| draft.remove_website(WebsiteId::new(opts.id)))?;
    store.save()?;
    info!("removed website {}", removed.name);

    Ok(())
}

fn run_move_website(env: &Env, opts: MoveWebsiteOptions) -> Result<()> {
    let id = WebsiteId::new(opts.id);
    let target = CategoryId::new(opts.category);
    let mut store = env.open_store()?;
    store.edit(|draft| draft.move_website(id, target, opts.position))?;
    store.save()?;
    info!("moved website {id} to category {target}");

    Ok(())
}

async fn run_status(env: &Env) -> Result<()> {
    let (store, remote) = env.connect()?;
    let comparison = fetch_comparison(&store, &remote).await?;
    report(&comparison);

    Ok(())
}

async fn run_pull(env: &Env, opts: PullOptions) -> Result<()> {
    let (mut store, remote) = env.connect()?;
    let comparison = fetch_comparison(&store, &remote).await?;
    if report(&comparison) {
        return Ok(());
    }

    let confirmed = opts.force
        || Confirm::new("Overwrite local document with remote copy?")
            .with_default(false)
            .prompt()?;
    let resolution = if confirmed {
        Resolution::UseRemote
    } else {
        Resolution::Cancel
    };

    let outcome = apply(&mut store, &remote, comparison, resolution).await?;
    log_outcome(&outcome);

    Ok(())
}

async fn run_push(env: &Env) -> Result<()> {
    let (mut store, remote) = env.connect()?;
    let comparison = fetch_comparison(&store, &remote).await?;
    if report(&comparison) {
        return Ok(());
    }

    let outcome = with_spinner(
        "pushing local document",
        apply(&mut store, &remote, comparison, Resolution::PushLocal),
    )
    .await??;
    log_outcome(&outcome);

    Ok(())
}

async fn run_sync(env: &Env) -> Result<()> {
    let (mut store, remote) = env.connect()?;
    let comparison = fetch_comparison(&store, &remote).await?;
    if report(&comparison) {
        return Ok(());
    }

    let resolution = Select::new("How should the differences be resolved?", Resolution::ALL.to_vec())
        .prompt()?;
    let outcome = with_spinner(
        "applying resolution",
        apply(&mut store, &remote, comparison, resolution),
    )
    .await??;
    log_outcome(&outcome);

    Ok(())
}

async fn fetch_comparison(store: &NavStore, remote: &GithubRemote) -> Result<Comparison> {
    let message = format!("comparing with {}", remote.contents_url());
    Ok(with_spinner(&message, compare(store, remote)).await??)
}

/// Print differences of comparison.
///
/// Returns `true` if there is nothing to resolve.
fn report(comparison: &Comparison) -> bool {
    if comparison.is_in_sync() {
        info!("local document and remote copy are in sync");
        return true;
    }

    print!("{}", comparison.diff);
    false
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Pulled => info!("local document replaced by remote copy"),
        Outcome::Pushed { sha } => info!("remote copy updated to {sha}"),
        Outcome::Unchanged => info!("nothing changed"),
    }
}

async fn with_spinner<T>(message: &str, task: impl Future<Output = T>) -> Result<T> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{elapsed_precise:.green}  {spinner:.yellow}  {msg}",
    )?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let output = task.await;
    bar.finish_and_clear();

    Ok(output)
}

fn parse_tag(tag: String) -> TagRef {
    match tag.parse() {
        Ok(id) => TagRef::Id(id),
        Err(_) => TagRef::Name(tag),
    }
}

fn read_document(path: &Path) -> Result<String> {
    read_to_string(path).with_context(|| format!("failed to read {:?}", path.display()))
}

fn emit(output: Option<&Path>, content: String) -> Result<()> {
    match output {
        Some(path) => {
            write(path, content).with_context(|| format!("failed to write {:?}", path.display()))?;
            info!("wrote {:?}", path.display());
        }
        None => println!("{content}"),
    }

    Ok(())
}
