use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use similar::{ChangeTag, TextDiff};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use histmerge_core::banner::has_redundant_banner;
use histmerge_core::batch::{BatchOptions, candidate_pages, merge_batch};
use histmerge_core::config::{BotConfig, load_config};
use histmerge_core::merge::merge_page;
use histmerge_core::remote::{MediaWikiClient, MediaWikiClientConfig, NS_TALK, PageStore};

const DEFAULT_CONFIG_FILE: &str = "histmerge.toml";

#[derive(Debug, Parser)]
#[command(
    name = "histmerge",
    version,
    about = "Merges redundant talk page banners into {{article history}}"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Merge the banners on one talk page and save it")]
    Fix(FixArgs),
    #[command(about = "Walk every talk page transcluding the template and merge in batch")]
    Run(RunArgs),
    #[command(about = "Report the talk pages still carrying redundant banners")]
    List(ListArgs),
    #[command(about = "Run the merge over a local wikitext file, no network")]
    Process(ProcessArgs),
}

#[derive(Debug, Args)]
struct FixArgs {
    /// Talk page to fix; the Talk: prefix is added when missing.
    page: String,
    #[arg(short, long, help = "Show the diff and confirm before saving")]
    interactive: bool,
    #[arg(long, help = "Never write; print the diff instead")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(short, long, help = "Confirm before each edit")]
    interactive: bool,
    #[arg(short, long, value_name = "N", help = "Start counting edits at this number")]
    count: Option<usize>,
    #[arg(short, long, value_name = "N", help = "Stop making edits at this number")]
    limit: Option<usize>,
    #[arg(long, help = "Never write; report what would change")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long, value_name = "N", help = "Stop after listing this many pages")]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct ProcessArgs {
    /// Wikitext file to process, or `-` for stdin.
    input: PathBuf,
    #[arg(short, long, value_name = "PATH", help = "Write the result here instead of stdout")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "histmerge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = load_config(&config_path)?;

    match cli.command {
        Commands::Fix(args) => run_fix(&config, args),
        Commands::Run(args) => run_batch(&config, args),
        Commands::List(args) => run_list(&config, args),
        Commands::Process(args) => run_process(args),
    }
}

fn run_fix(config: &BotConfig, args: FixArgs) -> Result<()> {
    let title = talk_title(&args.page);
    let mut client = build_client(config)?;
    if !args.dry_run {
        login_from_env(&mut client)?;
    }

    let Some(page) = client.get_page(&title)? else {
        bail!("{title} doesn't exist");
    };
    let updated = merge_page(&page.content)?;
    if updated == page.content {
        println!("{title}: nothing to merge");
        return Ok(());
    }

    if args.interactive || args.dry_run {
        print_diff(&page.content, &updated);
    }
    if args.dry_run {
        println!("dry_run: not saving {title}");
        return Ok(());
    }
    if args.interactive && !confirm(&format!("Save {title}?"))? {
        println!("skipped: {title}");
        return Ok(());
    }

    client.save_page(&title, &updated, &config.summary())?;
    tracing::info!(%title, "saved");
    Ok(())
}

fn run_batch(config: &BotConfig, args: RunArgs) -> Result<()> {
    let mut client = build_client(config)?;
    if !args.dry_run {
        login_from_env(&mut client)?;
    }

    if args.interactive {
        return run_batch_interactive(config, &mut client, &args);
    }

    let options = BatchOptions {
        template: config.template(),
        summary: config.summary(),
        start_count: args.count.unwrap_or(0),
        limit: args.limit,
        dry_run: args.dry_run,
    };
    let report = merge_batch(&mut client, &options)?;

    for page in &report.pages {
        match &page.detail {
            Some(detail) => println!("{}: {} ({detail})", page.action, page.title),
            None => println!("{}: {}", page.action, page.title),
        }
    }
    for error in &report.errors {
        tracing::warn!(%error, "page skipped");
    }
    println!("scanned: {}", report.scanned);
    println!("edits_made: {}", report.edits);
    println!("requests_made: {}", report.request_count);
    Ok(())
}

fn run_batch_interactive(
    config: &BotConfig,
    client: &mut MediaWikiClient,
    args: &RunArgs,
) -> Result<()> {
    let template = config.template();
    let titles = client.get_embedded_pages(&template, NS_TALK)?;
    tracing::info!(total = titles.len(), %template, "talk pages transcluding the template");

    let summary = config.summary();
    let mut edits = args.count.unwrap_or(0);
    if edits > 0 {
        tracing::info!(edits, "starting off with edits already made");
    }

    for title in titles {
        let page = match client.get_page(&title) {
            Ok(Some(page)) => page,
            Ok(None) => continue,
            Err(error) => {
                tracing::warn!(%title, %error, "fetch failed; skipping");
                continue;
            }
        };
        if !has_redundant_banner(&page.content) {
            continue;
        }

        let updated = match merge_page(&page.content) {
            Ok(updated) => updated,
            Err(error) => {
                tracing::warn!(%title, %error, "merge failed; skipping");
                continue;
            }
        };
        if updated == page.content {
            continue;
        }

        print_diff(&page.content, &updated);
        if !confirm(&format!("Save {title}?"))? {
            if confirm("Exit?")? {
                break;
            }
            continue;
        }

        if let Err(error) = client.save_page(&title, &updated, &summary) {
            tracing::warn!(%title, %error, "save failed; skipping");
            continue;
        }
        edits += 1;
        tracing::info!(edits, %title, "saved");
        if let Some(limit) = args.limit
            && edits >= limit
        {
            tracing::info!(edits, "edit limit reached; done");
            break;
        }
    }

    println!("edits_made: {edits}");
    println!("requests_made: {}", client.request_count());
    Ok(())
}

fn run_list(config: &BotConfig, args: ListArgs) -> Result<()> {
    let mut client = build_client(config)?;
    let template = config.template();
    let titles = candidate_pages(&mut client, &template, args.limit)?;
    for title in &titles {
        println!("{}", strip_talk_prefix(title));
    }
    println!("pages_found: {}", titles.len());
    Ok(())
}

fn run_process(args: ProcessArgs) -> Result<()> {
    let input = if args.input == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let output = merge_page(&input)?;
    match args.output {
        Some(path) => fs::write(&path, output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{output}"),
    }
    Ok(())
}

fn build_client(config: &BotConfig) -> Result<MediaWikiClient> {
    MediaWikiClient::new(MediaWikiClientConfig::from_config(config))
}

fn login_from_env(client: &mut MediaWikiClient) -> Result<()> {
    let username = std::env::var("WIKI_BOT_USER")
        .map_err(|_| anyhow::anyhow!("WIKI_BOT_USER is required for edits"))?;
    let password = std::env::var("WIKI_BOT_PASS")
        .map_err(|_| anyhow::anyhow!("WIKI_BOT_PASS is required for edits"))?;
    client.login(username.trim(), password.trim())
}

fn talk_title(page: &str) -> String {
    if page.starts_with("Talk:") {
        page.to_string()
    } else {
        format!("Talk:{page}")
    }
}

fn strip_talk_prefix(title: &str) -> &str {
    title.strip_prefix("Talk:").unwrap_or(title)
}

fn print_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        print!("{sign}{change}");
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::{strip_talk_prefix, talk_title};

    #[test]
    fn talk_title_adds_the_namespace_once() {
        assert_eq!(talk_title("Dyslexia"), "Talk:Dyslexia");
        assert_eq!(talk_title("Talk:Dyslexia"), "Talk:Dyslexia");
    }

    #[test]
    fn strip_talk_prefix_inverts_it() {
        assert_eq!(strip_talk_prefix("Talk:Dyslexia"), "Dyslexia");
        assert_eq!(strip_talk_prefix("Dyslexia"), "Dyslexia");
    }
}
