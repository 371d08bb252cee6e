//! Nestly CLI: shareable lists and notes that live entirely in their link.
//!
//! Documents are encoded into the link's fragment; nothing is uploaded. The
//! only local state is the recent-links ledger.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod share;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use nestly_core::codec;
use nestly_core::error::CipherError;
use nestly_core::ledger::{Ledger, Placement};
use nestly_core::link::Link;
use nestly_core::lockbox::{self, Package};
use nestly_core::tool::{ToolId, document_title};
use serde_json::Value;
use tracing::error;
use zeroize::Zeroizing;

use crate::config::{CliConfig, DEFAULT_BASE_URL, StorageKind};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const LOCKBOX_TITLE: &str = "Locked note";

// ── CLI structure ────────────────────────────────────────────────────

/// Nestly: simple tools for your home, shared by link.
#[derive(Parser)]
#[command(
    name = "nestly",
    version,
    about = "Nestly CLI: shareable lists and password-locked notes that live in their link",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         NESTLY_BASE_URL       Page links are attached to (default: {DEFAULT_BASE_URL})\n  \
         NESTLY_DATA_DIR       Where recent links are kept\n  \
         NESTLY_STORAGE        redb (default) or memory\n  \
         NESTLY_PASSWORD       Lockbox password for lock/unlock\n  \
         NESTLY_SHORTENER_URL  Short-link endpoint\n\n\
         {DIM}Examples:{RESET}\n  \
         nestly new grocery > list.json\n  \
         nestly save grocery --file list.json\n  \
         nestly open 'http://localhost:5173/#grocery:eJyr...'\n  \
         nestly lock --message 'wifi: hunter2' --password swordfish"
    ),
)]
struct Cli {
    /// Page URL that links are attached to.
    #[arg(long, env = "NESTLY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory holding the recent-links database.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep recent links in memory only; nothing is written to disk.
    #[arg(long, default_value = "false")]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tools.
    Tools,
    /// Print a tool's fresh document and link.
    New {
        /// Tool name (grocery, chores, recipes, packing, itinerary, wishlist, emergency).
        tool: ToolId,
    },
    /// Decode a link and print its document.
    Open {
        /// Link, fragment, or `tool:token`.
        link: String,
    },
    /// Encode a JSON document into a shareable link.
    Save {
        /// Tool that owns the document.
        tool: ToolId,
        /// Read the document from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
        /// The document's link before this edit; its recent entry is replaced.
        #[arg(long)]
        previous: Option<String>,
        /// Emit the old uncompressed token format.
        #[arg(long, default_value = "false")]
        legacy: bool,
    },
    /// Encrypt a note into a password-protected lockbox link.
    Lock {
        /// The note. Read from stdin when omitted.
        #[arg(long)]
        message: Option<String>,
        /// Password the recipient will need.
        #[arg(long, env = "NESTLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Decrypt a lockbox link.
    Unlock {
        /// Lockbox link.
        link: String,
        /// Password chosen by the sender.
        #[arg(long, env = "NESTLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show recently saved and opened links.
    Recent {
        /// Forget all recent links.
        #[arg(long, default_value = "false")]
        clear: bool,
    },
    /// Print the full URL and QR code image for a link.
    Share {
        /// Link, fragment, or `tool:token`.
        link: String,
        /// Also ask the shortener for a short link.
        #[arg(long, default_value = "false")]
        shorten: bool,
    },
}

struct Session {
    config: CliConfig,
    base_url: String,
    ledger: Ledger,
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<12}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_json(value: &Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("failed to format document")?;
    println!("{pretty}");
    Ok(())
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = CliConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.ephemeral {
        config.storage = StorageKind::Memory;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(config, cli.base_url, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(config: CliConfig, base_url: String, cmd: Commands) -> Result<()> {
    let ledger = Ledger::new(config.open_storage()?);
    let ctx = Session {
        config,
        base_url,
        ledger,
    };

    match cmd {
        Commands::Tools => {
            cmd_tools();
            Ok(())
        }
        Commands::New { tool } => cmd_new(&ctx, tool),
        Commands::Open { link } => cmd_open(&ctx, &link).await,
        Commands::Save {
            tool,
            file,
            previous,
            legacy,
        } => cmd_save(&ctx, tool, file.as_deref(), previous.as_deref(), legacy).await,
        Commands::Lock { message, password } => cmd_lock(&ctx, message, password).await,
        Commands::Unlock { link, password } => cmd_unlock(&link, password).await,
        Commands::Recent { clear } => cmd_recent(&ctx, clear).await,
        Commands::Share { link, shorten } => cmd_share(&ctx, &link, shorten).await,
    }
}

fn parse_link(input: &str) -> Result<Link> {
    Link::parse(input).with_context(|| format!("'{input}' is not a Nestly link"))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin"),
    }
}

// ── Document commands ────────────────────────────────────────────────

fn cmd_tools() {
    header("🏠", "Tools");
    for tool in ToolId::ALL {
        println!(
            "  {}  {BOLD}{:<10}{RESET} {DIM}{}{RESET}",
            tool.icon(),
            tool.as_str(),
            tool.display_name()
        );
    }
}

fn cmd_new(ctx: &Session, tool: ToolId) -> Result<()> {
    let Some(doc) = tool.default_document() else {
        bail!("lockbox notes are created with `nestly lock`");
    };
    print_json(&doc)?;
    eprintln!(
        "{DIM}fresh link:{RESET} {}",
        Link::fresh(tool).to_url(&ctx.base_url)
    );
    Ok(())
}

async fn cmd_open(ctx: &Session, input: &str) -> Result<()> {
    let link = parse_link(input)?;
    let tool = link.tool();

    if tool.is_sealed() {
        return open_lockbox(ctx, &link).await;
    }

    let Some(fallback) = tool.default_document() else {
        bail!("{tool} has no document");
    };
    let doc = match link.token() {
        None => fallback,
        Some(token) => match codec::try_decode_shaped(token, &fallback) {
            Ok((doc, _format)) => {
                ctx.ledger
                    .record(tool, document_title(&doc), &link.fragment(), None)
                    .await?;
                doc
            }
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                warning("This link didn't load, starting fresh.");
                fallback
            }
        },
    };

    header(tool.icon(), document_title(&doc));
    print_json(&doc)
}

async fn open_lockbox(ctx: &Session, link: &Link) -> Result<()> {
    let Some(token) = link.token() else {
        println!("  No note here yet. Create one with {BOLD}nestly lock{RESET}.");
        return Ok(());
    };
    if let Err(e) = Package::from_token(token) {
        tracing::debug!(error = %e, "lockbox token rejected");
        warning("This link didn't load, starting fresh.");
        println!("  Create a new note with {BOLD}nestly lock{RESET}.");
        return Ok(());
    }

    header(link.tool().icon(), "Restricted Access");
    println!("  This note is locked. Read it with {BOLD}nestly unlock{RESET}.");
    ctx.ledger
        .record(link.tool(), LOCKBOX_TITLE, &link.fragment(), None)
        .await?;
    Ok(())
}

async fn cmd_save(
    ctx: &Session,
    tool: ToolId,
    file: Option<&Path>,
    previous: Option<&str>,
    legacy: bool,
) -> Result<()> {
    if tool.is_sealed() {
        bail!("lockbox notes are created with `nestly lock`");
    }
    let input = read_input(file)?;
    let doc: Value = serde_json::from_str(&input).context("document is not valid JSON")?;
    let previous = previous.map(parse_link).transpose()?;

    let encoded = if legacy {
        codec::encode_legacy(&doc)
    } else {
        codec::encode(&doc)
    };
    let token =
        encoded.inspect_err(|e| error!(%tool, error = %e, "document could not be encoded"))?;

    let link = Link::new(tool, token);
    let title = document_title(&doc);
    let placement = ctx
        .ledger
        .record(
            tool,
            title,
            &link.fragment(),
            previous.as_ref().map(Link::fragment).as_deref(),
        )
        .await?;

    match placement {
        Placement::Replaced => success(&format!("Updated {BOLD}{title}{RESET}")),
        Placement::Reopened | Placement::Added => success(&format!("Saved {BOLD}{title}{RESET}")),
    }
    println!("{}", link.to_url(&ctx.base_url));
    Ok(())
}

// ── Lockbox commands ─────────────────────────────────────────────────

async fn cmd_lock(ctx: &Session, message: Option<String>, password: String) -> Result<()> {
    let message = Zeroizing::new(match message {
        Some(message) => message,
        None => read_input(None)?,
    });
    let password = Zeroizing::new(password);
    if message.is_empty() || password.is_empty() {
        bail!("please enter both a message and a password");
    }

    let package = lockbox::seal(message, password)
        .await
        .context("encryption failed")?;
    let link = Link::new(ToolId::Lockbox, package.to_token()?);
    ctx.ledger
        .record(ToolId::Lockbox, LOCKBOX_TITLE, &link.fragment(), None)
        .await?;

    success("Message locked! Send this link to someone with the password.");
    println!("{}", link.to_url(&ctx.base_url));
    Ok(())
}

async fn cmd_unlock(input: &str, password: String) -> Result<()> {
    let link = parse_link(input)?;
    if !link.tool().is_sealed() {
        bail!("not a lockbox link (tool: {})", link.tool());
    }
    let Some(token) = link.token() else {
        bail!("this lockbox link carries no note");
    };
    // A mangled token is reported exactly like a wrong password.
    let package = match Package::from_token(token) {
        Ok(package) => package,
        Err(e) => {
            tracing::debug!(error = %e, "lockbox token rejected");
            bail!("Incorrect password");
        }
    };

    match lockbox::open(package, Zeroizing::new(password)).await {
        Ok(secret) => {
            header("🔓", "Secret Revealed");
            println!("{}", secret.as_str());
            Ok(())
        }
        Err(CipherError::AuthenticationFailure) => bail!("Incorrect password"),
        Err(e) => Err(e.into()),
    }
}

// ── Ledger & sharing ─────────────────────────────────────────────────

async fn cmd_recent(ctx: &Session, clear: bool) -> Result<()> {
    if clear {
        ctx.ledger.clear().await?;
        success("Recent links cleared");
        return Ok(());
    }

    let entries = ctx.ledger.list().await?;
    if entries.is_empty() {
        println!("{DIM}No recent links.{RESET}");
        return Ok(());
    }

    header("🕒", "Recently Viewed");
    for entry in entries {
        let when = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        println!(
            "  {}  {BOLD}{}{RESET} {DIM}· {} · {when}{RESET}",
            entry.tool_id.icon(),
            entry.title,
            entry.tool_id.display_name(),
        );
        println!("     {DIM}{}{RESET}", join_base(&ctx.base_url, &entry.link));
    }
    Ok(())
}

/// Ledger links are fragments; re-parse them so stale entries still print.
fn join_base(base: &str, fragment: &str) -> String {
    Link::parse(fragment).map_or_else(|_| fragment.to_owned(), |link| link.to_url(base))
}

async fn cmd_share(ctx: &Session, input: &str, shorten: bool) -> Result<()> {
    let link = parse_link(input)?;
    let full = link.to_url(&ctx.base_url);

    header("🔗", "Share");
    kv_line("Link", &full);
    kv_line("QR code", &share::qr_url(&full));

    if shorten {
        let http = reqwest::Client::new();
        match share::shorten(&http, &ctx.config.shortener_url, &full).await {
            Ok(short) => kv_line("Short link", &short),
            Err(e) => warning(&format!("Could not shorten link: {e:#}")),
        }
    }
    Ok(())
}
