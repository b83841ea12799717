//! sticker-draft: extract editable stickers from SVG assets and manage
//! saved drafts from the command line.
//!
//! All output is JSON on stdout; logs go to stderr (`RUST_LOG`, `-v`).

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sd_core::{EntityFactory, NoopLayout, Session, Viewport, extract};
use sd_draft::{AssetProvider, DirAssetProvider, DraftStore, StoreConfig};
use serde_json::Value;
use std::path::PathBuf;

/// Extract editable stickers from SVG assets and manage drafts
#[derive(Parser, Debug)]
#[command(name = "sticker-draft")]
#[command(version)]
struct Args {
    /// Draft store root directory
    #[arg(long, global = true, default_value = "drafts")]
    store: PathBuf,

    /// Directory holding source assets (`<name>.svg`)
    #[arg(long, global = true, default_value = "assets")]
    assets: PathBuf,

    /// More logging (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten an SVG file into scene nodes
    Extract {
        file: PathBuf,
    },
    /// Import an asset into a new draft, fitted to the canvas
    Import {
        /// Asset name, resolved as `<assets>/<name>.svg`
        name: String,
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
        /// PNG to store as the draft thumbnail
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },
    /// List drafts, newest first
    List,
    /// Print a draft's manifest
    Show {
        id: String,
    },
    /// Rebuild a draft's stickers
    Restore {
        id: String,
    },
    /// Delete a draft
    Delete {
        id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let value = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run(args: &Args) -> Result<Value> {
    let assets = DirAssetProvider::new(&args.assets);
    let open_store = || {
        DraftStore::open(StoreConfig { root: args.store.clone() }, assets.clone())
            .with_context(|| format!("opening draft store at {}", args.store.display()))
    };

    match &args.command {
        Command::Extract { file } => {
            let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let nodes = extract(&bytes).with_context(|| format!("extracting {}", file.display()))?;
            log::info!("{} scene nodes from {}", nodes.len(), file.display());
            Ok(Value::Array(
                nodes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| output::scene_node(i, n))
                    .collect(),
            ))
        }
        Command::Import {
            name,
            width,
            height,
            thumbnail,
        } => {
            let store = open_store()?;
            let bytes = assets
                .bytes_for(name)
                .with_context(|| format!("asset {name:?} not found in {}", args.assets.display()))?;
            let viewport = Viewport {
                width: *width,
                height: *height,
            };
            let session = Session::import(&bytes, viewport, &EntityFactory::default())?;
            let thumbnail = thumbnail
                .as_ref()
                .map(|path| std::fs::read(path).with_context(|| format!("reading {}", path.display())))
                .transpose()?;
            let id = store.save(session.stickers(), name, thumbnail.as_deref(), None)?;
            Ok(output::draft_summary(&store.load(&id)?))
        }
        Command::List => Ok(Value::Array(
            open_store()?.list()?.iter().map(output::draft_summary).collect(),
        )),
        Command::Show { id } => Ok(serde_json::to_value(open_store()?.load(id)?)?),
        Command::Restore { id } => {
            let restored = open_store()?.restore(id, &mut NoopLayout)?;
            if restored.is_partial() {
                log::warn!("draft {id}: {} records could not be restored", restored.skipped.len());
            }
            Ok(output::restored(&restored))
        }
        Command::Delete { id } => {
            open_store()?.delete(id)?;
            Ok(serde_json::json!({ "deleted": id }))
        }
    }
}
