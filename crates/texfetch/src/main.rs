//! texfetch - command line entry point
//!
//! Fetches every URL given, keeps the first image that loads and cancels
//! the rest.

use std::path::PathBuf;

use anyhow::{Context, bail};
use smol::LocalExecutor;
use texfetch::{Capabilities, DecodedImage, FetchCallbacks, FetchError, FetchRequest, Loader, LoaderConfig, Platform};
use texfetch_memory::{MemoryGate, SysinfoProbe};
use tracing_subscriber::EnvFilter;

/// Rough decoded size of one texture, used to size the batch
const ESTIMATED_ASSET_BYTES: u64 = 64 * 1024 * 1024;

const USAGE: &str = "usage: texfetch [--cache-dir DIR] [--no-cache] [--no-transcoder] [--platform desktop|mobile|web] URL...";

#[derive(Debug, Default)]
struct Args {
    cache_dir: Option<PathBuf>,
    no_cache: bool,
    no_transcoder: bool,
    platform: Option<Platform>,
    urls: Vec<String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--cache-dir" => {
                    let dir = args.next().context("--cache-dir needs a directory")?;
                    parsed.cache_dir = Some(PathBuf::from(dir));
                }
                "--no-cache" => parsed.no_cache = true,
                "--no-transcoder" => parsed.no_transcoder = true,
                "--platform" => {
                    let name = args.next().context("--platform needs a value")?;
                    parsed.platform = Some(name.parse().map_err(anyhow::Error::msg)?);
                }
                "-h" | "--help" => bail!(USAGE),
                flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
                _ => parsed.urls.push(arg),
            }
        }
        if parsed.urls.is_empty() {
            bail!(USAGE);
        }
        Ok(parsed)
    }
}

enum Event {
    Loaded(usize, DecodedImage),
    Failed(usize, FetchError),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    let gate = MemoryGate::new(SysinfoProbe::new());
    if !gate.safe_to_allocate() {
        bail!("not enough free memory to start ({:?} pressure)", gate.pressure_level());
    }
    let batch = gate.max_concurrent(ESTIMATED_ASSET_BYTES).max(1);
    tracing::info!(
        "memory headroom {} MiB, up to {} concurrent fetches",
        gate.available_bytes() / (1024 * 1024),
        batch
    );
    let mut urls = args.urls;
    if urls.len() > batch {
        tracing::warn!("memory allows {} concurrent fetches, skipping {} URLs", batch, urls.len() - batch);
        urls.truncate(batch);
    }

    let config = match args.cache_dir {
        Some(dir) => LoaderConfig::new(dir),
        None => LoaderConfig::from_default_root()?,
    };
    let mut capabilities = Capabilities::detect();
    if let Some(platform) = args.platform {
        capabilities = capabilities.with_platform(platform);
    }
    if args.no_transcoder {
        capabilities = capabilities.without_transcoder();
    }
    let loader = Loader::new(config, capabilities)?;
    tracing::info!("cache root {}", loader.cache_root().display());

    let executor = LocalExecutor::new();
    let (tx, rx) = smol::channel::unbounded();
    let handles: Vec<_> = urls
        .iter()
        .enumerate()
        .map(|(index, url)| {
            let loaded = tx.clone();
            let failed = tx.clone();
            let callbacks = FetchCallbacks::new(
                move |image| {
                    let _ = loaded.try_send(Event::Loaded(index, image));
                },
                move |e| {
                    let _ = failed.try_send(Event::Failed(index, e));
                },
            )
            .on_progress(move |p| tracing::debug!("[{}] {:.0}%", index, p * 100.0));
            loader.spawn(&executor, FetchRequest::new(url.clone(), !args.no_cache), callbacks)
        })
        .collect();
    drop(tx);

    let winner = smol::block_on(executor.run(async {
        while let Ok(event) = rx.recv().await {
            match event {
                Event::Loaded(index, image) => return Some((index, image)),
                Event::Failed(index, e) => tracing::warn!("{}: {}", urls[index], e),
            }
        }
        None
    }));

    for handle in &handles {
        handle.cancel();
    }

    match winner {
        Some((index, image)) => {
            println!(
                "{}: {}x{} ({} bytes){}",
                urls[index],
                image.width,
                image.height,
                image.memory_size(),
                if image.orientation.is_flipped() { ", flipped" } else { "" }
            );
            Ok(())
        }
        None => bail!("none of {} URLs could be loaded", urls.len()),
    }
}
