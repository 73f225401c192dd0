//! Headless workbench shell.
//!
//! Exercises the library end to end from the command line: scan the
//! catalog, watch it live, probe the inference server, synthesize, and
//! manage committed samples. Text-to-token encoding lives outside this
//! crate, so `synth` takes the already-encoded sequence and uses `--text`
//! only to name the committed file.
//!
//! All tracing output goes to stderr so stdout stays scriptable.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use voxlab::catalog::{CatalogIndex, CatalogWatcher};
use voxlab::inference::{InferenceClient, LoadCoordinator};
use voxlab::prefs::Preferences;
use voxlab::samples::SampleStore;
use voxlab::session::{SequenceEncoder, SynthesisSession};
use voxlab::{Result, VoxConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let config = VoxConfig::from_file(&VoxConfig::default_config_path())?;

    match args[1].as_str() {
        "scan" => scan(&config)?,
        "watch" => watch(&config).await?,
        "probe" => probe(&config).await?,
        "synth" => synth(&config, &args[2..]).await?,
        "samples" => samples(&config, &args[2..])?,
        "help" | "--help" | "-h" => print_usage(),
        other => anyhow::bail!("unknown subcommand `{other}` (use scan|watch|probe|synth|samples)"),
    }
    Ok(())
}

/// Rebuild the catalog once and print it, marking the remembered game.
fn scan(config: &VoxConfig) -> Result<()> {
    let mut catalog = CatalogIndex::new(&config.paths.model_root, &config.paths.assets_dir);
    let added = catalog.rebuild()?;

    println!(
        "{} game(s), {} model(s) ({added} new)",
        catalog.game_count(),
        catalog.model_count()
    );

    let prefs = Preferences::load();
    for game in catalog.games() {
        let marker = if prefs.last_game.as_deref() == Some(game.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  [asset: {}]",
            game.id,
            game.asset.as_deref().unwrap_or("-")
        );
        for descriptor in catalog.descriptors_for(&game.id) {
            println!(
                "    {}  {}  outputs={} cmudict={}",
                descriptor.id,
                descriptor.name,
                descriptor.outputs,
                descriptor.cmudict.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

/// Scan once, then rebuild on every debounced tree change until Ctrl-C.
async fn watch(config: &VoxConfig) -> Result<()> {
    let mut catalog = CatalogIndex::new(&config.paths.model_root, &config.paths.assets_dir);
    catalog.rebuild()?;
    println!(
        "watching {} ({} game(s), {} model(s))",
        config.paths.model_root.display(),
        catalog.game_count(),
        catalog.model_count()
    );

    let (change_tx, mut change_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let watcher = CatalogWatcher::new(&config.paths.model_root, change_tx, cancel.child_token())
        .with_poll_interval(Duration::from_millis(config.watcher.poll_interval_ms))
        .with_debounce_window(Duration::from_millis(config.watcher.debounce_ms));
    let task = tokio::spawn(watcher.run());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }
            event = change_rx.recv() => {
                if event.is_none() {
                    break;
                }
                let added = catalog.rebuild()?;
                println!(
                    "catalog changed: {} game(s), {} model(s) ({added} new)",
                    catalog.game_count(),
                    catalog.model_count()
                );
            }
        }
    }

    let _ = task.await;
    Ok(())
}

/// Probe the inference server with retry; exits non-zero when not ready.
async fn probe(config: &VoxConfig) -> Result<()> {
    let client = InferenceClient::new(config.server.clone());
    let status = client.probe_with_retry().await;
    println!("{status}");
    if !status.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}

/// Encoder fed from the command line: the text is already tokens.
struct PreEncoded(Vec<i64>);

impl SequenceEncoder for PreEncoded {
    fn encode(&self, _text: &str) -> Result<Vec<i64>> {
        Ok(self.0.clone())
    }
}

/// Load the selected model if needed, synthesize once, optionally commit.
async fn synth(config: &VoxConfig, args: &[String]) -> anyhow::Result<()> {
    let game = required_flag(args, "--game")?;
    let model_id = required_flag(args, "--model")?;
    let sequence = required_flag(args, "--sequence")?;
    let text = flag_value(args, "--text").unwrap_or("");
    let tokens = parse_sequence(sequence)?;

    let mut catalog = CatalogIndex::new(&config.paths.model_root, &config.paths.assets_dir);
    catalog.rebuild()?;
    let descriptor = catalog
        .descriptors_for(game)
        .into_iter()
        .find(|d| d.id == model_id)
        .ok_or_else(|| anyhow::anyhow!("no model `{model_id}` under game `{game}`"))?;

    remember_game(game);

    let client = InferenceClient::new(config.server.clone());
    let mut coordinator = LoadCoordinator::new(&config.paths.model_root);
    coordinator.ensure_loaded(&client, game, &descriptor).await?;

    let mut session = SynthesisSession::new(&config.paths.output_dir);
    let staged = session
        .synthesize(&client, &coordinator, &PreEncoded(tokens), game, model_id, text)
        .await?;

    if has_flag(args, "--commit") {
        let store = SampleStore::new(&config.paths.output_dir);
        let sample = store.commit(&staged)?;
        session.clear_staged();
        println!("committed {}", sample.path.display());
    } else {
        println!("staged {}", staged.temp_path.display());
        println!("would commit to {}", staged.target_path.display());
    }
    Ok(())
}

/// List one model's committed samples, or delete one with `--confirm`.
fn samples(config: &VoxConfig, args: &[String]) -> anyhow::Result<()> {
    let game = required_flag(args, "--game")?;
    let model_id = required_flag(args, "--model")?;
    let store = SampleStore::new(&config.paths.output_dir);

    if let Some(name) = flag_value(args, "--delete") {
        let listed = store.list(game, model_id)?;
        let sample = listed
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow::anyhow!("no sample named `{name}` under {game}/{model_id}"))?;
        store.delete(sample, has_flag(args, "--confirm"))?;
        println!("deleted {name}");
        return Ok(());
    }

    let mut listed = store.list(game, model_id)?;
    listed.sort_by(|a, b| a.name.cmp(&b.name));
    if listed.is_empty() {
        println!("no samples for {game}/{model_id}");
        return Ok(());
    }
    for sample in listed {
        match sample.duration_secs {
            Some(secs) => println!("{}\t{secs:.2}s\t{}", sample.name, sample.path.display()),
            None => println!("{}\t-\t{}", sample.name, sample.path.display()),
        }
    }
    Ok(())
}

/// Persist the active game so the next launch reopens it.
fn remember_game(game: &str) {
    let mut prefs = Preferences::load();
    if prefs.last_game.as_deref() != Some(game) {
        prefs.set_last_game(game);
        if let Err(e) = prefs.save() {
            tracing::warn!(error = %e, "could not persist last game");
        }
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn required_flag<'a>(args: &'a [String], name: &str) -> anyhow::Result<&'a str> {
    flag_value(args, name).ok_or_else(|| anyhow::anyhow!("missing required flag {name} <value>"))
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

/// Comma-separated integer tokens, whitespace tolerated.
fn parse_sequence(raw: &str) -> anyhow::Result<Vec<i64>> {
    let tokens: Vec<i64> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<i64>()
                .map_err(|e| anyhow::anyhow!("bad token `{t}` in --sequence: {e}"))
        })
        .collect::<anyhow::Result<_>>()?;
    if tokens.is_empty() {
        anyhow::bail!("--sequence must contain at least one token");
    }
    Ok(tokens)
}

fn print_usage() {
    println!("usage: voxlab <command>");
    println!();
    println!("  scan                             rebuild the catalog once and print it");
    println!("  watch                            scan, then rebuild on tree changes (Ctrl-C stops)");
    println!("  probe                            check the inference server is reachable");
    println!("  synth --game G --model M --sequence \"1,2,3\" [--text T] [--commit]");
    println!("  samples --game G --model M [--delete NAME --confirm]");
}
