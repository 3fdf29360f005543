mod cli;

use mandolin::collector::{self, CollectOptions, CollectorOutcome, Registry};
use mandolin::config::{self, persist, Config};
use mandolin::editor::{self, EditOptions, EditorOutcome};
use mandolin_av::{format_timecode, get_tool_path, probe_duration, SystemRunner};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on flags
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mandolin=debug,mandolin_av=debug".to_string()
        } else if cli.quiet {
            "warn".to_string()
        } else {
            "info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Collect {
            dry_run,
            add,
            seed,
            json,
        } => match add {
            Some(path) => add_source(cli.config.as_deref(), &path),
            None => collect(cli.config.as_deref(), dry_run, seed, json),
        },
        Commands::Edit { dry_run, json } => edit(cli.config.as_deref(), dry_run, json),
        Commands::Duration { file } => print_duration(cli.config.as_deref(), &file),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mandolin {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// The config file a run reads and writes back to.
fn require_config_path(custom: Option<&Path>) -> Result<PathBuf> {
    config::resolve_config_path(custom).context(
        "No config file found; pass --config or create ./mandolin.toml",
    )
}

fn collect(config_path: Option<&Path>, dry_run: bool, seed: Option<u64>, json: bool) -> Result<()> {
    let path = require_config_path(config_path)?;
    let config = config::load_config(&path)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let registry = Registry::default();
    tracing::debug!("Strategies: {}", registry.strategy_names().join(", "));

    let outcome = collector::run(&config, &registry, &mut rng, &CollectOptions { dry_run })?;

    if !dry_run && outcome.changed(&config.instructions) {
        let backup = persist::backup_config(&path)?;
        tracing::debug!("Previous config saved to {:?}", backup);
        persist::update_instructions(&path, &outcome.updated_instructions)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_collect_summary(&outcome, dry_run);
    }

    if outcome.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} file(s) could not be copied", outcome.failures.len())
    }
}

fn print_collect_summary(outcome: &CollectorOutcome, dry_run: bool) {
    let candidates = if dry_run {
        &outcome.selected
    } else {
        &outcome.copied
    };
    let (verb, moved) = if dry_run {
        ("Would copy", "Would move")
    } else {
        ("Copied", "Moved")
    };

    for candidate in candidates.iter() {
        match candidate.action {
            collector::Action::Copy => {
                println!("{}: {} -> {}", verb, candidate.src.display(), candidate.dest.display())
            }
            collector::Action::Move { ref to } => {
                println!("{}: {} -> {}", moved, candidate.src.display(), to.display())
            }
        }
    }
    for failure in &outcome.failures {
        println!("Failed: {} ({})", failure.candidate.src.display(), failure.error);
    }

    let copies = candidates.iter().filter(|c| c.is_copy()).count();
    println!("\n{} {} file(s)", verb, copies);
}

fn add_source(config_path: Option<&Path>, source: &Path) -> Result<()> {
    let path = config::resolve_config_path(config_path)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATHS[0]));
    let mut config = if path.exists() {
        config::load_config(&path)?
    } else {
        Config::default()
    };

    if !collector::add_instruction(&mut config.instructions, source) {
        println!("An instruction for {} already exists", source.display());
        return Ok(());
    }

    if path.exists() {
        persist::backup_config(&path)?;
    }
    persist::update_instructions(&path, &config.instructions)?;
    println!("Added {} to {}", source.display(), path.display());
    Ok(())
}

fn edit(config_path: Option<&Path>, dry_run: bool, json: bool) -> Result<()> {
    let path = require_config_path(config_path)?;
    let config = config::load_config(&path)?;

    let outcome = editor::run(&config, &SystemRunner, &EditOptions { dry_run })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_edit_summary(&outcome, dry_run);
    }

    if outcome.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} edit(s) failed", outcome.failures.len())
    }
}

fn print_edit_summary(outcome: &EditorOutcome, dry_run: bool) {
    if dry_run {
        for queue in &outcome.planned {
            println!("# {}", queue.label);
            for command in &queue.commands {
                println!("{}", command);
            }
        }
    } else {
        println!("Ran {} command(s)", outcome.commands_executed.len());
    }
    for failure in &outcome.failures {
        println!("Failed: {} {}: {}", failure.cmd, failure.label, failure.reason);
    }
}

fn print_duration(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let duration = probe_duration(&SystemRunner, &config.toolbox(), file)
        .with_context(|| format!("Failed to probe {:?}", file))?;
    println!("{}", format_timecode(duration));
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let resolve = |name: &str, configured: Option<&Path>| {
        let configured = configured.map(config::expand_path);
        get_tool_path(name, configured.as_deref())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| name.to_string())
    };
    let ffmpeg = resolve("ffmpeg", config.tools.ffmpeg_path.as_deref());
    let handbrake = resolve("HandBrakeCLI", config.tools.handbrake_path.as_deref());

    let tools = mandolin_av::check_tools(&ffmpeg, &handbrake);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. The editor needs ffmpeg and HandBrakeCLI.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match config::resolve_config_path(path) {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(&p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config_summary(&Config::default());
        }
    }

    Ok(())
}

fn print_config_summary(config: &Config) {
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };
    println!("  Source root: {}", show(&config.src_root));
    println!("  Destination: {}", show(&config.dest));
    println!("  Extension: {}", config.extension);
    println!("  Instructions: {}", config.instructions.len());
    println!(
        "    Enabled: {}",
        config.instructions.iter().filter(|i| !i.disabled).count()
    );
    println!("  Edits: {}", config.edits.len());
    println!("  Shared sources: {}", config.shared.len());
}
