use clap::{Parser, Subcommand};
use soundscape::config::Config;
use soundscape::player::AudioOutput;
use soundscape::runtime::{spawn_runtime, RuntimeEvent, RuntimeOptions};
use soundscape::simulate::Simulation;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soundscape", about = "Crossfading ambient soundscape player")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the soundscape, reading commands from stdin
    Play {
        /// Directory holding the clips (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Start rotating immediately
        #[arg(long)]
        autostart: bool,
        /// Print the volume of every track on each sync
        #[arg(long)]
        meter: bool,
        /// Fixed random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the rotation on a virtual clock without audio
    Simulate {
        /// Number of rotations to run
        #[arg(short = 'n', long, default_value = "10")]
        cycles: usize,
        /// Fixed random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Virtual tick length in milliseconds
        #[arg(long, default_value = "100")]
        step_ms: u64,
        /// Print rotations as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the tracks in the catalog
    Catalog,
    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);

    match cli.command {
        Commands::Play {
            dir,
            autostart,
            meter,
            seed,
        } => {
            if let Some(dir) = dir {
                config.audio_dir = dir;
            }
            play(&config, autostart, meter, seed);
        }
        Commands::Simulate {
            cycles,
            seed,
            step_ms,
            json,
        } => {
            let catalog = config.catalog().unwrap_or_else(|e| fail(e));
            let mut sim = Simulation::new(
                &catalog,
                config.settings(),
                seed,
                Duration::from_millis(step_ms),
            )
            .unwrap_or_else(|e| fail(e));

            let heads = sim.start();
            let rotations = sim.run_cycles(cycles);
            if json {
                match serde_json::to_string_pretty(&rotations) {
                    Ok(s) => println!("{}", s),
                    Err(e) => fail(e),
                }
                return;
            }
            println!("t=0s       start    heads={:?}", heads);
            for r in &rotations {
                let evicted = r
                    .evicted
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "t={:<8} +{:<3} -{:<3} heads={:?}",
                    format!("{:.1}s", r.at_secs),
                    r.added,
                    evicted,
                    r.play_heads
                );
            }
        }
        Commands::Catalog => {
            let catalog = config.catalog().unwrap_or_else(|e| fail(e));
            if catalog.is_empty() {
                println!("No tracks in '{}'.", catalog.dir.display());
                return;
            }
            for (id, _) in catalog.iter() {
                if let Some(path) = catalog.path(id) {
                    println!("{:>3}  {}", id, path.display());
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigCmd::Show => {
                println!("# {}", config_path.display());
                match serde_json::to_string_pretty(&config) {
                    Ok(s) => println!("{}", s),
                    Err(e) => fail(e),
                }
            }
            ConfigCmd::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!(
                        "Error: '{}' already exists (use --force to overwrite)",
                        config_path.display()
                    );
                    std::process::exit(1);
                }
                if let Err(e) = Config::default().save(&config_path) {
                    fail(e);
                }
                println!("Wrote {}", config_path.display());
            }
        },
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn play(config: &Config, autostart: bool, meter: bool, seed: Option<u64>) {
    let catalog = config.catalog().unwrap_or_else(|e| fail(e));
    let options = RuntimeOptions {
        settings: config.settings(),
        tick: config.tick(),
        sync_interval: config.sync_interval(),
        seed,
    };

    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<usize, String>>();
    let handle = spawn_runtime(
        catalog,
        options,
        |catalog| AudioOutput::open()?.load_catalog(catalog),
        move |evt| match evt {
            RuntimeEvent::Ready { tracks } => {
                let _ = ready_tx.send(Ok(tracks));
            }
            RuntimeEvent::Started(heads) => println!("Started: {:?}", heads),
            RuntimeEvent::Stopped => println!("Stopped."),
            RuntimeEvent::Rotated(r) => match r.evicted {
                Some(old) => println!("Rotate: +{} -{}", r.added, old),
                None => println!("Rotate: +{}", r.added),
            },
            RuntimeEvent::Toggled { track, state } => println!("Track {}: {}", track, state),
            RuntimeEvent::Volumes(volumes) => {
                if meter {
                    let line: Vec<String> = volumes.iter().map(|v| format!("{:.2}", v)).collect();
                    println!("{}", line.join(" "));
                }
            }
            RuntimeEvent::Error(msg) => {
                eprintln!("Error: {}", msg);
                let _ = ready_tx.send(Err(msg));
            }
        },
    )
    .unwrap_or_else(|e| fail(e));

    match ready_rx.recv() {
        Ok(Ok(tracks)) => println!(
            "Loaded {} tracks. Commands: start, stop, <n> | toggle <n>, status, quit",
            tracks
        ),
        Ok(Err(_)) | Err(_) => std::process::exit(1),
    }

    if autostart {
        send(handle.start());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["start"] | ["play"] => send(handle.start()),
            ["stop"] => send(handle.stop()),
            ["toggle", n] | [n] if n.parse::<usize>().is_ok() => {
                if let Ok(id) = n.parse::<usize>() {
                    send(handle.toggle(id));
                }
            }
            ["status"] => match handle.snapshot() {
                Ok(tracks) => {
                    for t in tracks {
                        println!(
                            "{:>3} {} {:.2} {:<10} {}",
                            t.id,
                            t.volume_bar(),
                            t.volume,
                            t.state.to_string(),
                            t.name
                        );
                    }
                }
                Err(e) => fail(e),
            },
            ["quit"] | ["exit"] => break,
            _ => eprintln!("Unknown command: {}", line.trim()),
        }
    }

    handle.shutdown();
    // Give the runtime thread time to release the output device.
    std::thread::sleep(Duration::from_millis(100));
}

fn send(result: soundscape::Result<()>) {
    if let Err(e) = result {
        fail(e);
    }
}
