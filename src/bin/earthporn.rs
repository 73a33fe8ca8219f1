use std::path::PathBuf;

use clap::{Parser, Subcommand};
use earthporn::config::Config;
use earthporn::schedule::{self, TaskSpec};
use earthporn::{Fetcher, Resolution, SaveOutcome};
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Download images from https://www.reddit.com/r/earthporn
#[derive(Parser)]
#[command(name = "earthporn", version)]
#[command(about = "Download images from https://www.reddit.com/r/earthporn", long_about = None)]
struct Cli {
    /// Config file (defaults to ./earthporn.yaml, then the user config directory)
    #[arg(long, env = "EARTHPORN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Number of images (max = 100)
    #[arg(short, long, global = true)]
    count: Option<u32>,

    /// Destination directory
    #[arg(short, long, global = true)]
    dest: Option<String>,

    /// Number of images to keep in the directory (> count)
    #[arg(short, long, allow_negative_numbers = true, global = true)]
    keepcount: Option<i64>,

    /// Resolution of the display, to filter out images that do not look good
    #[arg(short, long, global = true)]
    resolution: Option<Resolution>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install as a cron job (Unix) or scheduled task (Windows)
    Install {
        /// Hours between runs
        #[arg(long, default_value_t = 1)]
        every: u32,
    },
    /// Remove the installed cron job or scheduled task
    Uninstall,
}

impl Cli {
    /// Apply command line overrides on top of the file config.
    fn apply(&self, config: &mut Config) {
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(dest) = &self.dest {
            config.dest = dest.clone();
        }
        if let Some(keepcount) = self.keepcount {
            config.keepcount = keepcount;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
    }

    /// Arguments the scheduled task passes back to this binary.
    fn task_args(&self) -> std::io::Result<Vec<String>> {
        let mut args = Vec::new();
        if let Some(path) = &self.config {
            args.push("--config".to_string());
            args.push(std::path::absolute(path)?.to_string_lossy().into_owned());
        }
        if let Some(count) = self.count {
            args.push(format!("--count={}", count));
        }
        if let Some(dest) = &self.dest {
            args.push(format!("--dest={}", dest));
        }
        if let Some(keepcount) = self.keepcount {
            args.push(format!("--keepcount={}", keepcount));
        }
        if let Some(resolution) = self.resolution {
            args.push(format!("--resolution={}", resolution));
        }
        Ok(args)
    }
}

/// Handle for swapping the log filter once the config is known.
type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Start logging before the config is read.
///
/// `RUST_LOG` wins when set; otherwise logging starts at `info` and the
/// returned handle applies the config's `log_level` later.
fn init_tracing() -> Option<FilterHandle> {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return None;
    }

    let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Some(handle)
}

fn apply_log_level(handle: Option<FilterHandle>, level: &str) {
    let Some(handle) = handle else {
        return;
    };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply log level {:?}: {}", level, e);
            }
        }
        Err(e) => warn!("Invalid log level {:?}: {}", level, e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter_handle = init_tracing();

    let mut config = Config::discover(cli.config.as_deref())?;
    cli.apply(&mut config);
    apply_log_level(filter_handle, &config.log_level);

    debug!("Starting with config: {:?}", config);

    match &cli.command {
        Some(Commands::Install { every }) => {
            config.validate()?;
            let exe = std::env::current_exe()?;
            let workdir = std::env::current_dir()?;
            let args = cli.task_args()?;

            schedule::install(&TaskSpec {
                exe: &exe,
                workdir: &workdir,
                args: &args,
                every_hours: *every,
            })?;
            println!("✅ Installed: runs every {} hour(s)", every);
        }
        Some(Commands::Uninstall) => {
            schedule::uninstall()?;
            println!("✅ Uninstalled");
        }
        None => {
            let fetcher = Fetcher::new(config)?;
            let summary = fetcher.run().await?;
            let saved = &summary.saved;

            println!("✅ Images in: {}", saved.directory.display());
            println!(
                "   Downloaded: {}, already present: {}",
                saved.downloaded(),
                saved.successful.len() - saved.downloaded()
            );
            for outcome in &saved.successful {
                if let SaveOutcome::Saved { path, size } = outcome {
                    println!("   + {} ({} bytes)", path.display(), size);
                }
            }
            if !saved.failed.is_empty() {
                println!("   Failed images:");
                for (title, err) in &saved.failed {
                    println!("   - {}: {}", title, err);
                }
            }
            if let Some(pruned) = &summary.pruned {
                println!("   Deleted {} old images", pruned.deleted.len());
                for (path, err) in &pruned.failed {
                    println!("   - could not delete {}: {}", path.display(), err);
                }
            }
            debug!("Done.");
        }
    }

    Ok(())
}
