//! roadlens command-line front-end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use roadlens::canvas::Canvas;
use roadlens::client::BackendClient;
use roadlens::config::AppConfig;
use roadlens::model::{Geometry, IpTarget, MetricKind, Mode, Pen};
use roadlens::panel::ProcessingPanel;
use roadlens::session::{DrawingSession, parse_script};
use roadlens::shell::{Route, Shell};
use roadlens::stream::{ResultState, consume};

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate road snapshots and follow analytics results")]
struct Cli {
    /// Backend base URL, overriding the configured one
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video and print where its snapshot and copy are served
    Upload { file: PathBuf },

    /// Fetch an IP camera snapshot and start its stream
    Connect {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: String,
        /// Mode to open once connected
        #[arg(long, default_value = "count_ip")]
        mode: Mode,
        /// Write the fetched snapshot here
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },

    /// Replay a pointer-gesture script on a snapshot
    Annotate {
        mode: Mode,
        /// Snapshot file path or URL
        #[arg(long)]
        snapshot: String,
        /// JSON array of input events
        #[arg(long)]
        gestures: PathBuf,
        /// Rendered canvas
        #[arg(long, default_value = "annotated.png")]
        out: PathBuf,
        /// Geometry JSON; printed to stdout when omitted
        #[arg(long)]
        geometry_out: Option<PathBuf>,
        /// Line color for counting lines
        #[arg(long)]
        color: Option<String>,
        /// Line width for counting lines (1-20)
        #[arg(long)]
        size: Option<u32>,
    },

    /// Post geometry for a route such as /video/count and follow the results
    Process {
        route: String,
        #[arg(long)]
        geometry: PathBuf,
        /// Write the latest result frame (JPEG) here
        #[arg(long)]
        frame_out: Option<PathBuf>,
    },

    /// Live line counting on an IP camera
    Live {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: String,
        #[arg(long)]
        geometry: PathBuf,
        #[arg(long)]
        frame_out: Option<PathBuf>,
    },

    /// List the processing modes with their routes and endpoints
    Modes,

    /// Print the effective configuration, or save it
    Config {
        /// Save to the config file instead of printing
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(backend) = &cli.backend {
        config.backend.base_url = backend.clone();
    }

    let mut level = config.preferences.log_level;
    for _ in 0..cli.verbose {
        level = level.more_verbose();
    }
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();
    log::debug!("Log level: {}", level.name());

    let client = BackendClient::from_config(&config.backend)?;

    match cli.command {
        Command::Upload { file } => {
            let mut shell = Shell::new(client);
            let outcome = shell.upload(&file).await?;
            println!("Video uploaded successfully!");
            println!("snapshot: {}", outcome.snapshot_url);
            println!("video:    {}", outcome.video_url);
        }
        Command::Connect {
            ip,
            port,
            mode,
            snapshot_out,
        } => {
            if !mode.is_ip() {
                bail!("Mode '{}' does not use an IP camera", mode);
            }
            let mut shell = Shell::new(client);
            let outcome = shell.connect(IpTarget::new(ip, port), mode).await;
            println!("{}", outcome.feed_status());

            if let (Some(path), Some(bytes)) = (snapshot_out, shell.ip_snapshot()) {
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("snapshot written to {}", path.display());
            }
            outcome.into_result()?;
            println!("open {}", shell.route().path());
        }
        Command::Annotate {
            mode,
            snapshot,
            gestures,
            out,
            geometry_out,
            color,
            size,
        } => {
            let bytes = if snapshot.starts_with("http://") || snapshot.starts_with("https://") {
                client.fetch_bytes(&snapshot).await?
            } else {
                std::fs::read(&snapshot).with_context(|| format!("Failed to read {snapshot}"))?
            };
            let script = std::fs::read_to_string(&gestures)
                .with_context(|| format!("Failed to read {:?}", gestures))?;
            let events = parse_script(&script).context("Invalid gesture script")?;

            let preferences = &config.preferences;
            let pen = Pen::new(
                color.unwrap_or_else(|| preferences.pen_color.clone()),
                size.unwrap_or(preferences.pen_size),
            );

            let mut canvas = Canvas::from_bytes(&bytes)?;
            if let Some(font_path) = &preferences.badge_font {
                canvas = canvas.with_font(Canvas::load_font(font_path)?);
            }
            let mut session = DrawingSession::new(mode.canvas_kind());
            session.set_pen(pen);

            for event in &events {
                canvas.dispatch(&mut session, event);
            }
            canvas.redraw(&session);
            canvas.save(&out)?;

            let json = session.geometry().to_json()?;
            match geometry_out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("geometry written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Process {
            route,
            geometry,
            frame_out,
        } => {
            let Route::Video { mode, target } = Route::parse(&route)? else {
                bail!("'{}' is not a processing route", route);
            };
            let geometry = read_geometry(&geometry, mode)?;

            let mut panel = ProcessingPanel::new(mode, target);
            println!("{}", panel.title());
            if let Some(reason) = panel.unavailable_reason() {
                bail!("{}", reason);
            }

            let result = panel
                .process(&client, &geometry, print_update)
                .await
                .map(|_| ());
            write_frame(panel.state(), frame_out.as_deref())?;
            result?;
        }
        Command::Live {
            ip,
            port,
            geometry,
            frame_out,
        } => {
            let target = IpTarget::new(ip, port);
            let geometry = read_geometry(&geometry, Mode::CountIp)?;
            let lines = geometry.lines().unwrap_or_default();

            let response = client.process_stream(&target, lines).await?;
            let state = consume(response.bytes_stream(), MetricKind::Counts, print_update).await?;
            write_frame(&state, frame_out.as_deref())?;
        }
        Command::Modes => {
            for mode in Mode::all() {
                println!(
                    "{:<20} /video/{:<16} {}",
                    mode.name(),
                    mode.slug(),
                    mode.endpoint().unwrap_or("-")
                );
            }
        }
        Command::Config { write } => {
            if write {
                let path = match &cli.config {
                    Some(path) => {
                        config.save(path)?;
                        path.clone()
                    }
                    None => config.save_to_default_path()?,
                };
                println!("configuration saved to {}", path.display());
            } else {
                println!("{}", config.to_json()?);
            }
        }
    }

    Ok(())
}

fn read_geometry(path: &Path, mode: Mode) -> Result<Geometry> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Geometry::from_json(mode.canvas_kind(), &json)
        .with_context(|| format!("{:?} is not {} geometry", path, mode))
}

fn print_update(state: &ResultState) {
    let summary = state.metrics().summary_lines();
    if summary.is_empty() {
        println!("[{}] frame", state.updates());
    } else {
        println!("[{}] {}", state.updates(), summary.join(" | "));
    }
}

fn write_frame(state: &ResultState, path: Option<&Path>) -> Result<()> {
    let (Some(path), Some(frame)) = (path, state.frame_bytes()) else {
        return Ok(());
    };
    let bytes = frame.context("Result frame is not valid base64")?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Latest frame written to {:?}", path);
    Ok(())
}
