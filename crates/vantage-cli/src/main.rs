use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vantage_core::{RenderedFrame, VantageConfig};
use vantage_render::{
    AnimatedImage, ChannelSink, FrameEvent, ImagePyramid, RenderTarget, ViewportRenderer,
};

const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(
    name = "vantage",
    version,
    about = "Vantage: background viewport renderer",
    long_about = "Drive the Vantage viewport renderer headlessly: load an image, let the render\nthread produce frames and write them out as PNG files."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames from an image or GIF and save them as PNG
    Preview {
        /// Image to display (.gif files are played as animations)
        #[arg()]
        file: PathBuf,

        /// Maximum number of detail levels to build for still images
        #[arg(long, default_value_t = 4)]
        levels: u32,

        /// Initial quality level (0 = best); overrides the config file
        #[arg(short, long)]
        quality: Option<u32>,

        /// Frames-per-second cap (0 = unbounded); overrides the config file
        #[arg(long)]
        fps: Option<u32>,

        /// Number of frames to collect
        #[arg(short = 'n', long, default_value_t = 1)]
        frames: usize,

        /// Directory the frames are written to
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Path to a vantage.toml configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the detail levels an image would be displayed at
    Info {
        #[arg()]
        file: PathBuf,

        /// Maximum number of detail levels
        #[arg(long, default_value_t = 4)]
        levels: u32,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination path
        #[arg(default_value = "vantage.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Preview {
            file,
            levels,
            quality,
            fps,
            frames,
            output,
            config,
        } => cmd_preview(&file, levels, quality, fps, frames, &output, config.as_deref()),
        Commands::Info { file, levels } => cmd_info(&file, levels),
        Commands::InitConfig { path } => cmd_init_config(&path),
    }
}

fn is_gif(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gif"))
        .unwrap_or(false)
}

fn cmd_preview(
    file: &Path,
    levels: u32,
    quality: Option<u32>,
    fps: Option<u32>,
    frames: usize,
    output: &Path,
    config: Option<&Path>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => VantageConfig::load_from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => VantageConfig::default(),
    };
    if let Some(q) = quality {
        config.renderer.quality_level = q;
    }
    if let Some(f) = fps {
        config.renderer.max_frames_per_second = f;
    }

    let (target, level_count) = if is_gif(file) {
        let anim = AnimatedImage::open_gif(file)?;
        tracing::info!("Loaded {} animation frames from {}", anim.frame_count(), file.display());
        (RenderTarget::single_resolution(anim), None)
    } else {
        let pyramid = ImagePyramid::open(file, levels)?;
        let count = pyramid.level_count();
        tracing::info!("Built {} detail levels for {}", count, file.display());
        (RenderTarget::multi_resolution(pyramid), Some(count))
    };

    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;

    let renderer = ViewportRenderer::with_config(&config.renderer);
    let (sink, rx) = ChannelSink::new();
    renderer.subscribe(sink);
    renderer.set_render_target(target)?;
    renderer.start()?;

    let mut quality = config.renderer.quality_level;
    let mut written = 0;
    while written < frames {
        let frame = match rx.recv_timeout(FRAME_TIMEOUT) {
            Ok(FrameEvent::Frame(frame)) => frame,
            Ok(FrameEvent::Failed(msg)) => anyhow::bail!("frame production failed: {}", msg),
            Err(_) => anyhow::bail!("no frame received within {:?}", FRAME_TIMEOUT),
        };
        let path = write_frame(output, &frame)?;
        println!(
            "   ✓ frame {} {}x{} detail {} in {}ms -> {}",
            frame.sequence,
            frame.width(),
            frame.height(),
            frame
                .detail_level
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            frame.frame_delta_millis(),
            path.display()
        );
        written += 1;

        // Still images only produce a new frame when asked for another level.
        if let Some(count) = level_count {
            if written < frames {
                quality = (quality + 1) % count;
                renderer.set_requested_quality_level(quality);
            }
        }
    }

    renderer.stop()?;
    println!("Wrote {} frame(s) to {}", written, output.display());
    Ok(())
}

fn write_frame(output: &Path, frame: &RenderedFrame) -> Result<PathBuf> {
    let name = match frame.detail_level {
        Some(level) => format!("frame_{:04}_detail{}.png", frame.sequence, level),
        None => format!("frame_{:04}.png", frame.sequence),
    };
    let path = output.join(name);
    image::save_buffer(
        &path,
        &frame.buffer.data,
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn cmd_info(file: &Path, levels: u32) -> Result<()> {
    if is_gif(file) {
        let anim = AnimatedImage::open_gif(file)?;
        println!("{}", file.display());
        println!("   Kind:    animation (dynamic)");
        println!("   Frames:  {}", anim.frame_count());
        return Ok(());
    }

    let pyramid = ImagePyramid::open(file, levels)?;
    println!("{}", file.display());
    println!("   Kind:    still image (static)");
    for level in 0..pyramid.level_count() {
        if let Some((w, h)) = pyramid.level_dimensions(level) {
            println!("   Detail {}: {}x{}", level, w, h);
        }
    }
    Ok(())
}

fn cmd_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    VantageConfig::default()
        .save_to_file(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
