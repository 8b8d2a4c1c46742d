use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use image::RgbaImage;

use crate::camera::Camera;
use crate::config::RenderJobSpec;
use crate::gpu::post_processor::PostProcessor;
use crate::gpu::GpuContext;
use crate::input::FilterKey;
use crate::maps::{generate_map, load_map};
use crate::passes::{AreaEffect, FramePass, FrameSequencer};
use crate::post_processing::{EffectCatalog, PostProcessKind};
use crate::render_job::{RenderError, RenderMetadata, RenderProgress};
use crate::scene::DemoScene;
use crate::shading::PostProcessMap;
use crate::state::PostProcessState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the demo scene through the post-process pipeline to PNG frames
    Render {
        /// JSON render job; defaults are used for anything it omits
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for frames and metadata.json
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of frames to simulate
        #[arg(long)]
        frames: Option<usize>,

        /// Frames per second
        #[arg(long)]
        fps: Option<f32>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Initial full-screen post-process (e.g. "Tint", "grey_noise", "PPBurn")
        #[arg(long)]
        filter: Option<String>,
    },

    /// List the post-processes and the keys that select them
    List,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config,
            out,
            frames,
            fps,
            width,
            height,
            filter,
        } => {
            let mut job = match config {
                Some(path) => RenderJobSpec::from_file(&path).map_err(anyhow::Error::msg)?,
                None => RenderJobSpec::default(),
            };
            if let Some(out) = out {
                job.output_dir = out;
            }
            if let Some(frames) = frames {
                job.frames = frames;
            }
            if let Some(fps) = fps {
                job.fps = fps;
            }
            if let Some(width) = width {
                job.width = width;
            }
            if let Some(height) = height {
                job.height = height;
            }
            if let Some(filter) = filter {
                job.filter = filter;
            }
            if let Err(e) = job.validate() {
                bail!("Invalid render job: {}", e);
            }
            pollster::block_on(render_offline(job))?;
        }
        Commands::List => list_post_processes(),
    }
    Ok(())
}

fn list_post_processes() {
    for kind in PostProcessKind::ALL {
        let map = kind.map().map(|m| m.file_name()).unwrap_or("-");
        println!(
            "{}  {:<14} {:<16} {}",
            FilterKey::for_kind(kind).digit(),
            kind.label(),
            kind.technique_name(),
            map
        );
    }
}

/// Read the maps from the media folder, or generate them.
fn load_maps(job: &RenderJobSpec) -> Result<Vec<(PostProcessMap, RgbaImage)>, RenderError> {
    PostProcessMap::ALL
        .iter()
        .map(|&map| {
            let image = match &job.media_dir {
                Some(dir) => load_map(dir, map)?,
                None => generate_map(map, job.seed),
            };
            Ok((map, image))
        })
        .collect()
}

async fn render_offline(job: RenderJobSpec) -> Result<()> {
    let started_at = Utc::now();
    let start = Instant::now();

    std::fs::create_dir_all(&job.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", job.output_dir))?;

    let gpu = GpuContext::new_headless().await?;
    let gpu_adapter = gpu.adapter_name.clone();

    let maps = load_maps(&job)?;
    let mut backend = PostProcessor::new(gpu.device, gpu.queue, job.width, job.height, &maps)?;
    let catalog = EffectCatalog::resolve(&backend)?;
    let areas = job
        .area_effects
        .iter()
        .map(AreaEffect::from_config)
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("Scene texture {}x{}, {} area effect(s)", job.width, job.height, areas.len());

    let mut sequencer =
        FrameSequencer::new(catalog, backend.create_capture(), job.ambient_colour).with_areas(areas);
    let mut scene = DemoScene::new();
    let mut camera = Camera::from_config(&job.camera);
    camera.set_aspect(job.width as f32 / job.height as f32);

    let filter = job.filter_kind().map_err(anyhow::Error::msg)?;
    let mut state = PostProcessState::new(filter, job.seed);
    state.pointer = glam::Vec2::from(job.pointer);

    let dt = job.frame_duration();
    let progress_interval = (job.fps.round() as usize).max(1);
    let mut frames_saved = 0;
    let mut warnings = Vec::new();

    log::info!("Rendering {} frames to {:?}", job.frames, job.output_dir);

    for frame in 0..job.frames {
        for activation in job.activations.iter().filter(|a| a.frame == frame) {
            if let Some(pointer) = activation.pointer {
                state.pointer = glam::Vec2::from(pointer);
            }
            if let Some(key) = FilterKey::new(activation.key) {
                state.press_key(key);
            }
        }

        state.update(dt, &mut scene);

        let save = job.should_save(frame);
        if save {
            backend.request_frame(job.output_dir.join(format!("frame_{:05}.png", frame)));
        }

        let report = sequencer.render_frame(&mut backend, &mut state, &scene, &camera);
        for (pass, reason) in &report.skipped {
            warnings.push(format!("Frame {}: {} skipped: {}", frame, pass, reason));
        }
        if save && report.ran(FramePass::Present) {
            frames_saved += 1;
        }

        if (frame + 1) % progress_interval == 0 || frame + 1 == job.frames {
            let progress = RenderProgress::new(frame + 1, job.frames, start.elapsed().as_secs_f64());
            log::info!(
                "Frame {}/{} ({:.0}%), ETA {:.1}s",
                progress.current_frame,
                progress.total_frames,
                progress.percentage(),
                progress.eta_secs.unwrap_or(0.0)
            );
        }
    }

    let render_duration_secs = start.elapsed().as_secs_f64();
    let metadata = RenderMetadata {
        config_hash: RenderMetadata::hash_job(&job)?,
        job: job.clone(),
        started_at,
        completed_at: Utc::now(),
        render_duration_secs,
        frame_count: job.frames,
        frames_saved,
        average_render_fps: if render_duration_secs > 0.0 {
            job.frames as f64 / render_duration_secs
        } else {
            0.0
        },
        postfx_version: env!("CARGO_PKG_VERSION").to_string(),
        gpu_adapter,
        warnings,
    };
    metadata.save(&job.output_dir.join("metadata.json"))?;

    if !metadata.warnings.is_empty() {
        log::warn!("{} pass(es) skipped, see metadata.json", metadata.warnings.len());
    }
    log::info!(
        "Done: {} frames saved in {:.1}s",
        metadata.frames_saved,
        metadata.render_duration_secs
    );
    Ok(())
}
