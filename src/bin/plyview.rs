//! plyview CLI - inspect an ASCII PLY mesh and optionally render it headless

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use plyview::prelude::*;
use plyview::gfx::resources::TextureResource;

#[derive(Parser)]
#[command(name = "plyview")]
#[command(about = "Inspect and render ASCII PLY meshes", long_about = None)]
struct Cli {
    /// Path to an ASCII PLY file
    file: PathBuf,

    /// Render one offscreen frame of the given size, e.g. 800x600
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    render: Option<(u32, u32)>,

    #[arg(long, value_enum, default_value_t = ModeArg::Solid)]
    mode: ModeArg,

    #[arg(long, value_enum, default_value_t = ShaderArg::Lit)]
    shader: ShaderArg,

    /// WGSL file defining vs_main/fs_main, used with --shader custom
    #[arg(long, value_name = "PATH")]
    custom_shader: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Solid,
    Wireframe,
    Points,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Solid => RenderMode::Solid,
            ModeArg::Wireframe => RenderMode::Wireframe,
            ModeArg::Points => RenderMode::Points,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShaderArg {
    Unlit,
    Lit,
    Custom,
}

impl From<ShaderArg> for ShaderType {
    fn from(shader: ShaderArg) -> Self {
        match shader {
            ShaderArg::Unlit => ShaderType::Unlit,
            ShaderArg::Lit => ShaderType::Lit,
            ShaderArg::Custom => ShaderType::Custom,
        }
    }
}

fn parse_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let height = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((width, height))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = RenderSettings::default()
        .with_render_mode(cli.mode.into())
        .with_shader_type(cli.shader.into());
    let mut engine = RenderEngine::new(settings);

    engine
        .load_mesh(&cli.file)
        .with_context(|| format!("Failed to load {}", cli.file.display()))?;
    engine.set_camera(Camera::default());
    engine.fit_camera_to_mesh();

    if let Some(path) = &cli.custom_shader {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read shader {}", path.display()))?;
        engine.set_custom_shader(&source)?;
    }

    print_summary(&engine);

    if let Some((width, height)) = cli.render {
        render_offscreen(&mut engine, width, height)?;
    }

    Ok(())
}

fn print_summary(engine: &RenderEngine) {
    let Some(mesh) = engine.mesh() else {
        return;
    };
    let bbox = mesh.bounding_box();
    let center = mesh.center();

    println!("Vertices:  {}", mesh.vertex_count());
    println!("Triangles: {}", mesh.triangle_count());
    println!("Edges:     {}", mesh.edge_index_count() / 2);
    println!(
        "Bounds:    [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}]",
        bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z
    );
    println!("Center:    [{:.4}, {:.4}, {:.4}]", center.x, center.y, center.z);
    println!("Radius:    {:.4}", mesh.bounding_radius());

    if let Some(camera) = engine.camera() {
        let eye = camera.position();
        println!(
            "Camera:    eye [{:.4}, {:.4}, {:.4}], distance {:.4}",
            eye.x,
            eye.y,
            eye.z,
            camera.distance()
        );
    }
}

fn render_offscreen(engine: &mut RenderEngine, width: u32, height: u32) -> Result<()> {
    let format = wgpu::TextureFormat::Rgba8Unorm;
    let context = GpuContext::new_headless(format).context("Failed to create a GPU device")?;
    let target = TextureResource::create_render_target(
        &context.device,
        width,
        height,
        format,
        "Offscreen Target",
    );

    engine.initialize(context);
    engine.resize(width, height);

    match engine.render_frame(&target.texture)? {
        FrameOutcome::Drawn { mode, call } => {
            println!("Rendered:  {}x{} with {} program, {:?}", width, height, mode.label(), call);
        }
        FrameOutcome::Cleared => println!("Rendered:  {}x{}, nothing to draw", width, height),
        FrameOutcome::Uninitialized => bail!("GPU context was not attached"),
    }

    let metrics = engine.performance().get_metrics();
    println!("Frame:     {:.2} ms", metrics.frame_time_ms);
    Ok(())
}
