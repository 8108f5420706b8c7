use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meshbvh::{
    Bvh, Camera, DEFAULT_MAX_PRIMITIVE, Mesh,
    geometry::{ScreenSize, WorldVector},
    preview::{PreviewSettings, render_preview},
};

#[derive(Parser)]
#[command(name = "meshbvh")]
#[command(about = "Builds bounding volume hierarchies over triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the hierarchy and write it out as little-endian binary files
    Export {
        #[command(flatten)]
        build: BuildArgs,
        /// Output path prefix, suffixes like `.node.bin` are appended to it
        output_prefix: PathBuf,
    },
    /// Print statistics of the hierarchy
    Info {
        #[command(flatten)]
        build: BuildArgs,
        /// Also print every node
        #[arg(long)]
        tree: bool,
    },
    /// Build the hierarchy and verify its structure
    Check {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Render a normal-shaded preview image
    Render {
        #[command(flatten)]
        build: BuildArgs,
        /// Output PNG file
        output: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
        #[arg(long)]
        no_shadows: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Input mesh (.obj or .ply)
    input: PathBuf,
    /// Maximum number of triangles in a leaf
    #[arg(long, default_value_t = DEFAULT_MAX_PRIMITIVE, value_parser = clap::value_parser!(u8).range(1..))]
    max_primitive: u8,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            build,
            output_prefix,
        } => export(&build, &output_prefix),
        Command::Info { build, tree } => show_info(&build, tree),
        Command::Check { build } => check(&build),
        Command::Render {
            build,
            output,
            width,
            height,
            no_shadows,
        } => render(&build, &output, ScreenSize::new(width, height), !no_shadows),
    }
}

fn load_mesh(path: &Path) -> anyhow::Result<Mesh> {
    let mesh = Mesh::load(path).with_context(|| format!("Loading {}", path.display()))?;
    info!(
        vertices = mesh.vertices.len(),
        triangles = mesh.triangle_count(),
        "Loaded {}",
        path.display()
    );
    Ok(mesh)
}

fn build<'a>(mesh: &'a Mesh, args: &BuildArgs) -> anyhow::Result<Bvh<'a>> {
    Bvh::create(&mesh.vertices, &mesh.indices, args.max_primitive)
        .with_context(|| format!("Building hierarchy for {}", args.input.display()))
}

fn export(args: &BuildArgs, output_prefix: &Path) -> anyhow::Result<()> {
    let mesh = load_mesh(&args.input)?;
    let bvh = build(&mesh, args)?;
    let files = bvh
        .export(output_prefix)
        .with_context(|| format!("Exporting to {}", output_prefix.display()))?;

    info!(nodes = bvh.nodes().len(), "Wrote {}", files.nodes.display());
    Ok(())
}

fn show_info(args: &BuildArgs, tree: bool) -> anyhow::Result<()> {
    let mesh = load_mesh(&args.input)?;
    let bvh = build(&mesh, args)?;

    println!("{}", bvh.statistics());
    let bbox = bvh.bounding_box();
    println!("Bounds: {:?} - {:?}", bbox.min.coords.as_slice(), bbox.max.coords.as_slice());

    if tree {
        bvh.print_tree();
    }
    Ok(())
}

fn check(args: &BuildArgs) -> anyhow::Result<()> {
    let mesh = load_mesh(&args.input)?;
    let bvh = build(&mesh, args)?;

    if let Err(e) = bvh.validate() {
        bail!("{} failed validation: {e}", args.input.display());
    }
    info!(nodes = bvh.nodes().len(), "Hierarchy is valid");
    Ok(())
}

fn render(args: &BuildArgs, output: &Path, resolution: ScreenSize, shadows: bool) -> anyhow::Result<()> {
    let mesh = load_mesh(&args.input)?;
    let bvh = build(&mesh, args)?;

    // Look at the whole mesh from the (1, 1, 1) direction
    let bbox = bvh.bounding_box();
    let y_fov = 39.0f32.to_radians();
    let radius = (bbox.size().norm() / 2.0).max(1e-3);
    let distance = 1.1 * radius / (y_fov / 2.0).sin();
    let camera = Camera::builder()
        .eye(bbox.center() + WorldVector::new(1.0, 1.0, 1.0).normalize() * distance)
        .look_at(bbox.center())
        .y_fov(y_fov)
        .resolution(resolution)
        .build()
        .context("Setting up camera")?;

    let settings = PreviewSettings {
        shadows,
        ..PreviewSettings::default()
    };

    let bar = ProgressBar::new(resolution.y as u64);
    let image = render_preview(&bvh, &camera, &settings, |_| bar.inc(1));
    bar.finish();

    image
        .save(output)
        .with_context(|| format!("Saving {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}
