use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use outfit_compositor::{
    HttpResponse, InMemoryCatalog, OutfitId, OutfitSize, Query, RenderService, ServiceOpts,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "outfit-render", version)]
struct Cli {
    /// Service configuration JSON. Defaults apply for anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the animation worker pool size.
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite an explicit list of layer URLs.
    Render(RenderArgs),
    /// Render a saved outfit from a catalog.
    Outfit(OutfitArgs),
    /// Print an outfit's visible layers, in draw order, as JSON.
    Layers(LayersArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Comma-separated layer URLs, bottom to top.
    #[arg(long)]
    layer_urls: String,

    /// Output size: 150, 300 or 600.
    #[arg(long, default_value_t = 600)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct OutfitArgs {
    /// Catalog JSON with outfits and appearances.
    #[arg(long)]
    catalog: PathBuf,

    /// Outfit id.
    #[arg(long)]
    id: u64,

    /// Output size: 150, 300 or 600.
    #[arg(long, default_value_t = 600)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct LayersArgs {
    /// Catalog JSON with outfits and appearances.
    #[arg(long)]
    catalog: PathBuf,

    /// Outfit id.
    #[arg(long)]
    id: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = load_opts(cli.config.as_deref(), cli.max_workers)?;
    match cli.cmd {
        Command::Render(args) => cmd_render(&opts, args),
        Command::Outfit(args) => cmd_outfit(&opts, args),
        Command::Layers(args) => cmd_layers(&opts, args),
    }
}

fn load_opts(path: Option<&Path>, max_workers: Option<usize>) -> anyhow::Result<ServiceOpts> {
    let mut opts = match path {
        Some(p) => ServiceOpts::from_path(p)?,
        None => ServiceOpts::default(),
    };
    if let Some(n) = max_workers {
        opts.pool.max_workers = n;
    }
    Ok(opts)
}

fn cmd_render(opts: &ServiceOpts, args: RenderArgs) -> anyhow::Result<()> {
    let size = OutfitSize::from_px(args.size)?;
    let service = RenderService::new(opts, Arc::new(InMemoryCatalog::new()))?;
    let size = size.to_string();
    let resp = service.outfit_image(&Query::from_pairs([
        ("layerUrls", args.layer_urls.as_str()),
        ("size", size.as_str()),
    ]));
    write_png(&resp, &args.out)
}

fn cmd_outfit(opts: &ServiceOpts, args: OutfitArgs) -> anyhow::Result<()> {
    let size = OutfitSize::from_px(args.size)?;
    let catalog = InMemoryCatalog::from_path(&args.catalog)?;
    let service = RenderService::new(opts, Arc::new(catalog))?;

    let id = OutfitId(args.id).to_string();
    let size = size.to_string();
    let mut query = vec![("id", id.as_str()), ("size", size.as_str())];

    // Follow the redirect to the current version, as a browser would.
    let resp = service.outfit_image_by_id(&Query::from_pairs(query.iter().copied()));
    let updated_at = resp
        .header(reqwest::header::LOCATION)
        .and_then(|loc| loc.split_once('?'))
        .map(|(_, q)| Query::parse(q))
        .and_then(|q| q.get("updatedAt").map(str::to_string));
    let resp = match &updated_at {
        Some(at) => {
            query.push(("updatedAt", at.as_str()));
            service.outfit_image_by_id(&Query::from_pairs(query))
        }
        None => resp,
    };
    write_png(&resp, &args.out)
}

fn cmd_layers(opts: &ServiceOpts, args: LayersArgs) -> anyhow::Result<()> {
    let catalog = InMemoryCatalog::from_path(&args.catalog)?;
    let service = RenderService::new(opts, Arc::new(catalog))?;
    let layers = service.visible_layers(OutfitId(args.id))?;
    let json = serde_json::to_string_pretty(&layers).context("serialize layers")?;
    println!("{json}");
    Ok(())
}

fn write_png(resp: &HttpResponse, out: &Path) -> anyhow::Result<()> {
    let is_png = resp.header(reqwest::header::CONTENT_TYPE) == Some("image/png");
    if !is_png {
        anyhow::bail!(
            "render failed ({}): {}",
            resp.status,
            String::from_utf8_lossy(&resp.body)
        );
    }
    if !resp.status.is_success() {
        tracing::warn!(status = %resp.status, "some layers failed; writing partial image");
    }

    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, &resp.body).with_context(|| format!("write png '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
