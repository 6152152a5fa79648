use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use weight_map::loader::{config_architectures, read_model_config, read_name_list};
use weight_map::{
    build_mapping_with, builtin, resolve_layer_count, Descriptor, DescriptorCatalog, LogObserver,
    MappingError, NoopObserver, ResolutionObserver,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprint!("{}", report(&err));
        std::process::exit(1);
    }
}

/// Failure text for stderr; unresolved weights are listed one per line.
fn report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<MappingError>() {
        Some(MappingError::Unresolved(missing)) => {
            let mut out = format!("{} weight(s) could not be resolved:\n", missing.len());
            for item in missing {
                out.push_str(&format!("  {item}\n"));
            }
            out
        }
        _ => format!("resolve-weights failed: {err:#}\n"),
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Map descriptor weight names onto a source checkpoint",
    long_about = None
)]
struct Args {
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = ["builtin", "descriptor_dir"],
        help = "Descriptor file (.json or .toml)"
    )]
    descriptor: Option<PathBuf>,

    #[arg(
        long,
        value_name = "NAME",
        conflicts_with = "descriptor_dir",
        help = "Use a descriptor bundled with the tool"
    )]
    builtin: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Pick a descriptor from this directory by the model's architectures"
    )]
    descriptor_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Model config.json supplying the layer count and architectures"
    )]
    model_config: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Layer count; overrides the model config")]
    num_layers: Option<usize>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Source tensor names: one per line, a JSON list, or a *.index.json"
    )]
    names: PathBuf,

    #[arg(long, help = "Print the mapping as JSON")]
    json: bool,

    #[arg(long, help = "Warn about checkpoints carrying several names for one weight")]
    warn_redundant: bool,
}

fn run() -> Result<()> {
    let args = Args::parse();

    let model_config = args
        .model_config
        .as_ref()
        .map(|path| {
            read_model_config(path)
                .with_context(|| format!("failed to read model config {}", path.display()))
        })
        .transpose()?;

    let descriptor = select_descriptor(&args, model_config.as_ref())?;

    let num_layers = match (args.num_layers, model_config.as_ref()) {
        (Some(count), _) => count,
        (None, Some(config)) => resolve_layer_count(config, descriptor.num_layers_source())?,
        (None, None) => bail!(
            "layer count unknown: pass --num-layers or --model-config (key '{}')",
            descriptor.num_layers_source()
        ),
    };

    let available = read_name_list(&args.names)
        .with_context(|| format!("failed to read names from {}", args.names.display()))?;
    log::info!(
        "resolving '{}' with {} layer(s) against {} source name(s)",
        descriptor.model_type,
        num_layers,
        available.len()
    );

    let mut log_observer = LogObserver;
    let mut noop = NoopObserver;
    let observer: &mut dyn ResolutionObserver = if args.warn_redundant {
        &mut log_observer
    } else {
        &mut noop
    };
    let mapping = build_mapping_with(&descriptor, num_layers, &available, observer)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
    } else {
        for weight in &mapping {
            let marker = if weight.is_embed { " [embed]" } else { "" };
            println!("{} -> {}{}", weight.target, weight.source, marker);
        }
        for skipped in mapping.skipped_optional() {
            println!("{skipped} -> (optional, absent)");
        }
    }

    Ok(())
}

fn select_descriptor(args: &Args, model_config: Option<&serde_json::Value>) -> Result<Descriptor> {
    if let Some(path) = &args.descriptor {
        return Ok(Descriptor::from_path(path)?);
    }
    if let Some(name) = &args.builtin {
        return Ok(builtin::descriptor(name)?);
    }

    let architectures = model_config
        .map(config_architectures)
        .unwrap_or_default();
    if architectures.is_empty() {
        bail!("no descriptor given and the model config lists no architectures");
    }

    let catalog = match &args.descriptor_dir {
        Some(dir) => DescriptorCatalog::load_dir(dir)?,
        None => DescriptorCatalog::builtin()?,
    };
    catalog
        .find(&architectures)
        .cloned()
        .ok_or_else(|| anyhow!("no descriptor supports {}", architectures.join(", ")))
}
