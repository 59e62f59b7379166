//! Preset lookup CLI commands.

use clap::Subcommand;
use console::style;
use osmtagger::app::AppConfig;
use osmtagger::config::ConfigFile;
use osmtagger::preset::{CatalogLoader, ExpansionWarning, FieldElement, PresetCatalog};

use super::common::{format_tags, parse_tags, KindArg};
use crate::error::CliError;

/// Preset subcommands.
#[derive(Debug, Subcommand)]
pub enum PresetCommands {
    /// Find presets matching a set of tags
    Resolve {
        /// Tags as key=value
        #[arg(required = true)]
        tags: Vec<String>,

        /// Only presets usable for this kind of feature
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Show the fields of a preset
    Show {
        /// Preset name, e.g. "Cafe"
        name: String,
    },
}

/// Run a presets subcommand.
pub fn run(command: PresetCommands) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let catalog = load_catalog(&config);

    match command {
        PresetCommands::Resolve { tags, kind } => run_resolve(&catalog, &tags, kind),
        PresetCommands::Show { name } => run_show(&catalog, &name),
    }
}

fn load_catalog(config: &ConfigFile) -> PresetCatalog {
    let paths = AppConfig::from_config_file(config).presets;
    let catalog = CatalogLoader::load(&paths);

    for error in &catalog.report().errors {
        eprintln!("{} {}", style("warning:").yellow(), error);
    }
    catalog
}

fn run_resolve(
    catalog: &PresetCatalog,
    pairs: &[String],
    kind: Option<KindArg>,
) -> Result<(), CliError> {
    let tags = parse_tags(pairs)?;
    let paths = match kind {
        Some(kind) => catalog.items_for_kind(&tags, kind.into()),
        None => catalog.resolve_paths_for_tags(&tags),
    };

    if paths.is_empty() {
        println!("No preset matches {}", format_tags(&tags));
        return Ok(());
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

fn run_show(catalog: &PresetCatalog, name: &str) -> Result<(), CliError> {
    let (path, item) = catalog
        .resolve_item_by_name(name)
        .ok_or_else(|| CliError::Input(format!("No preset named '{}'", name)))?;

    println!("{}", style(&path).bold());
    let kinds: Vec<&str> = item.kinds.iter().map(|k| k.as_str()).collect();
    println!("  types: {}", kinds.join(", "));
    let defining = item.defining_tags();
    if !defining.is_empty() {
        println!("  tags:  {}", format_tags(&defining));
    }
    println!();

    let expansion = catalog.expand_elements(&item.elements);
    for element in &expansion.elements {
        println!("  {}", describe(element));
    }
    for warning in &expansion.warnings {
        let message = match warning {
            ExpansionWarning::Cycle { chunk, stack } => {
                format!("chunk '{}' includes itself via {}", chunk, stack.join(" > "))
            }
            ExpansionWarning::DepthLimit { chunk } => {
                format!("chunk '{}' is nested too deeply", chunk)
            }
        };
        eprintln!("{} {}", style("warning:").yellow(), message);
    }
    Ok(())
}

fn describe(element: &FieldElement) -> String {
    match element {
        FieldElement::Key { key, value } => format!("key       {}={}", key, value),
        FieldElement::Text { key, label } => format!("text      {} ({})", key, label),
        FieldElement::Combo {
            key,
            values,
            default,
        } => match default {
            Some(default) => format!("combo     {} [{}] default {}", key, values.join(", "), default),
            None => format!("combo     {} [{}]", key, values.join(", ")),
        },
        FieldElement::Check { key, label, .. } => match label {
            Some(label) => format!("check     {} ({})", key, label),
            None => format!("check     {}", key),
        },
        FieldElement::MultiSelect { key, values, label } => {
            format!("multi     {} ({}) [{}]", key, label, values.join(", "))
        }
        FieldElement::Link { wiki } => format!("wiki      {}", wiki),
        FieldElement::Label { text } => format!("label     {}", text),
        FieldElement::ChunkRef { id } => format!("chunk     {}", id),
        FieldElement::PresetLink { preset_name } => format!("see also  {}", preset_name),
        FieldElement::LinkDivider => "----".to_string(),
    }
}
