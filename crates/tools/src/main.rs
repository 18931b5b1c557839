use std::fs;
use std::path::{Path, PathBuf};

use catalog::{
    Catalog, CatalogEntry, CatalogGroup, CatalogMember, CatalogStore, CorsProxy, DataItem,
    InMemoryCatalogStore, InMemoryEngine, ItemKind, Metadata, ProxyConfig, USER_ADDED_GROUP,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use layers::{Layer, SceneSink, TableLayer, TableStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablemap", about = "Render geo-located tables as CZML markers and legends")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a CSV table into a CZML document of colored markers.
    Czml {
        #[command(flatten)]
        table: TableArgs,
        /// Lead time as a percentage of the data's time range.
        #[arg(long)]
        lead_pct: Option<f64>,
        /// Trail time as a percentage of the data's time range.
        #[arg(long)]
        trail_pct: Option<f64>,
        /// Lead time in minutes; wins over --lead-pct.
        #[arg(long)]
        lead_min: Option<f64>,
        /// Trail time in minutes; wins over --trail-pct.
        #[arg(long)]
        trail_min: Option<f64>,
        /// Write here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Draw the color-bar legend of a CSV table as PNG.
    Legend {
        #[command(flatten)]
        table: TableArgs,
        #[arg(long)]
        output: PathBuf,
    },
    /// List the items of a catalog file and enable them on an in-memory engine.
    Catalog {
        input: PathBuf,
        /// Proxy settings (`proxyDomains`, `corsDomains`, `alwaysUseProxy`).
        #[arg(long)]
        proxy: Option<PathBuf>,
        /// Names of items to enable.
        #[arg(long)]
        enable: Vec<String>,
        /// CSV tables to load into the engine as CZML documents.
        #[arg(long)]
        table: Vec<PathBuf>,
        #[command(flatten)]
        user: UserDataArgs,
    },
}

/// Items the user adds by web link, kept in a JSON store file between runs.
#[derive(Args)]
struct UserDataArgs {
    /// JSON file holding user-added items.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Web link to a data file or WMS/WFS service to add.
    #[arg(long)]
    add: Vec<String>,
    /// What the links passed with --add point at.
    #[arg(long, value_enum, default_value_t = AddType::File)]
    add_type: AddType,
    /// Ids of user-added items to remove.
    #[arg(long)]
    remove: Vec<String>,
}

#[derive(Copy, Clone, ValueEnum)]
enum AddType {
    /// A CZML file.
    File,
    /// A WMS endpoint.
    Wms,
    /// A WFS endpoint.
    Wfs,
}

impl From<AddType> for ItemKind {
    fn from(value: AddType) -> Self {
        match value {
            AddType::File => ItemKind::Czml,
            AddType::Wms => ItemKind::Wms,
            AddType::Wfs => ItemKind::Wfs,
        }
    }
}

#[derive(Args)]
struct TableArgs {
    input: PathBuf,
    /// Variable column to map; defaults to the first one found.
    #[arg(long)]
    variable: Option<String>,
    /// JSON file with marker and gradient settings.
    #[arg(long)]
    style: Option<PathBuf>,
    /// Value that marks a missing measurement.
    #[arg(long)]
    no_data: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    match Cli::parse().command {
        Command::Czml {
            table,
            lead_pct,
            trail_pct,
            lead_min,
            trail_min,
            output,
        } => {
            let mut layer = load_table(&table)?;
            if let Some(pct) = lead_pct {
                layer.set_lead_time_by_percent(pct);
            }
            if let Some(pct) = trail_pct {
                layer.set_trail_time_by_percent(pct);
            }
            if let Some(minutes) = lead_min {
                layer.set_lead_minutes(minutes);
            }
            if let Some(minutes) = trail_min {
                layer.set_trail_minutes(minutes);
            }
            cmd_czml(&layer, output.as_deref())
        }
        Command::Legend { table, output } => {
            let layer = load_table(&table)?;
            let png = layer.legend_png().map_err(|e| e.to_string())?;
            fs::write(&output, png).map_err(|e| format!("write {output:?}: {e}"))?;
            eprintln!("wrote {}", output.display());
            Ok(())
        }
        Command::Catalog {
            input,
            proxy,
            enable,
            table,
            user,
        } => cmd_catalog(&input, proxy.as_deref(), &enable, &table, &user),
    }
}

fn load_table(args: &TableArgs) -> Result<TableLayer, String> {
    let mut style = match &args.style {
        Some(path) => {
            let payload = read_text(path)?;
            TableStyle::from_json_str(&payload).map_err(|e| format!("style {path:?}: {e}"))?
        }
        None => TableStyle::default(),
    };
    if args.no_data.is_some() {
        style.no_data = args.no_data;
    }

    let name = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let mut layer = TableLayer::new(1, name, style);
    let text = read_text(&args.input)?;
    layer
        .load_text(&text)
        .map_err(|e| format!("load {:?}: {e}", args.input))?;
    if let Some(variable) = &args.variable {
        layer.set_current_variable(variable).map_err(|e| e.to_string())?;
    }

    let data = layer.dataset();
    info!(
        rows = data.len(),
        variables = ?data.variables(),
        current = ?data.current_variable(),
        "table loaded"
    );
    if let Some(span) = data.time_range() {
        info!(range = %span.to_iso8601(), "time range");
    }
    Ok(layer)
}

fn cmd_czml(layer: &TableLayer, output: Option<&Path>) -> Result<(), String> {
    let packets = layer
        .czml_packets()
        .ok_or_else(|| "table is still loading".to_string())?;
    let payload = formats::czml::to_json_pretty(&packets).map_err(|e| e.to_string())?;
    match output {
        Some(path) => {
            fs::write(path, payload).map_err(|e| format!("write {path:?}: {e}"))?;
            eprintln!(
                "wrote {} ({} markers from layer {})",
                path.display(),
                packets.len().saturating_sub(1),
                layer.name()
            );
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn cmd_catalog(
    input: &Path,
    proxy: Option<&Path>,
    enable: &[String],
    tables: &[PathBuf],
    user: &UserDataArgs,
) -> Result<(), String> {
    let proxy = match proxy {
        Some(path) => {
            let config: ProxyConfig = serde_json::from_str(&read_text(path)?)
                .map_err(|e| format!("proxy config {path:?}: {e}"))?;
            CorsProxy::from(config)
        }
        None => CorsProxy::default(),
    };
    let mut catalog = Catalog::from_json_str(&read_text(input)?).map_err(|e| e.to_string())?;
    let store = update_user_store(user)?;
    if !store.snapshot().entries.is_empty() {
        let group = CatalogGroup::from_store(USER_ADDED_GROUP, &store).map_err(|e| e.to_string())?;
        catalog.members.push(CatalogMember::Group(group));
    }

    let mut engine = InMemoryEngine::new();
    for name in enable {
        catalog
            .item_mut(name)
            .map_err(|e| format!("{name}: {e}"))?
            .enable(&mut engine, &proxy)
            .map_err(|e| format!("{name}: {e}"))?;
    }

    for item in catalog.items() {
        let state = if item.is_enabled() { "enabled" } else { "-" };
        println!("{:<8} {:<28} {}", state, item.type_name(), item.name());
        match item.request_metadata(&proxy) {
            Metadata::Pending { url } => println!("         metadata: {url}"),
            Metadata::Unavailable {
                data_source_message, ..
            } => println!("         metadata: {data_source_message}"),
        }
    }

    for path in tables {
        let layer = load_table(&TableArgs {
            input: path.clone(),
            variable: None,
            style: None,
            no_data: None,
        })?;
        let sink: &mut dyn SceneSink = &mut engine;
        if !layer.push_to(sink) {
            warn!(table = %path.display(), "table not pushed: hidden or still loading");
        }
    }

    for (handle, layer) in engine.imagery_layers() {
        let picking = if layer.source.supports_feature_picking() {
            " pickable"
        } else {
            ""
        };
        println!(
            "imagery #{}: {} [{}]{picking}",
            handle.0, layer.source.url, layer.source.layers
        );
    }
    for (handle, (name, _)) in engine.data_sources() {
        println!("data source #{}: {name}", handle.0);
    }
    Ok(())
}

/// Loads the store file, applies `--remove` then `--add`, and writes the file back.
fn update_user_store(user: &UserDataArgs) -> Result<InMemoryCatalogStore, String> {
    let mut store = match &user.store {
        Some(path) if path.exists() => InMemoryCatalogStore::from_json_str(&read_text(path)?)
            .map_err(|e| format!("store {path:?}: {e}"))?,
        _ => InMemoryCatalogStore::new(),
    };
    let changes = apply_user_changes(&mut store, user, Utc::now().timestamp_millis().max(0) as u64)?;
    if changes > 0 {
        match &user.store {
            Some(path) => {
                let payload = store.to_json_pretty().map_err(|e| e.to_string())?;
                fs::write(path, payload).map_err(|e| format!("write {path:?}: {e}"))?;
                info!(store = %path.display(), changes, "user data saved");
            }
            None => warn!("no --store given; user-added items last for this run only"),
        }
    }
    Ok(store)
}

fn apply_user_changes(
    store: &mut dyn CatalogStore,
    user: &UserDataArgs,
    now_ms: u64,
) -> Result<usize, String> {
    let mut changes = 0;
    for id in &user.remove {
        let Some(entry) = store.get(id).map_err(|e| e.to_string())? else {
            warn!(id = %id, "no user-added item with this id");
            continue;
        };
        store.delete(id).map_err(|e| e.to_string())?;
        eprintln!("removed {} ({})", entry.name, entry.id);
        changes += 1;
    }
    for link in &user.add {
        let entry = CatalogEntry::from_link(link, user.add_type.into(), now_ms)
            .map_err(|e| format!("{link}: {e}"))?;
        eprintln!("added {} ({})", entry.name, entry.id);
        store.upsert(entry).map_err(|e| e.to_string())?;
        changes += 1;
    }
    Ok(changes)
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(add: &[&str], add_type: AddType, remove: &[&str]) -> UserDataArgs {
        UserDataArgs {
            store: None,
            add: add.iter().map(|s| s.to_string()).collect(),
            add_type,
            remove: remove.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn added_links_become_catalog_items() {
        let mut store = InMemoryCatalogStore::new();
        let changes = apply_user_changes(
            &mut store,
            &user(&["http://ows.example.org/wfs"], AddType::Wfs, &[]),
            10,
        )
        .unwrap();
        assert_eq!(changes, 1);

        let group = CatalogGroup::from_store(USER_ADDED_GROUP, &store).unwrap();
        let items = group.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind(), ItemKind::Wfs);
        assert_eq!(items[0].name(), "ows.example.org");
    }

    #[test]
    fn remove_runs_before_add_and_skips_unknown_ids() {
        let mut store = InMemoryCatalogStore::new();
        apply_user_changes(&mut store, &user(&["a.czml"], AddType::File, &[]), 1).unwrap();
        let id = store.list().unwrap()[0].id.clone();

        let changes = apply_user_changes(
            &mut store,
            &user(&["b.czml"], AddType::File, &[id.as_str(), "missing"]),
            2,
        )
        .unwrap();
        assert_eq!(changes, 2);
        let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b.czml".to_string()]);
    }

    #[test]
    fn empty_link_is_rejected() {
        let mut store = InMemoryCatalogStore::new();
        let err = apply_user_changes(&mut store, &user(&[" "], AddType::Wms, &[]), 0).unwrap_err();
        assert!(err.contains("url"), "{err}");
    }
}
