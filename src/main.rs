use clap::{Arg, ArgAction, Command};
use erb_link_i18n::{ExtractedKey, Extractor, ExtractorConfig, load_config_from_file};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("erb-link-i18n")
        .version("0.1.0")
        .about("Rewrites link_to text in ERB templates into i18n lookups")
        .arg(
            Arg::new("files")
                .help("ERB templates to process")
                .required(true)
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON file with extractor settings")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .short('w')
                .help("Rewrite the templates in place instead of printing them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keys")
                .long("keys")
                .short('k')
                .help("Write the extracted keys and their default texts to this JSON file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every extraction decision")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let default_directive = if matches.get_flag("verbose") {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config_from_file(path)?,
        None => ExtractorConfig::default(),
    };
    let extractor = Extractor::new(config);
    let write = matches.get_flag("write");

    let mut all_keys: Vec<ExtractedKey> = Vec::new();
    for path in matches.get_many::<PathBuf>("files").into_iter().flatten() {
        let source = fs::read_to_string(path)?;
        let (output, keys) = extractor.extract_source(&source)?;
        info!(file = %path.display(), keys = keys.len(), "processed");

        if write {
            if output != source {
                fs::write(path, &output)?;
            }
        } else {
            print!("{}", output);
        }
        all_keys.extend(keys);
    }

    if let Some(keys_path) = matches.get_one::<PathBuf>("keys") {
        write_keys(keys_path, &all_keys)?;
    }

    Ok(())
}

/// Writes `{ "key": "default text", ... }`, keeping the first text seen for
/// a key that occurs more than once.
fn write_keys(path: &Path, keys: &[ExtractedKey]) -> Result<(), Box<dyn std::error::Error>> {
    let mut object = Map::new();
    for extracted in keys {
        if let Some(existing) = object.get(&extracted.key) {
            if existing.as_str() != Some(extracted.default_text.as_str()) {
                warn!(key = extracted.key.as_str(), "key generated for different texts");
            }
            continue;
        }
        object.insert(
            extracted.key.clone(),
            Value::String(extracted.default_text.clone()),
        );
    }
    fs::write(path, serde_json::to_string_pretty(&Value::Object(object))?)?;
    Ok(())
}
