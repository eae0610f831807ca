//! # CLI Command Implementations
//!
//! All commands except `server` and `check-config` block on model locks and
//! are called from the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera::api;
use tessera::config::TesseraConfig;
use tessera_core::{
    BatchCall, BatchDispatcher, CreateKind, ExportFormat, ModelRegistry, TesseraError,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a batch call file (16 MB).
const MAX_BATCH_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of an import file (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Read a regular file no larger than `max_size`.
fn read_bounded(path: &Path, max_size: u64) -> Result<String, TesseraError> {
    let canonical = path.canonicalize().map_err(|e| {
        TesseraError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(TesseraError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| TesseraError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(TesseraError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read_to_string(&canonical)
        .map_err(|e| TesseraError::IoError(format!("Read file: {}", e)))
}

/// Resolve an output path against its existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, TesseraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        TesseraError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(TesseraError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| TesseraError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &TesseraConfig, host: &str, port: u16) -> Result<(), TesseraError> {
    let config = config.clone();
    let registry = tokio::task::spawn_blocking(move || config.build_registry())
        .await
        .map_err(|e| TesseraError::IoError(format!("Registry setup failed: {}", e)))??;

    eprintln!("Endpoints:");
    eprintln!("  POST /m3Batch           - Run a batch call");
    eprintln!("  POST /m3BatchPrivileged - Run a privileged batch call");
    eprintln!("  GET  /health            - Health check");
    eprintln!();
    eprintln!("Press Ctrl+C to stop");

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, Arc::new(registry)).await
}

// =============================================================================
// BATCH COMMAND
// =============================================================================

/// Run one batch call and print the response. Changed models are saved.
pub fn cmd_batch(config: &TesseraConfig, file: &Path, privileged: bool) -> Result<(), TesseraError> {
    let text = read_bounded(file, MAX_BATCH_FILE_SIZE)?;
    let call: BatchCall = serde_json::from_str(&text)
        .map_err(|e| TesseraError::SerializationError(format!("Batch call: {}", e)))?;

    let registry = Arc::new(config.build_registry()?);
    let dispatcher = BatchDispatcher::new(Arc::clone(&registry));
    let response = dispatcher.dispatch(&call.privileged(privileged));

    let saved = registry.save_all()?;
    tracing::debug!(saved, "batch finished");

    let json = serde_json::to_value(&response)
        .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
    print_json(&json);
    Ok(())
}

// =============================================================================
// MODELS COMMAND
// =============================================================================

/// List every stored or loaded model with its annotations.
pub fn cmd_models(config: &TesseraConfig, json_mode: bool) -> Result<(), TesseraError> {
    let registry = config.build_registry()?;
    let mut listing = Vec::new();
    for id in registry.available_ids()? {
        let annotations = registry.annotations_of(&id)?;
        listing.push((id, annotations));
    }

    if json_mode {
        let models: serde_json::Map<String, serde_json::Value> = listing
            .iter()
            .map(|(id, annotations)| {
                let values = annotations
                    .iter()
                    .map(|a| serde_json::json!({ "key": a.key, "value": a.value }))
                    .collect();
                (id.clone(), serde_json::Value::Array(values))
            })
            .collect();
        print_json(&serde_json::json!({ "models": models }));
        return Ok(());
    }

    println!("Models ({})", listing.len());
    println!("==========");
    for (id, annotations) in &listing {
        println!("{}", id);
        for annotation in annotations {
            println!("  {} = {}", annotation.key, annotation.value);
        }
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export one model.
pub fn cmd_export(
    config: &TesseraConfig,
    model_id: &str,
    output: &Path,
    format: Option<&str>,
) -> Result<(), TesseraError> {
    let validated_output = validate_output_path(output)?;
    let registry = config.build_registry()?;

    let handle = registry.get(model_id)?;
    let format = ExportFormat::parse(format);
    let text = {
        let model = handle.blocking_lock();
        registry.export(&model, format)?
    };

    std::fs::write(&validated_output, &text)
        .map_err(|e| TesseraError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} ({}) as {} bytes to {:?}",
        model_id,
        format.as_str(),
        text.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import one model and save it.
pub fn cmd_import(config: &TesseraConfig, input: &Path, json_mode: bool) -> Result<(), TesseraError> {
    let text = read_bounded(input, MAX_IMPORT_FILE_SIZE)?;
    let registry = config.build_registry()?;
    let id = import_and_save(&registry, text)?;

    if json_mode {
        print_json(&serde_json::json!({ "imported": id }));
    } else {
        println!("Imported {}", id);
    }
    Ok(())
}

fn import_and_save(registry: &ModelRegistry, text: String) -> Result<String, TesseraError> {
    let (id, _) = registry.create(CreateKind::Import { text })?;
    registry.save(&id)?;
    Ok(id)
}

// =============================================================================
// CHECK-CONFIG COMMAND
// =============================================================================

/// Validate the configuration without opening the store.
pub fn cmd_check_config(config: &TesseraConfig, json_mode: bool) -> Result<(), TesseraError> {
    config.schema()?;

    let definition = &config.schema;
    if json_mode {
        print_json(&serde_json::json!({
            "valid": true,
            "store": config.store.path.to_string_lossy(),
            "namespace": definition.namespace,
            "classes": definition.classes.len(),
            "relations": definition.relations.len(),
            "evidence": definition.evidence.len(),
            "corpora": config.corpus.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    println!("Configuration OK");
    println!("  Store:     {}", config.store.path.display());
    println!("  Namespace: {}", definition.namespace);
    println!("  Classes:   {}", definition.classes.len());
    println!("  Relations: {}", definition.relations.len());
    println!("  Evidence:  {}", definition.evidence.len());
    println!("  Corpora:   {}", config.corpus.len());
    Ok(())
}
