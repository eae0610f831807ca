//! Configuration loading against real files.

use std::sync::Arc;
use tessera::config::TesseraConfig;
use tessera_core::batch::request::Arguments;
use tessera_core::{BatchCall, BatchDispatcher, BatchRequest, SchemaDefinition, TesseraError};

const CONFIG: &str = r#"
[store]
path = "models.db"

[schema]
namespace = "http://example.org/"
classes = [
    { id = "GO:0008150", label = "biological_process" },
    { id = "GO:0006915", label = "apoptotic process", parents = ["GO:0008150"] },
]
relations = [{ id = "BFO:0000050", label = "part of", alias = "part_of" }]

[[corpus]]
name = "fb"
annotations = [{ gene = "FB:FBgn0000001", class = "GO:0006915" }]
"#;

#[test]
fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TesseraConfig::load(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(config.schema, SchemaDefinition::builtin());
    assert!(config.corpus.is_empty());
}

#[test]
fn file_sections_are_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tessera.toml");
    std::fs::write(&path, CONFIG).expect("write");

    let config = TesseraConfig::load(&path).expect("load");
    assert_eq!(config.store.path, std::path::PathBuf::from("models.db"));
    assert_eq!(config.schema.namespace, "http://example.org/");
    assert_eq!(config.schema.classes.len(), 2);
    assert_eq!(config.corpus.len(), 1);
    assert_eq!(config.corpus[0].annotations[0].gene, "FB:FBgn0000001");
    config.schema().expect("schema resolves");
}

#[test]
fn relative_namespace_fails_schema() {
    let config = TesseraConfig::from_toml(
        r#"
[schema]
namespace = "obo/"
"#,
    )
    .expect("parse");
    assert!(matches!(config.schema(), Err(TesseraError::InvalidConfig(_))));
    assert!(config.build_registry().is_err());
}

#[test]
fn built_registry_persists_across_restarts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TesseraConfig::from_toml(CONFIG)
        .expect("parse")
        .with_store_path(Some(dir.path().join("models.db")));

    let model = {
        let registry = Arc::new(config.build_registry().expect("registry"));
        let dispatcher = BatchDispatcher::new(Arc::clone(&registry));
        let arguments = Arguments {
            subject: Some("GO:0006915".into()),
            corpus_ref: Some("fb".into()),
            ..Arguments::default()
        };
        let response = dispatcher.dispatch(&BatchCall::new(
            "action",
            vec![BatchRequest::new("model", "generate", arguments)],
        ));
        assert!(response.is_success(), "{:?}", response.commentary);
        assert_eq!(registry.save_all().expect("save"), 1);
        response.data.id.expect("model id")
    };

    let registry = config.build_registry().expect("reopen");
    assert!(registry.list_ids().is_empty());
    assert!(registry.available_ids().expect("ids").contains(&model));
    assert!(registry.get(&model).is_ok());
}

#[test]
fn unknown_corpus_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TesseraConfig::default().with_store_path(Some(dir.path().join("t.db")));
    let registry = Arc::new(config.build_registry().expect("registry"));
    let dispatcher = BatchDispatcher::new(registry);

    let arguments = Arguments {
        subject: Some("GO:0008150".into()),
        corpus_ref: Some("nope".into()),
        ..Arguments::default()
    };
    let response = dispatcher.dispatch(&BatchCall::new(
        "action",
        vec![BatchRequest::new("model", "generate", arguments)],
    ));
    assert!(!response.is_success());
    let expected = TesseraError::UnknownCorpus("nope".into());
    assert!(
        response
            .commentary
            .as_deref()
            .is_some_and(|c| c.contains(&expected.to_string()))
    );
}
