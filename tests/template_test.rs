use std::fs;

use skel::error::Error;
use skel::spec::{Node, Spec};
use skel::template::{Template, TemplateStore};
use tempfile::TempDir;

fn sample(description: &str) -> Template {
    Template::new(
        "Rust CLI",
        description,
        Spec::new(vec![Node::directory("src", vec![Node::file("main.rs", "fn main() {}")])]),
    )
}

#[test]
fn test_missing_directory_is_an_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = TemplateStore::open(temp_dir.path().join("templates")).unwrap();

    assert!(store.is_empty());
    assert!(matches!(store.get("anything"), Err(Error::TemplateNotFound { .. })));
}

#[test]
fn test_save_writes_document_and_reloads() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("templates");

    let mut store = TemplateStore::open(&dir).unwrap();
    store.save("rust-cli", sample("binary crate")).unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("rust-cli.json")).unwrap()).unwrap();
    assert_eq!(document["name"], "Rust CLI");
    assert_eq!(document["description"], "binary crate");
    assert_eq!(document["structure"][0]["type"], "directory");
    assert_eq!(document["structure"][0]["files"][0]["path"], "main.rs");

    let reloaded = TemplateStore::open(&dir).unwrap();
    assert_eq!(reloaded.get("rust-cli").unwrap(), &sample("binary crate"));
    assert_eq!(reloaded.keys().collect::<Vec<_>>(), vec!["rust-cli"]);
}

#[test]
fn test_saving_same_key_replaces_template() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = TemplateStore::open(temp_dir.path()).unwrap();

    store.save("cli", sample("old")).unwrap();
    store.save("cli", sample("new")).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("cli").unwrap().description, "new");
    let reloaded = TemplateStore::open(temp_dir.path()).unwrap();
    assert_eq!(reloaded.get("cli").unwrap().description, "new");
}

#[test]
fn test_remove() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = TemplateStore::open(temp_dir.path()).unwrap();
    store.save("cli", sample("x")).unwrap();

    let removed = store.remove("cli").unwrap();

    assert_eq!(removed.name, "Rust CLI");
    assert!(!temp_dir.path().join("cli.json").exists());
    assert!(matches!(store.remove("cli"), Err(Error::TemplateNotFound { .. })));
}

#[test]
fn test_invalid_documents_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.json"), "{ nope").unwrap();
    fs::write(
        temp_dir.path().join("bad-structure.json"),
        r#"{"name": "x", "structure": [{"path": "a", "type": "bogus"}]}"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("good.json"),
        r#"{"name": "Good", "structure": [{"path": "a", "type": "directory"}]}"#,
    )
    .unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let store = TemplateStore::open(temp_dir.path()).unwrap();

    assert_eq!(store.keys().collect::<Vec<_>>(), vec!["good"]);
    let good = store.get("good").unwrap();
    assert_eq!(good.description, "");
    assert_eq!(good.structure.nodes()[0], Node::directory("a", vec![]));
}

#[test]
fn test_invalid_key_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = TemplateStore::open(temp_dir.path()).unwrap();

    assert!(matches!(store.save("../escape", sample("x")), Err(Error::TemplateError(_))));
    assert!(store.is_empty());
}
