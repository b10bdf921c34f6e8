//! Loading configurations from disk

use std::path::Path;

use xmltab_schema::{Error, Schema, SchemaNode};

#[test]
fn test_load_yaml_file() -> anyhow::Result<()> {
    let schema = Schema::from_file(Path::new("tests/data/albums.yaml"))?;

    assert_eq!(schema.root_element.as_deref(), Some("albums"));
    let layouts = schema.table_layouts()?;
    let names: Vec<&str> = layouts.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["track", "album"]);
    assert_eq!(
        layouts[1].columns,
        vec!["id", "name", "artist", "released", "label", "genre", "description"]
    );
    Ok(())
}

#[test]
fn test_load_json_file() -> anyhow::Result<()> {
    let schema = Schema::from_file(Path::new("tests/data/albums.json"))?;

    let Some(SchemaNode::Entity(album)) = schema.get("album") else {
        panic!("album should be an entity");
    };
    let paths: Vec<&str> = album.fields.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["name", "artist", "released", "label", "genre"]);
    Ok(())
}

#[test]
fn test_missing_file() {
    let result = Schema::from_file(Path::new("tests/data/nonexistent.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_written_config_round_trips_through_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yml");
    std::fs::write(&path, "album:\n  <entity>: album\n  <fields>:\n    title: title\n")?;

    let schema = Schema::from_file(&path)?;
    assert!(schema.root_element.is_none());
    assert_eq!(schema.table_layouts()?[0].columns, vec!["title"]);
    Ok(())
}
