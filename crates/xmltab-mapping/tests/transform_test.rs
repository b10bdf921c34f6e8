//! Integration test: documents to tables
//!
//! Runs whole documents through `DocTransformer` and checks the records
//! produced for each table.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use xmltab_mapping::{DocTransformer, Error, Record, Tables, TransformOptions};
use xmltab_schema::Schema;

const SIMPLE_CONFIG: &str = r#"
album:
  <entity>: album
  <fields>:
    name: name
    artist: artist
    released: released
    label: label
    genre: genre
"#;

const FIVE_LEAVES_LEFT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<album>
  <name>Five Leaves Left</name>
  <artist>Nick Drake</artist>
  <released>1969</released>
  <label>Island</label>
  <genre>Folk</genre>
</album>
"#;

fn transformer(config: &str, options: TransformOptions) -> DocTransformer {
    let schema = Schema::from_yaml_str(config).expect("test configuration should load");
    DocTransformer::new(Arc::new(schema), options).expect("transformer should build")
}

fn tolerant() -> TransformOptions {
    TransformOptions {
        continue_on_error: true,
        ..Default::default()
    }
}

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

#[test]
fn test_simple_transform() {
    let mut t = transformer(SIMPLE_CONFIG, TransformOptions::default());
    let tables = t.process_doc(FIVE_LEAVES_LEFT, None, None).unwrap();

    let expected = Tables::from([(
        "album".to_string(),
        vec![record(&[
            ("id", "None_0"),
            ("name", "Five Leaves Left"),
            ("artist", "Nick Drake"),
            ("released", "1969"),
            ("label", "Island"),
            ("genre", "Folk"),
        ])],
    )]);
    assert_eq!(*tables, expected);
}

#[test]
fn test_leading_whitespace_before_prologue() {
    let mut t = transformer(SIMPLE_CONFIG, TransformOptions::default());
    let doc = format!("\n\n   {FIVE_LEAVES_LEFT}");
    let tables = t.process_doc(&doc, None, None).unwrap();
    assert_eq!(tables["album"].len(), 1);
}

#[test]
fn test_joiner_concatenates_paragraphs() {
    let config = r#"
album:
  <entity>: album
  <fields>:
    name: name
    description/p:
      <fieldname>: description
      <joiner>: "\n"
"#;
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<album>
  <name>Five Leaves Left</name>
  <description>
    <p>
      Five Leaves Left was recorded between July 1968 and June 1969
      at Sound Techniques in London, England.
    </p>
    <p>
      The title of the album is a reference to the old Rizla
      cigarette papers packet.
    </p>
  </description>
</album>
"#;
    let mut t = transformer(config, TransformOptions::default());
    let tables = t.process_doc(xml, None, None).unwrap();

    assert_eq!(
        tables["album"][0]["description"].as_deref(),
        Some(
            "Five Leaves Left was recorded between July 1968 and June 1969 at Sound \
             Techniques in London, England.\nThe title of the album is a reference to the \
             old Rizla cigarette papers packet."
        )
    );
}

#[test]
fn test_repeated_plain_field_keeps_last_match() {
    let mut t = transformer(SIMPLE_CONFIG, TransformOptions::default());
    let xml = "<album><name>Pink Moon</name><genre>Folk</genre><genre>Baroque pop</genre></album>";
    let tables = t.process_doc(xml, None, None).unwrap();

    assert_eq!(tables["album"][0]["genre"].as_deref(), Some("Baroque pop"));
    assert!(!tables["album"][0].contains_key("label"));
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with warnings captured; returns its output and the log text.
fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();
    let output = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (output, logs)
}

#[test]
fn test_repeated_plain_field_warns_with_every_match() -> anyhow::Result<()> {
    let mut t = transformer(SIMPLE_CONFIG, TransformOptions::default());
    let xml = "<album><name>Pink Moon</name><genre>Folk</genre><genre>Baroque pop</genre></album>";
    let (genre, logs) = with_captured_warnings(|| -> anyhow::Result<Option<String>> {
        let tables = t.process_doc(xml, None, None)?;
        Ok(tables["album"][0]["genre"].clone())
    });

    assert_eq!(genre?.as_deref(), Some("Baroque pop"));
    assert!(logs.contains("Multiple elements found for genre!"), "{logs}");
    assert!(logs.contains("- Folk"), "{logs}");
    assert!(logs.contains("- Baroque pop"), "{logs}");
    assert!(!logs.contains("for name"), "{logs}");
    Ok(())
}

#[test]
fn test_joiner_enum_and_entity_paths_do_not_warn() -> anyhow::Result<()> {
    let config = r#"
album:
  <entity>: album
  <fields>:
    name: name
    notes/p:
      <fieldname>: notes
      <joiner>: " "
    format:
      <fieldname>: kind
      <enum_type>: reissue
    track:
      <entity>: track
      <fields>:
        .: title
"#;
    let xml = "<album><name>Pink Moon</name>\
               <notes><p>one</p><p>two</p></notes>\
               <format>LP</format><format>CD</format>\
               <track>Pink Moon</track><track>Place to Be</track></album>";
    let mut t = transformer(config, TransformOptions::default());
    let (counts, logs) = with_captured_warnings(|| -> anyhow::Result<(Option<String>, usize)> {
        let tables = t.process_doc(xml, None, None)?;
        Ok((tables["album"][0]["notes"].clone(), tables["track"].len()))
    });

    let (notes, tracks) = counts?;
    assert_eq!(notes.as_deref(), Some("one two"));
    assert_eq!(tracks, 2);
    assert!(!logs.contains("Multiple elements found"), "{logs}");
    Ok(())
}

#[test]
fn test_alternatives_always_warn_on_multiple_matches() -> anyhow::Result<()> {
    let config = r#"
album:
  <entity>: album
  <fields>:
    notes/p:
      - <fieldname>: notes
        <joiner>: " "
"#;
    let mut t = transformer(config, TransformOptions::default());
    let (notes, logs) = with_captured_warnings(|| -> anyhow::Result<Option<String>> {
        let tables = t.process_doc("<album><notes><p>one</p><p>two</p></notes></album>", None, None)?;
        Ok(tables["album"][0]["notes"].clone())
    });

    assert_eq!(notes?.as_deref(), Some("one two"));
    assert!(logs.contains("Multiple elements found for notes/p!"), "{logs}");
    Ok(())
}

#[test]
fn test_attribute_and_nested_paths() {
    let config = r#"
album:
  <entity>: album
  <fields>:
    "@catalogue": catalogue
    credits/producer: producer
"#;
    let xml = r#"<album catalogue="ILPS 9105"><credits><producer>Joe Boyd</producer></credits></album>"#;
    let mut t = transformer(config, TransformOptions::default());
    let tables = t.process_doc(xml, None, None).unwrap();

    assert_eq!(
        tables["album"][0],
        record(&[("id", "None_0"), ("catalogue", "ILPS 9105"), ("producer", "Joe Boyd")])
    );
}

mod doctype {
    use super::*;

    const ALBUM_CONFIG: &str = r#"
<root_element>: albums
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    name: name
    artist: artist
"#;

    fn albums(doctype: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doctype}<albums>\n  <album>\n    \
             <name>Five Leaves Left</name>\n    <artist>Nick Drake</artist>\n  </album>\n</albums>\n"
        )
    }

    fn checking(continue_on_error: bool) -> TransformOptions {
        TransformOptions {
            check_doctype: true,
            continue_on_error,
            ..Default::default()
        }
    }

    #[test]
    fn test_root_element_is_record() {
        let config = r#"
<root_element>: album
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    name: name
"#;
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE album SYSTEM \"album.dtd\" [ ]>\n\
                   <album><name>Five Leaves Left</name></album>\n";
        let mut t = transformer(config, checking(false));
        let tables = t.process_doc(xml, None, None).unwrap();

        assert_eq!(
            tables["album"],
            vec![record(&[("id", "Five Leaves Left"), ("name", "Five Leaves Left")])]
        );
    }

    #[test]
    fn test_root_element_is_container() {
        let mut t = transformer(ALBUM_CONFIG, checking(false));
        let xml = albums("<!DOCTYPE albums SYSTEM \"albums.dtd\" [ ]>\n");
        let tables = t.process_doc(&xml, None, None).unwrap();

        assert_eq!(tables["album"][0]["id"].as_deref(), Some("Five Leaves Left"));
    }

    #[test]
    fn test_wrong_doctype_is_fatal() {
        let mut t = transformer(ALBUM_CONFIG, checking(false));
        let xml = albums("<!DOCTYPE wrong_elem SYSTEM \"albums.dtd\" [ ]>\n");

        match t.process_doc(&xml, Some("albums.xml"), Some(1)) {
            Err(Error::WrongDoctype { declaration, context }) => {
                assert!(declaration.starts_with("<!DOCTYPE wrong_elem"));
                assert_eq!(context.filename.as_deref(), Some("albums.xml"));
            }
            other => panic!("expected WrongDoctype, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_doctype_is_fatal() {
        let mut t = transformer(ALBUM_CONFIG, checking(false));
        assert!(matches!(
            t.process_doc(&albums(""), None, None),
            Err(Error::NoDoctype { .. })
        ));
    }

    #[test]
    fn test_wrong_doctype_skipped_when_tolerant() {
        let mut t = transformer(ALBUM_CONFIG, checking(true));
        let xml = albums("<!DOCTYPE wrong_elem SYSTEM \"albums.dtd\" [ ]>\n");
        assert!(t.process_doc(&xml, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_missing_doctype_skipped_when_tolerant() {
        let mut t = transformer(ALBUM_CONFIG, checking(true));
        assert!(t.process_doc(&albums(""), None, None).unwrap().is_empty());
    }
}

mod keys {
    use super::*;

    #[test]
    fn test_composite_primary_key() {
        let config = r#"
album:
  <entity>: album
  <primary_key>: [name, artist, released]
  <fields>:
    name: name
"#;
        let xml = "<album><name>Pink Moon</name><artist>Nick Drake</artist><released>1972</released></album>";
        let mut t = transformer(config, TransformOptions::default());
        let tables = t.process_doc(xml, None, None).unwrap();

        assert_eq!(tables["album"][0]["id"].as_deref(), Some("Pink Moon-Nick Drake-1972"));
    }

    #[test]
    fn test_synthetic_keys_for_siblings() {
        let config = r#"
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    name: name
    tracks/track:
      <entity>: track
      <fields>:
        .: title
"#;
        let xml = "<album><name>Pink Moon</name><tracks>\
                   <track>Pink Moon</track><track>Place To Be</track>\
                   <track>Road</track><track>Which Will</track></tracks></album>";
        let mut t = transformer(config, TransformOptions::default());
        let tables = t.process_doc(xml, None, None).unwrap();

        let ids: Vec<&str> = tables["track"]
            .iter()
            .filter_map(|r| r["id"].as_deref())
            .collect();
        assert_eq!(ids, vec!["Pink Moon_0", "Pink Moon_1", "Pink Moon_2", "Pink Moon_3"]);
        assert!(tables["track"]
            .iter()
            .all(|r| r["album_id"].as_deref() == Some("Pink Moon")));
    }

    #[test]
    fn test_children_of_synthetic_parents_link_to_parent_id() {
        let config = r#"
album:
  <entity>: album
  <fields>:
    track:
      <entity>: track
      <fields>:
        .: title
"#;
        let xml = "<album><track>Hazey Jane II</track><track>Northern Sky</track></album>";
        let mut t = transformer(config, TransformOptions::default());
        let tables = t.process_doc(xml, None, None).unwrap();

        assert_eq!(tables["album"][0]["id"].as_deref(), Some("None_0"));
        assert_eq!(
            tables["track"][1],
            record(&[("id", "None_0_1"), ("album_id", "None_0"), ("title", "Northern Sky")])
        );
    }

    #[test]
    fn test_empty_primary_key_falls_back_to_synthetic() {
        let config = r#"
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    artist: artist
"#;
        let xml = "<album><name>  </name><artist>Nick Drake</artist></album>";
        let mut t = transformer(config, TransformOptions::default());
        let tables = t.process_doc(xml, None, None).unwrap();
        assert_eq!(tables["album"][0]["id"].as_deref(), Some("None_0"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = transformer(SIMPLE_CONFIG, TransformOptions::default())
            .process_doc(FIVE_LEAVES_LEFT, None, None)
            .unwrap()
            .clone();
        let second = transformer(SIMPLE_CONFIG, TransformOptions::default())
            .process_doc(FIVE_LEAVES_LEFT, None, None)
            .unwrap()
            .clone();
        assert_eq!(first, second);
    }
}

mod namespaces {
    use super::*;

    const CONFIG: &str = r#"
album:
  <entity>: album
  <fields>:
    name: name
    dc:title: title
    xx:subtitle: subtitle
"#;

    fn album(namespace: &str, name: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<album xmlns="{namespace}" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <name>{name}</name>
  <dc:title>{name} (remaster)</dc:title>
</album>"#
        )
    }

    #[test]
    fn test_default_namespace_is_transparent() {
        let mut t = transformer(CONFIG, TransformOptions::default());
        let tables = t.process_doc(&album("urn:albums", "Pink Moon"), None, None).unwrap();

        assert_eq!(
            tables["album"][0],
            record(&[("id", "None_0"), ("name", "Pink Moon"), ("title", "Pink Moon (remaster)")])
        );
    }

    #[test]
    fn test_namespace_map_cached_from_first_document() {
        let mut t = transformer(CONFIG, TransformOptions::default());
        t.process_doc(&album("urn:a", "Pink Moon"), None, None).unwrap();
        let tables = t.process_doc(&album("urn:b", "Bryter Layter"), None, None).unwrap();

        assert_eq!(tables["album"].len(), 1);
    }

    #[test]
    fn test_namespace_map_refreshed_per_document() {
        let options = TransformOptions {
            refresh_namespaces: true,
            ..Default::default()
        };
        let mut t = transformer(CONFIG, options);
        t.process_doc(&album("urn:a", "Pink Moon"), None, None).unwrap();
        let tables = t.process_doc(&album("urn:b", "Bryter Layter"), None, None).unwrap();

        assert_eq!(tables["album"].len(), 2);
        assert_eq!(tables["album"][1]["name"].as_deref(), Some("Bryter Layter"));
    }
}

#[test]
fn test_enum_map_and_enum_type() {
    let config = r#"
album:
  <entity>: album
  <fields>:
    name: name
    format:
      <fieldname>: format
      <enum_map>:
        LP: vinyl
        CD: compact disc
    released:
      <fieldname>: kind
      <enum_type>: studio album
"#;
    let mut t = transformer(config, TransformOptions::default());
    t.process_doc("<album><name>Pink Moon</name><format>LP</format><released>1972</released></album>", None, None)
        .unwrap();
    let tables = t
        .process_doc("<album><name>Time of No Reply</name><format>8-track</format></album>", None, None)
        .unwrap();

    let rows = &tables["album"];
    assert_eq!(rows[0]["format"].as_deref(), Some("vinyl"));
    assert_eq!(rows[0]["kind"].as_deref(), Some("studio album"));
    assert_eq!(rows[1]["id"].as_deref(), Some("None_1"));
    assert_eq!(rows[1].get("format"), Some(&None));
    assert!(!rows[1].contains_key("kind"));
}

#[test]
fn test_alternatives_feed_field_and_entity() {
    let config = r#"
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    name: name
    artist:
      - artist
      - <entity>: artist
        <primary_key>: .
        <fields>:
          .: name
"#;
    let xml = "<album><name>Pink Moon</name><artist>Nick Drake</artist></album>";
    let mut t = transformer(config, TransformOptions::default());
    let tables = t.process_doc(xml, None, None).unwrap();

    assert_eq!(tables["album"][0]["artist"].as_deref(), Some("Nick Drake"));
    assert_eq!(
        tables["artist"],
        vec![record(&[("id", "Nick Drake"), ("album_id", "Pink Moon"), ("name", "Nick Drake")])]
    );
}

#[test]
fn test_filename_field() {
    let config = r#"
album:
  <entity>: album
  <filename_field>: source_file
  <fields>:
    name: name
"#;
    let mut t = transformer(config, TransformOptions::default());
    t.process_doc("<album><name>Pink Moon</name></album>", Some("albums.xml"), Some(1))
        .unwrap();
    let tables = t.process_doc("<album><name>Bryter Layter</name></album>", None, None).unwrap();

    assert_eq!(tables["album"][0]["source_file"].as_deref(), Some("albums.xml"));
    assert_eq!(tables["album"][1].get("source_file"), Some(&None));
}

mod failures {
    use super::*;

    const TRACKS_CONFIG: &str = r#"
album:
  <entity>: album
  <fields>:
    name: name
    track:
      <entity>: track
      <primary_key>: title
      <fields>:
        title: title
"#;

    const GOOD: &str = "<album><name>Pink Moon</name><track><title>Road</title></track></album>";
    const AMBIGUOUS: &str = "<album><name>Bad</name><track><title>A</title><title>B</title></track></album>";

    #[test]
    fn test_records_are_all_or_nothing() {
        let mut t = transformer(TRACKS_CONFIG, tolerant());
        let before = t.process_doc(GOOD, None, None).unwrap().clone();
        let after = t.process_doc(AMBIGUOUS, None, None).unwrap().clone();
        assert_eq!(before, after);

        let tables = t.process_doc(GOOD, None, None).unwrap();
        let ids: Vec<&str> = tables["album"].iter().filter_map(|r| r["id"].as_deref()).collect();
        assert_eq!(ids, vec!["None_0", "None_1"]);
    }

    #[test]
    fn test_ambiguous_primary_key_is_fatal_when_strict() {
        let mut t = transformer(TRACKS_CONFIG, TransformOptions::default());
        match t.process_doc(AMBIGUOUS, Some("albums.xml"), Some(40)) {
            Err(Error::AmbiguousPrimaryKey { path, found, context }) => {
                assert_eq!(path, "title");
                assert_eq!(found, 2);
                assert_eq!(context.line, Some(40));
                assert_eq!(context.record_id, None);
            }
            other => panic!("expected AmbiguousPrimaryKey, got {other:?}"),
        }
    }

    #[test]
    fn test_error_carries_best_effort_record_id() {
        let config = r#"
album:
  <entity>: album
  <primary_key>: name
  <fields>:
    track:
      <entity>: track
      <primary_key>: title
      <fields>:
        title: title
"#;
        let mut t = transformer(config, TransformOptions::default());
        let err = t.process_doc(AMBIGUOUS, None, None).unwrap_err();

        assert_eq!(err.context().and_then(|c| c.record_id.as_deref()), Some("Bad"));
        assert!(err.to_string().contains("with ID Bad"));
    }

    #[test]
    fn test_malformed_document() {
        let mut t = transformer(SIMPLE_CONFIG, TransformOptions::default());
        assert!(matches!(
            t.process_doc("<album><name>Unclosed</album>", None, None),
            Err(Error::MalformedDocument { .. })
        ));

        let mut t = transformer(SIMPLE_CONFIG, tolerant());
        assert!(t.process_doc("<album><name>Unclosed</album>", None, None).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_schema_node_is_lazy() {
        let config = r#"
album:
  <entity>: album
  <fields>:
    name: name
    bonus_disc:
      <fieldname>: bonus
      <colour>: gold
"#;
        let mut t = transformer(config, TransformOptions::default());
        let tables = t.process_doc("<album><name>Pink Moon</name></album>", None, None).unwrap();
        assert_eq!(tables["album"].len(), 1);

        match t.process_doc("<album><name>Pink Moon</name><bonus_disc/></album>", None, None) {
            Err(Error::InvalidSchemaNode { path, .. }) => assert_eq!(path, "bonus_disc"),
            other => panic!("expected InvalidSchemaNode, got {other:?}"),
        }
    }
}
