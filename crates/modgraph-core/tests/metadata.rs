use modgraph_core::metadata::ModuleMetadata;
use modgraph_core::version::parse_version;
use std::path::PathBuf;
use tempfile::TempDir;

const APOLLO: &str = r#"{
  "name": "alice/apollo",
  "version": "0.0.2",
  "author": "alice",
  "summary": "Database clients",
  "dependencies": [
    { "name": "alice/java", "version_requirement": ">= 1.7.0" },
    { "name": "alice-stdlib" }
  ],
  "checksums": { "manifests/init.pp": "d41d8cd98f00b204e9800998ecf8427e" }
}"#;

#[test]
fn test_parse_metadata() {
    let meta = ModuleMetadata::from_json(APOLLO).unwrap();
    assert_eq!(meta.name, "alice/apollo");
    assert_eq!(meta.dependencies.len(), 2);
    assert_eq!(meta.checksums.len(), 1);
}

#[test]
fn test_metadata_to_release() {
    let meta = ModuleMetadata::from_json(APOLLO).unwrap();
    let release = meta.to_release(PathBuf::from("/mods/apollo")).unwrap();
    assert_eq!(release.name, "alice-apollo");
    assert_eq!(release.version, parse_version("0.0.2").unwrap());
    assert!(release.is_installed());

    let java = &release.requirements["alice-java"];
    assert!(java.satisfies(&parse_version("1.7.1").unwrap()));
    assert!(!java.satisfies(&parse_version("1.6.0").unwrap()));

    let stdlib = &release.requirements["alice-stdlib"];
    assert!(stdlib.satisfies(&parse_version("0.0.1").unwrap()));
}

#[test]
fn test_metadata_bad_version_is_error() {
    let meta = ModuleMetadata::from_json(r#"{"name": "a-b", "version": "one"}"#).unwrap();
    let err = meta.to_release(PathBuf::from("/x")).unwrap_err();
    assert!(err.to_string().contains("Metadata error"), "got: {err}");
}

#[test]
fn test_metadata_bad_requirement_is_error() {
    let json = r#"{"name": "a-b", "version": "1.0.0",
        "dependencies": [{"name": "c-d", "version_requirement": "~>banana"}]}"#;
    let meta = ModuleMetadata::from_json(json).unwrap();
    assert!(meta.to_release(PathBuf::from("/x")).is_err());
}

#[test]
fn test_load_from_dir() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("metadata.json"), APOLLO).unwrap();
    let meta = ModuleMetadata::load(tmp.path()).unwrap();
    assert_eq!(meta.version, "0.0.2");
}

#[test]
fn test_load_invalid_json() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("metadata.json"), "{not json").unwrap();
    assert!(ModuleMetadata::load(tmp.path()).is_err());
}
