use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use super::*;

#[test]
fn parse_config_with_default_volatile_dirs() {
    let content = r#"
target_root = "/games/client"
patch_root = "/games/client/Utility"
"#;

    let config = PatchConfig::from_toml_str(content).expect("config must parse");
    assert_eq!(config.target_root, PathBuf::from("/games/client"));
    assert_eq!(config.patch_root, PathBuf::from("/games/client/Utility"));
    assert_eq!(config.volatile_dirs.len(), DEFAULT_VOLATILE_DIRS.len());
    assert!(config.volatile_dirs.iter().any(|dir| dir == "SaveData"));
}

#[test]
fn parse_config_with_custom_volatile_dirs() {
    let content = r#"
target_root = "client"
patch_root = "client/Utility"
volatile_dirs = ["Replay", "data/cache"]
"#;

    let config = PatchConfig::from_toml_str(content).expect("config must parse");
    assert_eq!(config.volatile_dirs, vec!["Replay", "data/cache"]);
}

#[test]
fn parse_config_rejects_escaping_volatile_dir() {
    for bad in ["../outside", "/abs/dir", "  "] {
        let content = format!(
            "target_root = \"client\"\npatch_root = \"client/Utility\"\nvolatile_dirs = [\"{bad}\"]\n"
        );
        let err = PatchConfig::from_toml_str(&content).expect_err("must reject volatile dir");
        assert!(
            format!("{err:#}").contains("invalid volatile directory"),
            "unexpected error: {err:#}"
        );
    }
}

#[test]
fn parse_config_rejects_missing_roots() {
    let err = PatchConfig::from_toml_str("target_root = \"client\"\n")
        .expect_err("patch_root is required");
    assert!(format!("{err:#}").contains("failed to parse clientpatch config"));
}

#[test]
fn load_config_resolves_relative_roots_against_file_dir() {
    let dir = test_dir("load-config");
    fs::create_dir_all(&dir).expect("must create dir");
    let path = dir.join("clientpatch.toml");
    fs::write(&path, "target_root = \".\"\npatch_root = \"Utility\"\n").expect("must write");

    let config = PatchConfig::load(&path).expect("must load config");
    assert_eq!(config.target_root, dir.join("."));
    assert_eq!(config.patch_root, dir.join("Utility"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn discover_uses_parent_as_target_root() {
    let config = PatchConfig::discover("/games/client/Utility").expect("must discover");
    assert_eq!(config.target_root, PathBuf::from("/games/client"));
    assert_eq!(config.patch_root, PathBuf::from("/games/client/Utility"));
}

#[test]
fn layout_paths_match_patch_tree() {
    let layout = PatchLayout::new(&PatchConfig::new("/client", "/client/Utility"));
    let patches = Path::new("/client/Utility/Patches");

    assert_eq!(layout.patches_dir(), patches);
    assert_eq!(
        layout.before_common_dir(),
        patches.join("Common").join("BeforePatches")
    );
    assert_eq!(
        layout.after_common_dir(),
        patches.join("Common").join("AfterPatches")
    );
    assert_eq!(
        layout.version_build_dir("20180620"),
        patches
            .join("RagexeClient")
            .join("20180620")
            .join("Ragexe")
            .join("Build")
    );
    assert_eq!(
        layout.version_origin_dir("20180620"),
        patches
            .join("RagexeClient")
            .join("20180620")
            .join("Resource")
            .join("Original")
    );
    assert_eq!(
        layout.version_translated_dir("20180620"),
        patches
            .join("RagexeClient")
            .join("20180620")
            .join("Resource")
            .join("Translated")
    );
    assert_eq!(layout.backup_dir(), patches.join("Backup"));
    assert_eq!(layout.journal_path(), patches.join("PatchJournal.jsonl"));
}

#[test]
fn layout_directories_end_with_separator() {
    let layout = PatchLayout::new(&PatchConfig::new("/client", "/client/Utility"));
    let mut dirs = vec![
        layout.target_root(),
        layout.patch_root(),
        layout.patches_dir(),
        layout.before_common_dir(),
        layout.after_common_dir(),
        layout.versions_dir(),
        layout.version_build_dir("v1"),
        layout.version_origin_dir("v1"),
        layout.version_translated_dir("v1"),
        layout.backup_dir(),
    ];
    dirs.extend(layout.volatile_dirs());

    for dir in dirs {
        let rendered = dir.to_string_lossy().into_owned();
        assert!(
            rendered.ends_with(MAIN_SEPARATOR),
            "missing trailing separator: {rendered}"
        );
    }
}

#[test]
fn overlay_layers_are_in_priority_order() {
    let layout = PatchLayout::new(&PatchConfig::new("/client", "/client/Utility"));
    let layers = layout.overlay_layers("v1");
    assert_eq!(layers[0], layout.before_common_dir());
    assert_eq!(layers[1], layout.version_build_dir("v1"));
    assert_eq!(layers[2], layout.version_origin_dir("v1"));
    assert_eq!(layers[3], layout.version_translated_dir("v1"));
    assert_eq!(layers[4], layout.after_common_dir());
}

#[test]
fn session_record_path_creates_patches_dir_only() {
    let dir = test_dir("record-path");
    let layout = PatchLayout::new(&PatchConfig::new(&dir, dir.join("Utility")));
    assert!(!layout.patches_dir().exists());

    let path = layout.session_record_path().expect("must resolve record path");
    assert_eq!(path, layout.patches_dir().join("LastPatchesInfo.json"));
    assert!(layout.patches_dir().is_dir());
    assert!(!path.exists());
    assert!(!layout.backup_dir().exists());

    let again = layout.session_record_path().expect("must be idempotent");
    assert_eq!(again, path);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn available_versions_skips_common_and_files() {
    let dir = test_dir("versions");
    let layout = PatchLayout::new(&PatchConfig::new(&dir, dir.join("Utility")));
    assert!(layout
        .available_versions()
        .expect("missing dir is not an error")
        .is_empty());

    let versions = layout.versions_dir();
    for name in ["20180620", "20151104", "Common"] {
        fs::create_dir_all(versions.join(name)).expect("must create version dir");
    }
    fs::write(versions.join("README.txt"), b"notes").expect("must write file");

    let found = layout.available_versions().expect("must list versions");
    assert_eq!(found, vec!["20151104", "20180620"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_dirs_reports_absent_layers() {
    let dir = test_dir("missing");
    let layout = PatchLayout::new(&PatchConfig::new(&dir, dir.join("Utility")));
    fs::create_dir_all(layout.before_common_dir()).expect("must create before dir");

    let missing = layout.missing_dirs();
    assert!(missing.contains(&layout.versions_dir()));
    assert!(missing.contains(&layout.after_common_dir()));
    assert!(!missing.contains(&layout.before_common_dir()));
    assert!(!missing.contains(&layout.patches_dir()));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn session_record_keeps_legacy_field_names() {
    let record = SessionRecord {
        timestamp: "2024-01-02 03:04:05".to_string(),
        backed_up: vec!["data/foo.txt".to_string()],
        installed: vec![InstalledFile {
            src: "Patches/Common/BeforePatches/data/foo.txt".to_string(),
            dst: "data/foo.txt".to_string(),
        }],
    };

    let raw = serde_json::to_string(&record).expect("must serialize");
    assert!(raw.contains("\"patchtime\":\"2024-01-02 03:04:05\""));
    assert!(raw.contains("\"backuplist\":[\"data/foo.txt\"]"));
    assert!(raw.contains("\"patchlist\":[{\"src\":"));

    let parsed: SessionRecord = serde_json::from_str(&raw).expect("must parse");
    assert_eq!(parsed, record);
}

#[test]
fn generated_record_reads_legacy_document() {
    let raw = r#"{
    "transtime": "2019-05-01 10:00:00",
    "transfiles": ["20180620/Resource/Translated/data/btn_ok.bmp"]
}"#;
    let record: GeneratedRecord = serde_json::from_str(raw).expect("must parse");
    assert_eq!(record.timestamp, "2019-05-01 10:00:00");
    assert_eq!(
        record.files,
        vec!["20180620/Resource/Translated/data/btn_ok.bmp"]
    );
}

#[test]
fn record_timestamp_has_expected_shape() {
    let stamp = record_timestamp();
    assert_eq!(stamp.len(), 19);
    assert_eq!(&stamp[4..5], "-");
    assert_eq!(&stamp[10..11], " ");
    assert_eq!(&stamp[13..14], ":");
}

fn test_dir(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    path.push(format!(
        "clientpatch-core-tests-{label}-{}-{}",
        std::process::id(),
        nanos
    ));
    path
}
