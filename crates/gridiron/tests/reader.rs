mod common;

use std::sync::Arc;

use common::{Install, DATA_PACKAGE, PATCH_PACKAGE};
use gridiron::cas::{CasBlockReader, ReadOptions as CasReadOptions};
use gridiron::ebx::{EbxValue, TypeTable};
use gridiron::{CacheKind, CacheStore, Error, GameResourceReader, NoProgress, Progress, ReadOptions, ReaderConfig};
use pretty_assertions::assert_eq;

fn config(install: &Install) -> ReaderConfig {
    ReaderConfig {
        workers: 3,
        queue_depth: 2,
        ..ReaderConfig::new(install.cache_dir())
    }
}

fn scan(install: &Install, build_cache: bool) -> ReadOptions {
    ReadOptions {
        path: Some(install.exe()),
        build_cache,
    }
}

fn scenario_install() -> Install {
    let install = Install::new();
    install.write(&format!("{DATA_PACKAGE}/cas_01.cas"), &common::scenario_container());
    install
}

fn sound_types() -> Arc<TypeTable> {
    Arc::new(TypeTable::from_records(common::type_descriptors("Extra").records()))
}

#[test]
fn scenario_sound_x() {
    let install = scenario_install();
    let mut reader = GameResourceReader::new(config(&install));

    let index = reader.read(&scan(&install, false), &mut NoProgress).unwrap();
    assert_eq!(index.len(), 1);

    let record = index.find("sound/x").unwrap();
    assert_eq!(record.name, "Sound/X");
    assert_eq!(record.offset, 0x720C);
    assert_eq!(record.size, 0x17E);
    assert_eq!(record.file, format!("{DATA_PACKAGE}/cas_01.cas"));

    let data = reader.get_resource_data("sound/x").unwrap();
    assert_eq!(data.len(), 546);
    assert_eq!(data, common::scenario_ebx());

    reader.set_types(sound_types());
    let resource = reader.get_resource("SOUND/X").unwrap();
    assert_eq!(resource.offset, 0x720C);
    assert_eq!(resource.size, 0x17E);
    assert_eq!(resource.data, common::scenario_payload());

    let fields = resource.fields.unwrap();
    assert_eq!(fields.type_name, common::SOUND_TYPE);
    assert_eq!(fields.get("ChannelCount"), Some(&EbxValue::Int32(0x0403_0201)));
    assert_eq!(fields.get("Loudness"), Some(&EbxValue::UInt16(0x0605)));
}

#[test]
fn ranged_read_matches_full_scan() {
    let install = scenario_install();
    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut NoProgress).unwrap();

    let path = install.root().join(format!("{DATA_PACKAGE}/cas_01.cas"));
    let full = CasBlockReader::open(&path)
        .unwrap()
        .read_all(None, &CasReadOptions::default())
        .unwrap();
    assert_eq!(full.len(), 1);

    reader.set_types(Arc::new(TypeTable::new()));
    let err = reader.get_resource("sound/x").unwrap_err();
    assert!(matches!(err, Error::Ebx(_)) || matches!(err, Error::Cas(_)));

    reader.set_types(sound_types());
    let ranged = reader.get_resource("sound/x").unwrap();
    assert_eq!(ranged.id, full[0].id);
    assert_eq!(ranged.name, full[0].name);
    assert_eq!(ranged.offset, full[0].offset);
    assert_eq!(ranged.size, full[0].size);
}

#[test]
fn build_cache_then_cold_read() {
    let install = Install::new();
    install.write(&format!("{DATA_PACKAGE}/cas_01.cas"), &common::container(&["A/One", "A/Two", "B/Three"]));
    install.write(&format!("{DATA_PACKAGE}/cas_02.cas"), &common::container(&["C/Four"]));
    install.write(&format!("{PATCH_PACKAGE}/cas_01.cas"), &common::container(&["A/Two"]));

    let mut built = GameResourceReader::new(config(&install));
    let built_index = built.read(&scan(&install, true), &mut NoProgress).unwrap();
    assert_eq!(built_index.len(), 5);
    assert!(CacheStore::new(install.cache_dir()).exists(CacheKind::Index));

    // Cold read of the cache alone, without the executable path.
    let mut messages = Vec::new();
    let mut sink = |p: Progress| messages.push(p.message);
    let mut cold = GameResourceReader::new(config(&install));
    let cold_index = cold.read(&ReadOptions::default(), &mut sink).unwrap();
    assert_eq!(messages, vec!["Cache found."]);
    assert_eq!(cold_index.records(), built_index.records());
    assert_eq!(cold.data().unwrap().len(), 5);
}

#[test]
fn patch_record_wins_over_data() {
    let install = Install::new();
    install.write(&format!("{DATA_PACKAGE}/cas_01.cas"), &common::container(&["Shared/Name", "Data/Only"]));
    install.write(&format!("{PATCH_PACKAGE}/cas_01.cas"), &common::container(&["shared/name"]));

    let mut reader = GameResourceReader::new(config(&install));
    let index = reader.read(&scan(&install, false), &mut NoProgress).unwrap();

    assert_eq!(index.len(), 3);
    assert!(index.records()[0].file.starts_with("Patch/"));
    assert_eq!(index.find("SHARED/NAME").unwrap().file, format!("{PATCH_PACKAGE}/cas_01.cas"));
    let data = reader.get_resource_data("Shared/Name").unwrap();
    assert!(data.starts_with(b"EBXD"));
}

#[test]
fn progress_messages_follow_the_scan() {
    let install = Install::new();
    install.write(&format!("{DATA_PACKAGE}/cas_01.cas"), &common::container(&["A"]));
    install.write(&format!("{PATCH_PACKAGE}/cas_01.cas"), &common::container(&["B"]));

    let mut events = Vec::new();
    let mut sink = |p: Progress| events.push(p);
    GameResourceReader::new(config(&install))
        .read(&scan(&install, true), &mut sink)
        .unwrap();

    let messages: Vec<String> = events.iter().map(|p| p.message.clone()).collect();
    let patch = install.root().join(format!("{PATCH_PACKAGE}/cas_01.cas"));
    let data = install.root().join(format!("{DATA_PACKAGE}/cas_01.cas"));
    let expected = vec![
        format!("[1/2]: Reading {}.", patch.display()),
        format!("[2/2]: Reading {}.", data.display()),
        "Finished reading CAS files.".to_string(),
        "Starting to build cache.".to_string(),
        "Cache built successfully.".to_string(),
    ];
    assert_eq!(messages, expected);

    let steps: Vec<(usize, usize)> = events.iter().map(|p| (p.current_step, p.total_steps)).collect();
    assert_eq!(steps, vec![(0, 2), (1, 2), (2, 2), (0, 1), (1, 1)]);
    assert_eq!(events[1].progress_percent, 50.0);
    assert_eq!(events[4].progress_percent, 100.0);
}

#[test]
fn cache_miss_rescans_without_saving() {
    let install = scenario_install();
    let (tx, rx) = crossbeam_channel::unbounded::<Progress>();
    let mut tx = tx;

    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut tx).unwrap();
    drop(tx);

    let messages: Vec<String> = rx.iter().map(|p| p.message).collect();
    assert_eq!(messages[0], "Cache not found. Reading from game files...");
    assert_eq!(messages.last().unwrap(), "Finished reading CAS files.");
    assert!(!CacheStore::new(install.cache_dir()).exists(CacheKind::Index));
}

#[test]
fn corrupt_cache_is_not_a_miss() {
    let install = scenario_install();
    std::fs::create_dir_all(install.cache_dir()).unwrap();
    std::fs::write(install.cache_dir().join("m22.cache"), b"not a cache").unwrap();

    let mut reader = GameResourceReader::new(config(&install));
    let err = reader.read(&scan(&install, false), &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::CacheCorrupt { kind: CacheKind::Index, .. }));
}

#[test]
fn lookup_errors() {
    let install = scenario_install();
    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut NoProgress).unwrap();

    assert!(matches!(reader.get_resource_data(""), Err(Error::Configuration(_))));
    assert!(matches!(reader.get_resource("sound/x"), Err(Error::Configuration(_))));
    match reader.get_resource_data("sound/y") {
        Err(Error::ResourceNotFound(name)) => assert_eq!(name, "sound/y"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_partition_is_fatal() {
    let install = Install::new();
    std::fs::remove_dir_all(install.root().join("Data")).unwrap();

    let mut reader = GameResourceReader::new(config(&install));
    let err = reader.read(&scan(&install, true), &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::Cas(_)));
    assert!(!CacheStore::new(install.cache_dir()).exists(CacheKind::Index));
}

#[test]
fn failed_rescan_keeps_the_previous_install() {
    let install = scenario_install();
    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut NoProgress).unwrap();

    let elsewhere = Install::new();
    std::fs::remove_dir_all(elsewhere.root().join("Data")).unwrap();
    let err = reader.read(&scan(&elsewhere, true), &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::Cas(_)));

    // Lookups still resolve against the install the index was read from.
    assert_eq!(reader.get_resource_data("sound/x").unwrap().len(), 546);
}

#[test]
fn concurrent_lookups_share_the_index() {
    let install = scenario_install();
    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut NoProgress).unwrap();
    reader.set_types(sound_types());

    let reader = &reader;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || reader.get_resource_data("Sound/X").unwrap().len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 546);
        }
    });
}

#[test]
fn tree_groups_names() {
    let install = Install::new();
    install.write(
        &format!("{DATA_PACKAGE}/cas_01.cas"),
        &common::container(&["Sound/Crowd/Cheer", "Sound/Crowd/Boo", "Players/QB"]),
    );

    let mut reader = GameResourceReader::new(config(&install));
    reader.read(&scan(&install, false), &mut NoProgress).unwrap();

    let tree = reader.data().unwrap().tree();
    assert_eq!(tree.resource_count(), 3);
    assert_eq!(tree.get("Sound/Crowd").unwrap().children.len(), 2);
}
