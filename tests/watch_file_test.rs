//! Watch list persistence against real files

use pretty_assertions::assert_eq;
use ram_probe::core::types::{Address, Endianness, Representation, Value, Width};
use ram_probe::process::mock::MockProcess;
use ram_probe::watch::{Watcher, WatcherSet};

fn target() -> MockProcess {
    let data: Vec<u8> = (0u8..64).collect();
    MockProcess::with_page(Address::new(0x2000), data)
}

#[test]
fn test_save_then_load_preserves_slots_and_values() {
    let mem = target();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.wch");

    let mut set = WatcherSet::new();
    set.insert(
        Watcher::new(Address::new(0x2000), Width::W32, Representation::Hex)
            .with_description("header"),
        &mem,
    )
    .unwrap();
    set.insert(
        Watcher::new(Address::new(0x2010), Width::W8, Representation::Signed),
        &mem,
    )
    .unwrap();
    set.save(&path).unwrap();

    let mut loaded = WatcherSet::new();
    let added = loaded.load(&path, &mem).unwrap();
    assert_eq!(added, 2);

    let first = loaded.get(0).unwrap();
    assert_eq!(first.address, Address::new(0x2000));
    assert_eq!(first.width, Width::W32);
    assert_eq!(first.representation, Representation::Hex);
    assert_eq!(first.description, "header");
    assert_eq!(first.value(), Value::I32(0x03020100));

    let second = loaded.get(1).unwrap();
    assert_eq!(second.width, Width::W8);
    assert_eq!(second.value(), Value::I32(0x10));
}

#[test]
fn test_load_skips_records_already_watched() {
    let mem = target();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.wch");

    let mut set = WatcherSet::new();
    set.insert(
        Watcher::new(Address::new(0x2004), Width::W16, Representation::Unsigned),
        &mem,
    )
    .unwrap();
    set.save(&path).unwrap();

    let added = set.load(&path, &mem).unwrap();
    assert_eq!(added, 0);
    assert_eq!(set.len(), 1);
}

#[test]
fn test_file_format_is_stable() {
    let mem = target();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("format.wch");

    let mut set = WatcherSet::new();
    set.insert(
        Watcher::new(Address::new(0xABCD), Width::W16, Representation::Hex)
            .with_description("timer"),
        &mem,
    )
    .unwrap();
    set.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "0\n1\n12345\t0000ABCD\t2\th\tl\ttimer\n");
}

#[test]
fn test_loaded_endianness_is_always_little() {
    let mem = target();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endian.wch");

    std::fs::write(&path, "0\n1\n12345\t00002008\t4\tu\tb\t\n").unwrap();

    let mut set = WatcherSet::new();
    set.load(&path, &mem).unwrap();
    assert_eq!(set.get(0).unwrap().endianness, Endianness::Little);
}

#[test]
fn test_update_all_reports_changes() {
    let mem = target();
    let mut set = WatcherSet::new();
    set.insert(
        Watcher::new(Address::new(0x2020), Width::W8, Representation::Unsigned),
        &mem,
    )
    .unwrap();
    set.insert(
        Watcher::new(Address::new(0x2030), Width::W8, Representation::Unsigned),
        &mem,
    )
    .unwrap();

    assert_eq!(set.update_all(&mem), 0);
    mem.poke(Address::new(0x2020), &[0xEE]);
    assert_eq!(set.update_all(&mem), 1);
    assert!(set.get(0).unwrap().has_changed());
    assert!(!set.get(1).unwrap().has_changed());
}

#[test]
fn test_truncated_file_is_rejected() {
    let mem = target();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.wch");

    std::fs::write(&path, "0\n3\n12345\t00002000\t1\tu\tl\t\n").unwrap();

    let mut set = WatcherSet::new();
    assert!(set.load(&path, &mem).is_err());
}
