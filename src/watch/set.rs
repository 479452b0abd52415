//! Ordered collection of watchers with file persistence

use super::watcher::Watcher;
use crate::core::types::{ScanError, ScanResult};
use crate::process::ProcessMemory;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// The ordered watch list.
///
/// Insertion preserves order and refuses duplicates, where duplicate
/// means the same address, width, and representation. Descriptions are
/// free text except for the characters the file format reserves.
#[derive(Debug, Clone, Default)]
pub struct WatcherSet {
    watchers: Vec<Watcher>,
}

impl WatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Watcher> {
        self.watchers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Watcher> {
        self.watchers.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Watcher> {
        self.watchers.iter()
    }

    pub fn contains(&self, watcher: &Watcher) -> bool {
        self.watchers.iter().any(|w| w.same_slot(watcher))
    }

    /// Adds a watcher and caches its first value. Returns false when an
    /// equivalent watcher is already present.
    pub fn insert(&mut self, mut watcher: Watcher, mem: &dyn ProcessMemory) -> ScanResult<bool> {
        if watcher.description.contains(['\t', '\n', '\r']) {
            return Err(ScanError::WatchDescription(watcher.description));
        }
        if self.contains(&watcher) {
            debug!(address = %watcher.address, "watcher already present");
            return Ok(false);
        }
        watcher.prime(mem);
        self.watchers.push(watcher);
        Ok(true)
    }

    /// Refreshes every cached value; returns how many changed
    pub fn update_all(&mut self, mem: &dyn ProcessMemory) -> usize {
        self.watchers
            .iter_mut()
            .map(|w| w.update(mem))
            .filter(|changed| *changed)
            .count()
    }

    pub fn remove(&mut self, index: usize) -> Option<Watcher> {
        if index < self.watchers.len() {
            Some(self.watchers.remove(index))
        } else {
            None
        }
    }

    /// Removes the watcher occupying the same slot, if any
    pub fn remove_matching(&mut self, watcher: &Watcher) -> Option<Watcher> {
        let index = self.watchers.iter().position(|w| w.same_slot(watcher))?;
        Some(self.watchers.remove(index))
    }

    pub fn clear(&mut self) {
        self.watchers.clear();
    }

    /// Writes the list in the watch file format: a mode line, a count
    /// line, then one record per watcher.
    pub fn save(&self, path: impl AsRef<Path>) -> ScanResult<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        writeln!(out, "0")?;
        writeln!(out, "{}", self.watchers.len())?;
        for watcher in &self.watchers {
            writeln!(out, "{}", watcher.serialize())?;
        }
        out.flush()?;
        debug!(count = self.watchers.len(), path = %path.as_ref().display(), "watch list saved");
        Ok(())
    }

    /// Appends the records from a watch file, skipping duplicates, and
    /// caches each new watcher's first value. Returns how many were
    /// added.
    pub fn load(&mut self, path: impl AsRef<Path>, mem: &dyn ProcessMemory) -> ScanResult<usize> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut lines = reader.lines();

        // mode line, currently always "0"
        let _mode = lines.next().transpose()?;
        let count_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| ScanError::WatchFile("missing count line".to_string()))?;
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| ScanError::WatchFile(count_line.clone()))?;

        let mut added = 0;
        let mut remaining = count;
        for line in lines {
            if remaining == 0 {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            remaining -= 1;
            let mut watcher = Watcher::deserialize(&line)?;
            if self.contains(&watcher) {
                warn!(address = %watcher.address, "skipping duplicate watcher");
                continue;
            }
            watcher.prime(mem);
            self.watchers.push(watcher);
            added += 1;
        }
        if remaining > 0 {
            return Err(ScanError::WatchFile(format!(
                "expected {} records, file ended after {}",
                count,
                count - remaining
            )));
        }
        debug!(added, path = %path.as_ref().display(), "watch list loaded");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, Representation, Value, Width};
    use crate::process::mock::MockProcess;

    fn mem() -> MockProcess {
        MockProcess::with_page(Address::new(0x1000), vec![1, 2, 3, 4, 5, 6, 7, 8])
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let p = mem();
        let mut set = WatcherSet::new();
        let w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Unsigned);
        assert!(set.insert(w.clone(), &p).unwrap());
        assert!(!set.insert(w, &p).unwrap());
        assert_eq!(set.len(), 1);

        // different width is a different slot
        let wide = Watcher::new(Address::new(0x1000), Width::W16, Representation::Unsigned);
        assert!(set.insert(wide, &p).unwrap());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_insert_rejects_reserved_characters() {
        let p = mem();
        let mut set = WatcherSet::new();
        let w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Unsigned)
            .with_description("a\tb");
        assert!(matches!(
            set.insert(w, &p),
            Err(ScanError::WatchDescription(_))
        ));
    }

    #[test]
    fn test_insert_caches_value() {
        let p = mem();
        let mut set = WatcherSet::new();
        set.insert(
            Watcher::new(Address::new(0x1002), Width::W8, Representation::Unsigned),
            &p,
        )
        .unwrap();
        assert_eq!(set.get(0).unwrap().value(), Value::I32(3));
    }

    #[test]
    fn test_update_all_counts_changes() {
        let p = mem();
        let mut set = WatcherSet::new();
        for i in 0..4 {
            set.insert(
                Watcher::new(Address::new(0x1000 + i), Width::W8, Representation::Unsigned),
                &p,
            )
            .unwrap();
        }
        assert_eq!(set.update_all(&p), 0);

        p.poke(Address::new(0x1001), &[0xAA]);
        p.poke(Address::new(0x1003), &[0xBB]);
        assert_eq!(set.update_all(&p), 2);
        assert!(set.get(1).unwrap().has_changed());
        assert!(!set.get(0).unwrap().has_changed());
    }

    #[test]
    fn test_remove_matching() {
        let p = mem();
        let mut set = WatcherSet::new();
        let w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Unsigned);
        set.insert(w.clone(), &p).unwrap();
        assert!(set.remove_matching(&w).is_some());
        assert!(set.remove_matching(&w).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let p = mem();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watches.wch");

        let mut set = WatcherSet::new();
        set.insert(
            Watcher::new(Address::new(0x1000), Width::W16, Representation::Signed)
                .with_description("first"),
            &p,
        )
        .unwrap();
        set.insert(
            Watcher::new(Address::new(0x1004), Width::W32, Representation::Hex),
            &p,
        )
        .unwrap();
        set.save(&path).unwrap();

        let mut loaded = WatcherSet::new();
        assert_eq!(loaded.load(&path, &p).unwrap(), 2);
        assert_eq!(loaded.len(), 2);
        let first = loaded.get(0).unwrap();
        assert_eq!(first.address, Address::new(0x1000));
        assert_eq!(first.width, Width::W16);
        assert_eq!(first.description, "first");
        // values are cached at load time
        assert_eq!(loaded.get(1).unwrap().value(), Value::I32(0x08070605));
    }

    #[test]
    fn test_load_skips_duplicates_already_present() {
        let p = mem();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watches.wch");

        let mut set = WatcherSet::new();
        let w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Unsigned);
        set.insert(w, &p).unwrap();
        set.save(&path).unwrap();

        // loading the same file back adds nothing
        assert_eq!(set.load(&path, &p).unwrap(), 0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let p = mem();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watches.wch");
        std::fs::write(&path, "0\n3\n12345\t00001000\t1\tu\tl\tonly one\n").unwrap();

        let mut set = WatcherSet::new();
        assert!(matches!(
            set.load(&path, &p),
            Err(ScanError::WatchFile(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let p = mem();
        let mut set = WatcherSet::new();
        assert!(matches!(
            set.load("/nonexistent/watches.wch", &p),
            Err(ScanError::Io(_))
        ));
    }
}
