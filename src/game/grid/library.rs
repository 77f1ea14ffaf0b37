//! Map templates loaded from disk at startup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::game::grid::export::ExportedMap;
use crate::game::grid::map::Map;

/// Read-only set of template maps keyed by `info.id`.
#[derive(Debug, Clone, Default)]
pub struct MapLibrary {
    maps: HashMap<String, Map>,
}

impl MapLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` ExportedMap in `dir`. Invalid files are skipped.
    pub fn load_dir(dir: &Path) -> Self {
        let mut library = Self::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("[MapLibrary] Cannot read map directory {}: {}", dir.display(), e);
                return library;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| ExportedMap::from_json(&json).map_err(|e| e.to_string()));
            match loaded {
                Ok(map) => library.insert(map),
                Err(e) => warn!("[MapLibrary] Skipping {}: {}", path.display(), e),
            }
        }
        info!("[MapLibrary] Loaded {} map template(s) from {}", library.len(), dir.display());
        library
    }

    /// Add a template; its id falls back to the map name when empty.
    pub fn insert(&mut self, map: Map) {
        let id = if map.info().id.is_empty() { map.info().name.clone() } else { map.info().id.clone() };
        self.maps.insert(id, map);
    }

    /// A fresh copy of the template, ready to be played on.
    pub fn get(&self, id: &str) -> Option<Map> {
        self.maps.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Block;
    use crate::game::types::{MapInfo, MapSize};

    #[test]
    fn insert_and_get_clone() {
        let mut library = MapLibrary::new();
        let info = MapInfo { id: "arena".into(), name: "Arena".into(), desc: String::new() };
        library.insert(Map::filled(MapSize::new(2, 2), info, Block::blank()));
        assert_eq!(library.len(), 1);
        assert!(library.get("arena").is_some());
        assert!(library.get("missing").is_none());
    }

    #[test]
    fn missing_directory_gives_empty_library() {
        let library = MapLibrary::load_dir(Path::new("/definitely/not/a/map/dir"));
        assert!(library.is_empty());
    }
}
