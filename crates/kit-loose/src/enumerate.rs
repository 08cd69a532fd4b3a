use std::fs;

use kit_hash::ObjectId;

use crate::LooseObjectStore;

/// Iterator over every object OID present in the loose object store.
///
/// Walks the two-level fan-out directory structure (`objects/XX/YYYY...`)
/// eagerly, collecting OIDs up front; the object count in a working
/// repository is small enough that this is simpler than a lazy walker.
pub struct LooseObjectIter {
    oids: std::vec::IntoIter<ObjectId>,
}

impl LooseObjectIter {
    pub(crate) fn new(store: &LooseObjectStore) -> std::io::Result<Self> {
        let mut oids = Vec::new();
        let objects_dir = &store.objects_dir;

        let top_entries = match fs::read_dir(objects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { oids: Vec::new().into_iter() });
            }
            Err(e) => return Err(e),
        };

        for top in top_entries {
            let top = top?;
            if !top.file_type()?.is_dir() {
                continue;
            }
            let fanout_name = top.file_name();
            let fanout = match fanout_name.to_str() {
                Some(s) if s.len() == 2 && s.bytes().all(|b| b.is_ascii_hexdigit()) => s,
                _ => continue,
            };

            for entry in fs::read_dir(top.path())? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let rest_name = entry.file_name();
                let rest = match rest_name.to_str() {
                    Some(s) if s.len() == 38 && s.bytes().all(|b| b.is_ascii_hexdigit()) => s,
                    _ => continue,
                };
                if let Ok(oid) = ObjectId::from_hex(&format!("{fanout}{rest}")) {
                    oids.push(oid);
                }
            }
        }

        oids.sort();
        Ok(Self { oids: oids.into_iter() })
    }
}

impl Iterator for LooseObjectIter {
    type Item = ObjectId;

    fn next(&mut self) -> Option<Self::Item> {
        self.oids.next()
    }
}

impl LooseObjectStore {
    /// Iterate over every OID present in the loose store.
    pub fn iter_oids(&self) -> std::io::Result<LooseObjectIter> {
        LooseObjectIter::new(self)
    }
}
