//! Object database: the content-addressed store of blobs, trees, and commits.
//!
//! Wraps a [`kit_loose::LooseObjectStore`] with the put/get/exists/iterate
//! contract the rest of the engine depends on. There is no packfile or
//! alternates support: every object this engine ever writes lives as its own
//! loose, zlib-compressed file under `objects/`.

use std::path::{Path, PathBuf};

use kit_hash::{HashAlgorithm, ObjectId};
use kit_loose::LooseObjectStore;
use kit_object::{Object, ObjectType};

/// Header information about an object without reading its full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// The object database for a single repository.
pub struct ObjectDatabase {
    loose: LooseObjectStore,
    objects_dir: PathBuf,
}

impl ObjectDatabase {
    /// Open the object database at `objects_dir`, using SHA-1.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        Self::open_with_algo(objects_dir, HashAlgorithm::Sha1)
    }

    /// Open the object database with an explicit hash algorithm.
    pub fn open_with_algo(
        objects_dir: impl AsRef<Path>,
        hash_algo: HashAlgorithm,
    ) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        Ok(Self {
            loose: LooseObjectStore::open(&objects_dir, hash_algo),
            objects_dir,
        })
    }

    /// Read and parse an object. Returns `Ok(None)` if it does not exist.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        Ok(self.loose.read(oid)?)
    }

    /// Read just the type and size of an object without parsing its content.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        match self.loose.read_header(oid)? {
            Some((obj_type, size)) => Ok(Some(ObjectInfo { obj_type, size })),
            None => Ok(None),
        }
    }

    /// Check whether an object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.loose.contains(oid)
    }

    /// Write an object, returning its OID. Idempotent: writing an object
    /// whose OID already exists is a no-op.
    pub fn write(&self, obj: &Object) -> Result<ObjectId, OdbError> {
        Ok(self.loose.write(obj)?)
    }

    /// Write raw content with a known type, returning its OID.
    pub fn write_raw(&self, obj_type: ObjectType, content: &[u8]) -> Result<ObjectId, OdbError> {
        Ok(self.loose.write_raw(obj_type, content)?)
    }

    /// Iterate over every OID in the store, in ascending order.
    pub fn iter_all_oids(&self) -> Result<impl Iterator<Item = ObjectId>, OdbError> {
        Ok(self.loose.iter_oids()?)
    }

    /// Resolve an abbreviated hex prefix to a full OID.
    ///
    /// Errors if no object matches, or if more than one does.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId, OdbError> {
        if prefix.len() < 4 || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OdbError::NotFound);
        }
        if prefix.len() == 40 {
            return ObjectId::from_hex(prefix).map_err(|_| OdbError::NotFound);
        }

        let prefix_lower = prefix.to_ascii_lowercase();
        let mut matches = self
            .iter_all_oids()?
            .filter(|oid| oid.to_hex().starts_with(&prefix_lower));

        let first = matches.next().ok_or(OdbError::NotFound)?;
        if matches.next().is_some() {
            return Err(OdbError::Ambiguous {
                prefix: prefix.to_string(),
            });
        }
        Ok(first)
    }

    /// The path to the `objects/` directory backing this database.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// The hash algorithm in use.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.loose.hash_algo()
    }
}

/// Errors produced by object database operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found")]
    NotFound,

    #[error("ambiguous object prefix: {prefix} matches more than one object")]
    Ambiguous { prefix: String },

    #[error(transparent)]
    Loose(#[from] kit_loose::LooseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use kit_object::Blob;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let obj = Object::Blob(Blob::new(b"hello".to_vec()));
        let oid = odb.write(&obj).unwrap();

        let read_back = odb.read(&oid).unwrap().unwrap();
        assert_eq!(read_back, obj);
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let oid1 = odb.write_raw(ObjectType::Blob, b"same content").unwrap();
        let oid2 = odb.write_raw(ObjectType::Blob, b"same content").unwrap();
        assert_eq!(oid1, oid2);
    }

    #[test]
    fn missing_object_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let oid = ObjectId::from_hex("0000000000000000000000000000000000000000").unwrap();
        assert!(odb.read(&oid).unwrap().is_none());
        assert!(!odb.contains(&oid));
    }

    #[test]
    fn read_header_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let content = b"header check";
        let oid = odb.write_raw(ObjectType::Blob, content).unwrap();

        let info = odb.read_header(&oid).unwrap().unwrap();
        assert_eq!(info.obj_type, ObjectType::Blob);
        assert_eq!(info.size, content.len());
    }

    #[test]
    fn iter_all_oids_sees_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let a = odb.write_raw(ObjectType::Blob, b"a").unwrap();
        let b = odb.write_raw(ObjectType::Blob, b"b").unwrap();

        let mut seen: Vec<_> = odb.iter_all_oids().unwrap().collect();
        seen.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn resolve_prefix_unique() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let oid = odb.write_raw(ObjectType::Blob, b"prefix me").unwrap();
        let hex = oid.to_hex();
        let resolved = odb.resolve_prefix(&hex[..8]).unwrap();
        assert_eq!(resolved, oid);
    }

    #[test]
    fn resolve_prefix_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        assert!(matches!(
            odb.resolve_prefix("deadbeef"),
            Err(OdbError::NotFound)
        ));
    }
}
