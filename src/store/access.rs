//! In-process operation surface
//!
//! Transport layers and the booking workflow are written against
//! `RecordAccess` rather than `RecordStore`, so they can be driven by any
//! implementation of the same contract.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::lock::LockToken;
use crate::schema::Schema;

use super::RecordStore;

/// The record store operation set
pub trait RecordAccess: Send + Sync {
    fn schema(&self) -> &Schema;

    fn config(&self) -> &StoreConfig;

    fn create(&self, fields: &[String]) -> StoreResult<u32>;

    fn read(&self, record_number: u32) -> StoreResult<Vec<String>>;

    fn update(&self, record_number: u32, fields: &[String], token: LockToken) -> StoreResult<()>;

    fn delete(&self, record_number: u32, token: LockToken) -> StoreResult<()>;

    fn find(&self, criteria: &[Option<String>]) -> StoreResult<Vec<u32>>;

    fn lock(&self, record_number: u32) -> StoreResult<LockToken>;

    fn unlock(&self, record_number: u32, token: LockToken) -> StoreResult<()>;

    fn key_projection(&self, fields: &[String]) -> StoreResult<Vec<Option<String>>>;
}

impl RecordAccess for RecordStore {
    fn schema(&self) -> &Schema {
        RecordStore::schema(self)
    }

    fn config(&self) -> &StoreConfig {
        RecordStore::config(self)
    }

    fn create(&self, fields: &[String]) -> StoreResult<u32> {
        RecordStore::create(self, fields)
    }

    fn read(&self, record_number: u32) -> StoreResult<Vec<String>> {
        RecordStore::read(self, record_number)
    }

    fn update(&self, record_number: u32, fields: &[String], token: LockToken) -> StoreResult<()> {
        RecordStore::update(self, record_number, fields, token)
    }

    fn delete(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        RecordStore::delete(self, record_number, token)
    }

    fn find(&self, criteria: &[Option<String>]) -> StoreResult<Vec<u32>> {
        RecordStore::find(self, criteria)
    }

    fn lock(&self, record_number: u32) -> StoreResult<LockToken> {
        RecordStore::lock(self, record_number)
    }

    fn unlock(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        RecordStore::unlock(self, record_number, token)
    }

    fn key_projection(&self, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        RecordStore::key_projection(self, fields)
    }
}

macro_rules! forward_access {
    ($($wrapper:ty),*) => {$(
        impl<T: RecordAccess + ?Sized> RecordAccess for $wrapper {
            fn schema(&self) -> &Schema {
                (**self).schema()
            }

            fn config(&self) -> &StoreConfig {
                (**self).config()
            }

            fn create(&self, fields: &[String]) -> StoreResult<u32> {
                (**self).create(fields)
            }

            fn read(&self, record_number: u32) -> StoreResult<Vec<String>> {
                (**self).read(record_number)
            }

            fn update(&self, record_number: u32, fields: &[String], token: LockToken) -> StoreResult<()> {
                (**self).update(record_number, fields, token)
            }

            fn delete(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
                (**self).delete(record_number, token)
            }

            fn find(&self, criteria: &[Option<String>]) -> StoreResult<Vec<u32>> {
                (**self).find(criteria)
            }

            fn lock(&self, record_number: u32) -> StoreResult<LockToken> {
                (**self).lock(record_number)
            }

            fn unlock(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
                (**self).unlock(record_number, token)
            }

            fn key_projection(&self, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
                (**self).key_projection(fields)
            }
        }
    )*};
}

forward_access!(&T, Arc<T>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use tempfile::TempDir;

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_trait_object_drives_store() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::new(vec![FieldDef::new("name", 8), FieldDef::new("owner", 8)]).unwrap();
        let store = RecordStore::create_file(&dir.path().join("db.dat"), StoreConfig::new(7), &schema).unwrap();
        let access: Arc<dyn RecordAccess> = Arc::new(store);

        let n = access.create(&fields(&["Acme", ""])).unwrap();
        let token = access.lock(n).unwrap();
        access.update(n, &fields(&["Acme", "42"]), token).unwrap();
        access.unlock(n, token).unwrap();

        assert_eq!(access.read(n).unwrap(), fields(&["Acme", "42"]));
        assert_eq!(access.find(&[Some("Ac".to_string()), None]).unwrap(), vec![n]);
        assert_eq!(access.schema().field_count(), 2);
    }

    #[test]
    fn test_reference_forwards() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::new(vec![FieldDef::new("name", 8)]).unwrap();
        let store = RecordStore::create_file(&dir.path().join("db.dat"), StoreConfig::new(7), &schema).unwrap();

        fn count<A: RecordAccess>(access: A) -> usize {
            access.find(&[None]).unwrap().len()
        }

        store.create(&["a"]).unwrap();
        assert_eq!(count(&store), 1);
    }
}
