//! Transactional adapter over the redb key-value engine.

use crate::error::StorageResult;
use crate::path::ContainerPath;
use redb::{ReadableTable, TableDefinition, TableError, TableHandle};
use std::path::Path;

type RawTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

/// All key-value pairs of one container, in key order.
pub type Entries = Vec<(Vec<u8>, Vec<u8>)>;

/// Read access shared by snapshot and write transactions.
pub trait KvRead {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    fn get(&self, container: &ContainerPath, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Returns every pair in the container, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    fn entries(&self, container: &ContainerPath) -> StorageResult<Entries>;
}

/// An ordered, transactional key-value engine with nested containers.
///
/// One write transaction may be open at a time; read transactions see the
/// last committed state and run concurrently with the writer.
pub struct Engine {
    db: redb::Database,
}

impl Engine {
    /// Opens the database file at `path`, creating it (and missing parent
    /// directories) if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file is
    /// not a valid database.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        Ok(Self { db })
    }

    /// Opens an existing database file, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a valid database.
    pub fn open_existing(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("database file {} does not exist", path.display()),
            )
            .into());
        }
        let db = redb::Database::open(path)?;
        Ok(Self { db })
    }

    /// Creates a database that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to initialize.
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self { db })
    }

    /// Starts a read-only snapshot transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a transaction.
    pub fn begin_read(&self) -> StorageResult<ReadTxn> {
        Ok(ReadTxn {
            txn: self.db.begin_read()?,
        })
    }

    /// Starts the write transaction, blocking until any other writer is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a transaction.
    pub fn begin_write(&self) -> StorageResult<WriteTxn> {
        Ok(WriteTxn {
            txn: self.db.begin_write()?,
        })
    }
}

/// A read-only snapshot. Missing containers read as empty.
pub struct ReadTxn {
    txn: redb::ReadTransaction,
}

impl ReadTxn {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    pub fn get(&self, container: &ContainerPath, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let name = container.table_name();
        let table = match self.txn.open_table(RawTable::new(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Returns every pair in the container, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    pub fn entries(&self, container: &ContainerPath) -> StorageResult<Entries> {
        let name = container.table_name();
        let table = match self.txn.open_table(RawTable::new(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        collect_entries(&table)
    }

    /// Whether the container has been created.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    pub fn contains_container(&self, container: &ContainerPath) -> StorageResult<bool> {
        let name = container.table_name();
        match self.txn.open_table(RawTable::new(&name)) {
            Ok(_) => Ok(true),
            Err(TableError::TableDoesNotExist(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// The single write transaction.
///
/// Dropping it without calling [`WriteTxn::commit`] discards every change.
pub struct WriteTxn {
    txn: redb::WriteTransaction,
}

impl WriteTxn {
    /// Creates the container if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to create the table.
    pub fn create_container(&mut self, container: &ContainerPath) -> StorageResult<()> {
        let name = container.table_name();
        self.txn.open_table(RawTable::new(&name))?;
        Ok(())
    }

    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    pub fn get(&self, container: &ContainerPath, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let name = container.table_name();
        let table = self.txn.open_table(RawTable::new(&name))?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to write.
    pub fn put(&mut self, container: &ContainerPath, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let name = container.table_name();
        let mut table = self.txn.open_table(RawTable::new(&name))?;
        table.insert(key, value)?;
        Ok(())
    }

    /// Removes `key`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to write.
    pub fn delete(&mut self, container: &ContainerPath, key: &[u8]) -> StorageResult<bool> {
        let name = container.table_name();
        let mut table = self.txn.open_table(RawTable::new(&name))?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }

    /// Returns every pair in the container, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read.
    pub fn entries(&self, container: &ContainerPath) -> StorageResult<Entries> {
        let name = container.table_name();
        let table = self.txn.open_table(RawTable::new(&name))?;
        collect_entries(&table)
    }

    /// Drops the container together with every container nested in it.
    /// Returns whether the container itself existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to delete a table.
    pub fn delete_container(&mut self, container: &ContainerPath) -> StorageResult<bool> {
        let descendants: Vec<String> = self
            .txn
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .filter(|name| container.is_ancestor_of_table(name))
            .collect();
        for name in &descendants {
            self.txn.delete_table(RawTable::new(name))?;
        }
        let name = container.table_name();
        Ok(self.txn.delete_table(RawTable::new(&name))?)
    }

    /// Makes every change durable and visible to new readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is applied in that case.
    pub fn commit(self) -> StorageResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discards every change.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to roll back.
    pub fn abort(self) -> StorageResult<()> {
        self.txn.abort()?;
        Ok(())
    }
}

impl KvRead for ReadTxn {
    fn get(&self, container: &ContainerPath, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        ReadTxn::get(self, container, key)
    }

    fn entries(&self, container: &ContainerPath) -> StorageResult<Entries> {
        ReadTxn::entries(self, container)
    }
}

impl KvRead for WriteTxn {
    fn get(&self, container: &ContainerPath, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        WriteTxn::get(self, container, key)
    }

    fn entries(&self, container: &ContainerPath) -> StorageResult<Entries> {
        WriteTxn::entries(self, container)
    }
}

fn collect_entries<T>(table: &T) -> StorageResult<Entries>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut entries = Vec::new();
    for item in table.iter()? {
        let (key, value) = item?;
        entries.push((key.value().to_vec(), value.value().to_vec()));
    }
    Ok(entries)
}
