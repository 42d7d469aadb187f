pub mod codec;
pub mod queries;
pub mod tables;

use redb::{
    Database, Error as RedbError, ReadTransaction, ReadableDatabase, ReadableMultimapTable,
    ReadableTable, Table, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

pub use codec::{decode, encode};

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> std::result::Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            tracing::error!("Failed to create database directory: {}", e);
            RedbError::Io(e)
        })?;
    }

    let db = Database::create(path)?;
    init_tables(&db)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Create every table by opening it once inside a write transaction
#[allow(clippy::result_large_err)]
pub fn init_tables(db: &Database) -> std::result::Result<(), RedbError> {
    use tables::*;

    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(SEQUENCES)?;
        let _ = write_txn.open_table(USERS)?;
        let _ = write_txn.open_table(USER_PHONES)?;
        let _ = write_txn.open_table(USER_INVITE_CODES)?;
        let _ = write_txn.open_multimap_table(USER_INVITEES)?;
        let _ = write_txn.open_table(SESSIONS)?;
        let _ = write_txn.open_table(LEVELS)?;
        let _ = write_txn.open_table(LEVEL_NAMES)?;
        let _ = write_txn.open_table(USER_LEVELS)?;
        let _ = write_txn.open_multimap_table(USER_LEVEL_INDEX)?;
        let _ = write_txn.open_table(DEPOSITS)?;
        let _ = write_txn.open_multimap_table(USER_DEPOSITS)?;
        let _ = write_txn.open_table(WITHDRAWALS)?;
        let _ = write_txn.open_multimap_table(USER_WITHDRAWALS)?;
        let _ = write_txn.open_table(TASKS)?;
        let _ = write_txn.open_multimap_table(USER_TASKS)?;
        let _ = write_txn.open_table(ROULETTE_SPINS)?;
        let _ = write_txn.open_multimap_table(USER_SPINS)?;
        let _ = write_txn.open_table(REWARD_CODES)?;
        let _ = write_txn.open_table(REWARD_CODE_NAMES)?;
        let _ = write_txn.open_table(REWARD_CLAIMS)?;
        let _ = write_txn.open_table(BANK_DETAILS)?;
        let _ = write_txn.open_table(PLATFORM_BANK_ACCOUNTS)?;
        let _ = write_txn.open_table(SETTINGS)?;
    }
    write_txn.commit()?;

    Ok(())
}

/// Run `f` inside a read transaction on the blocking pool
pub async fn read<T, F>(db: &Db, f: F) -> Result<T>
where
    F: FnOnce(&ReadTransaction) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let read_txn = db.begin_read()?;
        f(&read_txn)
    })
    .await?
}

/// Run `f` inside a write transaction on the blocking pool
///
/// The transaction commits when `f` returns `Ok` and is aborted otherwise,
/// so a rule that fails halfway leaves no partial balance update behind.
/// redb admits one writer at a time, which serializes every
/// check-then-update sequence run through here.
pub async fn write<T, F>(db: &Db, f: F) -> Result<T>
where
    F: FnOnce(&WriteTransaction) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let write_txn = db.begin_write()?;
        match f(&write_txn) {
            Ok(value) => {
                write_txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort()?;
                Err(e)
            }
        }
    })
    .await?
}

/// Issue the next id for a record table
pub fn next_id(write_txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut sequences = write_txn.open_table(tables::SEQUENCES)?;
    let next = sequences.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    sequences.insert(sequence, next)?;
    Ok(next)
}

/// Fetch and decode one record by id
pub fn get_record<T, Tbl>(table: &Tbl, id: u64) -> Result<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<u64, &'static [u8]>,
{
    table.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

pub fn put_record<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    record: &T,
) -> Result<()> {
    let bytes = encode(record)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

/// Ids filed under `owner` in a multimap index, ascending
pub fn index_ids<Tbl>(index: &Tbl, owner: u64) -> Result<Vec<u64>>
where
    Tbl: ReadableMultimapTable<u64, u64>,
{
    let mut ids = Vec::new();
    for id in index.get(owner)? {
        ids.push(id?.value());
    }
    Ok(ids)
}

/// Decode the records for `ids`, skipping ids with no row
pub fn load_records<T, Tbl>(table: &Tbl, ids: &[u64]) -> Result<Vec<(u64, T)>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<u64, &'static [u8]>,
{
    let mut records = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(record) = get_record(table, id)? {
            records.push((id, record));
        }
    }
    Ok(records)
}

/// Decode every record of a table, in id order
pub fn all_records<T, Tbl>(table: &Tbl) -> Result<Vec<(u64, T)>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<u64, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (id, bytes) = entry?;
        records.push((id.value(), decode(bytes.value())?));
    }
    Ok(records)
}

/// Fetch and decode a singleton settings record
pub fn get_setting<T, Tbl>(table: &Tbl, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    table.get(key)?.map(|bytes| decode(bytes.value())).transpose()
}
