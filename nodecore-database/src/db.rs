use rocksdb::{DBWithThreadMode, MultiThreaded, Options};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

/// The concrete RocksDB handle type used by every store in the node.
pub struct DB {
    inner: DBWithThreadMode<MultiThreaded>,
}

impl DB {
    pub fn new(inner: DBWithThreadMode<MultiThreaded>) -> Self {
        Self { inner }
    }
}

impl Deref for DB {
    type Target = DBWithThreadMode<MultiThreaded>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for DB {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Opens (creating if absent) the RocksDB instance backing the blockchain
/// store, UTXO store and tx-meta store.
pub fn open_db(db_dir: impl AsRef<Path>, create_if_missing: bool, max_open_files: i32) -> Arc<DB> {
    let mut opts = Options::default();
    opts.create_if_missing(create_if_missing);
    opts.create_missing_column_families(true);
    opts.set_max_open_files(max_open_files);
    opts.increase_parallelism(num_cpus());
    let inner = DBWithThreadMode::<MultiThreaded>::open(&opts, db_dir).expect("failed to open database");
    Arc::new(DB::new(inner))
}

fn num_cpus() -> i32 {
    std::thread::available_parallelism().map(|n| n.get() as i32).unwrap_or(1)
}

/// Deletes an existing DB directory if it exists.
pub fn delete_db(db_dir: impl AsRef<Path>) {
    let db_dir = db_dir.as_ref();
    if !db_dir.exists() {
        return;
    }
    let options = Options::default();
    <DBWithThreadMode<MultiThreaded>>::destroy(&options, db_dir).expect("DB is expected to be deletable");
}
