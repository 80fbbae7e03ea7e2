//! Eligibility records by address

use std::sync::Arc;

use coinsensus_sybil::{Address, EligibilityRecord, EligibilityResult, EligibilityStore};
use redb::{Database, ReadableTable, TableDefinition};

use crate::StorageResult;

/// Table for eligibility records keyed by address
const ELIGIBILITY: TableDefinition<&str, &[u8]> = TableDefinition::new("eligibility_records");

/// Durable [`EligibilityStore`]
pub struct EligibilityTable {
    db: Arc<Database>,
}

impl EligibilityTable {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ELIGIBILITY)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn get(&self, address: &Address) -> StorageResult<Option<EligibilityRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ELIGIBILITY)?;

        let result = match table.get(address.as_str())? {
            Some(data) => Some(bincode::deserialize(data.value())?),
            None => None,
        };

        Ok(result)
    }

    pub fn put(&self, address: &Address, record: &EligibilityRecord) -> StorageResult<()> {
        let encoded = bincode::serialize(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ELIGIBILITY)?;
            table.insert(address.as_str(), encoded.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ELIGIBILITY)?;
        Ok(table.len()?)
    }
}

impl EligibilityStore for EligibilityTable {
    fn load(&self, address: &Address) -> EligibilityResult<Option<EligibilityRecord>> {
        Ok(self.get(address)?)
    }

    fn save(&self, address: &Address, record: &EligibilityRecord) -> EligibilityResult<()> {
        Ok(self.put(address, record)?)
    }
}
