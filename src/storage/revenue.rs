use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::MonthlyRevenue;
use super::tables::*;

pub(super) fn insert_revenue(
    write_txn: &WriteTransaction,
    position: u8,
    revenue: &MonthlyRevenue,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(REVENUE)?;
    let data = rmp_serde::to_vec_named(revenue)?;
    table.insert(position, data.as_slice())?;
    Ok(())
}

impl Database {
    /// Store revenue for the month at `position` (0 = first month shown)
    pub fn put_revenue(&self, position: u8, revenue: &MonthlyRevenue) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        insert_revenue(&write_txn, position, revenue)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Monthly revenue in calendar order
    pub fn get_revenue(&self) -> Result<Vec<MonthlyRevenue>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REVENUE)?;

        let mut revenue = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            revenue.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(revenue)
    }
}
