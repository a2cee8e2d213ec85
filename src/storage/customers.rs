use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::invoices::contains_ignore_case;
use super::models::{Customer, CustomerSummary, Invoice, InvoiceStatus};
use super::tables::*;

/// Write a customer within an open transaction.
pub(super) fn insert_customer(
    write_txn: &WriteTransaction,
    customer: &Customer,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(CUSTOMERS)?;
    let data = rmp_serde::to_vec_named(customer)?;
    table.insert(customer.id.as_str(), data.as_slice())?;
    Ok(())
}

impl Database {
    // ========================================================================
    // Customer operations
    // ========================================================================

    pub fn put_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        insert_customer(&write_txn, customer)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_customer(&self, id: &str) -> Result<Option<Customer>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All customers, by name
    pub fn get_all_customers(&self) -> Result<Vec<Customer>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS)?;

        let mut customers = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let customer: Customer = rmp_serde::from_slice(value.value())?;
            customers.push(customer);
        }
        customers.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(customers)
    }

    pub fn count_customers(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS)?;
        Ok(table.len()?)
    }

    /// Customers whose name or email contains `query` (case-insensitive), with
    /// their invoice totals, by name. An empty query matches everyone.
    pub fn get_filtered_customers(
        &self,
        query: &str,
    ) -> Result<Vec<CustomerSummary>, DatabaseError> {
        let needle = query.trim().to_lowercase();
        let customers: Vec<Customer> = self
            .get_all_customers()?
            .into_iter()
            .filter(|c| {
                contains_ignore_case(&c.name, &needle) || contains_ignore_case(&c.email, &needle)
            })
            .collect();

        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(CUSTOMER_INVOICES)?;
        let invoices = read_txn.open_table(INVOICES)?;

        let mut summaries = Vec::with_capacity(customers.len());
        for customer in customers {
            let ids: Vec<String> = match index.get(customer.id.as_str())? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => Vec::new(),
            };

            let mut summary = CustomerSummary {
                customer,
                total_invoices: 0,
                total_pending: 0,
                total_paid: 0,
            };
            for id in ids {
                let Some(data) = invoices.get(id.as_str())? else {
                    continue;
                };
                let invoice: Invoice = rmp_serde::from_slice(data.value())?;
                summary.total_invoices += 1;
                match invoice.status {
                    InvoiceStatus::Pending => summary.total_pending += invoice.amount,
                    InvoiceStatus::Paid => summary.total_paid += invoice.amount,
                }
            }
            summaries.push(summary);
        }

        Ok(summaries)
    }
}
