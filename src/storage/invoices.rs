use std::cmp::Reverse;
use std::collections::HashMap;

use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{
    CardData, Customer, Invoice, InvoiceDetail, InvoiceStatus, InvoiceWithCustomer,
};
use super::tables::*;

/// Page size of the filtered invoice listing.
pub const INVOICES_PER_PAGE: usize = 6;

/// `needle` must already be lowercase. An empty needle matches anything.
pub(super) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

fn matches_query(row: &InvoiceWithCustomer, needle: &str) -> bool {
    let Some(ref customer) = row.customer else {
        return false;
    };
    contains_ignore_case(&customer.name, needle)
        || contains_ignore_case(&customer.email, needle)
        || contains_ignore_case(&row.invoice.amount.to_string(), needle)
        || contains_ignore_case(&row.invoice.date.format("%Y-%m-%d").to_string(), needle)
        || contains_ignore_case(row.invoice.status.as_str(), needle)
}

/// Write an invoice within an open transaction, moving it between customer
/// indexes if its customer changed.
pub(super) fn insert_invoice(
    write_txn: &WriteTransaction,
    invoice: &Invoice,
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(INVOICES)?;
    let mut index = write_txn.open_table(CUSTOMER_INVOICES)?;

    let previous: Option<Invoice> = match table.get(invoice.id.as_str())? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    if let Some(previous) = previous.filter(|p| p.customer_id != invoice.customer_id) {
        let mut ids: Vec<String> = match index.get(previous.customer_id.as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };
        ids.retain(|id| id != &invoice.id);
        let index_data = rmp_serde::to_vec_named(&ids)?;
        index.insert(previous.customer_id.as_str(), index_data.as_slice())?;
    }

    let data = rmp_serde::to_vec_named(invoice)?;
    table.insert(invoice.id.as_str(), data.as_slice())?;

    let mut ids: Vec<String> = match index.get(invoice.customer_id.as_str())? {
        Some(data) => rmp_serde::from_slice(data.value())?,
        None => Vec::new(),
    };
    if !ids.contains(&invoice.id) {
        ids.push(invoice.id.clone());
        let index_data = rmp_serde::to_vec_named(&ids)?;
        index.insert(invoice.customer_id.as_str(), index_data.as_slice())?;
    }

    Ok(())
}

impl Database {
    // ========================================================================
    // Invoice operations
    // ========================================================================

    pub fn put_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        insert_invoice(&write_txn, invoice)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(INVOICES)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// An invoice together with the attachments uploaded for it
    pub fn get_invoice_detail(&self, id: &str) -> Result<Option<InvoiceDetail>, DatabaseError> {
        let Some(invoice) = self.get_invoice(id)? else {
            return Ok(None);
        };
        let attachments = self.get_attachments_by_record(id)?;
        Ok(Some(InvoiceDetail {
            invoice,
            attachments,
        }))
    }

    pub fn count_invoices(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(INVOICES)?;
        Ok(table.len()?)
    }

    /// Every invoice joined with its customer, from a single snapshot
    fn joined_invoices(&self) -> Result<Vec<InvoiceWithCustomer>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let customer_table = read_txn.open_table(CUSTOMERS)?;
        let invoice_table = read_txn.open_table(INVOICES)?;

        let mut customers: HashMap<String, Customer> = HashMap::new();
        for result in customer_table.iter()? {
            let (_, value) = result?;
            let customer: Customer = rmp_serde::from_slice(value.value())?;
            customers.insert(customer.id.clone(), customer);
        }

        let mut rows = Vec::new();
        for result in invoice_table.iter()? {
            let (_, value) = result?;
            let invoice: Invoice = rmp_serde::from_slice(value.value())?;
            let customer = customers.get(&invoice.customer_id).cloned();
            rows.push(InvoiceWithCustomer { invoice, customer });
        }

        Ok(rows)
    }

    /// The most recently created invoices, newest first
    pub fn get_latest_invoices(
        &self,
        limit: usize,
    ) -> Result<Vec<InvoiceWithCustomer>, DatabaseError> {
        let mut rows = self.joined_invoices()?;
        rows.sort_by_key(|r| Reverse(r.invoice.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn filtered_invoices(&self, query: &str) -> Result<Vec<InvoiceWithCustomer>, DatabaseError> {
        let needle = query.trim().to_lowercase();
        let mut rows: Vec<InvoiceWithCustomer> = self
            .joined_invoices()?
            .into_iter()
            .filter(|r| matches_query(r, &needle))
            .collect();
        rows.sort_by_key(|r| Reverse((r.invoice.date, r.invoice.created_at)));
        Ok(rows)
    }

    /// One page (1-based) of invoices whose customer name or email, amount,
    /// date or status contains `query`, newest date first. Invoices without a
    /// customer are never listed.
    pub fn get_filtered_invoices(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<InvoiceWithCustomer>, DatabaseError> {
        let offset = (page.max(1) as usize - 1) * INVOICES_PER_PAGE;
        Ok(self
            .filtered_invoices(query)?
            .into_iter()
            .skip(offset)
            .take(INVOICES_PER_PAGE)
            .collect())
    }

    /// Number of pages `get_filtered_invoices` has for `query`
    pub fn get_invoice_pages(&self, query: &str) -> Result<u64, DatabaseError> {
        let total = self.filtered_invoices(query)?.len();
        Ok(total.div_ceil(INVOICES_PER_PAGE) as u64)
    }

    pub fn get_card_data(&self) -> Result<CardData, DatabaseError> {
        let read_txn = self.begin_read()?;
        let customers = read_txn.open_table(CUSTOMERS)?;
        let invoices = read_txn.open_table(INVOICES)?;

        let mut cards = CardData {
            number_of_customers: customers.len()?,
            number_of_invoices: invoices.len()?,
            ..Default::default()
        };
        for result in invoices.iter()? {
            let (_, value) = result?;
            let invoice: Invoice = rmp_serde::from_slice(value.value())?;
            match invoice.status {
                InvoiceStatus::Paid => cards.total_paid_invoices += invoice.amount,
                InvoiceStatus::Pending => cards.total_pending_invoices += invoice.amount,
            }
        }

        Ok(cards)
    }
}
