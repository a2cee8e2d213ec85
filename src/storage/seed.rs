//! Placeholder dashboard data for development databases.

use chrono::{Duration, NaiveDate, Utc};
use redb::ReadableTableMetadata;

use super::customers::insert_customer;
use super::db::{Database, DatabaseError};
use super::invoices::insert_invoice;
use super::models::{Customer, Invoice, InvoiceStatus, MonthlyRevenue};
use super::revenue::insert_revenue;
use super::tables::*;

/// (name, email, image_url)
const CUSTOMERS_SEED: &[(&str, &str, &str)] = &[
    ("Evil Rabbit", "evil@rabbit.com", "/customers/evil-rabbit.png"),
    ("Delba de Oliveira", "delba@oliveira.com", "/customers/delba-de-oliveira.png"),
    ("Lee Robinson", "lee@robinson.com", "/customers/lee-robinson.png"),
    ("Michael Novotny", "michael@novotny.com", "/customers/michael-novotny.png"),
    ("Amy Burns", "amy@burns.com", "/customers/amy-burns.png"),
    ("Balazs Orban", "balazs@orban.com", "/customers/balazs-orban.png"),
];

/// (customer index, amount in cents, status, date)
const INVOICES_SEED: &[(usize, u64, InvoiceStatus, &str)] = &[
    (0, 15795, InvoiceStatus::Pending, "2022-12-06"),
    (1, 20348, InvoiceStatus::Pending, "2022-11-14"),
    (4, 3040, InvoiceStatus::Paid, "2022-10-29"),
    (3, 44800, InvoiceStatus::Paid, "2023-09-10"),
    (5, 34577, InvoiceStatus::Pending, "2023-08-05"),
    (2, 54246, InvoiceStatus::Pending, "2023-07-16"),
    (0, 666, InvoiceStatus::Pending, "2023-06-27"),
    (3, 32545, InvoiceStatus::Paid, "2023-06-09"),
    (4, 1250, InvoiceStatus::Paid, "2023-06-17"),
    (5, 8546, InvoiceStatus::Paid, "2023-06-07"),
    (1, 500, InvoiceStatus::Paid, "2023-08-19"),
    (5, 8945, InvoiceStatus::Paid, "2023-06-03"),
    (2, 1000, InvoiceStatus::Paid, "2022-06-05"),
];

const REVENUE_SEED: &[(&str, u64)] = &[
    ("Jan", 2000),
    ("Feb", 1800),
    ("Mar", 2200),
    ("Apr", 2500),
    ("May", 2300),
    ("Jun", 3200),
    ("Jul", 3500),
    ("Aug", 3700),
    ("Sep", 2500),
    ("Oct", 2800),
    ("Nov", 3000),
    ("Dec", 4800),
];

impl Database {
    /// Load the placeholder customers, invoices and revenue in one transaction.
    ///
    /// Returns `false` without writing anything if customers or invoices
    /// already exist.
    pub fn seed_placeholder_data(&self) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let populated = {
            let customers = write_txn.open_table(CUSTOMERS)?;
            let invoices = write_txn.open_table(INVOICES)?;
            customers.len()? > 0 || invoices.len()? > 0
        };
        if populated {
            write_txn.abort()?;
            return Ok(false);
        }

        let customers: Vec<Customer> = CUSTOMERS_SEED
            .iter()
            .map(|(name, email, image_url)| Customer {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                email: email.to_string(),
                image_url: image_url.to_string(),
            })
            .collect();
        for customer in &customers {
            insert_customer(&write_txn, customer)?;
        }

        // Creation times follow seed order so "latest" is stable
        let base = Utc::now();
        for (i, (customer, amount, status, date)) in INVOICES_SEED.iter().enumerate() {
            let invoice = Invoice {
                id: uuid::Uuid::new_v4().to_string(),
                customer_id: customers[*customer].id.clone(),
                amount: *amount,
                status: *status,
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .unwrap_or(NaiveDate::MIN),
                created_at: base + Duration::seconds(i as i64),
            };
            insert_invoice(&write_txn, &invoice)?;
        }

        for (i, (month, revenue)) in REVENUE_SEED.iter().enumerate() {
            insert_revenue(
                &write_txn,
                i as u8,
                &MonthlyRevenue {
                    month: month.to_string(),
                    revenue: *revenue,
                },
            )?;
        }

        write_txn.commit()?;
        tracing::info!(
            customers = customers.len(),
            invoices = INVOICES_SEED.len(),
            "Seeded placeholder data"
        );
        Ok(true)
    }
}
