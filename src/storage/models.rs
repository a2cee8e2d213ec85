use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classification given to attachments created through the upload issuer.
pub const MEDIA_RECORD_TYPE: &str = "media";

/// Metadata about an uploaded (or about-to-be-uploaded) object, stored in redb.
///
/// A record is written when the upload URL is issued, so it may reference an
/// object that was never actually written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: String,
    /// Fully-qualified object location: base URL + generated name
    pub key: String,
    pub service_name: String,
    /// Name supplied by the client. Never used for addressing.
    pub file_name: String,
    pub content_type: String,
    pub byte_size: u64,
    pub checksum: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an attachment. Id and timestamps are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub key: String,
    pub service_name: String,
    pub file_name: String,
    pub content_type: String,
    pub byte_size: u64,
    pub checksum: String,
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl NewAttachment {
    pub fn into_record(self) -> AttachmentRecord {
        let now = Utc::now();
        AttachmentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            key: self.key,
            service_name: self.service_name,
            file_name: self.file_name,
            content_type: self.content_type,
            byte_size: self.byte_size,
            checksum: self.checksum,
            record_id: self.record_id,
            record_type: self.record_type,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Dashboard records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    /// Amount in cents
    pub amount: u64,
    pub status: InvoiceStatus,
    /// Invoice date as entered; listings sort on it
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: u64,
}

/// An invoice joined with its customer. `customer` is `None` when the
/// customer record is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceWithCustomer {
    pub invoice: Invoice,
    pub customer: Option<Customer>,
}

/// An invoice with every attachment whose `record_id` is the invoice id.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub attachments: Vec<AttachmentRecord>,
}

/// Dashboard summary cards. Totals are in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardData {
    pub number_of_customers: u64,
    pub number_of_invoices: u64,
    pub total_paid_invoices: u64,
    pub total_pending_invoices: u64,
}

/// A customer with invoice totals, in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSummary {
    pub customer: Customer,
    pub total_invoices: u64,
    pub total_pending: u64,
    pub total_paid: u64,
}
