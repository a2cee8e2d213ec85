use redb::TableDefinition;

/// Attachment records: uuid -> AttachmentRecord (msgpack)
pub const ATTACHMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("attachments");

/// Storage key index: key -> uuid. Enforces one attachment per key.
pub const ATTACHMENT_KEYS: TableDefinition<&str, &str> = TableDefinition::new("attachment_keys");

/// Owner index: record_id -> msgpack Vec of attachment UUIDs
pub const RECORD_ATTACHMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("record_attachments");

/// Customers: uuid -> Customer (msgpack)
pub const CUSTOMERS: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");

/// Invoices: uuid -> Invoice (msgpack)
pub const INVOICES: TableDefinition<&str, &[u8]> = TableDefinition::new("invoices");

/// Customer index: customer_id -> msgpack Vec of invoice UUIDs
pub const CUSTOMER_INVOICES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("customer_invoices");

/// Monthly revenue: position in the year (0-based) -> MonthlyRevenue (msgpack)
pub const REVENUE: TableDefinition<u8, &[u8]> = TableDefinition::new("revenue");
