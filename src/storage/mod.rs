mod attachments;
mod customers;
pub mod db;
mod invoices;
pub mod models;
mod revenue;
mod seed;
mod tables;

pub use db::{Database, DatabaseError};
pub use invoices::INVOICES_PER_PAGE;
pub use tables::*;
