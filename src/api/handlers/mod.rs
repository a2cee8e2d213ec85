mod admin;
mod attachments;
mod dashboard;
mod objects;
mod uploads;

use crate::api::response::ApiError;
use crate::object_store::ObjectStoreError;

pub use admin::health;
pub use attachments::{get_attachment, list_attachments};
pub use dashboard::{
    get_cards, get_invoice, get_invoice_pages, get_latest_invoices, get_revenue,
    list_customer_summaries, list_customers, list_invoices, seed,
};
pub use objects::{get_object, put_object};
pub use uploads::create_upload_url;

/// Map an ObjectStoreError raised while accepting a direct upload to an ApiError
fn object_store_error(e: ObjectStoreError) -> ApiError {
    match e {
        ObjectStoreError::InvalidSignature | ObjectStoreError::Expired => {
            ApiError::forbidden(e.to_string())
        }
        ObjectStoreError::InvalidKey(_) | ObjectStoreError::Mismatch(_) => {
            ApiError::bad_request(e.to_string())
        }
        ObjectStoreError::NotFound(_) => ApiError::not_found("Object not found"),
        _ => ApiError::internal(e.to_string()),
    }
}
