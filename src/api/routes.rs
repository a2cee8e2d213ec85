use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.uploads.max_upload_size as usize;

    let mut router = Router::new()
        // Upload URL issuance
        .route("/api/upload", post(handlers::create_upload_url))
        // Attachments
        .route("/api/attachments", get(handlers::list_attachments))
        .route("/api/attachments/:id", get(handlers::get_attachment))
        // Dashboard
        .route("/api/dashboard/revenue", get(handlers::get_revenue))
        .route("/api/dashboard/cards", get(handlers::get_cards))
        .route(
            "/api/dashboard/latest-invoices",
            get(handlers::get_latest_invoices),
        )
        // Invoices
        .route("/api/invoices", get(handlers::list_invoices))
        .route("/api/invoices/pages", get(handlers::get_invoice_pages))
        .route("/api/invoices/:id", get(handlers::get_invoice))
        // Customers
        .route("/api/customers", get(handlers::list_customers))
        .route(
            "/api/customers/summary",
            get(handlers::list_customer_summaries),
        )
        // Internal
        .route("/_internal/health", get(handlers::health))
        .route("/_internal/seed", post(handlers::seed));

    // Direct upload target, only when objects live on this node
    if state.local_store.is_some() {
        router = router.route(
            "/objects/:key",
            put(handlers::put_object)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(handlers::get_object),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
