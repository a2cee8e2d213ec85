use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::attachments::{attachment_to_response, AttachmentResponse};
use crate::api::response::{ApiError, AppQuery, Data};
use crate::storage::models::{Customer, InvoiceWithCustomer, MonthlyRevenue};
use crate::storage::INVOICES_PER_PAGE;
use crate::AppState;

/// Latest-invoice widget size.
const LATEST_INVOICES: usize = 5;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub number_of_customers: u64,
    pub number_of_invoices: u64,
    pub total_paid_invoices: String,
    pub total_pending_invoices: String,
}

#[derive(Debug, Serialize)]
pub struct LatestInvoiceResponse {
    pub id: String,
    pub amount: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

/// Invoice listing row. `amount` is in cents.
#[derive(Debug, Serialize)]
pub struct InvoiceRowResponse {
    pub id: String,
    pub customer_id: String,
    pub amount: u64,
    pub date: String,
    pub status: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct InvoicePageResponse {
    pub items: Vec<InvoiceRowResponse>,
    pub page: u32,
    pub per_page: usize,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct InvoicePagesResponse {
    pub total_pages: u64,
}

/// A single invoice for editing. `amount` is in dollars.
#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
    pub id: String,
    pub customer_id: String,
    pub amount: f64,
    pub date: String,
    pub status: String,
    pub attachments: Vec<AttachmentResponse>,
}

#[derive(Debug, Serialize)]
pub struct CustomerSummaryResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub total_invoices: u64,
    pub total_pending: String,
    pub total_paid: String,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub seeded: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceSearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: GET /api/dashboard/revenue
pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<Vec<MonthlyRevenue>>>, ApiError> {
    let revenue = state
        .db
        .get_revenue()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Data::success(revenue))
}

/// Route: GET /api/dashboard/cards
pub async fn get_cards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<CardsResponse>>, ApiError> {
    let cards = state
        .db
        .get_card_data()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Data::success(CardsResponse {
        number_of_customers: cards.number_of_customers,
        number_of_invoices: cards.number_of_invoices,
        total_paid_invoices: format_currency(cards.total_paid_invoices),
        total_pending_invoices: format_currency(cards.total_pending_invoices),
    }))
}

/// Route: GET /api/dashboard/latest-invoices
pub async fn get_latest_invoices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<Vec<LatestInvoiceResponse>>>, ApiError> {
    let rows = state
        .db
        .get_latest_invoices(LATEST_INVOICES)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let items = rows
        .into_iter()
        .map(|row| LatestInvoiceResponse {
            id: row.invoice.id,
            amount: format_currency(row.invoice.amount),
            name: row.customer.as_ref().map(|c| c.name.clone()),
            email: row.customer.as_ref().map(|c| c.email.clone()),
            image_url: row.customer.map(|c| c.image_url),
        })
        .collect();

    Ok(Data::success(items))
}

/// Route: GET /api/invoices?query=&page=
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<InvoiceSearchParams>,
) -> Result<Json<Data<InvoicePageResponse>>, ApiError> {
    if params.page == 0 {
        return Err(ApiError::bad_request("page must be greater than 0"));
    }

    let rows = state
        .db
        .get_filtered_invoices(&params.query, params.page)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let total_pages = state
        .db
        .get_invoice_pages(&params.query)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Data::success(InvoicePageResponse {
        items: rows.into_iter().filter_map(invoice_row).collect(),
        page: params.page,
        per_page: INVOICES_PER_PAGE,
        total_pages,
    }))
}

/// Route: GET /api/invoices/pages?query=
pub async fn get_invoice_pages(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<Data<InvoicePagesResponse>>, ApiError> {
    let total_pages = state
        .db
        .get_invoice_pages(&params.query)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Data::success(InvoicePagesResponse { total_pages }))
}

/// Route: GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Data<InvoiceDetailResponse>>, ApiError> {
    let detail = state
        .db
        .get_invoice_detail(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Invoice not found"))?;

    Ok(Data::success(InvoiceDetailResponse {
        id: detail.invoice.id,
        customer_id: detail.invoice.customer_id,
        amount: detail.invoice.amount as f64 / 100.0,
        date: detail.invoice.date.format("%Y-%m-%d").to_string(),
        status: detail.invoice.status.as_str().to_string(),
        attachments: detail
            .attachments
            .iter()
            .map(attachment_to_response)
            .collect(),
    }))
}

/// Route: GET /api/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<Vec<Customer>>>, ApiError> {
    let customers = state
        .db
        .get_all_customers()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Data::success(customers))
}

/// Route: GET /api/customers/summary?query=
pub async fn list_customer_summaries(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<Data<Vec<CustomerSummaryResponse>>>, ApiError> {
    let summaries = state
        .db
        .get_filtered_customers(&params.query)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let items = summaries
        .into_iter()
        .map(|s| CustomerSummaryResponse {
            id: s.customer.id,
            name: s.customer.name,
            email: s.customer.email,
            image_url: s.customer.image_url,
            total_invoices: s.total_invoices,
            total_pending: format_currency(s.total_pending),
            total_paid: format_currency(s.total_paid),
        })
        .collect();

    Ok(Data::success(items))
}

/// Load placeholder dashboard data into an empty database.
/// Route: POST /_internal/seed
pub async fn seed(State(state): State<Arc<AppState>>) -> Result<Json<Data<SeedResponse>>, ApiError> {
    let seeded = state
        .db
        .seed_placeholder_data()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let message = if seeded {
        "Database seeded successfully"
    } else {
        "Database already contains data"
    };
    Ok(Data::success(SeedResponse {
        seeded,
        message: message.to_string(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn invoice_row(row: InvoiceWithCustomer) -> Option<InvoiceRowResponse> {
    let customer = row.customer?;
    Some(InvoiceRowResponse {
        id: row.invoice.id,
        customer_id: row.invoice.customer_id,
        amount: row.invoice.amount,
        date: row.invoice.date.format("%Y-%m-%d").to_string(),
        status: row.invoice.status.as_str().to_string(),
        name: customer.name,
        email: customer.email,
        image_url: customer.image_url,
    })
}

/// Format cents as US dollars, e.g. `125632` -> `$1,256.32`.
pub fn format_currency(cents: u64) -> String {
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, digit) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::format_currency;
    use crate::api::create_router;
    use crate::storage::models::NewAttachment;
    use crate::testutil::test_state;

    async fn send(app: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0), "$0.00");
        assert_eq!(format_currency(666), "$6.66");
        assert_eq!(format_currency(15795), "$157.95");
        assert_eq!(format_currency(125632), "$1,256.32");
        assert_eq!(format_currency(100_000_000), "$1,000,000.00");
    }

    #[tokio::test]
    async fn test_seed_then_cards() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(create_router(state.clone()), Method::POST, "/_internal/seed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["seeded"], true);

        let (_, again) = send(create_router(state.clone()), Method::POST, "/_internal/seed").await;
        assert_eq!(again["data"]["seeded"], false);

        let (status, body) = send(create_router(state), Method::GET, "/api/dashboard/cards").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["number_of_customers"], 6);
        assert_eq!(body["data"]["number_of_invoices"], 13);
        assert_eq!(body["data"]["total_paid_invoices"], "$1,006.26");
        assert_eq!(body["data"]["total_pending_invoices"], "$1,256.32");
    }

    #[tokio::test]
    async fn test_invoice_listing_pages() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.db.seed_placeholder_data().unwrap();

        let (status, body) =
            send(create_router(state.clone()), Method::GET, "/api/invoices?page=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_pages"], 3);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["items"][0]["date"], "2022-06-05");

        let (_, body) = send(
            create_router(state.clone()),
            Method::GET,
            "/api/invoices/pages?query=rabbit",
        )
        .await;
        assert_eq!(body["data"]["total_pages"], 1);

        let (status, _) = send(create_router(state), Method::GET, "/api/invoices?page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invoice_detail_includes_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.db.seed_placeholder_data().unwrap();

        let invoice = state.db.get_filtered_invoices("", 1).unwrap()[0]
            .invoice
            .clone();
        state
            .db
            .create_attachment(NewAttachment {
                key: "http://127.0.0.1:8080/objects/abc".to_string(),
                service_name: "local".to_string(),
                file_name: "receipt.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                byte_size: 10,
                checksum: "x".to_string(),
                record_id: Some(invoice.id.clone()),
                record_type: Some("media".to_string()),
                metadata: None,
            })
            .unwrap();

        let (status, body) = send(
            create_router(state.clone()),
            Method::GET,
            &format!("/api/invoices/{}", invoice.id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["amount"], 448.0);
        assert_eq!(body["data"]["status"], "paid");
        assert_eq!(
            body["data"]["attachments"][0]["file_name"],
            "receipt.pdf"
        );

        let (status, body) =
            send(create_router(state), Method::GET, "/api/invoices/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Invoice not found");
    }

    #[tokio::test]
    async fn test_customer_summary_formats_totals() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.db.seed_placeholder_data().unwrap();

        let (status, body) = send(
            create_router(state),
            Method::GET,
            "/api/customers/summary?query=lee",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "Lee Robinson");
        assert_eq!(items[0]["total_invoices"], 2);
        assert_eq!(items[0]["total_pending"], "$542.46");
        assert_eq!(items[0]["total_paid"], "$10.00");
    }
}
