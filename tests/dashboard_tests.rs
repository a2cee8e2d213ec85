use chrono::{NaiveDate, Utc};

use attachment_uploads::storage::models::{
    Customer, Invoice, InvoiceStatus, NewAttachment, MEDIA_RECORD_TYPE,
};
use attachment_uploads::storage::{Database, INVOICES_PER_PAGE};

fn seeded_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    assert!(db.seed_placeholder_data().unwrap());
    (dir, db)
}

fn amounts(db: &Database, query: &str, page: u32) -> Vec<u64> {
    db.get_filtered_invoices(query, page)
        .unwrap()
        .into_iter()
        .map(|row| row.invoice.amount)
        .collect()
}

#[test]
fn test_card_totals() {
    let (_dir, db) = seeded_db();

    let cards = db.get_card_data().unwrap();
    assert_eq!(cards.number_of_customers, 6);
    assert_eq!(cards.number_of_invoices, 13);
    assert_eq!(cards.total_pending_invoices, 125632);
    assert_eq!(cards.total_paid_invoices, 100626);
}

#[test]
fn test_seed_only_fills_an_empty_database() {
    let (_dir, db) = seeded_db();

    assert!(!db.seed_placeholder_data().unwrap());
    assert_eq!(db.count_customers().unwrap(), 6);
    assert_eq!(db.count_invoices().unwrap(), 13);
    assert_eq!(db.get_revenue().unwrap().len(), 12);
}

#[test]
fn test_filtered_invoices_newest_date_first() {
    let (_dir, db) = seeded_db();

    assert_eq!(INVOICES_PER_PAGE, 6);
    assert_eq!(amounts(&db, "", 1), vec![44800, 500, 34577, 54246, 666, 1250]);
    assert_eq!(amounts(&db, "", 3), vec![1000]);
    assert!(amounts(&db, "", 4).is_empty());
    // Page 0 reads as the first page
    assert_eq!(amounts(&db, "", 0), amounts(&db, "", 1));
    assert_eq!(db.get_invoice_pages("").unwrap(), 3);
}

#[test]
fn test_filtered_invoices_match_customer_status_and_date() {
    let (_dir, db) = seeded_db();

    let rabbit = db.get_filtered_invoices("RaBbIt", 1).unwrap();
    assert_eq!(rabbit.len(), 2);
    assert_eq!(rabbit[0].invoice.amount, 666);
    assert!(rabbit
        .iter()
        .all(|r| r.customer.as_ref().unwrap().name == "Evil Rabbit"));

    let paid: Vec<_> = (1..=2)
        .flat_map(|page| db.get_filtered_invoices("paid", page).unwrap())
        .collect();
    assert_eq!(paid.len(), 8);
    assert!(paid.iter().all(|r| r.invoice.status == InvoiceStatus::Paid));
    assert_eq!(db.get_invoice_pages("paid").unwrap(), 2);

    assert_eq!(db.get_filtered_invoices("2023-06", 1).unwrap().len(), 5);
    assert_eq!(amounts(&db, "54246", 1), vec![54246]);
    assert_eq!(db.get_invoice_pages("no such customer").unwrap(), 0);
}

#[test]
fn test_latest_invoices_by_creation() {
    let (_dir, db) = seeded_db();

    let latest: Vec<u64> = db
        .get_latest_invoices(5)
        .unwrap()
        .into_iter()
        .map(|row| row.invoice.amount)
        .collect();
    assert_eq!(latest, vec![1000, 8945, 500, 8546, 1250]);
}

#[test]
fn test_customers_sorted_and_summarized() {
    let (_dir, db) = seeded_db();

    let names: Vec<String> = db
        .get_all_customers()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Amy Burns",
            "Balazs Orban",
            "Delba de Oliveira",
            "Evil Rabbit",
            "Lee Robinson",
            "Michael Novotny",
        ]
    );

    let lee = db.get_filtered_customers("lee").unwrap();
    assert_eq!(lee.len(), 1);
    assert_eq!(lee[0].customer.name, "Lee Robinson");
    assert_eq!(lee[0].total_invoices, 2);
    assert_eq!(lee[0].total_pending, 54246);
    assert_eq!(lee[0].total_paid, 1000);

    assert_eq!(db.get_filtered_customers("").unwrap().len(), 6);
    assert_eq!(db.get_filtered_customers("@orban.com").unwrap().len(), 1);
}

#[test]
fn test_revenue_in_calendar_order() {
    let (_dir, db) = seeded_db();

    let revenue = db.get_revenue().unwrap();
    assert_eq!(revenue.len(), 12);
    assert_eq!(revenue[0].month, "Jan");
    assert_eq!(revenue[11].month, "Dec");
    assert_eq!(revenue[11].revenue, 4800);
}

#[test]
fn test_invoice_detail_lists_its_attachments() {
    let (_dir, db) = seeded_db();
    let invoice = db.get_filtered_invoices("", 1).unwrap()[0].invoice.clone();

    db.create_attachment(NewAttachment {
        key: "https://bucket.example.com/receipt".to_string(),
        service_name: "s3".to_string(),
        file_name: "receipt.png".to_string(),
        content_type: "image/png".to_string(),
        byte_size: 1024,
        checksum: "abc".to_string(),
        record_id: Some(invoice.id.clone()),
        record_type: Some(MEDIA_RECORD_TYPE.to_string()),
        metadata: None,
    })
    .unwrap();

    let detail = db.get_invoice_detail(&invoice.id).unwrap().unwrap();
    assert_eq!(detail.invoice, invoice);
    assert_eq!(detail.attachments.len(), 1);
    assert_eq!(detail.attachments[0].file_name, "receipt.png");

    assert!(db.get_invoice_detail("missing").unwrap().is_none());
}

#[test]
fn test_reassigning_an_invoice_moves_customer_totals() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();

    for (id, name) in [("c1", "Ada"), ("c2", "Grace")] {
        db.put_customer(&Customer {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            image_url: String::new(),
        })
        .unwrap();
    }

    let mut invoice = Invoice {
        id: "inv-1".to_string(),
        customer_id: "c1".to_string(),
        amount: 2500,
        status: InvoiceStatus::Pending,
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        created_at: Utc::now(),
    };
    db.put_invoice(&invoice).unwrap();

    invoice.customer_id = "c2".to_string();
    invoice.status = InvoiceStatus::Paid;
    db.put_invoice(&invoice).unwrap();

    let summaries = db.get_filtered_customers("").unwrap();
    assert_eq!(summaries[0].customer.name, "Ada");
    assert_eq!(summaries[0].total_invoices, 0);
    assert_eq!(summaries[1].customer.name, "Grace");
    assert_eq!(summaries[1].total_invoices, 1);
    assert_eq!(summaries[1].total_paid, 2500);
    assert_eq!(db.count_invoices().unwrap(), 1);
}

#[test]
fn test_seeded_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    {
        let db = Database::open(&path).unwrap();
        assert!(db.seed_placeholder_data().unwrap());
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_card_data().unwrap().number_of_invoices, 13);
    assert!(!db.seed_placeholder_data().unwrap());
}
