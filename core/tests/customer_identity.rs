//! Customer dedup by phone, anonymous customers and segment progression.

mod common;

use common::pipeline;
use complaint_core::normalizer::RawSubmission;

fn from_phone(phone: &str, text: &str) -> RawSubmission {
    RawSubmission::new().with("telefono", phone).with("descripcion", text)
}

/// The same number written three ways resolves to one customer.
#[test]
fn phone_formats_collapse_to_one_customer() {
    let mut p = pipeline(7);
    let a = p.submit(&from_phone("81 1234 5678", "uno")).unwrap();
    let b = p.submit(&from_phone("+52 (81) 1234-5678", "dos")).unwrap();
    let c = p.submit(&from_phone("8112345678", "tres")).unwrap();

    assert_eq!(a.customer_id, b.customer_id);
    assert_eq!(b.customer_id, c.customer_id);
    assert_eq!(p.store().customer_count().unwrap(), 1);

    let customer = p.store().get_customer(&a.customer_id).unwrap().unwrap();
    assert_eq!(customer.complaint_count, 3);
    assert_eq!(customer.segment, "recurring");
    assert!(!customer.is_anonymous);
    assert_eq!(p.store().complaints_for_customer(&a.customer_id).unwrap().len(), 3);
}

/// Without a valid phone every submission is a new anonymous customer.
#[test]
fn missing_or_invalid_phone_creates_anonymous_customers() {
    let mut p = pipeline(7);
    let a = p.submit(&RawSubmission::new().with("descripcion", "uno")).unwrap();
    let b = p.submit(&from_phone("1234567890", "placeholder")).unwrap();
    let c = p.submit(&from_phone("www.ejemplo.com/5512345678", "url")).unwrap();

    assert_ne!(a.customer_id, b.customer_id);
    assert_ne!(b.customer_id, c.customer_id);
    assert_eq!(p.store().customer_count().unwrap(), 3);

    for id in [&a.customer_id, &b.customer_id, &c.customer_id] {
        let customer = p.store().get_customer(id).unwrap().unwrap();
        assert!(customer.is_anonymous);
        assert_eq!(customer.phone, None);
        assert_eq!(customer.complaint_count, 1);
        assert_eq!(customer.segment, "first_time");
    }
}

/// A name arriving on a later submission fills a nameless customer, but
/// never overwrites an existing one.
#[test]
fn later_name_fills_missing_name_only() {
    let mut p = pipeline(7);
    let first = p.submit(&from_phone("5598765432", "sin nombre")).unwrap();
    assert_eq!(
        p.store().get_customer(&first.customer_id).unwrap().unwrap().name,
        None
    );

    p.submit(&from_phone("5598765432", "con nombre").with("nombre", "Carla")).unwrap();
    p.submit(&from_phone("5598765432", "otro nombre").with("nombre", "Otra Persona")).unwrap();

    let customer = p.store().find_customer_by_phone("5598765432").unwrap().unwrap();
    assert_eq!(customer.customer_id, first.customer_id);
    assert_eq!(customer.name.as_deref(), Some("Carla"));
}

/// Five complaints make a chronic complainer.
#[test]
fn segment_progresses_with_complaint_count() {
    let mut p = pipeline(7);
    let mut segments = Vec::new();
    let mut customer_id = String::new();
    for i in 0..5 {
        let c = p.submit(&from_phone("3311112222", &format!("queja {i}"))).unwrap();
        customer_id = c.customer_id;
        segments.push(p.store().get_customer(&customer_id).unwrap().unwrap().segment);
    }
    assert_eq!(
        segments,
        vec!["first_time", "recurring", "recurring", "recurring", "chronic"]
    );
    assert_eq!(
        p.store().get_customer(&customer_id).unwrap().unwrap().complaint_count,
        5
    );
}

/// last_complaint_at tracks the latest complaint, not the latest submission.
#[test]
fn last_complaint_at_never_moves_backwards() {
    let mut p = pipeline(7);
    let late = p
        .submit(&from_phone("3344445555", "tarde").with("fecha", "2024-06-01 10:00:00"))
        .unwrap();
    p.submit(&from_phone("3344445555", "temprano").with("fecha", "2024-02-01 10:00:00"))
        .unwrap();

    let customer = p.store().get_customer(&late.customer_id).unwrap().unwrap();
    assert_eq!(customer.last_complaint_at, Some(late.created_at));
}
