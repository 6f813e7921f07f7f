//! Insight emission for urgent complaints.

mod common;

use common::pipeline;
use complaint_core::{insight::URGENT_COMPLAINT_KIND, normalizer::RawSubmission};

/// Urgency 4 raises a high-impact insight scored with the branch confidence.
#[test]
fn urgency_four_raises_high_impact_insight() {
    let mut p = pipeline(11);
    let c = p
        .submit(
            &RawSubmission::new()
                .with("descripcion", "El pollo estaba horrible y frío, el servicio fue pésimo")
                .with("sucursal", "Monterrey"),
        )
        .unwrap();
    assert_eq!(c.urgency, 4);

    let insights = p.store().insights_for_complaint(&c.complaint_id).unwrap();
    assert_eq!(insights.len(), 1);
    let i = &insights[0];
    assert_eq!(i.kind, URGENT_COMPLAINT_KIND);
    assert_eq!(i.impact, "high");
    assert_eq!(i.probability, 0.95);
    assert_eq!(i.created_at, c.created_at);
    assert!(i.title.contains("Calidad del producto"));
    assert_eq!(
        i.suggested_actions,
        vec![
            "Verificar temperaturas y tiempos de cocción",
            "Revisar el lote de insumos con el gerente",
        ]
    );
}

/// An emergency puts the escalation action first and uses the fallback
/// probability when no branch was given.
#[test]
fn emergency_insight_escalates_first() {
    let mut p = pipeline(11);
    let c = p
        .submit(&RawSubmission::new().with("descripcion", "Me dio intoxicación después de cenar"))
        .unwrap();
    assert_eq!(c.urgency, 5);

    let insights = p.store().insights_for_complaint(&c.complaint_id).unwrap();
    assert_eq!(insights.len(), 1);
    let i = &insights[0];
    assert_eq!(i.impact, "critical");
    assert_eq!(i.probability, 0.5);
    assert_eq!(
        i.suggested_actions,
        vec![
            "Contactar al cliente de inmediato y escalar a dirección regional",
            "Contactar al cliente para seguimiento",
            "Notificar al gerente de la sucursal",
        ]
    );
}

/// Below the threshold nothing is written to the insight table.
#[test]
fn low_urgency_raises_no_insight() {
    let mut p = pipeline(11);
    let c = p
        .submit(&RawSubmission::new().with("descripcion", "Todo muy lento hoy"))
        .unwrap();
    assert_eq!(c.urgency, 2);
    assert!(p.store().insights_for_complaint(&c.complaint_id).unwrap().is_empty());
    assert_eq!(p.store().insight_count().unwrap(), 0);
}

/// One insight per urgent complaint, never more.
#[test]
fn each_urgent_complaint_gets_exactly_one_insight() {
    let mut p = pipeline(11);
    for _ in 0..3 {
        p.submit(&RawSubmission::new().with("descripcion", "Había una cucaracha, qué asco, horrible"))
            .unwrap();
    }
    assert_eq!(p.store().complaint_count().unwrap(), 3);
    assert_eq!(p.store().insight_count().unwrap(), 3);
}
