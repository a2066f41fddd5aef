//! Protocols: the billable visit record.
//!
//! A protocol row and the service lines ordered with it are written in one
//! IMMEDIATE transaction, so the number derived from the highest issued
//! index cannot be handed out twice. The unique index on `protocol_number`
//! backs that up; a collision rolls the attempt back and it is retried.

use chrono::Datelike;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::accounts::Actor;
use crate::api::error::{required, ApiError};
use crate::catalog::optional_datetime;
use crate::config::ProtocolDeletePolicy;
use crate::db::{repository, DatabaseError};
use crate::models::dates::{now_timestamp, parse_datetime};
use crate::models::*;

const MAX_NUMBER_ATTEMPTS: usize = 3;

pub fn list(conn: &Connection, filter: &ProtocolFilter) -> Result<Vec<ProtocolView>, ApiError> {
    repository::list_protocols(conn, filter)?
        .into_iter()
        .map(|p| protocol_view(conn, p, false))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> Result<ProtocolView, ApiError> {
    protocol_view(conn, find(conn, id)?, true)
}

pub fn create(conn: &Connection, actor: &Actor, input: NewProtocol) -> Result<CreatedProtocol, ApiError> {
    let patient_id = required(input.patient_id, "patient_id")?;
    let examination_type_id = required(input.examination_type_id, "examination_type_id")?;
    let total_amount = amount_field(required(input.total_amount, "total_amount")?, "total_amount")?;
    let discount_amount = amount_field(input.discount_amount.unwrap_or(0.0), "discount_amount")?;
    let protocol_date = optional_datetime(input.protocol_date.as_deref(), "protocol_date")?;

    repository::get_patient(conn, patient_id)?.ok_or_else(|| ApiError::not_found("Patient", patient_id))?;
    repository::get_named_entry(conn, ReferenceTable::ExaminationTypes, examination_type_id)?
        .ok_or_else(|| ApiError::not_found("ExaminationType", examination_type_id))?;
    if let Some(company_id) = input.company_id {
        repository::get_company(conn, company_id)?.ok_or_else(|| ApiError::not_found("Company", company_id))?;
    }

    let now = now_timestamp();
    let draft = Protocol {
        id: 0,
        protocol_number: String::new(),
        patient_id,
        examination_type_id,
        company_id: input.company_id,
        protocol_date: protocol_date.unwrap_or(now),
        receipt_number: input.receipt_number,
        ledger_number: input.ledger_number,
        total_amount,
        discount_amount,
        paid_amount: 0.0,
        status: PROTOCOL_STATUS_ACTIVE.into(),
        created_by: Some(actor.user_id),
        created_at: now,
        updated_at: now,
    };

    let (id, skipped_services) =
        retry_number_collisions(|| insert_with_services(conn, &draft, &input.services))?;

    tracing::info!(
        protocol_id = id,
        patient_id,
        skipped = skipped_services.len(),
        by = actor.user_id,
        "Protocol created"
    );
    Ok(CreatedProtocol {
        protocol: get(conn, id)?,
        skipped_services,
    })
}

/// Run `insert` again while it trips the unique index on `protocol_number`,
/// up to `MAX_NUMBER_ATTEMPTS` runs in total.
fn retry_number_collisions<T>(
    mut insert: impl FnMut() -> Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    let mut attempt = 1;
    loop {
        match insert() {
            Err(DatabaseError::ConstraintViolation(detail))
                if attempt < MAX_NUMBER_ATTEMPTS && detail.contains("protocol_number") =>
            {
                tracing::warn!(attempt, %detail, "Protocol number collision, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn insert_with_services(
    conn: &Connection,
    draft: &Protocol,
    orders: &[ServiceOrder],
) -> Result<(i64, Vec<SkippedService>), DatabaseError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut protocol = draft.clone();
    protocol.protocol_number = repository::next_protocol_number(&tx, now_timestamp().year())?;
    let id = repository::insert_protocol(&tx, &protocol)?;

    let mut skipped = Vec::new();
    for (index, order) in orders.iter().enumerate() {
        let Some(service_id) = order.service_id else {
            skipped.push(SkippedService {
                index,
                service_id: None,
                reason: "service_id is required".into(),
            });
            continue;
        };
        let Some(service) = repository::get_service(&tx, service_id)? else {
            skipped.push(SkippedService {
                index,
                service_id: Some(service_id),
                reason: format!("Service {service_id} not found"),
            });
            continue;
        };
        let price = match order.price {
            Some(p) if p.is_finite() && p >= 0.0 => repository::round_money(p),
            Some(_) => {
                skipped.push(SkippedService {
                    index,
                    service_id: Some(service_id),
                    reason: "price must be a non-negative number".into(),
                });
                continue;
            }
            None => service.price,
        };
        repository::insert_protocol_service(
            &tx,
            &ProtocolService {
                id: 0,
                protocol_id: id,
                service_id,
                price,
                created_at: protocol.created_at,
                updated_at: protocol.created_at,
            },
        )?;
    }

    tx.commit()?;
    Ok((id, skipped))
}

pub fn update(conn: &Connection, actor: &Actor, id: i64, input: ProtocolUpdate) -> Result<ProtocolView, ApiError> {
    let mut protocol = find(conn, id)?;

    if let Some(&exam_id) = input.examination_type_id.value() {
        repository::get_named_entry(conn, ReferenceTable::ExaminationTypes, exam_id)?
            .ok_or_else(|| ApiError::not_found("ExaminationType", exam_id))?;
    }
    if let Some(&company_id) = input.company_id.value() {
        repository::get_company(conn, company_id)?.ok_or_else(|| ApiError::not_found("Company", company_id))?;
    }
    input
        .examination_type_id
        .apply_required("examination_type_id", &mut protocol.examination_type_id)?;
    input.company_id.apply_to(&mut protocol.company_id);

    match input.protocol_date {
        Patch::Absent => {}
        Patch::Null => return Err(ApiError::BadRequest("protocol_date cannot be null".into())),
        Patch::Value(raw) => {
            protocol.protocol_date = parse_datetime(&raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid protocol_date: {raw}")))?;
        }
    }
    input.receipt_number.apply_to(&mut protocol.receipt_number);
    input.ledger_number.apply_to(&mut protocol.ledger_number);
    input.total_amount.apply_required("total_amount", &mut protocol.total_amount)?;
    input.discount_amount.apply_required("discount_amount", &mut protocol.discount_amount)?;
    protocol.total_amount = amount_field(protocol.total_amount, "total_amount")?;
    protocol.discount_amount = amount_field(protocol.discount_amount, "discount_amount")?;
    input.status.apply_required("status", &mut protocol.status)?;
    if protocol.status.trim().is_empty() {
        return Err(ApiError::missing("status"));
    }
    protocol.updated_at = now_timestamp();

    repository::update_protocol(conn, &protocol)?;
    tracing::debug!(protocol_id = id, by = actor.user_id, "Protocol updated");
    get(conn, id)
}

pub fn delete(conn: &Connection, actor: &Actor, id: i64, policy: ProtocolDeletePolicy) -> Result<(), ApiError> {
    actor.require_admin()?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    find(&tx, id)?;

    match policy {
        ProtocolDeletePolicy::Restrict => {
            let dependents = repository::count_protocol_dependents(&tx, id)?;
            if !dependents.is_empty() {
                return Err(ApiError::Conflict(format!(
                    "Protocol {id} still has {} service(s) and {} payment(s)",
                    dependents.services, dependents.payments
                )));
            }
        }
        ProtocolDeletePolicy::Cascade => repository::delete_protocol_dependents(&tx, id)?,
    }
    repository::delete_protocol(&tx, id)?;
    tx.commit()?;

    tracing::info!(protocol_id = id, ?policy, by = actor.user_id, "Protocol deleted");
    Ok(())
}

pub(crate) fn find(conn: &Connection, id: i64) -> Result<Protocol, ApiError> {
    repository::get_protocol(conn, id)?.ok_or_else(|| ApiError::not_found("Protocol", id))
}

pub(crate) fn with_patient(conn: &Connection, protocol: Protocol) -> Result<ProtocolWithPatient, ApiError> {
    let patient = repository::get_patient(conn, protocol.patient_id)?;
    Ok(ProtocolWithPatient { protocol, patient })
}

fn protocol_view(conn: &Connection, protocol: Protocol, with_payments: bool) -> Result<ProtocolView, ApiError> {
    let patient = repository::get_patient(conn, protocol.patient_id)?;
    let examination_type =
        repository::get_named_entry(conn, ReferenceTable::ExaminationTypes, protocol.examination_type_id)?;
    let company = match protocol.company_id {
        Some(company_id) => repository::get_company(conn, company_id)?,
        None => None,
    };
    let services = repository::list_services_for_protocol(conn, protocol.id)?
        .into_iter()
        .map(|ps| {
            let service = repository::get_service(conn, ps.service_id)?;
            Ok(ProtocolServiceView {
                protocol_service: ps,
                service,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    let payments = if with_payments {
        Some(repository::list_payments_for_protocol(conn, protocol.id)?)
    } else {
        None
    };
    Ok(ProtocolView {
        protocol,
        patient,
        examination_type,
        company,
        services,
        payments,
    })
}

fn amount_field(value: f64, field: &str) -> Result<f64, ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::BadRequest(format!("{field} must be a non-negative number")));
    }
    Ok(repository::round_money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;

    struct Setup {
        conn: Connection,
        user: Actor,
        admin: Actor,
        patient_id: i64,
        exam_id: i64,
    }

    fn setup() -> Setup {
        let conn = open_memory_database().unwrap();
        let user = Actor::from_user(&fixtures::user(&conn, "sekreter", Role::User));
        let admin = Actor::from_user(&fixtures::user(&conn, "yonetici", Role::Admin));
        let patient_id = fixtures::patient(&conn, "Ayşe", None).id;
        let exam_id = fixtures::examination_type(&conn, "Hemogram").id;
        Setup {
            conn,
            user,
            admin,
            patient_id,
            exam_id,
        }
    }

    fn order(s: &Setup) -> NewProtocol {
        NewProtocol {
            patient_id: Some(s.patient_id),
            examination_type_id: Some(s.exam_id),
            total_amount: Some(450.0),
            ..Default::default()
        }
    }

    #[test]
    fn first_protocol_of_the_year_gets_index_one() {
        let s = setup();
        let created = create(&s.conn, &s.user, order(&s)).unwrap();
        let year = now_timestamp().year();
        assert_eq!(created.protocol.protocol.protocol_number, format!("P{year}000001"));
        assert_eq!(created.protocol.protocol.paid_amount, 0.0);
        assert_eq!(created.protocol.protocol.status, PROTOCOL_STATUS_ACTIVE);
        assert_eq!(created.protocol.protocol.created_by, Some(s.user.user_id));
        assert_eq!(created.protocol.patient.as_ref().unwrap().first_name, "Ayşe");
        assert_eq!(created.protocol.examination_type.as_ref().unwrap().name, "Hemogram");
    }

    #[test]
    fn sequential_numbers_are_distinct_and_zero_padded() {
        let s = setup();
        let year = now_timestamp().year();
        let numbers: Vec<String> = (0..12)
            .map(|_| create(&s.conn, &s.user, order(&s)).unwrap().protocol.protocol.protocol_number)
            .collect();
        for (i, number) in numbers.iter().enumerate() {
            assert_eq!(number, &format!("P{year}{:06}", i + 1));
        }
    }

    #[test]
    fn numbering_only_counts_the_current_year() {
        let s = setup();
        fixtures::protocol(&s.conn, s.patient_id, s.exam_id, "P1999000041");
        let created = create(&s.conn, &s.user, order(&s)).unwrap();
        let year = now_timestamp().year();
        assert_eq!(created.protocol.protocol.protocol_number, format!("P{year}000001"));
    }

    #[test]
    fn number_collision_is_retried_with_a_fresh_number() {
        let s = setup();
        let year = now_timestamp().year();
        let taken = fixtures::protocol(&s.conn, s.patient_id, s.exam_id, &format!("P{year}000001"));

        // The first run reuses a number another writer committed meanwhile.
        let mut stale = Some(taken.protocol_number.clone());
        let mut attempts = 0;
        let id = retry_number_collisions(|| {
            attempts += 1;
            let mut protocol = taken.clone();
            protocol.protocol_number = match stale.take() {
                Some(number) => number,
                None => repository::next_protocol_number(&s.conn, year)?,
            };
            repository::insert_protocol(&s.conn, &protocol)
        })
        .unwrap();

        assert_eq!(attempts, 2);
        let stored = repository::get_protocol(&s.conn, id).unwrap().unwrap();
        assert_eq!(stored.protocol_number, format!("P{year}000002"));
    }

    #[test]
    fn number_collisions_give_up_after_max_attempts() {
        let mut attempts = 0;
        let result: Result<(), _> = retry_number_collisions(|| {
            attempts += 1;
            Err(DatabaseError::ConstraintViolation(
                "UNIQUE constraint failed: protocols.protocol_number".into(),
            ))
        });
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
        assert_eq!(attempts, MAX_NUMBER_ATTEMPTS);
    }

    #[test]
    fn other_constraint_failures_are_not_retried() {
        let mut attempts = 0;
        let result: Result<(), _> = retry_number_collisions(|| {
            attempts += 1;
            Err(DatabaseError::ConstraintViolation("FOREIGN KEY constraint failed".into()))
        });
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn create_validates_required_fields_and_references() {
        let s = setup();
        let mut input = order(&s);
        input.total_amount = None;
        assert!(matches!(
            create(&s.conn, &s.user, input).unwrap_err(),
            ApiError::BadRequest(msg) if msg == "total_amount is required"
        ));

        let mut input = order(&s);
        input.patient_id = Some(999);
        assert!(matches!(create(&s.conn, &s.user, input).unwrap_err(), ApiError::NotFound(_)));

        let mut input = order(&s);
        input.examination_type_id = Some(999);
        assert!(matches!(create(&s.conn, &s.user, input).unwrap_err(), ApiError::NotFound(_)));

        let mut input = order(&s);
        input.company_id = Some(999);
        assert!(matches!(create(&s.conn, &s.user, input).unwrap_err(), ApiError::NotFound(_)));

        assert!(list(&s.conn, &ProtocolFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn unknown_services_are_skipped_and_reported() {
        let s = setup();
        let hemogram = fixtures::service(&s.conn, "Hemogram", 120.0);
        let odyometri = fixtures::service(&s.conn, "Odyometri", 200.0);

        let mut input = order(&s);
        input.services = vec![
            ServiceOrder {
                service_id: Some(hemogram.id),
                price: None,
            },
            ServiceOrder {
                service_id: Some(4242),
                price: None,
            },
            ServiceOrder {
                service_id: Some(odyometri.id),
                price: Some(150.0),
            },
        ];
        let created = create(&s.conn, &s.user, input).unwrap();

        let prices: Vec<f64> = created
            .protocol
            .services
            .iter()
            .map(|line| line.protocol_service.price)
            .collect();
        assert_eq!(prices, vec![120.0, 150.0]);
        assert_eq!(created.skipped_services.len(), 1);
        assert_eq!(created.skipped_services[0].index, 1);
        assert_eq!(created.skipped_services[0].service_id, Some(4242));
    }

    #[test]
    fn get_includes_payments_but_list_does_not() {
        let s = setup();
        let created = create(&s.conn, &s.user, order(&s)).unwrap();
        let id = created.protocol.protocol.id;
        fixtures::payment(&s.conn, id, 100.0, None);

        assert_eq!(get(&s.conn, id).unwrap().payments.unwrap().len(), 1);
        assert!(list(&s.conn, &ProtocolFilter::default()).unwrap()[0].payments.is_none());
        assert!(matches!(get(&s.conn, 999).unwrap_err(), ApiError::NotFound(_)));
    }

    #[test]
    fn update_revalidates_references_and_keeps_paid_amount() {
        let s = setup();
        let created = create(&s.conn, &s.user, order(&s)).unwrap();
        let id = created.protocol.protocol.id;

        let bad: ProtocolUpdate = serde_json::from_value(serde_json::json!({ "company_id": 999 })).unwrap();
        assert!(matches!(update(&s.conn, &s.user, id, bad).unwrap_err(), ApiError::NotFound(_)));

        let company = fixtures::company(&s.conn, "Acme Tekstil");
        let patch: ProtocolUpdate = serde_json::from_value(serde_json::json!({
            "company_id": company.id,
            "discount_amount": 50,
            "status": "closed",
            "protocol_date": "2024-03-01 09:30:00",
        }))
        .unwrap();
        let updated = update(&s.conn, &s.user, id, patch).unwrap();
        assert_eq!(updated.protocol.company_id, Some(company.id));
        assert_eq!(updated.protocol.discount_amount, 50.0);
        assert_eq!(updated.protocol.status, "closed");
        assert_eq!(updated.protocol.protocol_date.to_string(), "2024-03-01 09:30:00");
        assert_eq!(updated.protocol.total_amount, 450.0);
        assert_eq!(updated.protocol.paid_amount, 0.0);

        let clear: ProtocolUpdate = serde_json::from_value(serde_json::json!({ "company_id": null })).unwrap();
        assert_eq!(update(&s.conn, &s.user, id, clear).unwrap().protocol.company_id, None);

        let null_total: ProtocolUpdate =
            serde_json::from_value(serde_json::json!({ "total_amount": null })).unwrap();
        assert!(matches!(
            update(&s.conn, &s.user, id, null_total).unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn list_filters_by_date_range_and_status() {
        let s = setup();
        for date in ["2024-01-10 08:00:00", "2024-02-15 23:59:59", "2024-03-20 10:00:00"] {
            let mut input = order(&s);
            input.protocol_date = Some(date.into());
            create(&s.conn, &s.user, input).unwrap();
        }

        let february = list(
            &s.conn,
            &ProtocolFilter {
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
                end_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 15),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(february.len(), 1);

        let from_feb = list(
            &s.conn,
            &ProtocolFilter {
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 15),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(from_feb.len(), 2);

        let closed = list(
            &s.conn,
            &ProtocolFilter {
                status: Some("closed".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(closed.is_empty());
    }

    #[test]
    fn restrict_policy_refuses_protocol_with_payments() {
        let s = setup();
        let id = create(&s.conn, &s.user, order(&s)).unwrap().protocol.protocol.id;
        fixtures::payment(&s.conn, id, 100.0, None);

        assert!(matches!(
            delete(&s.conn, &s.user, id, ProtocolDeletePolicy::Restrict).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            delete(&s.conn, &s.admin, id, ProtocolDeletePolicy::Restrict).unwrap_err(),
            ApiError::Conflict(_)
        ));
        assert!(get(&s.conn, id).is_ok());

        let empty = create(&s.conn, &s.user, order(&s)).unwrap().protocol.protocol.id;
        delete(&s.conn, &s.admin, empty, ProtocolDeletePolicy::Restrict).unwrap();
        assert!(matches!(get(&s.conn, empty).unwrap_err(), ApiError::NotFound(_)));
    }

    #[test]
    fn cascade_policy_removes_children() {
        let s = setup();
        let hemogram = fixtures::service(&s.conn, "Hemogram", 120.0);
        let mut input = order(&s);
        input.services = vec![ServiceOrder {
            service_id: Some(hemogram.id),
            price: None,
        }];
        let id = create(&s.conn, &s.user, input).unwrap().protocol.protocol.id;
        fixtures::payment(&s.conn, id, 100.0, None);

        delete(&s.conn, &s.admin, id, ProtocolDeletePolicy::Cascade).unwrap();
        assert!(matches!(get(&s.conn, id).unwrap_err(), ApiError::NotFound(_)));
        assert!(repository::list_protocol_services(&s.conn).unwrap().is_empty());
        assert!(repository::list_payments_for_protocol(&s.conn, id).unwrap().is_empty());

        assert!(matches!(
            delete(&s.conn, &s.admin, id, ProtocolDeletePolicy::Cascade).unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
