//! Payments against protocols and the cash report.
//!
//! `protocols.paid_amount` is recomputed from the payments table inside the
//! same transaction as every payment write, so the two never disagree.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::accounts::Actor;
use crate::api::error::{required, ApiError};
use crate::catalog::optional_datetime;
use crate::db::repository;
use crate::models::dates::{now_timestamp, parse_datetime};
use crate::models::*;
use crate::protocols;

pub fn list(conn: &Connection, filter: &PaymentFilter) -> Result<Vec<PaymentView>, ApiError> {
    repository::list_payments(conn, filter)?
        .into_iter()
        .map(|p| payment_view(conn, p))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> Result<PaymentView, ApiError> {
    payment_view(conn, find(conn, id)?)
}

pub fn create(conn: &Connection, actor: &Actor, input: NewPayment) -> Result<PaymentView, ApiError> {
    let protocol_id = required(input.protocol_id, "protocol_id")?;
    let amount = positive_amount(required(input.amount, "amount")?)?;
    let payment_date = optional_datetime(input.payment_date.as_deref(), "payment_date")?;

    protocols::find(conn, protocol_id)?;
    ensure_payment_type(conn, input.payment_type_id)?;
    ensure_cash_register(conn, input.cash_register_id)?;

    let now = now_timestamp();
    let payment = Payment {
        id: 0,
        protocol_id,
        payment_date: payment_date.unwrap_or(now),
        receipt_number: input.receipt_number,
        cash_register_id: input.cash_register_id,
        payment_type_id: input.payment_type_id,
        amount,
        description: input.description,
        created_by: Some(actor.user_id),
        created_at: now,
        updated_at: now,
    };

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let id = repository::insert_payment(&tx, &payment)?;
    let paid = repository::recompute_paid_amount(&tx, protocol_id)?;
    tx.commit()?;

    tracing::info!(payment_id = id, protocol_id, amount, paid, by = actor.user_id, "Payment recorded");
    get(conn, id)
}

pub fn update(conn: &Connection, actor: &Actor, id: i64, input: PaymentUpdate) -> Result<PaymentView, ApiError> {
    let mut payment = find(conn, id)?;

    if let Some(&type_id) = input.payment_type_id.value() {
        ensure_payment_type(conn, Some(type_id))?;
    }
    if let Some(&register_id) = input.cash_register_id.value() {
        ensure_cash_register(conn, Some(register_id))?;
    }
    match input.payment_date {
        Patch::Absent => {}
        Patch::Null => return Err(ApiError::BadRequest("payment_date cannot be null".into())),
        Patch::Value(raw) => {
            payment.payment_date = parse_datetime(&raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid payment_date: {raw}")))?;
        }
    }
    input.amount.apply_required("amount", &mut payment.amount)?;
    payment.amount = positive_amount(payment.amount)?;
    input.receipt_number.apply_to(&mut payment.receipt_number);
    input.cash_register_id.apply_to(&mut payment.cash_register_id);
    input.payment_type_id.apply_to(&mut payment.payment_type_id);
    input.description.apply_to(&mut payment.description);
    payment.updated_at = now_timestamp();

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    repository::update_payment(&tx, &payment)?;
    let paid = repository::recompute_paid_amount(&tx, payment.protocol_id)?;
    tx.commit()?;

    tracing::debug!(payment_id = id, protocol_id = payment.protocol_id, paid, by = actor.user_id, "Payment updated");
    get(conn, id)
}

pub fn delete(conn: &Connection, actor: &Actor, id: i64) -> Result<(), ApiError> {
    actor.require_admin()?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let payment = find(&tx, id)?;
    repository::delete_payment(&tx, id)?;
    let paid = repository::recompute_paid_amount(&tx, payment.protocol_id)?;
    tx.commit()?;

    tracing::info!(payment_id = id, protocol_id = payment.protocol_id, paid, by = actor.user_id, "Payment deleted");
    Ok(())
}

/// Totals for the cash report, with the same filters as [`list`].
pub fn cash_summary(conn: &Connection, filter: &PaymentFilter) -> Result<CashSummary, ApiError> {
    Ok(repository::summarize_payments(conn, filter)?)
}

fn find(conn: &Connection, id: i64) -> Result<Payment, ApiError> {
    repository::get_payment(conn, id)?.ok_or_else(|| ApiError::not_found("Payment", id))
}

fn payment_view(conn: &Connection, payment: Payment) -> Result<PaymentView, ApiError> {
    let protocol = match repository::get_protocol(conn, payment.protocol_id)? {
        Some(p) => Some(protocols::with_patient(conn, p)?),
        None => None,
    };
    let payment_type = match payment.payment_type_id {
        Some(type_id) => repository::get_named_entry(conn, ReferenceTable::PaymentTypes, type_id)?,
        None => None,
    };
    let cash_register = match payment.cash_register_id {
        Some(register_id) => repository::get_named_entry(conn, ReferenceTable::CashRegisters, register_id)?,
        None => None,
    };
    Ok(PaymentView {
        payment,
        protocol,
        payment_type,
        cash_register,
    })
}

fn positive_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::BadRequest("amount must be greater than 0".into()));
    }
    Ok(repository::round_money(amount))
}

fn ensure_payment_type(conn: &Connection, id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = id {
        repository::get_named_entry(conn, ReferenceTable::PaymentTypes, id)?
            .ok_or_else(|| ApiError::not_found("PaymentType", id))?;
    }
    Ok(())
}

fn ensure_cash_register(conn: &Connection, id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = id {
        repository::get_named_entry(conn, ReferenceTable::CashRegisters, id)?
            .ok_or_else(|| ApiError::not_found("CashRegister", id))?;
    }
    Ok(())
}
