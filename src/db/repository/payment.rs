use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{round_money, FilterQuery};
use crate::db::DatabaseError;
use crate::models::*;

const PAYMENT_COLUMNS: &str = "id, protocol_id, payment_date, receipt_number, cash_register_id,
     payment_type_id, amount, description, created_by, created_at, updated_at";

pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO payments (protocol_id, payment_date, receipt_number, cash_register_id,
         payment_type_id, amount, description, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            payment.protocol_id,
            payment.payment_date,
            payment.receipt_number,
            payment.cash_register_id,
            payment.payment_type_id,
            payment.amount,
            payment.description,
            payment.created_by,
            payment.created_at,
            payment.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_payment(conn: &Connection, id: i64) -> Result<Option<Payment>, DatabaseError> {
    let payment = conn
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
            params![id],
            payment_from_row,
        )
        .optional()?;
    Ok(payment)
}

fn payment_filter_query(filter: &PaymentFilter) -> FilterQuery {
    let mut q = FilterQuery::new();
    q.date_range("p.payment_date", filter.start_date, filter.end_date);
    q.eq("p.protocol_id", filter.protocol_id);
    q.eq("p.payment_type_id", filter.payment_type_id);
    q.eq("p.cash_register_id", filter.cash_register_id);
    q
}

pub fn list_payments(conn: &Connection, filter: &PaymentFilter) -> Result<Vec<Payment>, DatabaseError> {
    let q = payment_filter_query(filter);
    let sql = format!(
        "SELECT p.id, p.protocol_id, p.payment_date, p.receipt_number, p.cash_register_id,
                p.payment_type_id, p.amount, p.description, p.created_by, p.created_at, p.updated_at
         FROM payments p{} ORDER BY p.payment_date DESC, p.id DESC",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let payments = stmt
        .query_map(q.param_refs().as_slice(), payment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(payments)
}

pub fn list_payments_for_protocol(conn: &Connection, protocol_id: i64) -> Result<Vec<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE protocol_id = ?1 ORDER BY payment_date, id"
    ))?;
    let payments = stmt
        .query_map(params![protocol_id], payment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(payments)
}

pub fn update_payment(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payments SET payment_date = ?1, receipt_number = ?2, cash_register_id = ?3,
         payment_type_id = ?4, amount = ?5, description = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            payment.payment_date,
            payment.receipt_number,
            payment.cash_register_id,
            payment.payment_type_id,
            payment.amount,
            payment.description,
            payment.updated_at,
            payment.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Payment", payment.id));
    }
    Ok(())
}

pub fn delete_payment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM payments WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Payment", id));
    }
    Ok(())
}

/// Cash report: totals per payment type over the filtered payments.
pub fn summarize_payments(conn: &Connection, filter: &PaymentFilter) -> Result<CashSummary, DatabaseError> {
    let q = payment_filter_query(filter);
    let sql = format!(
        "SELECT p.payment_type_id, t.name, COUNT(*), COALESCE(SUM(p.amount), 0)
         FROM payments p
         LEFT JOIN payment_types t ON t.id = p.payment_type_id{}
         GROUP BY p.payment_type_id, t.name
         ORDER BY p.payment_type_id",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let by_payment_type = stmt
        .query_map(q.param_refs().as_slice(), |row| {
            Ok(PaymentTypeTotal {
                payment_type_id: row.get(0)?,
                payment_type_name: row.get(1)?,
                count: row.get(2)?,
                total: round_money(row.get(3)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let count = by_payment_type.iter().map(|t| t.count).sum();
    let total = round_money(by_payment_type.iter().map(|t| t.total).sum());
    Ok(CashSummary {
        count,
        total,
        by_payment_type,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        protocol_id: row.get(1)?,
        payment_date: row.get(2)?,
        receipt_number: row.get(3)?,
        cash_register_id: row.get(4)?,
        payment_type_id: row.get(5)?,
        amount: row.get(6)?,
        description: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
