use domain::AllocationError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// SQLSTATE / SQLite codes worth retrying: serialization failure, deadlock,
/// lock wait timeout, database busy.
const TRANSIENT_CODES: [&str; 5] = ["40001", "40P01", "55P03", "5", "517"];

fn sql_code(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn is_transient(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    sql_code(err).is_some_and(|code| TRANSIENT_CODES.contains(&code.as_str()))
}

/// Maps a database error onto the allocation error surface.
pub(crate) fn map_db_err(err: DbErr) -> AllocationError {
    if is_transient(&err) {
        AllocationError::Transient(err.to_string())
    } else {
        AllocationError::Storage(err.to_string())
    }
}

/// Sheet insert: a duplicate primary key means the generated id was taken.
pub(crate) fn map_sheet_insert_err(err: DbErr, sheet_id: &str) -> AllocationError {
    if is_unique_violation(&err) {
        AllocationError::IdCollision(sheet_id.to_string())
    } else {
        map_db_err(err)
    }
}

/// Line item insert: a duplicate pallet id means another writer bound the
/// pallet after our read. The retry will see the binding and report a
/// conflict.
pub(crate) fn map_line_item_insert_err(err: DbErr) -> AllocationError {
    if is_unique_violation(&err) {
        AllocationError::Transient(format!("pallet bound concurrently: {err}"))
    } else {
        map_db_err(err)
    }
}
