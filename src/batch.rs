use crate::config::now_utc;
use crate::db::{Db, fetch_report, insert_finance_record, insert_link};
use crate::domain::RecordSpec;
use crate::error::{LedgerError, LedgerResult};
use tracing::{info, warn};

/// Creates every record in `specs` and links each one to the report, all or nothing.
///
/// Any failing item rolls the whole batch back and is reported as a single
/// [`LedgerError::BatchPartialFailure`]. An unknown report is `NotFound`.
pub fn commit_batch(db: &mut Db, report_id: i64, specs: &[RecordSpec]) -> LedgerResult<Vec<i64>> {
    let total = specs.len();
    let fail = |index: usize, source: LedgerError| LedgerError::BatchPartialFailure {
        index,
        total,
        source: Box::new(source),
    };

    for (index, spec) in specs.iter().enumerate() {
        spec.validate().map_err(|e| fail(index, e))?;
    }

    let tx = db.conn_mut().transaction()?;
    fetch_report(&tx, report_id)?;

    let created_at = now_utc();
    let mut ids = Vec::with_capacity(total);
    for (index, spec) in specs.iter().enumerate() {
        let inserted = insert_finance_record(&tx, spec, created_at)
            .and_then(|id| insert_link(&tx, report_id, id).map(|_| id));
        match inserted {
            Ok(id) => ids.push(id),
            Err(e) => {
                // Dropping `tx` rolls back.
                warn!(report_id, index, total, error = %e, "batch rolled back");
                return Err(fail(index, e.into()));
            }
        }
    }

    tx.commit()?;
    info!(report_id, count = ids.len(), "batch committed");
    Ok(ids)
}
