//! Enrichment: backfill derived attributes onto transactions.

use crate::derive::derive_attributes;
use crate::error::RetailError;
use crate::record::{DerivedAttributes, Transaction};

/// Compute derived attributes for every record, keyed by invoice id.
///
/// Fails on the first record missing its date or time; nothing is returned
/// for a partially valid input.
pub fn derive_all(records: &[Transaction]) -> Result<Vec<(String, DerivedAttributes)>, RetailError> {
    records
        .iter()
        .map(|record| Ok((record.invoice_id.clone(), derive_attributes(record)?)))
        .collect()
}

/// Attach derived attributes to every record in place.
///
/// All attributes are computed before any record is touched, so on error the
/// input is left unchanged. Running it twice yields the same records.
pub fn enrich(records: &mut [Transaction]) -> Result<usize, RetailError> {
    let derived = records
        .iter()
        .map(derive_attributes)
        .collect::<Result<Vec<_>, _>>()?;

    for (record, attributes) in records.iter_mut().zip(derived) {
        record.derived = Some(attributes);
    }

    Ok(records.len())
}
