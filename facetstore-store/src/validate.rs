//! Pre-dispatch validation shared by every backend.
//!
//! Every `StoreBackend::put_transaction` implementation is expected to
//! call [`validate_transaction`] before touching the network, so no
//! backend can accidentally skip the checks the spec requires to be
//! synchronous and fatal.

use facetstore_record::Record;

use crate::error::{StoreError, MAX_TRANSACTION_ITEMS};

/// Check that a prospective commit's records are well-formed for
/// `facet` and within the backend's transaction-size ceiling.
pub fn validate_transaction(
    facet: &str,
    state: &Record,
    inbound: &[Record],
    outbound: &[Record],
) -> Result<(), StoreError> {
    if !(state.is_state() && state.is_facet(facet)) {
        return Err(StoreError::Validation(format!(
            "state row must be a StateRecord of facet {facet}, got sort_key={} facet={}",
            state.sort_key, state.facet
        )));
    }

    for r in inbound {
        if !(r.is_inbound() && r.is_facet(facet)) {
            return Err(StoreError::Validation(format!(
                "inbound row must be an InboundRecord of facet {facet}, got sort_key={} facet={}",
                r.sort_key, r.facet
            )));
        }
    }

    for r in outbound {
        if !(r.is_outbound() && r.is_facet(facet)) {
            return Err(StoreError::Validation(format!(
                "outbound row must be an OutboundRecord of facet {facet}, got sort_key={} facet={}",
                r.sort_key, r.facet
            )));
        }
    }

    let len = 1 + inbound.len() + outbound.len();
    if len > MAX_TRANSACTION_ITEMS {
        return Err(StoreError::Capacity { len, max: MAX_TRANSACTION_ITEMS });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn rejects_state_of_wrong_facet() {
        let state = Record::new_state("widget", "id", 1, "{}".into(), Utc::now());
        let err = validate_transaction("gadget", &state, &[], &[]).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn rejects_inbound_of_wrong_kind() {
        let state = Record::new_state("widget", "id", 1, "{}".into(), Utc::now());
        let not_inbound = Record::new_state("widget", "id", 1, "{}".into(), Utc::now());
        let err = validate_transaction("widget", &state, &[not_inbound], &[]).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn rejects_oversized_transaction() {
        let state = Record::new_state("widget", "id", 1, "{}".into(), Utc::now());
        let inbound: Vec<Record> = (0..30)
            .map(|i| Record::new_inbound("widget", "id", i, "T", "{}".into(), Utc::now()))
            .collect();
        let err = validate_transaction("widget", &state, &inbound, &[]).unwrap_err();
        assert!(matches!(err, StoreError::Capacity { .. }));
    }

    #[test]
    fn accepts_well_formed_transaction() {
        let state = Record::new_state("widget", "id", 2, "{}".into(), Utc::now());
        let inbound = vec![Record::new_inbound("widget", "id", 2, "T", "{}".into(), Utc::now())];
        let outbound =
            vec![Record::new_outbound("widget", "id", 2, 0, "Emitted", "{}".into(), Utc::now())];
        assert!(validate_transaction("widget", &state, &inbound, &outbound).is_ok());
    }
}
