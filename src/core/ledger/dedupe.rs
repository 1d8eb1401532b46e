//! Removal of already-exported records from a candidate set

use crate::domain::{RecordId, RecordTable};
use std::collections::HashSet;

/// Keep the records whose identifier is not in `exported`
///
/// Input order is preserved and neither input is modified.
pub fn dedupe(candidates: &RecordTable, exported: &HashSet<RecordId>) -> RecordTable {
    let remaining = candidates
        .records()
        .iter()
        .filter(|record| !exported.contains(record.id()))
        .cloned()
        .collect();
    candidates.with_records(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn table(ids: &[&str]) -> RecordTable {
        RecordTable::from_rows(
            vec!["ID".to_string(), "TITLE".to_string()],
            "ID",
            ids.iter()
                .map(|id| vec![Some(id.to_string()), Some(format!("title {id}"))])
                .collect(),
        )
        .unwrap()
    }

    fn ids(table: &RecordTable) -> Vec<&str> {
        table.records().iter().map(|r| r.id().as_str()).collect()
    }

    fn set(values: &[&str]) -> HashSet<RecordId> {
        values.iter().map(|v| RecordId::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_removes_ledgered_and_keeps_order() {
        let candidates = table(&["5", "3", "9", "1", "7"]);
        let result = dedupe(&candidates, &set(&["9", "5", "404"]));

        assert_eq!(ids(&result), vec!["3", "1", "7"]);
        assert_eq!(result.columns(), candidates.columns());
        assert_eq!(candidates.len(), 5);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(dedupe(&table(&[]), &set(&["1"])).is_empty());
        assert_eq!(dedupe(&table(&["1", "2"]), &HashSet::new()).len(), 2);
    }

    #[test]
    fn test_fully_ledgered_candidates() {
        let result = dedupe(&table(&["1", "2", "3"]), &set(&["3", "2", "1"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_repeated_candidate_rows_share_fate() {
        // A join can return one row per related entity for the same record
        let candidates = table(&["1", "2", "2", "3"]);
        assert_eq!(ids(&dedupe(&candidates, &set(&["2"]))), vec!["1", "3"]);
        assert_eq!(ids(&dedupe(&candidates, &set(&["1"]))), vec!["2", "2", "3"]);
    }

    #[test]
    fn test_size_matches_intersection_for_random_sets() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let count = rng.gen_range(0..60);
            let values: Vec<String> = (0..count).map(|i| format!("R{i:04}")).collect();
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            let ledger: Vec<&str> = refs.iter().copied().filter(|_| rng.gen_bool(0.4)).collect();

            let candidates = table(&refs);
            let ledger = set(&ledger);
            let result = dedupe(&candidates, &ledger);

            let overlap = candidates.records().iter().filter(|r| ledger.contains(r.id())).count();
            assert_eq!(result.len(), candidates.len() - overlap);
            assert!(result.records().iter().all(|r| !ledger.contains(r.id())));
        }
    }
}
