//! Partitioning of deduplicated records into export batches
//!
//! Batch lengths are drawn uniformly from `[min_rows, max_rows]` and clamped
//! to what is left, so every batch but the last falls inside the bounds. The
//! last one can be shorter than `min_rows`. An input no longer than
//! `min_rows` becomes a single batch.

use crate::domain::{Record, RecordId, RecordTable, Result, TallyError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

/// A contiguous slice of the deduplicated records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position in the run
    pub index: usize,
    pub columns: Arc<[String]>,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_id(&self) -> Option<&RecordId> {
        self.records.first().map(Record::id)
    }

    pub fn last_id(&self) -> Option<&RecordId> {
        self.records.last().map(Record::id)
    }

    /// Distinct identifiers in first-occurrence order
    pub fn record_ids(&self) -> Vec<RecordId> {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records
            .iter()
            .map(Record::id)
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }
}

/// Check `min_rows`/`max_rows`
pub fn validate_bounds(min_rows: usize, max_rows: usize) -> Result<()> {
    if min_rows == 0 {
        return Err(TallyError::Validation("min_rows must be positive".to_string()));
    }
    if min_rows > max_rows {
        return Err(TallyError::Validation(format!(
            "min_rows ({min_rows}) must not exceed max_rows ({max_rows})"
        )));
    }
    Ok(())
}

/// Split `records` into ordered batches using `rng` for the batch lengths
///
/// # Errors
///
/// Returns a validation error if the bounds are invalid.
pub fn split_records<R: Rng>(
    records: &RecordTable,
    min_rows: usize,
    max_rows: usize,
    rng: &mut R,
) -> Result<Vec<Batch>> {
    validate_bounds(min_rows, max_rows)?;
    Ok(split_validated(records, min_rows, max_rows, rng))
}

fn split_validated<R: Rng>(
    records: &RecordTable,
    min_rows: usize,
    max_rows: usize,
    rng: &mut R,
) -> Vec<Batch> {
    let columns = records.shared_columns();
    let rows = records.records();
    if rows.is_empty() {
        return Vec::new();
    }

    let batch = |index: usize, slice: &[Record]| Batch {
        index,
        columns: Arc::clone(&columns),
        records: slice.to_vec(),
    };

    if rows.len() <= min_rows {
        return vec![batch(1, rows)];
    }

    let mut batches = Vec::new();
    let mut offset = 0;
    while offset < rows.len() {
        let drawn = rng.gen_range(min_rows..=max_rows);
        let end = (offset + drawn).min(rows.len());
        batches.push(batch(batches.len() + 1, &rows[offset..end]));
        offset = end;
    }
    batches
}

/// Batch planner owning its random source
pub struct Batcher {
    min_rows: usize,
    max_rows: usize,
    rng: StdRng,
}

impl Batcher {
    /// Create a batcher; `seed` makes the plan reproducible
    ///
    /// # Errors
    ///
    /// Returns a validation error if the bounds are invalid.
    pub fn new(min_rows: usize, max_rows: usize, seed: Option<u64>) -> Result<Self> {
        validate_bounds(min_rows, max_rows)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            min_rows,
            max_rows,
            rng,
        })
    }

    /// Plan the batches for `records`
    pub fn split(&mut self, records: &RecordTable) -> Vec<Batch> {
        split_validated(records, self.min_rows, self.max_rows, &mut self.rng)
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.min_rows, self.max_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn table(count: usize) -> RecordTable {
        RecordTable::from_rows(
            vec!["ID".to_string(), "AUTHOR".to_string()],
            "ID",
            (1..=count)
                .map(|i| vec![Some(format!("R{i:04}")), None])
                .collect(),
        )
        .unwrap()
    }

    fn flatten(batches: &[Batch]) -> Vec<Record> {
        batches.iter().flat_map(|b| b.records.clone()).collect()
    }

    #[test]
    fn test_450_records_split_into_bounded_batches() {
        let input = table(450);
        let mut batcher = Batcher::new(200, 220, Some(42)).unwrap();

        let batches = batcher.split(&input);

        assert!((2..=3).contains(&batches.len()));
        assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), 450);
        assert!(batches.iter().all(|b| b.len() <= 220));
        let (last, head) = batches.split_last().unwrap();
        assert!(head.iter().all(|b| b.len() >= 200));
        assert!(!last.is_empty());
        assert_eq!(flatten(&batches), input.records());
    }

    #[test]
    fn test_short_input_is_single_batch() {
        let input = table(150);
        let batches = Batcher::new(200, 220, None).unwrap().split(&input);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].index, 1);
        assert_eq!(batches[0].records, input.records());
    }

    #[test]
    fn test_exactly_min_rows_is_single_batch() {
        let batches = Batcher::new(200, 220, Some(1)).unwrap().split(&table(200));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 200);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let batches = Batcher::new(200, 220, Some(1)).unwrap().split(&table(0));
        assert!(batches.is_empty());
    }

    #[test_case(201, 200, 220 ; "just above min")]
    #[test_case(421, 200, 220 ; "short tail likely")]
    #[test_case(1000, 200, 220 ; "many batches")]
    #[test_case(97, 10, 10 ; "fixed size")]
    #[test_case(50, 1, 3 ; "tiny bounds")]
    fn test_split_invariants(count: usize, min_rows: usize, max_rows: usize) {
        let input = table(count);
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let batches = split_records(&input, min_rows, max_rows, &mut rng).unwrap();

            assert_eq!(flatten(&batches), input.records(), "seed {seed}");
            for (i, batch) in batches.iter().enumerate() {
                assert_eq!(batch.index, i + 1);
                assert!(!batch.is_empty());
                assert!(batch.len() <= max_rows);
                if i + 1 < batches.len() {
                    assert!(batch.len() >= min_rows, "seed {seed} batch {}", batch.index);
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_plan() {
        let input = table(1000);
        let plan = |seed| {
            Batcher::new(200, 220, Some(seed))
                .unwrap()
                .split(&input)
                .iter()
                .map(Batch::len)
                .collect::<Vec<_>>()
        };
        assert_eq!(plan(9), plan(9));
    }

    #[test_case(0, 10 ; "zero min")]
    #[test_case(20, 10 ; "min above max")]
    fn test_invalid_bounds(min_rows: usize, max_rows: usize) {
        assert!(matches!(
            Batcher::new(min_rows, max_rows, None),
            Err(TallyError::Validation(_))
        ));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(split_records(&table(5), min_rows, max_rows, &mut rng).is_err());
    }

    #[test]
    fn test_batch_identifier_helpers() {
        let table = RecordTable::from_rows(
            vec!["ID".to_string()],
            "ID",
            ["7", "8", "8", "9"].iter().map(|v| vec![Some(v.to_string())]).collect(),
        )
        .unwrap();
        let batch = &split_records(&table, 5, 5, &mut StdRng::seed_from_u64(0)).unwrap()[0];

        assert_eq!(batch.first_id().unwrap().as_str(), "7");
        assert_eq!(batch.last_id().unwrap().as_str(), "9");
        let ids: Vec<_> = batch.record_ids().iter().map(|id| id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["7", "8", "9"]);
    }
}
