use time::PrimitiveDateTime;

use crate::db::models::ScoreRecord;

/// A student's score history ordered for charting. Iterating it is restartable.
#[derive(Debug, Clone)]
pub(crate) struct ProgressSeries {
    records: Vec<ScoreRecord>,
}

impl ProgressSeries {
    pub(crate) fn new(mut records: Vec<ScoreRecord>) -> Self {
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        Self { records }
    }

    pub(crate) fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn points(&self) -> impl Iterator<Item = (PrimitiveDateTime, f64)> + '_ {
        self.records.iter().map(|record| (record.recorded_at, record.percent()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(id: i64, at: PrimitiveDateTime, score: i32, total: i32) -> ScoreRecord {
        ScoreRecord {
            id,
            student_id: "S-1".to_string(),
            category: "Cardiology".to_string(),
            score,
            total_questions: total,
            recorded_at: at,
        }
    }

    #[test]
    fn points_are_sorted_by_time_then_id() {
        let series = ProgressSeries::new(vec![
            record(3, datetime!(2025-03-02 10:00), 5, 10),
            record(2, datetime!(2025-03-01 09:00), 10, 10),
            record(1, datetime!(2025-03-01 09:00), 0, 10),
        ]);

        let ids: Vec<i64> = series.records().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let percents: Vec<f64> = series.points().map(|(_, percent)| percent).collect();
        assert_eq!(percents, vec![0.0, 100.0, 50.0]);
    }

    #[test]
    fn zero_total_plots_as_zero() {
        let series = ProgressSeries::new(vec![record(1, datetime!(2025-03-01 09:00), 0, 0)]);
        assert_eq!(series.points().next().map(|(_, percent)| percent), Some(0.0));
    }

    #[test]
    fn points_can_be_iterated_twice() {
        let series = ProgressSeries::new(vec![
            record(1, datetime!(2025-03-01 09:00), 3, 4),
            record(2, datetime!(2025-03-02 09:00), 4, 4),
        ]);
        assert_eq!(series.points().count(), 2);
        assert_eq!(series.points().count(), 2);
        assert!(!series.is_empty());
    }
}
