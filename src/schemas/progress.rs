use serde::Serialize;

use crate::core::time::format_primitive;
use crate::services::progress::ProgressSeries;

#[derive(Debug, Serialize)]
pub(crate) struct ProgressPoint {
    pub(crate) id: i64,
    pub(crate) category: String,
    pub(crate) score: i32,
    pub(crate) total: i32,
    pub(crate) percent: f64,
    pub(crate) recorded_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) student_id: String,
    pub(crate) points: Vec<ProgressPoint>,
}

impl ProgressResponse {
    pub(crate) fn from_series(student_id: String, series: &ProgressSeries) -> Self {
        let points = series
            .records()
            .iter()
            .zip(series.points())
            .map(|(record, (recorded_at, percent))| ProgressPoint {
                id: record.id,
                category: record.category.clone(),
                score: record.score,
                total: record.total_questions,
                percent,
                recorded_at: format_primitive(recorded_at),
            })
            .collect();

        Self { student_id, points }
    }
}
