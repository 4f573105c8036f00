//! crates/study_hub_core/src/filter.rs
//!
//! Answers "children of a course" queries by scanning a child table.
//! There is no index: cost is linear in the size of the table.

use crate::domain::CourseScoped;
use crate::ports::{PortResult, Table};

/// Returns every record of `table` whose `course_id` equals `course_id` exactly.
/// An unknown or dangling course id simply yields an empty list.
pub async fn list_by_parent<V: CourseScoped>(
    table: &dyn Table<V>,
    course_id: &str,
) -> PortResult<Vec<V>> {
    let children = table
        .values()
        .await?
        .into_iter()
        .filter(|record| record.course_id() == course_id)
        .collect();
    Ok(children)
}
