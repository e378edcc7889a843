//! Repository usage history

use chrono::{DateTime, Utc};

use super::types::RepositoryUsage;

/// Record a repository as used at `at`
///
/// The repository moves to the front; older entries beyond `capacity` drop off.
pub fn record_usage(
    history: &mut Vec<RepositoryUsage>,
    repository: &str,
    at: DateTime<Utc>,
    capacity: usize,
) {
    history.retain(|h| h.repository != repository);
    history.insert(
        0,
        RepositoryUsage {
            repository: repository.to_string(),
            last_used: at,
        },
    );
    history.truncate(capacity);
}

/// Sort most recent first, keep the newest entry per repository, and bound
/// the list to `capacity`
#[must_use]
pub fn normalize(mut history: Vec<RepositoryUsage>, capacity: usize) -> Vec<RepositoryUsage> {
    // Stable sort keeps stored order between equal timestamps
    history.sort_by(|a, b| b.last_used.cmp(&a.last_used));

    let mut seen = std::collections::HashSet::new();
    history.retain(|h| !h.repository.is_empty() && seen.insert(h.repository.clone()));
    history.truncate(capacity);
    history
}
