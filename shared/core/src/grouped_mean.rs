use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, Default)]
struct MeanEntry {
    sum: f64,
    count: usize,
}

impl MeanEntry {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Per-group running sums, kept in the order groups were first seen.
#[derive(Debug, Clone, Default)]
pub struct GroupedMean {
    entries: IndexMap<String, MeanEntry>,
}

impl GroupedMean {
    pub fn new() -> Self {
        GroupedMean {
            entries: IndexMap::new(),
        }
    }

    pub fn push(&mut self, group: &str, value: f64) {
        match self.entries.get_mut(group) {
            Some(entry) => entry.push(value),
            None => {
                let mut entry = MeanEntry::default();
                entry.push(value);
                self.entries.insert(group.to_string(), entry);
            }
        }
    }

    pub fn mean(&self, group: &str) -> Option<f64> {
        self.entries.get(group).and_then(|entry| entry.average())
    }

    pub fn count(&self, group: &str) -> usize {
        self.entries.get(group).map(|entry| entry.count).unwrap_or(0)
    }

    pub fn num_groups(&self) -> usize {
        self.entries.len()
    }

    pub fn total_count(&self) -> usize {
        self.entries.values().map(|entry| entry.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(group, count, mean)` for every group, in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, usize, f64)> + '_ {
        self.entries.iter().filter_map(|(name, entry)| {
            entry
                .average()
                .map(|average| (name.as_str(), entry.count, average))
        })
    }

    /// Mean over every pushed value, regardless of group.
    pub fn overall_mean(&self) -> Option<f64> {
        let total = self.total_count();
        if total == 0 {
            return None;
        }
        let sum: f64 = self.entries.values().map(|entry| entry.sum).sum();
        Some(sum / total as f64)
    }

    /// Unweighted mean of the per-group means: every group counts once.
    pub fn mean_of_means(&self) -> Option<f64> {
        let means = self
            .entries
            .values()
            .filter_map(|entry| entry.average())
            .collect::<Vec<_>>();
        if means.is_empty() {
            None
        } else {
            Some(means.iter().sum::<f64>() / means.len() as f64)
        }
    }
}

impl<S: AsRef<str>> Extend<(S, f64)> for GroupedMean {
    fn extend<T: IntoIterator<Item = (S, f64)>>(&mut self, iter: T) {
        for (group, value) in iter {
            self.push(group.as_ref(), value);
        }
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for GroupedMean {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut grouped = GroupedMean::new();
        grouped.extend(iter);
        grouped
    }
}
