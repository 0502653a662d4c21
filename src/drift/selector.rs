use crate::ChangeEvent;

/// Tracked data field together with its baseline value
///
/// The baseline is fixed at construction and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    field: String,
    baseline: String,
}

/// Outcome of comparing one event against the baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Field present and equal to the baseline
    Unchanged,
    /// Created/Modified payload without the tracked field
    Absent,
    /// Deletion or in-band error; never a trigger
    Ignored,
    /// Field present and different from the baseline
    Drifted { current: String, new: String },
}

impl FieldSelector {
    pub fn new(
        field: impl Into<String>,
        baseline: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            baseline: baseline.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Compares the tracked field of `event` with the baseline.
    ///
    /// Comparison is exact string equality. `current` in
    /// [`Verdict::Drifted`] is the baseline, `new` the observed value.
    pub fn evaluate(
        &self,
        event: &ChangeEvent,
    ) -> Verdict {
        let payload = match event {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) => p,
            ChangeEvent::Deleted(_) | ChangeEvent::Error(_) => return Verdict::Ignored,
        };

        match payload.get(&self.field) {
            None => Verdict::Absent,
            Some(value) if value == self.baseline => Verdict::Unchanged,
            Some(value) => Verdict::Drifted {
                current: self.baseline.clone(),
                new: value.to_string(),
            },
        }
    }
}
