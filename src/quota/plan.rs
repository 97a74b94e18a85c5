//! Pre-dispatch credit projection.

use std::fmt;

/// Default monthly credit allotment (the free SerpAPI tier).
pub const DEFAULT_MONTHLY_QUOTA: u64 = 250;

/// The credit projection computed before any network call.
///
/// Read-only once built; gates whether execution proceeds. Policy: the
/// run warns when projected usage exceeds the quota but does not block
/// unless a hard cap is configured and exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    /// Monthly credit allotment.
    pub quota: u64,
    /// Credits already consumed this month.
    pub used_before: u64,
    /// Credits this run will charge: `task_count * pages_per_task`.
    pub credits_needed: u64,
    /// Optional ceiling on `credits_needed` for a single run.
    pub hard_cap: Option<u64>,
}

impl RunPlan {
    /// Projects the credit cost of a run.
    #[must_use]
    pub fn project(
        task_count: usize,
        pages_per_task: usize,
        used_before: u64,
        quota: u64,
        hard_cap: Option<u64>,
    ) -> Self {
        Self {
            quota,
            used_before,
            credits_needed: (task_count * pages_per_task) as u64,
            hard_cap,
        }
    }

    /// Usage after the run completes.
    #[must_use]
    pub fn projected_used(&self) -> u64 {
        self.used_before + self.credits_needed
    }

    /// Projected usage as a percentage of quota.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.quota == 0 {
            return 100.0;
        }
        (self.projected_used() as f64 / self.quota as f64) * 100.0
    }

    /// True when the projected usage exceeds the monthly quota.
    #[must_use]
    pub fn exceeds_quota(&self) -> bool {
        self.projected_used() > self.quota
    }

    /// True when a hard cap is configured and this run's cost exceeds it.
    #[must_use]
    pub fn exceeds_hard_cap(&self) -> bool {
        self.hard_cap.is_some_and(|cap| self.credits_needed > cap)
    }
}

impl fmt::Display for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quota {} | used {} | this run {} | after {} ({:.1}%)",
            self.quota,
            self.used_before,
            self.credits_needed,
            self.projected_used(),
            self.percent()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accounting_scenario() {
        // 5 tasks x 2 pages, 10 already used, quota 250
        let plan = RunPlan::project(5, 2, 10, 250, None);
        assert_eq!(plan.credits_needed, 10);
        assert_eq!(plan.projected_used(), 20);
        assert!((plan.percent() - 8.0).abs() < f64::EPSILON);
        assert!(!plan.exceeds_quota());
        assert!(!plan.exceeds_hard_cap());
    }

    #[test]
    fn test_exceeds_quota_warns_not_blocks() {
        let plan = RunPlan::project(100, 3, 0, 250, None);
        assert_eq!(plan.credits_needed, 300);
        assert!(plan.exceeds_quota());
        // No hard cap configured: nothing to abort on
        assert!(!plan.exceeds_hard_cap());
    }

    #[test]
    fn test_hard_cap_exceeded() {
        let plan = RunPlan::project(6, 2, 0, 250, Some(10));
        assert_eq!(plan.credits_needed, 12);
        assert!(plan.exceeds_hard_cap());
    }

    #[test]
    fn test_hard_cap_exactly_met_is_allowed() {
        let plan = RunPlan::project(5, 2, 0, 250, Some(10));
        assert!(!plan.exceeds_hard_cap());
    }

    #[test]
    fn test_zero_quota_is_full() {
        let plan = RunPlan::project(1, 1, 0, 0, None);
        assert!((plan.percent() - 100.0).abs() < f64::EPSILON);
        assert!(plan.exceeds_quota());
    }

    #[test]
    fn test_display_shows_projection() {
        let plan = RunPlan::project(5, 2, 10, 250, None);
        let text = plan.to_string();
        assert!(text.contains("this run 10"), "missing cost in: {text}");
        assert!(text.contains("8.0%"), "missing percent in: {text}");
    }

    #[test]
    fn test_default_quota_constant() {
        assert_eq!(DEFAULT_MONTHLY_QUOTA, 250);
    }
}
