//! Task expansion and the per-task result type.

use std::collections::HashSet;
use std::fmt;

use crate::dorks::DorkSet;

/// Placeholder spellings a dork template may use for the target domain.
///
/// `example[.]com` is the defanged form common in published dork lists.
const PLACEHOLDERS: [&str; 2] = ["example.com", "example[.]com"];

/// One unit of work: a query template bound to a domain and category.
///
/// Immutable once enqueued; the cross-product of domains x categories x
/// templates is expanded up front by [`expand_tasks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Target domain substituted into the template.
    pub domain: String,
    /// Category the template was listed under.
    pub category: String,
    /// The raw query template, placeholders intact.
    pub template: String,
}

impl Task {
    /// Creates a new task.
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        category: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            category: category.into(),
            template: template.into(),
        }
    }

    /// Returns the concrete query with every placeholder replaced by the
    /// target domain.
    #[must_use]
    pub fn query(&self) -> String {
        let mut query = self.template.clone();
        for placeholder in PLACEHOLDERS {
            query = query.replace(placeholder, &self.domain);
        }
        query
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} @ {}", self.category, self.template, self.domain)
    }
}

/// The URLs one task discovered across all of its pages.
///
/// Produced exactly once per task. Pages that exhausted their retries are
/// simply absent from the union; that is not an error for the task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Target domain the task ran against.
    pub domain: String,
    /// Category of the originating template.
    pub category: String,
    /// The raw query template.
    pub template: String,
    /// Deduplicated union of URLs from every successful page.
    pub urls: HashSet<String>,
}

impl TaskResult {
    /// Builds a result for a task with the URLs it discovered.
    #[must_use]
    pub fn new(task: &Task, urls: HashSet<String>) -> Self {
        Self {
            domain: task.domain.clone(),
            category: task.category.clone(),
            template: task.template.clone(),
            urls,
        }
    }

    /// An empty result, used when a worker failed unexpectedly.
    #[must_use]
    pub fn empty(task: &Task) -> Self {
        Self::new(task, HashSet::new())
    }
}

/// Expands the cross-product of domains x categories x templates.
///
/// Task order follows domain order, then dork-file order; the dispatcher
/// makes no ordering promises anyway.
#[must_use]
pub fn expand_tasks(domains: &[String], dorks: &DorkSet) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(domains.len() * dorks.len());
    for domain in domains {
        for (category, template) in dorks.iter() {
            tasks.push(Task::new(domain, category, template));
        }
    }
    tasks
}
