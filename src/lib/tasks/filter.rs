use regex::Regex;

use super::types::{TaskRecord, TaskResult, TaskState};

/// A single side-effect free test over a task record.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Accepts everything. Only ever appears alone in a chain.
    All,
    Name(Regex),
    Id(String),
    /// Accepts a record in any of the listed states.
    States(Vec<TaskState>),
}

impl Filter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Name(exp) => exp.is_match(&task.name),
            Filter::Id(id) => task.id == *id,
            Filter::States(states) => states.contains(&task.state),
        }
    }
}

/// Filters joined by logical AND.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

/// Filter flags as selected on the command line.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub name: Option<String>,
    pub all: bool,
    pub running: bool,
    pub failed: bool,
    pub killed: bool,
    pub finished: bool,
}

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        FilterChain { filters }
    }

    pub fn all() -> Self {
        FilterChain::new(vec![Filter::All])
    }

    /// Builds the chain for a set of flags. `all` replaces everything else;
    /// with no state flag at all only running tasks are selected.
    pub fn build(opts: &FilterOptions) -> TaskResult<Self> {
        // Compile first so a bad pattern fails the command even with --all.
        let name = match opts.name.as_deref().filter(|n| !n.is_empty()) {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        if opts.all {
            return Ok(FilterChain::all());
        }

        let mut filters = Vec::new();
        if let Some(exp) = name {
            filters.push(Filter::Name(exp));
        }

        let mut states = Vec::new();
        if opts.running {
            states.push(TaskState::Running);
        }
        if opts.failed {
            states.push(TaskState::Failed);
        }
        if opts.killed {
            states.push(TaskState::Killed);
        }
        if opts.finished {
            states.push(TaskState::Finished);
        }
        if states.is_empty() {
            states.push(TaskState::Running);
        }
        filters.push(Filter::States(states));

        Ok(FilterChain { filters })
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// True when every filter accepts the record. Stops at the first
    /// rejection; an empty chain accepts everything.
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.filters.iter().all(|filter| filter.matches(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::client::testing::task;
    use crate::lib::tasks::types::TaskError;

    fn opts() -> FilterOptions {
        FilterOptions::default()
    }

    #[test]
    fn defaults_to_running_only() {
        let chain = FilterChain::build(&opts()).unwrap();
        assert!(chain.matches(&task("a", "web", TaskState::Running)));
        assert!(!chain.matches(&task("b", "web", TaskState::Finished)));
        assert!(!chain.matches(&task("c", "web", TaskState::Staging)));
    }

    #[test]
    fn state_flags_select_their_union() {
        let chain = FilterChain::build(&FilterOptions {
            failed: true,
            killed: true,
            ..opts()
        })
        .unwrap();
        assert!(chain.matches(&task("a", "web", TaskState::Failed)));
        assert!(chain.matches(&task("b", "web", TaskState::Killed)));
        assert!(!chain.matches(&task("c", "web", TaskState::Running)));
    }

    #[test]
    fn name_and_state_must_both_match() {
        let chain = FilterChain::build(&FilterOptions {
            name: Some("^web-".to_string()),
            finished: true,
            ..opts()
        })
        .unwrap();
        assert!(chain.matches(&task("a", "web-1", TaskState::Finished)));
        assert!(!chain.matches(&task("b", "web-1", TaskState::Running)));
        assert!(!chain.matches(&task("c", "db-1", TaskState::Finished)));
    }

    #[test]
    fn all_accepts_everything_regardless_of_other_flags() {
        let chain = FilterChain::build(&FilterOptions {
            name: Some("never-matches".to_string()),
            all: true,
            running: true,
            killed: true,
            ..opts()
        })
        .unwrap();
        assert_eq!(chain.filters().len(), 1);
        for state in [TaskState::Running, TaskState::Lost, TaskState::Unknown] {
            assert!(chain.matches(&task("x", "anything", state)));
        }
    }

    #[test]
    fn bad_pattern_fails_the_build() {
        let err = FilterChain::build(&FilterOptions {
            name: Some("web-(".to_string()),
            all: true,
            ..opts()
        })
        .unwrap_err();
        assert!(matches!(err, TaskError::Pattern(_)));
    }

    #[test]
    fn reordering_filters_never_changes_the_result() {
        let filters = vec![
            Filter::Name(Regex::new("api").unwrap()),
            Filter::States(vec![TaskState::Running, TaskState::Failed]),
            Filter::Id("t-2".to_string()),
        ];
        let records = [
            task("t-1", "api", TaskState::Running),
            task("t-2", "api", TaskState::Failed),
            task("t-2", "web", TaskState::Failed),
            task("t-2", "api", TaskState::Killed),
        ];

        let forward = FilterChain::new(filters.clone());
        let backward = FilterChain::new(filters.into_iter().rev().collect());
        for record in &records {
            assert_eq!(forward.matches(record), backward.matches(record));
        }
        assert!(forward.matches(&records[1]));
        assert_eq!(records.iter().filter(|r| forward.matches(r)).count(), 1);
    }

    #[test]
    fn empty_chain_accepts() {
        assert!(FilterChain::default().matches(&task("a", "b", TaskState::Error)));
    }
}
