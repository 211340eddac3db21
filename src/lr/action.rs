use serde::{Deserialize, Serialize};

/// One cell of the action table.
///
/// A shift's `came_from` maps each item of the target state to the item it
/// directly continues in the origin state; the runtime chains read counters
/// along it so reductions of quantified rules know their width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Shift {
        goto: usize,
        came_from: Vec<Option<usize>>,
    },
    Reduce {
        key: String,
        rule: usize,
    },
    Accept {
        key: String,
    },
}

impl Action {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Action::Shift { .. } => "shift",
            Action::Reduce { .. } => "reduce",
            Action::Accept { .. } => "accept",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift { goto, .. } => write!(f, "s{}", goto),
            Action::Reduce { rule, .. } => write!(f, "r{}", rule),
            Action::Accept { .. } => write!(f, "acc"),
        }
    }
}
