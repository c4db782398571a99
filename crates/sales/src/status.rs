//! Status Registry: sales order lifecycle statuses and the transition graph.
//!
//! ```text
//! NEW → PR → PO → SR → FAR → DR → DELIVERY → DELIVERED → RECEIVED → COMPLETED
//! ```
//! `CANCELLED` is reachable from every non-terminal status and `PR → NEW` is
//! the only backward edge (reopen).

use serde::{Deserialize, Serialize};

use orderflow_auth::Department;
use orderflow_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Drafted by sales.
    #[serde(alias = "OPEN", alias = "DRAFT")]
    New,
    /// Purchase request.
    Pr,
    /// Purchase order placed with the vendor.
    Po,
    /// Stock reservation.
    Sr,
    /// Finance approval request.
    Far,
    /// Delivery request.
    Dr,
    Delivery,
    Delivered,
    Received,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 11] = [
        SaleStatus::New,
        SaleStatus::Pr,
        SaleStatus::Po,
        SaleStatus::Sr,
        SaleStatus::Far,
        SaleStatus::Dr,
        SaleStatus::Delivery,
        SaleStatus::Delivered,
        SaleStatus::Received,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::New => "NEW",
            SaleStatus::Pr => "PR",
            SaleStatus::Po => "PO",
            SaleStatus::Sr => "SR",
            SaleStatus::Far => "FAR",
            SaleStatus::Dr => "DR",
            SaleStatus::Delivery => "DELIVERY",
            SaleStatus::Delivered => "DELIVERED",
            SaleStatus::Received => "RECEIVED",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }

    /// Forward successor in the main chain.
    pub fn forward(self) -> Option<SaleStatus> {
        match self {
            SaleStatus::New => Some(SaleStatus::Pr),
            SaleStatus::Pr => Some(SaleStatus::Po),
            SaleStatus::Po => Some(SaleStatus::Sr),
            SaleStatus::Sr => Some(SaleStatus::Far),
            SaleStatus::Far => Some(SaleStatus::Dr),
            SaleStatus::Dr => Some(SaleStatus::Delivery),
            SaleStatus::Delivery => Some(SaleStatus::Delivered),
            SaleStatus::Delivered => Some(SaleStatus::Received),
            SaleStatus::Received => Some(SaleStatus::Completed),
            SaleStatus::Completed | SaleStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Cancelled)
    }

    /// PR, PO, SR, FAR and DR: the statuses purchasing drives.
    pub fn is_purchasing_chain(self) -> bool {
        matches!(
            self,
            SaleStatus::Pr | SaleStatus::Po | SaleStatus::Sr | SaleStatus::Far | SaleStatus::Dr
        )
    }

    /// Department expected to move the order out of this status.
    pub fn owning_department(self) -> Option<Department> {
        match self {
            SaleStatus::New | SaleStatus::Delivered | SaleStatus::Received => Some(Department::Sales),
            s if s.is_purchasing_chain() => Some(Department::Purchasing),
            SaleStatus::Delivery => Some(Department::Warehouse),
            _ => None,
        }
    }
}

impl core::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "OPEN" | "DRAFT" => Ok(SaleStatus::New),
            other => SaleStatus::ALL
                .into_iter()
                .find(|status| status.as_str() == other)
                .ok_or_else(|| DomainError::validation(format!("unknown sale status: {s}"))),
        }
    }
}

/// Every status directly reachable from `current`.
pub fn next_possible_statuses(current: SaleStatus) -> Vec<SaleStatus> {
    if current.is_terminal() {
        return Vec::new();
    }
    let mut next: Vec<SaleStatus> = current.forward().into_iter().collect();
    next.push(SaleStatus::Cancelled);
    if current == SaleStatus::Pr {
        next.push(SaleStatus::New);
    }
    next
}

pub fn is_valid_transition(from: SaleStatus, to: SaleStatus) -> bool {
    next_possible_statuses(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pr_can_advance_cancel_or_reopen() {
        assert_eq!(
            next_possible_statuses(SaleStatus::Pr),
            vec![SaleStatus::Po, SaleStatus::Cancelled, SaleStatus::New]
        );
        assert!(!is_valid_transition(SaleStatus::Pr, SaleStatus::Sr));
    }

    #[test]
    fn reopen_is_the_only_backward_edge() {
        for from in SaleStatus::ALL {
            for to in next_possible_statuses(from) {
                if to < from && to != SaleStatus::Cancelled {
                    assert_eq!((from, to), (SaleStatus::Pr, SaleStatus::New));
                }
            }
        }
    }

    #[test]
    fn legacy_aliases_parse_as_new() {
        assert_eq!("open".parse::<SaleStatus>(), Ok(SaleStatus::New));
        assert_eq!(" DRAFT".parse::<SaleStatus>(), Ok(SaleStatus::New));
        assert_eq!("far".parse::<SaleStatus>(), Ok(SaleStatus::Far));
        assert!("SHIPPED".parse::<SaleStatus>().is_err());

        let legacy: SaleStatus = serde_json::from_str("\"OPEN\"").unwrap();
        assert_eq!(legacy, SaleStatus::New);
        assert_eq!(serde_json::to_string(&SaleStatus::Delivered).unwrap(), "\"DELIVERED\"");
    }

    #[test]
    fn departments_follow_the_chain() {
        assert_eq!(SaleStatus::New.owning_department(), Some(Department::Sales));
        assert_eq!(SaleStatus::Far.owning_department(), Some(Department::Purchasing));
        assert_eq!(SaleStatus::Delivery.owning_department(), Some(Department::Warehouse));
        assert_eq!(SaleStatus::Received.owning_department(), Some(Department::Sales));
        assert_eq!(SaleStatus::Cancelled.owning_department(), None);
    }

    fn any_status() -> impl Strategy<Value = SaleStatus> {
        (0usize..SaleStatus::ALL.len()).prop_map(|i| SaleStatus::ALL[i])
    }

    proptest! {
        #[test]
        fn transition_check_agrees_with_successor_set(from in any_status(), to in any_status()) {
            prop_assert_eq!(
                is_valid_transition(from, to),
                next_possible_statuses(from).contains(&to)
            );
        }

        #[test]
        fn terminal_statuses_have_no_successors(status in any_status()) {
            prop_assert_eq!(status.is_terminal(), next_possible_statuses(status).is_empty());
        }

        #[test]
        fn display_round_trips_through_parse(status in any_status()) {
            prop_assert_eq!(status.to_string().parse::<SaleStatus>(), Ok(status));
        }
    }
}
