use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_auth::{ActingUser, OwnedRecord, RecordKind, check_ownership};
use orderflow_core::{
    CustomerId, DomainError, DomainResult, Entity, TenantId, UserId, record_id_newtype,
};

record_id_newtype!(
    /// Lead (and opportunity) identifier.
    LeadId,
    "LeadId"
);

/// Lead status.
///
/// The `lead_*` values are the lead stage, the `opp_*` values the opportunity
/// stage. `opp_sq` marks an opportunity that has been turned into a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    LeadNew,
    LeadContacted,
    LeadQualified,
    OppProspecting,
    OppProposal,
    OppNegotiation,
    OppSq,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 9] = [
        LeadStatus::LeadNew,
        LeadStatus::LeadContacted,
        LeadStatus::LeadQualified,
        LeadStatus::OppProspecting,
        LeadStatus::OppProposal,
        LeadStatus::OppNegotiation,
        LeadStatus::OppSq,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::LeadNew => "lead_new",
            LeadStatus::LeadContacted => "lead_contacted",
            LeadStatus::LeadQualified => "lead_qualified",
            LeadStatus::OppProspecting => "opp_prospecting",
            LeadStatus::OppProposal => "opp_proposal",
            LeadStatus::OppNegotiation => "opp_negotiation",
            LeadStatus::OppSq => "opp_sq",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }

    /// Statuses from which an opportunity may be converted to a quotation.
    pub fn is_opportunity_stage(self) -> bool {
        matches!(
            self,
            LeadStatus::OppProspecting | LeadStatus::OppProposal | LeadStatus::OppNegotiation
        )
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }

    /// Manual status changes.
    ///
    /// Closed leads are immutable, `opp_sq` is only ever set by conversion, and
    /// a converted opportunity can only be closed.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        if self == next || self.is_closed() || next == LeadStatus::OppSq {
            return false;
        }
        match self {
            LeadStatus::OppSq => next.is_closed(),
            _ => true,
        }
    }
}

impl core::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LeadStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown lead status: {s}")))
    }
}

/// Lead / opportunity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub tenant_id: TenantId,
    pub name: String,
    /// Creating user (`id_user`).
    pub owner_id: UserId,
    /// Co-owner.
    pub assigned_to: Option<UserId>,
    pub customer_id: Option<CustomerId>,
    pub status: LeadStatus,
    /// Comma-separated product names.
    pub product_interest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn is_opportunity(&self) -> bool {
        self.status.is_opportunity_stage()
    }

    /// Product names listed in `product_interest`, trimmed, blanks removed.
    pub fn product_interest_names(&self) -> Vec<&str> {
        self.product_interest
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn change_status(&mut self, next: LeadStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::precondition(format!(
                "lead status cannot change from {} to {next}",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Stamp the lead after its quotation has been created.
    pub fn mark_converted(&mut self, at: DateTime<Utc>) {
        self.status = LeadStatus::OppSq;
        self.updated_at = at;
    }
}

impl Entity for Lead {
    type Id = LeadId;

    fn id(&self) -> LeadId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl OwnedRecord for Lead {
    fn record_kind(&self) -> RecordKind {
        RecordKind::Lead
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }

    fn assignee_id(&self) -> Option<UserId> {
        self.assigned_to
    }
}

/// Gate for turning an opportunity into a sales quotation.
///
/// Re-validates visibility (`NotFound` when hidden) and then requires an
/// opportunity-stage status (`PreconditionFailed` otherwise).
pub fn can_convert_opportunity_to_sq(lead: &Lead, user: Option<&ActingUser>) -> DomainResult<()> {
    check_ownership(lead, user)?;
    if !lead.is_opportunity() {
        return Err(DomainError::precondition(format!(
            "lead must be at an opportunity stage to create a quotation (status is {})",
            lead.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_auth::Role;
    use proptest::prelude::*;

    fn lead(owner: i64, status: LeadStatus) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId::new(1),
            tenant_id: TenantId::new(),
            name: "Harbour expansion".to_string(),
            owner_id: UserId::new(owner),
            assigned_to: None,
            customer_id: None,
            status,
            product_interest: Some(" Steel Pipe, ,valve ,".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn product_interest_is_split_and_trimmed() {
        assert_eq!(lead(1, LeadStatus::OppProposal).product_interest_names(), vec!["Steel Pipe", "valve"]);
    }

    #[test]
    fn conversion_requires_visibility_before_status() {
        let l = lead(1, LeadStatus::LeadNew);
        let stranger = ActingUser::new(UserId::new(2), Role::Sales);
        assert_eq!(can_convert_opportunity_to_sq(&l, Some(&stranger)), Err(DomainError::NotFound));

        let owner = ActingUser::new(UserId::new(1), Role::Sales);
        assert!(matches!(
            can_convert_opportunity_to_sq(&l, Some(&owner)),
            Err(DomainError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn opportunity_owner_can_convert() {
        let l = lead(1, LeadStatus::OppNegotiation);
        let owner = ActingUser::new(UserId::new(1), Role::Sales);
        assert_eq!(can_convert_opportunity_to_sq(&l, Some(&owner)), Ok(()));
    }

    #[test]
    fn converted_opportunity_cannot_be_converted_again() {
        let mut l = lead(1, LeadStatus::OppProposal);
        l.mark_converted(Utc::now());
        let owner = ActingUser::new(UserId::new(1), Role::Sales);
        assert!(matches!(
            can_convert_opportunity_to_sq(&l, Some(&owner)),
            Err(DomainError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(" OPP_Proposal ".parse::<LeadStatus>(), Ok(LeadStatus::OppProposal));
        assert!("opportunity".parse::<LeadStatus>().is_err());
        assert_eq!(serde_json::to_string(&LeadStatus::OppSq).unwrap(), "\"opp_sq\"");
    }

    #[test]
    fn opp_sq_is_reserved_for_conversion() {
        let mut l = lead(1, LeadStatus::OppProposal);
        assert!(l.change_status(LeadStatus::OppSq, Utc::now()).is_err());
        l.mark_converted(Utc::now());
        assert!(l.change_status(LeadStatus::OppProposal, Utc::now()).is_err());
        assert_eq!(l.change_status(LeadStatus::Won, Utc::now()), Ok(()));
    }

    proptest! {
        #[test]
        fn closed_leads_never_change(from in 7usize..9, to in 0usize..9) {
            let from = LeadStatus::ALL[from];
            prop_assert!(!from.can_transition_to(LeadStatus::ALL[to]));
        }
    }
}
