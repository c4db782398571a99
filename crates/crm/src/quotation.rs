use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_auth::{OwnedRecord, RecordKind};
use orderflow_core::{CustomerId, DomainError, DomainResult, Entity, TenantId, UserId, record_id_newtype};
use orderflow_products::ProductId;

use crate::LeadId;

record_id_newtype!(
    /// Sales quotation identifier.
    QuotationId,
    "QuotationId"
);

/// Quotation status.
///
/// Legacy `sq_*` values and `closed` are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    #[serde(alias = "sq_draft")]
    Draft,
    #[serde(alias = "sq_sent")]
    Sent,
    #[serde(alias = "sq_approved")]
    Approved,
    Win,
    Lost,
    #[serde(alias = "closed")]
    Converted,
}

impl QuotationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Approved => "approved",
            QuotationStatus::Win => "win",
            QuotationStatus::Lost => "lost",
            QuotationStatus::Converted => "converted",
        }
    }

    /// `converted` and `lost` are final.
    pub fn is_final(self) -> bool {
        matches!(self, QuotationStatus::Converted | QuotationStatus::Lost)
    }

    /// Manual status changes. `converted` is only reachable through conversion.
    pub fn can_transition_to(self, next: QuotationStatus) -> bool {
        use QuotationStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Sent, Approved | Win | Lost) | (Approved, Win | Lost)
        )
    }
}

impl core::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for QuotationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" | "sq_draft" => Ok(QuotationStatus::Draft),
            "sent" | "sq_sent" => Ok(QuotationStatus::Sent),
            "approved" | "sq_approved" => Ok(QuotationStatus::Approved),
            "win" => Ok(QuotationStatus::Win),
            "lost" => Ok(QuotationStatus::Lost),
            "converted" | "closed" => Ok(QuotationStatus::Converted),
            _ => Err(DomainError::validation(format!("unknown quotation status: {s}"))),
        }
    }
}

/// Pipeline stage shown alongside the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStage {
    Draft,
    Sent,
    Negotiation,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// Sales quotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub tenant_id: TenantId,
    pub number: String,
    pub owner_id: UserId,
    /// Opportunity the quotation was created from.
    pub lead_id: Option<LeadId>,
    pub customer_id: CustomerId,
    pub status: QuotationStatus,
    pub stage: QuotationStage,
    pub items: Vec<QuotationItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// Quotation accepted by the customer, or sent and still at the sent stage.
    pub fn is_convertible_to_sales_order(&self) -> bool {
        match self.status {
            QuotationStatus::Win | QuotationStatus::Approved => true,
            QuotationStatus::Sent => self.stage == QuotationStage::Sent,
            _ => false,
        }
    }

    pub fn ensure_convertible_to_sales_order(&self) -> DomainResult<()> {
        if self.is_convertible_to_sales_order() {
            Ok(())
        } else {
            Err(DomainError::precondition(format!(
                "quotation must be win, approved or sent to create a sales order (status is {})",
                self.status
            )))
        }
    }

    /// Manual status change. Moving to `sent` also moves the stage and `lost`
    /// closes it. A won quotation keeps its stage until it is converted.
    pub fn change_status(&mut self, next: QuotationStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::precondition(format!(
                "quotation status cannot change from {} to {next}",
                self.status
            )));
        }
        self.status = next;
        match next {
            QuotationStatus::Sent => self.stage = QuotationStage::Sent,
            QuotationStatus::Lost => self.stage = QuotationStage::Closed,
            _ => {}
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn change_stage(&mut self, stage: QuotationStage, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_final() {
            return Err(DomainError::precondition(format!(
                "quotation is {} and can no longer change",
                self.status
            )));
        }
        self.stage = stage;
        self.updated_at = at;
        Ok(())
    }

    /// Stamp the quotation after its sales order has been created.
    pub fn mark_converted(&mut self, at: DateTime<Utc>) {
        self.status = QuotationStatus::Converted;
        self.stage = QuotationStage::Closed;
        self.updated_at = at;
    }

    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.unit_price.saturating_mul(item.quantity.max(0) as u64))
            .sum()
    }
}

impl Entity for Quotation {
    type Id = QuotationId;

    fn id(&self) -> QuotationId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl OwnedRecord for Quotation {
    fn record_kind(&self) -> RecordKind {
        RecordKind::Quotation
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotation(status: QuotationStatus, stage: QuotationStage) -> Quotation {
        let now = Utc::now();
        Quotation {
            id: QuotationId::new(3),
            tenant_id: TenantId::new(),
            number: "SQ2601010001".to_string(),
            owner_id: UserId::new(1),
            lead_id: None,
            customer_id: CustomerId::new(9),
            status,
            stage,
            items: vec![QuotationItem {
                product_id: ProductId::new(4),
                description: "Valve".to_string(),
                quantity: 3,
                unit_price: 250,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn convertible_statuses() {
        use QuotationStage as G;
        use QuotationStatus as S;
        assert!(quotation(S::Win, G::Negotiation).is_convertible_to_sales_order());
        assert!(quotation(S::Approved, G::Draft).is_convertible_to_sales_order());
        assert!(quotation(S::Sent, G::Sent).is_convertible_to_sales_order());
        assert!(!quotation(S::Sent, G::Negotiation).is_convertible_to_sales_order());
        assert!(!quotation(S::Draft, G::Draft).is_convertible_to_sales_order());
        assert!(!quotation(S::Lost, G::Closed).is_convertible_to_sales_order());
        assert!(!quotation(S::Converted, G::Closed).is_convertible_to_sales_order());
    }

    #[test]
    fn legacy_status_names_are_accepted() {
        let legacy: QuotationStatus = serde_json::from_str("\"sq_approved\"").unwrap();
        assert_eq!(legacy, QuotationStatus::Approved);
        assert_eq!("CLOSED".parse::<QuotationStatus>(), Ok(QuotationStatus::Converted));
        assert_eq!(serde_json::to_string(&QuotationStatus::Converted).unwrap(), "\"converted\"");
    }

    #[test]
    fn sending_moves_the_stage() {
        let mut q = quotation(QuotationStatus::Draft, QuotationStage::Draft);
        q.change_status(QuotationStatus::Sent, Utc::now()).unwrap();
        assert_eq!(q.stage, QuotationStage::Sent);
        assert!(q.is_convertible_to_sales_order());
    }

    #[test]
    fn converted_is_not_reachable_manually_and_is_final() {
        let mut q = quotation(QuotationStatus::Win, QuotationStage::Negotiation);
        assert!(q.change_status(QuotationStatus::Converted, Utc::now()).is_err());
        q.mark_converted(Utc::now());
        assert_eq!(q.stage, QuotationStage::Closed);
        assert!(q.change_stage(QuotationStage::Negotiation, Utc::now()).is_err());
        assert!(q.change_status(QuotationStatus::Lost, Utc::now()).is_err());
    }

    #[test]
    fn only_losing_closes_the_stage() {
        let mut won = quotation(QuotationStatus::Sent, QuotationStage::Negotiation);
        won.change_status(QuotationStatus::Win, Utc::now()).unwrap();
        assert_eq!(won.stage, QuotationStage::Negotiation);
        assert!(won.is_convertible_to_sales_order());

        let mut lost = quotation(QuotationStatus::Sent, QuotationStage::Negotiation);
        lost.change_status(QuotationStatus::Lost, Utc::now()).unwrap();
        assert_eq!(lost.stage, QuotationStage::Closed);
        assert!(!lost.is_convertible_to_sales_order());
    }

    #[test]
    fn total_sums_lines() {
        assert_eq!(quotation(QuotationStatus::Draft, QuotationStage::Draft).total(), 750);
    }
}
