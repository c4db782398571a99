use core::str::FromStr;

use serde::Deserialize;

use orderflow_core::{CustomerId, DomainError, VendorId};
use orderflow_purchasing::PurchaseOrderStatus;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveReopenRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub line_no: u32,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertLeadRequest {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderStatusRequest {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct CompanyCodeRequest {
    pub company_code: String,
}

// -------------------------
// Parsing helpers
// -------------------------

/// Parse a path segment or body field into a typed value, or a 400 response.
pub fn parse<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use orderflow_sales::{OrderAction, SalesOrderId};

    #[test]
    fn ids_and_names_parse_or_answer_bad_request() {
        assert_eq!(parse::<SalesOrderId>("12").unwrap(), SalesOrderId::new(12));
        assert_eq!(
            parse::<OrderAction>("update_status_pr").unwrap(),
            OrderAction::UpdateStatusPr
        );
        assert_eq!(
            parse::<SalesOrderId>("twelve").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            parse::<OrderAction>("launch").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn purchase_order_request_fields_are_optional() {
        let req: CreatePurchaseOrderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.vendor_id.is_none());
        let req: CreatePurchaseOrderRequest =
            serde_json::from_str(r#"{"vendor_id": 4, "note": "rush"}"#).unwrap();
        assert_eq!(req.vendor_id, Some(VendorId::new(4)));
    }
}
