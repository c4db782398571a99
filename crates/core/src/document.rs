//! Generated document numbers.
//!
//! Every generated business document is numbered
//! `{PREFIX}{YY}{companyCode}{MM}{sequence}` where the sequence is zero-padded
//! to four digits and restarts for every (prefix, company, year, month) period.
//! Company codes are exactly [`COMPANY_CODE_LEN`] characters wide.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Document family, rendered as the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentPrefix {
    Quotation,
    SalesOrder,
    PurchaseOrder,
}

impl DocumentPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentPrefix::Quotation => "SQ",
            DocumentPrefix::SalesOrder => "SO",
            DocumentPrefix::PurchaseOrder => "PO",
        }
    }
}

impl core::fmt::Display for DocumentPrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully allocated document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    prefix: DocumentPrefix,
    year: u32,
    company_code: String,
    month: u32,
    sequence: u32,
}

impl ValueObject for DocumentNumber {}

impl DocumentNumber {
    /// Build the number for `sequence` within the period that contains `at`.
    pub fn new(
        prefix: DocumentPrefix,
        company_code: &str,
        at: DateTime<Utc>,
        sequence: u32,
    ) -> DomainResult<Self> {
        validate_company_code(company_code)?;
        if sequence == 0 {
            return Err(DomainError::validation("document sequence starts at 1"));
        }
        Ok(Self {
            prefix,
            year: (at.year().rem_euclid(100)) as u32,
            company_code: company_code.to_string(),
            month: at.month(),
            sequence,
        })
    }

    /// Period key shared by every number of the same prefix, company and month
    /// (e.g. `SQ2601` + `07` → `SQ260107`).
    pub fn period_key(
        prefix: DocumentPrefix,
        company_code: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<String> {
        validate_company_code(company_code)?;
        Ok(format!(
            "{}{:02}{}{:02}",
            prefix.as_str(),
            at.year().rem_euclid(100),
            company_code,
            at.month()
        ))
    }

    /// Extract the sequence part of an existing number if it belongs to
    /// `period_key`. Used to seed counters from already stored documents.
    pub fn sequence_in_period(number: &str, period_key: &str) -> Option<u32> {
        let rest = number.strip_prefix(period_key)?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }

    pub fn prefix(&self) -> DocumentPrefix {
        self.prefix
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}{:02}{}{:02}{:04}",
            self.prefix.as_str(),
            self.year,
            self.company_code,
            self.month,
            self.sequence
        )
    }
}

/// Width of the company code segment. Fixed so that period keys of different
/// companies never prefix one another.
pub const COMPANY_CODE_LEN: usize = 2;

pub fn validate_company_code(code: &str) -> DomainResult<()> {
    if code.len() != COMPANY_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::validation(format!(
            "company code must be {COMPANY_CODE_LEN} alphanumeric characters (got {code:?})"
        )));
    }
    Ok(())
}
