//! The forex request aggregate

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{document, Audit};
use crate::store::ObjectId;

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    New,
    Validated,
    Approved,
    Rejected,
    Accepted,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "new",
            RequestStatus::Validated => "validated",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
        }
    }

    /// Forward-only transition table.
    ///
    /// `Validated -> Validated` is allowed: a second validation overwrites the
    /// first one.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;

        matches!(
            (self, next),
            (New, Validated)
                | (New, Rejected)
                | (Validated, Validated)
                | (Validated, Approved)
                | (Validated, Rejected)
                | (Approved, Accepted)
                | (Approved, Declined)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Accepted | RequestStatus::Declined
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer answer to an approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptanceStatus {
    Pending,
    Accepted,
    Declined,
}

/// Supporting documents a request may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Passport,
    Ticket,
    Visa,
    EducationLoanApproval,
    BusinessLicense,
    BusinessSupportingLetter,
    HealthLetter,
}

impl AttachmentKind {
    pub const ALL: [AttachmentKind; 7] = [
        AttachmentKind::Passport,
        AttachmentKind::Ticket,
        AttachmentKind::Visa,
        AttachmentKind::EducationLoanApproval,
        AttachmentKind::BusinessLicense,
        AttachmentKind::BusinessSupportingLetter,
        AttachmentKind::HealthLetter,
    ];

    /// Multipart field name and storage filename prefix
    pub fn field_name(&self) -> &'static str {
        match self {
            AttachmentKind::Passport => "passport",
            AttachmentKind::Ticket => "ticket",
            AttachmentKind::Visa => "visa",
            AttachmentKind::EducationLoanApproval => "education_loan_approval",
            AttachmentKind::BusinessLicense => "business_license",
            AttachmentKind::BusinessSupportingLetter => "business_supporting_letter",
            AttachmentKind::HealthLetter => "health_letter",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.field_name() == name)
    }

    pub fn is_mandatory(&self) -> bool {
        matches!(self, AttachmentKind::Passport | AttachmentKind::Ticket)
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// File references held by a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachments {
    pub passport_id: ObjectId,
    pub ticket_id: ObjectId,
    #[serde(default)]
    pub visa_id: Option<ObjectId>,
    #[serde(default)]
    pub education_loan_approval_id: Option<ObjectId>,
    #[serde(default)]
    pub business_license_id: Option<ObjectId>,
    #[serde(default)]
    pub business_supporting_letter_id: Option<ObjectId>,
    #[serde(default)]
    pub health_letter_id: Option<ObjectId>,
}

impl Attachments {
    pub fn get(&self, kind: AttachmentKind) -> Option<ObjectId> {
        match kind {
            AttachmentKind::Passport => Some(self.passport_id),
            AttachmentKind::Ticket => Some(self.ticket_id),
            AttachmentKind::Visa => self.visa_id,
            AttachmentKind::EducationLoanApproval => self.education_loan_approval_id,
            AttachmentKind::BusinessLicense => self.business_license_id,
            AttachmentKind::BusinessSupportingLetter => self.business_supporting_letter_id,
            AttachmentKind::HealthLetter => self.health_letter_id,
        }
    }

    /// Every attachment that is set, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (AttachmentKind, ObjectId)> + '_ {
        AttachmentKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|id| (kind, id)))
    }
}

/// A forex request document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: ObjectId,
    pub request_code: String,

    pub name: String,
    pub accounts_to_deduct: Vec<String>,
    pub average_deposit: f64,
    pub previous_fcy_generation: f64,
    pub current_fcy_generation: f64,
    pub fcy_requested_amount: f64,

    pub travel_purpose_id: ObjectId,
    pub travel_country_id: ObjectId,
    pub fcy_requested_id: ObjectId,
    pub account_currency_id: ObjectId,
    pub customer_type_id: ObjectId,
    #[serde(default)]
    pub branch_id: Option<ObjectId>,
    #[serde(default)]
    pub department_id: Option<ObjectId>,

    #[serde(default)]
    pub authorized_by: Option<ObjectId>,
    #[serde(default)]
    pub authorized_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validated_by: Option<ObjectId>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<ObjectId>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<ObjectId>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub accepted_by: Option<ObjectId>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declined_by: Option<ObjectId>,
    #[serde(default)]
    pub declined_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub attachments: Attachments,

    #[serde(default)]
    pub validated_current_balance: Option<f64>,
    #[serde(default)]
    pub validated_average_deposit: Option<f64>,
    #[serde(default)]
    pub validated_account_currency_id: Option<ObjectId>,

    /// Co-indexed with `approved_amounts`
    #[serde(default)]
    pub approved_currency_ids: Vec<ObjectId>,
    #[serde(default)]
    pub approved_amounts: Vec<f64>,
    #[serde(default)]
    pub acceptance_status: Option<AcceptanceStatus>,

    pub status: RequestStatus,

    #[serde(flatten)]
    pub audit: Audit,
}

document!(Request, "requests");

impl Request {
    pub fn created_by(&self) -> Option<ObjectId> {
        self.audit.created_by
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn test_attachments_iter_skips_absent_kinds() {
        let (passport, ticket, visa) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let attachments = Attachments {
            passport_id: passport,
            ticket_id: ticket,
            visa_id: Some(visa),
            education_loan_approval_id: None,
            business_license_id: None,
            business_supporting_letter_id: None,
            health_letter_id: None,
        };

        let present: Vec<_> = attachments.iter().collect();
        assert_eq!(
            present,
            vec![
                (AttachmentKind::Passport, passport),
                (AttachmentKind::Ticket, ticket),
                (AttachmentKind::Visa, visa),
            ]
        );
        assert_eq!(attachments.get(AttachmentKind::HealthLetter), None);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(New.can_transition_to(Validated));
        assert!(New.can_transition_to(Rejected));
        assert!(Validated.can_transition_to(Approved));
        assert!(Validated.can_transition_to(Validated));
        assert!(Approved.can_transition_to(Accepted));
        assert!(Approved.can_transition_to(Declined));
    }

    #[test]
    fn test_backward_and_skipping_transitions_are_refused() {
        assert!(!New.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Validated));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(New));
        assert!(!New.can_transition_to(Accepted));

        for terminal in [Rejected, Accepted, Declined] {
            assert!(terminal.is_terminal());
            for next in [New, Validated, Approved, Rejected, Accepted, Declined] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_attachment_field_names() {
        for kind in AttachmentKind::ALL {
            assert_eq!(AttachmentKind::from_field_name(kind.field_name()), Some(kind));
        }
        assert_eq!(AttachmentKind::from_field_name("selfie"), None);

        let mandatory: Vec<_> = AttachmentKind::ALL
            .into_iter()
            .filter(AttachmentKind::is_mandatory)
            .collect();
        assert_eq!(mandatory, vec![AttachmentKind::Passport, AttachmentKind::Ticket]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Validated).unwrap(), "validated");
    }
}
