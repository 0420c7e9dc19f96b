//! Lifecycle inputs and the read-side view of a request

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RequestError;
use crate::models::{
    AcceptanceStatus, AttachmentKind, Branch, Country, Currency, Department, FileRecord, Request,
    RequestStatus, TravelPurpose,
};
use crate::store::ObjectId;

/// A numeric input that clients send either as a JSON number or as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Number(f64),
    Text(String),
}

impl TextOrNumber {
    /// Parse into a finite, non-negative amount. Errors read `Invalid <label> value`.
    pub fn parse_amount(&self, label: &str) -> Result<f64, RequestError> {
        let value = match self {
            TextOrNumber::Number(n) => Some(*n),
            TextOrNumber::Text(raw) => raw.trim().replace(',', "").parse::<f64>().ok(),
        };

        value
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| RequestError::Validation(format!("Invalid {} value", label)))
    }
}

impl From<&str> for TextOrNumber {
    fn from(raw: &str) -> Self {
        TextOrNumber::Text(raw.to_string())
    }
}

impl From<f64> for TextOrNumber {
    fn from(n: f64) -> Self {
        TextOrNumber::Number(n)
    }
}

/// Text fields of the create form, as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRequestForm {
    pub name: Option<String>,
    #[serde(default)]
    pub accounts_to_deduct: Vec<String>,
    pub average_deposit: Option<TextOrNumber>,
    pub previous_fcy_generation: Option<TextOrNumber>,
    pub current_fcy_generation: Option<TextOrNumber>,
    pub fcy_requested_amount: Option<TextOrNumber>,
    pub travel_purpose_id: Option<String>,
    pub travel_country_id: Option<String>,
    pub fcy_requested_id: Option<String>,
    pub account_currency_id: Option<String>,
    pub customer_type_id: Option<String>,
    pub branch_id: Option<String>,
    pub department_id: Option<String>,
    pub authorized_by: Option<String>,
}

/// Parsed create input. Building it performs no writes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
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
    pub branch_id: Option<ObjectId>,
    pub department_id: Option<ObjectId>,
    pub authorized_by: Option<ObjectId>,
}

impl CreateRequestForm {
    /// Apply one multipart text field
    pub fn set_field(&mut self, field: &str, value: String) -> Result<(), RequestError> {
        match field {
            "name" => self.name = Some(value),
            "accounts_to_deduct" | "accounts_to_deduct[]" => {
                self.accounts_to_deduct.extend(split_accounts(&value)?)
            }
            "average_deposit" => self.average_deposit = Some(TextOrNumber::Text(value)),
            "previous_fcy_generation" => {
                self.previous_fcy_generation = Some(TextOrNumber::Text(value))
            }
            "current_fcy_generation" => {
                self.current_fcy_generation = Some(TextOrNumber::Text(value))
            }
            "fcy_requested_amount" => self.fcy_requested_amount = Some(TextOrNumber::Text(value)),
            "travel_purpose_id" => self.travel_purpose_id = Some(value),
            "travel_country_id" => self.travel_country_id = Some(value),
            "fcy_requested_id" => self.fcy_requested_id = Some(value),
            "account_currency_id" => self.account_currency_id = Some(value),
            "customer_type_id" => self.customer_type_id = Some(value),
            "branch_id" => self.branch_id = non_blank(value),
            "department_id" => self.department_id = non_blank(value),
            "authorized_by" => self.authorized_by = non_blank(value),
            other => {
                return Err(RequestError::Validation(format!(
                    "Unknown form field '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    pub fn parse(self) -> Result<NewRequest, RequestError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RequestError::Validation("name is required".to_string()))?;

        let accounts_to_deduct: Vec<String> = self
            .accounts_to_deduct
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if accounts_to_deduct.is_empty() {
            return Err(RequestError::Validation(
                "accounts_to_deduct must contain at least one account".to_string(),
            ));
        }

        let average_deposit = required_amount(self.average_deposit, "Average Deposit")?;
        let previous_fcy_generation =
            required_amount(self.previous_fcy_generation, "Previous FCY Generation")?;
        let current_fcy_generation =
            required_amount(self.current_fcy_generation, "Current FCY Generation")?;
        let fcy_requested_amount =
            required_amount(self.fcy_requested_amount, "FCY Requested Amount")?;
        if fcy_requested_amount <= 0.0 {
            return Err(RequestError::Validation(
                "Invalid FCY Requested Amount value".to_string(),
            ));
        }

        Ok(NewRequest {
            name,
            accounts_to_deduct,
            average_deposit,
            previous_fcy_generation,
            current_fcy_generation,
            fcy_requested_amount,
            travel_purpose_id: required_id(self.travel_purpose_id, "travel_purpose_id")?,
            travel_country_id: required_id(self.travel_country_id, "travel_country_id")?,
            fcy_requested_id: required_id(self.fcy_requested_id, "fcy_requested_id")?,
            account_currency_id: required_id(self.account_currency_id, "account_currency_id")?,
            customer_type_id: required_id(self.customer_type_id, "customer_type_id")?,
            branch_id: optional_id(self.branch_id, "branch_id")?,
            department_id: optional_id(self.department_id, "department_id")?,
            authorized_by: optional_id(self.authorized_by, "authorized_by")?,
        })
    }
}

/// Accepts a JSON array, a comma separated list or a single account
fn split_accounts(raw: &str) -> Result<Vec<String>, RequestError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed).map_err(|_| {
            RequestError::Validation("Invalid accounts_to_deduct value".to_string())
        });
    }

    Ok(trimmed
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn required_amount(value: Option<TextOrNumber>, label: &str) -> Result<f64, RequestError> {
    value
        .ok_or_else(|| RequestError::Validation(format!("{} is required", label)))?
        .parse_amount(label)
}

pub(crate) fn parse_id(raw: &str, field: &str) -> Result<ObjectId, RequestError> {
    ObjectId::parse_str(raw).map_err(|_| RequestError::invalid_id(field, raw))
}

fn required_id(raw: Option<String>, field: &str) -> Result<ObjectId, RequestError> {
    let raw = raw.ok_or_else(|| RequestError::Validation(format!("{} is required", field)))?;
    parse_id(&raw, field)
}

fn optional_id(raw: Option<String>, field: &str) -> Result<Option<ObjectId>, RequestError> {
    raw.map(|raw| parse_id(&raw, field)).transpose()
}

/// One uploaded attachment of the create form
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub kind: AttachmentKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequestInput {
    pub validated_currency_id: String,
    pub validated_current_balance: TextOrNumber,
    pub validated_average_deposit: TextOrNumber,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveRequestInput {
    pub approved_currency_ids: Vec<String>,
    pub approved_amounts: Vec<TextOrNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectRequestInput {
    pub reason: Option<String>,
}

/// `GET /requests?populate=false`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_populate")]
    pub populate: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self { populate: true }
    }
}

fn default_populate() -> bool {
    true
}

/// A user's display name, taken from the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorName {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
}

/// Read-side shape of a request.
///
/// Raw reference scalars are always projected. Joined documents are only
/// present when the reference resolved; an unresolved join is omitted, never
/// rendered as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestView {
    pub id: ObjectId,
    pub request_code: String,
    pub status: RequestStatus,

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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,

    pub passport_id: ObjectId,
    pub ticket_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_loan_approval_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_license_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_supporting_letter_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_letter_id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_current_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_average_deposit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_account_currency_id: Option<ObjectId>,
    #[serde(default)]
    pub approved_currency_ids: Vec<ObjectId>,
    #[serde(default)]
    pub approved_amounts: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_status: Option<AcceptanceStatus>,

    // Joined actors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejecter: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptor: Option<ActorName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decliner: Option<ActorName>,

    // Joined reference data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_country: Option<Country>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_purpose: Option<TravelPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcy_requested: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_account_currency: Option<Currency>,
    /// Not ordered like `approved_currency_ids`; pair by id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_currencies: Option<Vec<Currency>>,

    // Joined attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_loan_approval: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_license: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_supporting_letter: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_letter: Option<FileRecord>,
}

impl RequestView {
    /// Joined attachment for `kind`, if it resolved
    pub fn attachment(&self, kind: AttachmentKind) -> Option<&FileRecord> {
        match kind {
            AttachmentKind::Passport => self.passport.as_ref(),
            AttachmentKind::Ticket => self.ticket.as_ref(),
            AttachmentKind::Visa => self.visa.as_ref(),
            AttachmentKind::EducationLoanApproval => self.education_loan_approval.as_ref(),
            AttachmentKind::BusinessLicense => self.business_license.as_ref(),
            AttachmentKind::BusinessSupportingLetter => self.business_supporting_letter.as_ref(),
            AttachmentKind::HealthLetter => self.health_letter.as_ref(),
        }
    }

    pub(crate) fn attachment_slot(&mut self, kind: AttachmentKind) -> &mut Option<FileRecord> {
        match kind {
            AttachmentKind::Passport => &mut self.passport,
            AttachmentKind::Ticket => &mut self.ticket,
            AttachmentKind::Visa => &mut self.visa,
            AttachmentKind::EducationLoanApproval => &mut self.education_loan_approval,
            AttachmentKind::BusinessLicense => &mut self.business_license,
            AttachmentKind::BusinessSupportingLetter => &mut self.business_supporting_letter,
            AttachmentKind::HealthLetter => &mut self.health_letter,
        }
    }

    /// Approved `(currency, amount)` pairs, matched by currency id
    pub fn approved_pairs(&self) -> Vec<(Option<&Currency>, f64)> {
        self.approved_currency_ids
            .iter()
            .zip(&self.approved_amounts)
            .map(|(id, amount)| {
                let currency = self
                    .approved_currencies
                    .as_ref()
                    .and_then(|currencies| currencies.iter().find(|c| c.id == *id));
                (currency, *amount)
            })
            .collect()
    }
}

impl From<&Request> for RequestView {
    /// Raw projection: scalars only, no joins
    fn from(request: &Request) -> Self {
        let attachments = &request.attachments;

        Self {
            id: request.id,
            request_code: request.request_code.clone(),
            status: request.status,
            name: request.name.clone(),
            accounts_to_deduct: request.accounts_to_deduct.clone(),
            average_deposit: request.average_deposit,
            previous_fcy_generation: request.previous_fcy_generation,
            current_fcy_generation: request.current_fcy_generation,
            fcy_requested_amount: request.fcy_requested_amount,
            travel_purpose_id: request.travel_purpose_id,
            travel_country_id: request.travel_country_id,
            fcy_requested_id: request.fcy_requested_id,
            account_currency_id: request.account_currency_id,
            customer_type_id: request.customer_type_id,
            branch_id: request.branch_id,
            department_id: request.department_id,
            created_by: request.audit.created_by,
            created_at: request.audit.created_at,
            updated_at: request.audit.updated_at,
            authorized_by: request.authorized_by,
            authorized_at: request.authorized_at,
            validated_by: request.validated_by,
            validated_at: request.validated_at,
            approved_by: request.approved_by,
            approved_at: request.approved_at,
            rejected_by: request.rejected_by,
            rejected_at: request.rejected_at,
            rejection_reason: request.rejection_reason.clone(),
            accepted_by: request.accepted_by,
            accepted_at: request.accepted_at,
            declined_by: request.declined_by,
            declined_at: request.declined_at,
            passport_id: attachments.passport_id,
            ticket_id: attachments.ticket_id,
            visa_id: attachments.visa_id,
            education_loan_approval_id: attachments.education_loan_approval_id,
            business_license_id: attachments.business_license_id,
            business_supporting_letter_id: attachments.business_supporting_letter_id,
            health_letter_id: attachments.health_letter_id,
            validated_current_balance: request.validated_current_balance,
            validated_average_deposit: request.validated_average_deposit,
            validated_account_currency_id: request.validated_account_currency_id,
            approved_currency_ids: request.approved_currency_ids.clone(),
            approved_amounts: request.approved_amounts.clone(),
            acceptance_status: request.acceptance_status,
            creator: None,
            authorizer: None,
            validator: None,
            approver: None,
            rejecter: None,
            acceptor: None,
            decliner: None,
            department: None,
            branch: None,
            travel_country: None,
            travel_purpose: None,
            account_currency: None,
            fcy_requested: None,
            validated_account_currency: None,
            approved_currencies: None,
            passport: None,
            ticket: None,
            visa: None,
            education_loan_approval: None,
            business_license: None,
            business_supporting_letter: None,
            health_letter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> CreateRequestForm {
        let mut form = CreateRequestForm::default();
        for (field, value) in [
            ("name", "Abebe Kebede"),
            ("accounts_to_deduct", "1000123, 1000456"),
            ("average_deposit", "250,000.50"),
            ("previous_fcy_generation", "1200"),
            ("current_fcy_generation", "900"),
            ("fcy_requested_amount", "5000"),
            ("travel_purpose_id", "64b7f0c2a1b2c3d4e5f60701"),
            ("travel_country_id", "64b7f0c2a1b2c3d4e5f60702"),
            ("fcy_requested_id", "64b7f0c2a1b2c3d4e5f60703"),
            ("account_currency_id", "64b7f0c2a1b2c3d4e5f60704"),
            ("customer_type_id", "64b7f0c2a1b2c3d4e5f60705"),
        ] {
            form.set_field(field, value.to_string()).unwrap();
        }
        form
    }

    #[test]
    fn test_complete_form_parses() {
        let parsed = complete_form().parse().unwrap();

        assert_eq!(parsed.accounts_to_deduct, vec!["1000123", "1000456"]);
        assert_eq!(parsed.average_deposit, 250_000.5);
        assert_eq!(parsed.fcy_requested_amount, 5000.0);
        assert!(parsed.branch_id.is_none());
    }

    #[test]
    fn test_accounts_accept_json_array_and_repeats() {
        let mut form = CreateRequestForm::default();
        form.set_field("accounts_to_deduct", r#"["1", "2"]"#.to_string())
            .unwrap();
        form.set_field("accounts_to_deduct[]", "3".to_string())
            .unwrap();
        assert_eq!(form.accounts_to_deduct, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_accounts_are_rejected() {
        let mut form = complete_form();
        form.accounts_to_deduct.clear();

        let err = form.parse().unwrap_err();
        assert!(err.to_string().contains("accounts_to_deduct"));
    }

    #[test]
    fn test_unparsable_deposit_names_the_field() {
        let mut form = complete_form();
        form.set_field("average_deposit", "abc".to_string()).unwrap();

        let err = form.parse().unwrap_err();
        assert_eq!(err.to_string(), "Invalid Average Deposit value");
    }

    #[test]
    fn test_malformed_reference_id_echoes_literal() {
        let mut form = complete_form();
        form.set_field("travel_country_id", "ethiopia".to_string())
            .unwrap();

        match form.parse().unwrap_err() {
            RequestError::InvalidId { field, value } => {
                assert_eq!(field, "travel_country_id");
                assert_eq!(value, "ethiopia");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut form = CreateRequestForm::default();
        assert!(form.set_field("is_deleted", "true".to_string()).is_err());
    }

    #[test]
    fn test_text_or_number() {
        assert_eq!(TextOrNumber::from(12.5).parse_amount("X").unwrap(), 12.5);
        assert_eq!(TextOrNumber::from(" 7 ").parse_amount("X").unwrap(), 7.0);
        assert!(TextOrNumber::from("-1").parse_amount("X").is_err());
        assert!(TextOrNumber::from("NaN").parse_amount("X").is_err());

        let parsed: Vec<TextOrNumber> = serde_json::from_str(r#"[1, "2"]"#).unwrap();
        assert_eq!(parsed, vec![TextOrNumber::Number(1.0), TextOrNumber::from("2")]);
    }

    #[test]
    fn test_list_query_defaults_to_populated() {
        assert!(ListQuery::default().populate);
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert!(query.populate);
    }
}
