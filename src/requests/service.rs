//! Request lifecycle engine
//!
//! Every transition is a single read-modify-write against the document store.
//! There is no version check, so concurrent writers on the same request race
//! and the last write wins.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use super::error::RequestError;
use super::model::{
    parse_id, ApproveRequestInput, AttachmentUpload, CreateRequestForm, NewRequest,
    RejectRequestInput, RequestView, ValidateRequestInput,
};
use super::populate::{self, populate};
use crate::auth::{is_admin, Actor, Permission};
use crate::deadline::with_deadline;
use crate::files::FileStore;
use crate::models::request::Attachments;
use crate::models::{AcceptanceStatus, Audit, AttachmentKind, FileRecord, Request, RequestStatus};
use crate::notifications::{Notifier, RequestEvent};
use crate::store::{Collections, Document, ObjectId, Repository, StoreError};

const REQUEST_CODE_PREFIX: &str = "REQ-";
const REQUEST_CODE_LEN: usize = 8;
const REQUEST_CODE_ATTEMPTS: usize = 5;
const REQUEST_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Request lifecycle service
#[derive(Clone)]
pub struct RequestService {
    collections: Collections,
    files: FileStore,
    notifier: Notifier,
    timeout: Duration,
}

impl RequestService {
    pub fn new(
        collections: Collections,
        files: FileStore,
        notifier: Notifier,
        timeout: Duration,
    ) -> Self {
        Self {
            collections,
            files,
            notifier,
            timeout,
        }
    }

    /// Create a `new` request with its attachments.
    ///
    /// All-or-nothing: any failure after attachments were written discards
    /// them and leaves no request behind.
    pub async fn create(
        &self,
        form: CreateRequestForm,
        uploads: Vec<AttachmentUpload>,
        actor: &Actor,
    ) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, async {
            let input = form.parse()?;
            check_uploads(&uploads)?;

            let (branch_id, department_id) = self.fill_org_from_profile(&input, actor).await?;
            self.check_references(&input, branch_id, department_id)
                .await?;

            let stored = self.store_uploads(&uploads, actor).await?;

            let request = match self
                .insert_request(input, branch_id, department_id, &stored, actor)
                .await
            {
                Ok(request) => request,
                Err(e) => {
                    self.discard_all(&stored, actor).await;
                    return Err(e);
                }
            };

            tracing::info!(
                request_id = %request.id,
                request_code = %request.request_code,
                created_by = %actor.user_id,
                attachments = stored.len(),
                "Request created"
            );

            let view = self.view_after_write(&request).await;
            self.notifier.notify(RequestEvent::Submitted, &view).await;
            Ok(view)
        })
        .await
    }

    /// `new|validated -> validated`. A repeated validation overwrites the
    /// previous one.
    pub async fn validate(
        &self,
        id: ObjectId,
        input: ValidateRequestInput,
        actor: &Actor,
    ) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, async {
            require(Permission::ValidateRequest, actor, "validate")?;

            let currency_id = parse_id(&input.validated_currency_id, "validated_currency_id")?;
            let balance = input
                .validated_current_balance
                .parse_amount("Validated Current Balance")?;
            let deposit = input
                .validated_average_deposit
                .parse_amount("Validated Average Deposit")?;

            let mut request = self.load(id).await?;
            ensure_transition(&request, RequestStatus::Validated)?;
            require_ref(&self.collections.currencies, "validated_currency_id", currency_id).await?;

            let now = Utc::now();
            request.validated_by = Some(actor.user_id);
            request.validated_at = Some(now);
            request.validated_account_currency_id = Some(currency_id);
            request.validated_current_balance = Some(balance);
            request.validated_average_deposit = Some(deposit);
            request.status = RequestStatus::Validated;
            request.audit.touch(Some(actor.user_id));

            self.save(&request).await?;
            tracing::info!(request_id = %id, validated_by = %actor.user_id, "Request validated");

            let view = self.view_after_write(&request).await;
            self.notifier.notify(RequestEvent::Validated, &view).await;
            Ok(view)
        })
        .await
    }

    /// `validated -> approved`, storing co-indexed currency/amount pairs
    pub async fn approve(
        &self,
        id: ObjectId,
        input: ApproveRequestInput,
        actor: &Actor,
    ) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, async {
            require(Permission::ApproveRequest, actor, "approve")?;

            let currency_ids = input
                .approved_currency_ids
                .iter()
                .map(|raw| parse_id(raw, "approved_currency_ids"))
                .collect::<Result<Vec<_>, _>>()?;
            let amounts = input
                .approved_amounts
                .iter()
                .map(|amount| amount.parse_amount("Approved Amount"))
                .collect::<Result<Vec<_>, _>>()?;
            check_approval_pairs(&currency_ids, &amounts)?;

            let mut request = self.load(id).await?;
            ensure_transition(&request, RequestStatus::Approved)?;

            let found: HashSet<ObjectId> = self
                .collections
                .currencies
                .find_many(&currency_ids)
                .await?
                .into_iter()
                .map(|currency| currency.id)
                .collect();
            if let Some(missing) = currency_ids.iter().find(|id| !found.contains(id)) {
                return Err(RequestError::ReferenceNotFound {
                    field: "approved_currency_ids",
                    id: *missing,
                });
            }

            request.approved_by = Some(actor.user_id);
            request.approved_at = Some(Utc::now());
            request.approved_currency_ids = currency_ids;
            request.approved_amounts = amounts;
            request.acceptance_status = Some(AcceptanceStatus::Pending);
            request.status = RequestStatus::Approved;
            request.audit.touch(Some(actor.user_id));

            self.save(&request).await?;
            tracing::info!(
                request_id = %id,
                approved_by = %actor.user_id,
                currencies = request.approved_currency_ids.len(),
                "Request approved"
            );

            let view = self.view_after_write(&request).await;
            self.notifier.notify(RequestEvent::Approved, &view).await;
            Ok(view)
        })
        .await
    }

    /// `new|validated -> rejected`
    pub async fn reject(
        &self,
        id: ObjectId,
        input: RejectRequestInput,
        actor: &Actor,
    ) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, async {
            require(Permission::RejectRequest, actor, "reject")?;

            let mut request = self.load(id).await?;
            ensure_transition(&request, RequestStatus::Rejected)?;

            request.rejected_by = Some(actor.user_id);
            request.rejected_at = Some(Utc::now());
            request.rejection_reason = input
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            request.status = RequestStatus::Rejected;
            request.audit.touch(Some(actor.user_id));

            self.save(&request).await?;
            tracing::info!(request_id = %id, rejected_by = %actor.user_id, "Request rejected");

            let view = self.view_after_write(&request).await;
            self.notifier.notify(RequestEvent::Rejected, &view).await;
            Ok(view)
        })
        .await
    }

    /// `approved -> accepted`, by the requester or an administrator
    pub async fn accept(&self, id: ObjectId, actor: &Actor) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, self.answer(id, actor, RequestStatus::Accepted)).await
    }

    /// `approved -> declined`, by the requester or an administrator
    pub async fn decline(&self, id: ObjectId, actor: &Actor) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, self.answer(id, actor, RequestStatus::Declined)).await
    }

    async fn answer(
        &self,
        id: ObjectId,
        actor: &Actor,
        next: RequestStatus,
    ) -> Result<RequestView, RequestError> {
        let mut request = self.load(id).await?;

        if request.created_by() != Some(actor.user_id) && !is_admin(&actor.role) {
            return Err(RequestError::Forbidden(format!(
                "Only the requester may mark a request as {}",
                next
            )));
        }
        ensure_transition(&request, next)?;

        let now = Utc::now();
        match next {
            RequestStatus::Accepted => {
                request.accepted_by = Some(actor.user_id);
                request.accepted_at = Some(now);
                request.acceptance_status = Some(AcceptanceStatus::Accepted);
            }
            _ => {
                request.declined_by = Some(actor.user_id);
                request.declined_at = Some(now);
                request.acceptance_status = Some(AcceptanceStatus::Declined);
            }
        }
        request.status = next;
        request.audit.touch(Some(actor.user_id));

        self.save(&request).await?;
        tracing::info!(request_id = %id, status = %next, by = %actor.user_id, "Request answered");

        Ok(self.view_after_write(&request).await)
    }

    /// All live requests. With `populate` off only raw scalars are projected.
    pub async fn get_all(&self, populate: bool) -> Result<Vec<RequestView>, RequestError> {
        with_deadline(self.timeout, async {
            let requests = self
                .collections
                .requests
                .find_all()
                .await
                .map_err(aggregation_failed)?;

            if requests.is_empty() {
                return Err(RequestError::NoDocuments);
            }

            let mut views = Vec::with_capacity(requests.len());
            for request in &requests {
                views.push(self.build_view(request, populate).await?);
            }
            Ok(views)
        })
        .await
    }

    pub async fn get_by_id(
        &self,
        id: ObjectId,
        populate: bool,
    ) -> Result<RequestView, RequestError> {
        with_deadline(self.timeout, async {
            let request = self
                .collections
                .requests
                .find_by_id(id)
                .await
                .map_err(aggregation_failed)?
                .ok_or(RequestError::NotFound)?;

            self.build_view(&request, populate).await
        })
        .await
    }

    async fn build_view(
        &self,
        request: &Request,
        with_joins: bool,
    ) -> Result<RequestView, RequestError> {
        if with_joins {
            populate(request, &self.collections)
                .await
                .map_err(aggregation_failed)
        } else {
            Ok(populate::project(request))
        }
    }

    /// The write is already committed, so a failed join degrades to the raw
    /// projection instead of failing the transition.
    async fn view_after_write(&self, request: &Request) -> RequestView {
        match populate(request, &self.collections).await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "Failed to populate request");
                populate::project(request)
            }
        }
    }

    async fn load(&self, id: ObjectId) -> Result<Request, RequestError> {
        self.collections
            .requests
            .find_by_id(id)
            .await?
            .ok_or(RequestError::NotFound)
    }

    async fn save(&self, request: &Request) -> Result<(), RequestError> {
        self.collections
            .requests
            .update(request)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => RequestError::NotFound,
                other => RequestError::Store(other),
            })
    }

    /// Branch and department default to the creator's profile
    async fn fill_org_from_profile(
        &self,
        input: &NewRequest,
        actor: &Actor,
    ) -> Result<(Option<ObjectId>, Option<ObjectId>), RequestError> {
        if input.branch_id.is_some() && input.department_id.is_some() {
            return Ok((input.branch_id, input.department_id));
        }

        let profile = match self.collections.users.find_by_id(actor.user_id).await? {
            Some(user) => self.collections.profiles.find_by_id(user.profile_id).await?,
            None => None,
        };

        Ok(match profile {
            Some(profile) => (
                input.branch_id.or(profile.branch_id),
                input.department_id.or(profile.department_id),
            ),
            None => (input.branch_id, input.department_id),
        })
    }

    async fn check_references(
        &self,
        input: &NewRequest,
        branch_id: Option<ObjectId>,
        department_id: Option<ObjectId>,
    ) -> Result<(), RequestError> {
        let c = &self.collections;

        require_ref(&c.travel_purposes, "travel_purpose_id", input.travel_purpose_id).await?;
        require_ref(&c.countries, "travel_country_id", input.travel_country_id).await?;
        require_ref(&c.currencies, "fcy_requested_id", input.fcy_requested_id).await?;
        require_ref(&c.currencies, "account_currency_id", input.account_currency_id).await?;
        require_ref(&c.customer_types, "customer_type_id", input.customer_type_id).await?;
        if let Some(branch_id) = branch_id {
            require_ref(&c.branches, "branch_id", branch_id).await?;
        }
        if let Some(department_id) = department_id {
            require_ref(&c.departments, "department_id", department_id).await?;
        }
        if let Some(authorized_by) = input.authorized_by {
            require_ref(&c.users, "authorized_by", authorized_by).await?;
        }
        Ok(())
    }

    async fn store_uploads(
        &self,
        uploads: &[AttachmentUpload],
        actor: &Actor,
    ) -> Result<Vec<(AttachmentKind, FileRecord)>, RequestError> {
        let mut stored = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let result = self
                .files
                .store(
                    &upload.bytes,
                    &upload.file_name,
                    &upload.content_type,
                    upload.kind.field_name(),
                    Some(actor.user_id),
                )
                .await;

            match result {
                Ok(record) => stored.push((upload.kind, record)),
                Err(e) => {
                    tracing::warn!(
                        kind = %upload.kind,
                        file = %upload.file_name,
                        error = %e,
                        "Attachment upload failed, discarding earlier uploads"
                    );
                    self.discard_all(&stored, actor).await;
                    return Err(e.into());
                }
            }
        }

        Ok(stored)
    }

    async fn discard_all(&self, stored: &[(AttachmentKind, FileRecord)], actor: &Actor) {
        for (_, record) in stored {
            self.files.discard(record, Some(actor.user_id)).await;
        }
    }

    async fn insert_request(
        &self,
        input: NewRequest,
        branch_id: Option<ObjectId>,
        department_id: Option<ObjectId>,
        stored: &[(AttachmentKind, FileRecord)],
        actor: &Actor,
    ) -> Result<Request, RequestError> {
        let attachment = |kind: AttachmentKind| {
            stored
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, record)| record.id)
        };
        let (Some(passport_id), Some(ticket_id)) = (
            attachment(AttachmentKind::Passport),
            attachment(AttachmentKind::Ticket),
        ) else {
            return Err(RequestError::Validation(
                "passport and ticket attachments are required".to_string(),
            ));
        };

        let now = Utc::now();
        let mut request = Request {
            id: ObjectId::new(),
            request_code: String::new(),
            name: input.name,
            accounts_to_deduct: input.accounts_to_deduct,
            average_deposit: input.average_deposit,
            previous_fcy_generation: input.previous_fcy_generation,
            current_fcy_generation: input.current_fcy_generation,
            fcy_requested_amount: input.fcy_requested_amount,
            travel_purpose_id: input.travel_purpose_id,
            travel_country_id: input.travel_country_id,
            fcy_requested_id: input.fcy_requested_id,
            account_currency_id: input.account_currency_id,
            customer_type_id: input.customer_type_id,
            branch_id,
            department_id,
            authorized_by: input.authorized_by,
            authorized_at: input.authorized_by.map(|_| now),
            validated_by: None,
            validated_at: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            accepted_by: None,
            accepted_at: None,
            declined_by: None,
            declined_at: None,
            attachments: Attachments {
                passport_id,
                ticket_id,
                visa_id: attachment(AttachmentKind::Visa),
                education_loan_approval_id: attachment(AttachmentKind::EducationLoanApproval),
                business_license_id: attachment(AttachmentKind::BusinessLicense),
                business_supporting_letter_id: attachment(
                    AttachmentKind::BusinessSupportingLetter,
                ),
                health_letter_id: attachment(AttachmentKind::HealthLetter),
            },
            validated_current_balance: None,
            validated_average_deposit: None,
            validated_account_currency_id: None,
            approved_currency_ids: Vec::new(),
            approved_amounts: Vec::new(),
            acceptance_status: None,
            status: RequestStatus::New,
            audit: Audit::new(Some(actor.user_id)),
        };

        for attempt in 1..=REQUEST_CODE_ATTEMPTS {
            let code = generate_request_code();
            if self
                .collections
                .requests
                .find_one_by("request_code", &code)
                .await?
                .is_some()
            {
                tracing::debug!(code = %code, attempt, "Request code collision");
                continue;
            }

            request.request_code = code;
            match self.collections.requests.create(&request).await {
                Ok(()) => return Ok(request),
                Err(StoreError::Duplicate { .. }) => {
                    tracing::debug!(attempt, "Request code taken concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RequestError::Store(StoreError::Backend(
            "could not allocate a unique request code".to_string(),
        )))
    }
}

/// `REQ-` followed by 8 uppercase alphanumerics
pub fn generate_request_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REQUEST_CODE_LEN)
        .map(|_| REQUEST_CODE_CHARSET[rng.gen_range(0..REQUEST_CODE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", REQUEST_CODE_PREFIX, suffix)
}

fn require(permission: Permission, actor: &Actor, action: &str) -> Result<(), RequestError> {
    if permission.allows(&actor.role) {
        Ok(())
    } else {
        Err(RequestError::Forbidden(format!(
            "Role '{}' may not {} requests",
            actor.role, action
        )))
    }
}

fn ensure_transition(request: &Request, next: RequestStatus) -> Result<(), RequestError> {
    if request.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(RequestError::InvalidTransition {
            from: request.status,
            to: next,
        })
    }
}

async fn require_ref<T: Document>(
    repository: &Repository<T>,
    field: &'static str,
    id: ObjectId,
) -> Result<(), RequestError> {
    if repository.exists(id).await? {
        Ok(())
    } else {
        Err(RequestError::ReferenceNotFound { field, id })
    }
}

/// Mandatory kinds present, each kind at most once
fn check_uploads(uploads: &[AttachmentUpload]) -> Result<(), RequestError> {
    let mut seen = HashSet::new();
    for upload in uploads {
        if !seen.insert(upload.kind) {
            return Err(RequestError::Validation(format!(
                "{} attachment was sent more than once",
                upload.kind
            )));
        }
    }

    for kind in AttachmentKind::ALL.into_iter().filter(AttachmentKind::is_mandatory) {
        if !seen.contains(&kind) {
            return Err(RequestError::Validation(format!(
                "{} attachment is required",
                kind
            )));
        }
    }
    Ok(())
}

fn check_approval_pairs(currency_ids: &[ObjectId], amounts: &[f64]) -> Result<(), RequestError> {
    if currency_ids.is_empty() {
        return Err(RequestError::Validation(
            "approved_currency_ids must contain at least one currency".to_string(),
        ));
    }
    if currency_ids.len() != amounts.len() {
        return Err(RequestError::Validation(format!(
            "approved_currency_ids and approved_amounts must have the same length ({} != {})",
            currency_ids.len(),
            amounts.len()
        )));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = currency_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(RequestError::Validation(format!(
            "Currency '{}' is approved more than once",
            duplicate
        )));
    }
    Ok(())
}

fn aggregation_failed(err: StoreError) -> RequestError {
    tracing::error!(error = %err, "Request aggregation failed");
    RequestError::Aggregation(err)
}
