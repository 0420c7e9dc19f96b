//! Read-side denormalization of requests.
//!
//! A populated read is a fixed, ordered chain of fetch-and-attach steps. Each
//! step takes the view built so far and returns it with one group of joins
//! filled in. A join that does not resolve is left as `None`, which the view
//! omits on serialization.

use std::collections::HashMap;

use super::model::{ActorName, RequestView};
use crate::models::request::Attachments;
use crate::models::Request;
use crate::store::{Collections, Document, ObjectId, Repository, StoreError};

/// Build the full view of `request`
pub async fn populate(
    request: &Request,
    collections: &Collections,
) -> Result<RequestView, StoreError> {
    let view = project(request);
    let view = attach_actors(view, collections).await?;
    let view = attach_references(view, collections).await?;
    let view = attach_approved_currencies(view, collections).await?;
    attach_attachments(view, &request.attachments, collections).await
}

/// Raw scalars only
pub fn project(request: &Request) -> RequestView {
    RequestView::from(request)
}

/// Resolve each actor reference to the user's profile name
pub async fn attach_actors(
    mut view: RequestView,
    collections: &Collections,
) -> Result<RequestView, StoreError> {
    let mut cache: HashMap<ObjectId, Option<ActorName>> = HashMap::new();

    view.creator = actor_name(view.created_by, collections, &mut cache).await?;
    view.authorizer = actor_name(view.authorized_by, collections, &mut cache).await?;
    view.validator = actor_name(view.validated_by, collections, &mut cache).await?;
    view.approver = actor_name(view.approved_by, collections, &mut cache).await?;
    view.rejecter = actor_name(view.rejected_by, collections, &mut cache).await?;
    view.acceptor = actor_name(view.accepted_by, collections, &mut cache).await?;
    view.decliner = actor_name(view.declined_by, collections, &mut cache).await?;

    Ok(view)
}

async fn actor_name(
    user_id: Option<ObjectId>,
    collections: &Collections,
    cache: &mut HashMap<ObjectId, Option<ActorName>>,
) -> Result<Option<ActorName>, StoreError> {
    let Some(user_id) = user_id else {
        return Ok(None);
    };
    if let Some(cached) = cache.get(&user_id) {
        return Ok(cached.clone());
    }

    let name = match collections.users.find_by_id(user_id).await? {
        Some(user) => collections
            .profiles
            .find_by_id(user.profile_id)
            .await?
            .map(|profile| ActorName {
                first_name: profile.first_name,
                middle_name: profile.middle_name,
                last_name: profile.last_name,
            }),
        None => None,
    };

    cache.insert(user_id, name.clone());
    Ok(name)
}

/// Resolve the classification and organisation references
pub async fn attach_references(
    mut view: RequestView,
    collections: &Collections,
) -> Result<RequestView, StoreError> {
    view.department = resolve(&collections.departments, view.department_id).await?;
    view.branch = resolve(&collections.branches, view.branch_id).await?;
    view.travel_country = resolve(&collections.countries, Some(view.travel_country_id)).await?;
    view.travel_purpose =
        resolve(&collections.travel_purposes, Some(view.travel_purpose_id)).await?;
    view.account_currency =
        resolve(&collections.currencies, Some(view.account_currency_id)).await?;
    view.fcy_requested = resolve(&collections.currencies, Some(view.fcy_requested_id)).await?;
    view.validated_account_currency =
        resolve(&collections.currencies, view.validated_account_currency_id).await?;

    Ok(view)
}

/// One batch lookup for every approved currency. Order follows the store, not
/// `approved_currency_ids`.
pub async fn attach_approved_currencies(
    mut view: RequestView,
    collections: &Collections,
) -> Result<RequestView, StoreError> {
    if view.approved_currency_ids.is_empty() {
        return Ok(view);
    }

    let currencies = collections
        .currencies
        .find_many(&view.approved_currency_ids)
        .await?;
    if !currencies.is_empty() {
        view.approved_currencies = Some(currencies);
    }

    Ok(view)
}

/// Resolve every attachment reference to its file record
pub async fn attach_attachments(
    mut view: RequestView,
    attachments: &Attachments,
    collections: &Collections,
) -> Result<RequestView, StoreError> {
    for (kind, file_id) in attachments.iter() {
        *view.attachment_slot(kind) = collections.files.find_by_id(file_id).await?;
    }

    Ok(view)
}

async fn resolve<T: Document>(
    repository: &Repository<T>,
    id: Option<ObjectId>,
) -> Result<Option<T>, StoreError> {
    match id {
        Some(id) => repository.find_by_id(id).await,
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{
        Audit, Country, Currency, FileRecord, Profile, RequestStatus, TravelPurpose, User,
    };
    use crate::store::MemoryDocumentStore;

    fn currency(code: &str) -> Currency {
        Currency {
            id: ObjectId::new(),
            name: code.to_string(),
            code: code.to_string(),
            symbol: None,
            audit: Audit::new(None),
        }
    }

    fn file(name: &str) -> FileRecord {
        FileRecord {
            id: ObjectId::new(),
            storage_name: format!("passport-0011223344556677-{}", name),
            name: name.to_string(),
            file_id: "0011223344556677".to_string(),
            path: format!("/tmp/{}", name),
            url: format!("http://localhost/files/{}", name),
            size: 3,
            content_type: "application/pdf".to_string(),
            audit: Audit::new(None),
        }
    }

    fn request(creator: Option<ObjectId>, passport: ObjectId, ticket: ObjectId) -> Request {
        Request {
            id: ObjectId::new(),
            request_code: "REQ-ABCD1234".to_string(),
            name: "Applicant".to_string(),
            accounts_to_deduct: vec!["1000".to_string()],
            average_deposit: 10.0,
            previous_fcy_generation: 1.0,
            current_fcy_generation: 2.0,
            fcy_requested_amount: 3.0,
            travel_purpose_id: ObjectId::new(),
            travel_country_id: ObjectId::new(),
            fcy_requested_id: ObjectId::new(),
            account_currency_id: ObjectId::new(),
            customer_type_id: ObjectId::new(),
            branch_id: None,
            department_id: None,
            authorized_by: None,
            authorized_at: None,
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
                passport_id: passport,
                ticket_id: ticket,
                visa_id: None,
                education_loan_approval_id: None,
                business_license_id: None,
                business_supporting_letter_id: None,
                health_letter_id: None,
            },
            validated_current_balance: None,
            validated_average_deposit: None,
            validated_account_currency_id: None,
            approved_currency_ids: Vec::new(),
            approved_amounts: Vec::new(),
            acceptance_status: None,
            status: RequestStatus::New,
            audit: Audit::new(creator),
        }
    }

    fn collections() -> Collections {
        Collections::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_unresolved_joins_are_absent() {
        let collections = collections();
        let request = request(None, ObjectId::new(), ObjectId::new());

        let view = populate(&request, &collections).await.unwrap();
        let json = serde_json::to_value(&view).unwrap();

        for key in ["creator", "travel_country", "passport", "approved_currencies", "branch"] {
            assert!(json.get(key).is_none(), "{key} should be absent");
        }
        assert!(json.get("passport_id").is_some());
    }

    #[tokio::test]
    async fn test_actor_resolves_to_profile_name() {
        let collections = collections();
        let user_id = ObjectId::new();
        let profile = Profile {
            id: ObjectId::new(),
            user_id,
            first_name: "Sara".to_string(),
            middle_name: None,
            last_name: "Tesfaye".to_string(),
            email: Some("sara@example.com".to_string()),
            phone: None,
            department_id: None,
            branch_id: None,
            audit: Audit::new(None),
        };
        let user = User {
            id: user_id,
            username: "sara".to_string(),
            password_hash: "x".to_string(),
            role_id: ObjectId::new(),
            profile_id: profile.id,
            audit: Audit::new(None),
        };
        collections.profiles.create(&profile).await.unwrap();
        collections.users.create(&user).await.unwrap();

        let request = request(Some(user_id), ObjectId::new(), ObjectId::new());
        let view = attach_actors(project(&request), &collections).await.unwrap();

        let creator = view.creator.unwrap();
        assert_eq!(creator.first_name, "Sara");
        assert_eq!(creator.last_name, "Tesfaye");
        let json = serde_json::to_value(&creator).unwrap();
        assert!(json.get("email").is_none());
    }

    #[tokio::test]
    async fn test_references_and_attachments_resolve() {
        let collections = collections();
        let passport = file("passport.pdf");
        let ticket = file("ticket.pdf");
        collections.files.create(&passport).await.unwrap();
        collections.files.create(&ticket).await.unwrap();

        let mut request = request(None, passport.id, ticket.id);
        let country = Country {
            id: request.travel_country_id,
            name: "Kenya".to_string(),
            code: "KE".to_string(),
            audit: Audit::new(None),
        };
        let purpose = TravelPurpose {
            id: request.travel_purpose_id,
            name: "Education".to_string(),
            audit: Audit::new(None),
        };
        collections.countries.create(&country).await.unwrap();
        collections.travel_purposes.create(&purpose).await.unwrap();
        request.attachments.visa_id = Some(ObjectId::new());

        let view = populate(&request, &collections).await.unwrap();

        assert_eq!(view.travel_country, Some(country));
        assert_eq!(view.travel_purpose, Some(purpose));
        assert_eq!(view.passport.as_ref().map(|f| f.url.as_str()), Some(passport.url.as_str()));
        assert_eq!(view.ticket, Some(ticket));
        assert!(view.visa.is_none());
    }

    #[tokio::test]
    async fn test_approved_currencies_pair_by_id() {
        let collections = collections();
        let usd = currency("USD");
        let eur = currency("EUR");
        collections.currencies.create(&eur).await.unwrap();
        collections.currencies.create(&usd).await.unwrap();

        let mut request = request(None, ObjectId::new(), ObjectId::new());
        request.approved_currency_ids = vec![usd.id, eur.id];
        request.approved_amounts = vec![100.0, 50.0];

        let view = attach_approved_currencies(project(&request), &collections)
            .await
            .unwrap();

        assert_eq!(view.approved_currencies.as_ref().map(Vec::len), Some(2));
        let pairs: Vec<_> = view
            .approved_pairs()
            .into_iter()
            .map(|(c, amount)| (c.map(|c| c.code.clone()), amount))
            .collect();
        assert_eq!(
            pairs,
            vec![(Some("USD".to_string()), 100.0), (Some("EUR".to_string()), 50.0)]
        );
    }
}
