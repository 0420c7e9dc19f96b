//! Lifecycle email templates, rendered from the populated request view

use crate::requests::RequestView;

/// Subject and body of one message
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

fn greeting(view: &RequestView) -> String {
    match &view.creator {
        Some(creator) => format!("Dear {} {},", creator.first_name, creator.last_name),
        None => "Hello,".to_string(),
    }
}

fn currency_code(view: &RequestView) -> String {
    view.fcy_requested
        .as_ref()
        .map(|c| c.code.clone())
        .unwrap_or_else(|| view.fcy_requested_id.to_hex())
}

pub fn request_submitted(view: &RequestView) -> Rendered {
    Rendered {
        subject: format!("Forex request {} submitted", view.request_code),
        body: format!(
            "{}\n\nYour forex request {} for {} {:.2} on behalf of {} has been received and is awaiting validation.",
            greeting(view),
            view.request_code,
            currency_code(view),
            view.fcy_requested_amount,
            view.name,
        ),
    }
}

pub fn request_validated(view: &RequestView) -> Rendered {
    let validator = view
        .validator
        .as_ref()
        .map(|v| format!(" by {} {}", v.first_name, v.last_name))
        .unwrap_or_default();

    Rendered {
        subject: format!("Forex request {} validated", view.request_code),
        body: format!(
            "{}\n\nYour forex request {} has been validated{} and is awaiting approval.",
            greeting(view),
            view.request_code,
            validator,
        ),
    }
}

pub fn request_approved(view: &RequestView) -> Rendered {
    let lines: Vec<String> = view
        .approved_pairs()
        .into_iter()
        .zip(&view.approved_currency_ids)
        .map(|((currency, amount), id)| {
            let code = currency
                .map(|c| c.code.clone())
                .unwrap_or_else(|| id.to_hex());
            format!("  - {} {:.2}", code, amount)
        })
        .collect();

    Rendered {
        subject: format!("Forex request {} approved", view.request_code),
        body: format!(
            "{}\n\nYour forex request {} has been approved for:\n{}\n\nPlease accept or decline the allocation.",
            greeting(view),
            view.request_code,
            lines.join("\n"),
        ),
    }
}

pub fn request_rejected(view: &RequestView) -> Rendered {
    let reason = view
        .rejection_reason
        .as_deref()
        .map(|r| format!("\n\nReason: {}", r))
        .unwrap_or_default();

    Rendered {
        subject: format!("Forex request {} rejected", view.request_code),
        body: format!(
            "{}\n\nYour forex request {} has been rejected.{}",
            greeting(view),
            view.request_code,
            reason,
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Audit, Currency, RequestStatus};
    use crate::requests::ActorName;
    use crate::store::ObjectId;

    fn view() -> RequestView {
        let now = Utc::now();
        serde_json::from_value(serde_json::json!({
            "id": ObjectId::new(),
            "request_code": "REQ-7K2M9QXA",
            "status": RequestStatus::Approved,
            "name": "Abebe Kebede",
            "accounts_to_deduct": ["1000123"],
            "average_deposit": 10.0,
            "previous_fcy_generation": 1.0,
            "current_fcy_generation": 1.0,
            "fcy_requested_amount": 1500.0,
            "travel_purpose_id": ObjectId::new(),
            "travel_country_id": ObjectId::new(),
            "fcy_requested_id": ObjectId::new(),
            "account_currency_id": ObjectId::new(),
            "customer_type_id": ObjectId::new(),
            "created_at": now,
            "updated_at": now,
            "passport_id": ObjectId::new(),
            "ticket_id": ObjectId::new(),
        }))
        .unwrap()
    }

    #[test]
    fn test_approved_lists_pairs_by_currency_id() {
        let usd = Currency {
            id: ObjectId::new(),
            name: "US Dollar".to_string(),
            code: "USD".to_string(),
            symbol: Some("$".to_string()),
            audit: Audit::new(None),
        };
        let unknown = ObjectId::new();

        let mut view = view();
        view.creator = Some(ActorName {
            first_name: "Abebe".to_string(),
            middle_name: None,
            last_name: "Kebede".to_string(),
        });
        view.approved_currency_ids = vec![unknown, usd.id];
        view.approved_amounts = vec![20.0, 1000.0];
        view.approved_currencies = Some(vec![usd]);

        let rendered = request_approved(&view);

        assert_eq!(rendered.subject, "Forex request REQ-7K2M9QXA approved");
        assert!(rendered.body.starts_with("Dear Abebe Kebede,"));
        assert!(rendered.body.contains("USD 1000.00"));
        assert!(rendered.body.contains(&format!("{} 20.00", unknown.to_hex())));
    }

    #[test]
    fn test_rejected_includes_reason() {
        let mut view = view();
        view.rejection_reason = Some("Insufficient balance".to_string());

        let rendered = request_rejected(&view);
        assert!(rendered.body.starts_with("Hello,"));
        assert!(rendered.body.ends_with("Reason: Insufficient balance"));
    }
}
