//! Checkout input and address resolution.
//!
//! Manual forms are validated locally; nothing here touches the network.
//! Saved addresses are looked up by the orchestrator and then merged with the
//! form and profile through [`resolve_saved_address`].

use std::fmt;

use nutriio_core::{AddressId, ContactError, Email, Phone, UserId};
use serde::{Deserialize, Serialize};

use crate::models::{
    CustomerContact, DEFAULT_COUNTRY, Delivery, Profile, SavedAddress, ShippingAddress,
};

/// One checkout submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Signed-in shopper, if any.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Saved address chosen instead of the manual form.
    #[serde(default)]
    pub selected_address_id: Option<AddressId>,
    #[serde(default)]
    pub form: CheckoutForm,
}

/// The manual address form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Form fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutField {
    FullName,
    Email,
    Phone,
    AddressLine1,
    City,
    PostalCode,
    SavedAddress,
}

impl CheckoutField {
    /// Label shown next to the field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullName => "Full name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::AddressLine1 => "Address line 1",
            Self::City => "City",
            Self::PostalCode => "Postal code",
            Self::SavedAddress => "Saved address",
        }
    }
}

/// What is wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    Invalid(String),
}

/// Every field problem found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    problems: Vec<(CheckoutField, FieldProblem)>,
}

impl ValidationErrors {
    /// No problems recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// All problems, in the order they were found.
    #[must_use]
    pub fn problems(&self) -> &[(CheckoutField, FieldProblem)] {
        &self.problems
    }

    /// Fields reported as missing.
    pub fn missing(&self) -> impl Iterator<Item = CheckoutField> + '_ {
        self.problems
            .iter()
            .filter(|(_, problem)| *problem == FieldProblem::Missing)
            .map(|(field, _)| *field)
    }

    /// Whether `field` has a problem.
    #[must_use]
    pub fn contains(&self, field: CheckoutField) -> bool {
        self.problems.iter().any(|(f, _)| *f == field)
    }

    pub(crate) fn single(field: CheckoutField, problem: FieldProblem) -> Self {
        Self {
            problems: vec![(field, problem)],
        }
    }

    fn push(&mut self, field: CheckoutField, problem: FieldProblem) {
        self.problems.push((field, problem));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self.missing().map(CheckoutField::label).collect();
        if !missing.is_empty() {
            write!(f, "Please fill in all required fields: {}", missing.join(", "))?;
        }
        for (field, problem) in &self.problems {
            if let FieldProblem::Invalid(reason) = problem {
                if !missing.is_empty() {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {reason}", field.label())?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a manually entered address and contact.
///
/// # Errors
///
/// Returns every missing or malformed field at once.
pub fn validate_manual(form: &CheckoutForm) -> Result<Delivery, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let full_name = required(&mut errors, CheckoutField::FullName, &form.full_name);
    let address_line_1 = required(&mut errors, CheckoutField::AddressLine1, &form.address_line_1);
    let city = required(&mut errors, CheckoutField::City, &form.city);
    let postal_code = required(&mut errors, CheckoutField::PostalCode, &form.postal_code);
    let email = parse_field(&mut errors, CheckoutField::Email, &form.email, Email::parse);
    let phone = parse_field(&mut errors, CheckoutField::Phone, &form.phone, Phone::parse);

    match (email, phone) {
        (Some(email), Some(phone)) if errors.is_empty() => {
            let address = ShippingAddress {
                full_name: full_name.clone(),
                phone: phone.as_str().to_string(),
                address_line_1,
                address_line_2: non_empty(&form.address_line_2),
                city,
                state: form.state.trim().to_string(),
                postal_code,
                country: non_empty(&form.country)
                    .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            };
            Ok(Delivery {
                address,
                contact: CustomerContact {
                    name: full_name,
                    email,
                    phone,
                },
            })
        }
        _ => Err(errors),
    }
}

/// Merge a saved address with contact details from the form or profile.
///
/// Name and phone fall back to the address itself; email must come from the
/// form or the profile.
///
/// # Errors
///
/// Returns the missing or malformed contact fields.
pub fn resolve_saved_address(
    saved: &SavedAddress,
    form: &CheckoutForm,
    profile: Option<&Profile>,
) -> Result<Delivery, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let profile_email = profile.and_then(|p| p.email.as_deref()).unwrap_or_default();
    let profile_name = profile.and_then(|p| p.full_name.as_deref()).unwrap_or_default();

    let email_source = first_non_empty(&[form.email.as_str(), profile_email]);
    let email = parse_field(&mut errors, CheckoutField::Email, email_source, Email::parse);

    let phone_source = first_non_empty(&[form.phone.as_str(), saved.phone_number.as_str()]);
    let phone = parse_field(&mut errors, CheckoutField::Phone, phone_source, Phone::parse);

    let name = first_non_empty(&[
        form.full_name.as_str(),
        saved.full_name.as_str(),
        profile_name,
    ]).to_string();
    if name.is_empty() {
        errors.push(CheckoutField::FullName, FieldProblem::Missing);
    }

    match (email, phone) {
        (Some(email), Some(phone)) if errors.is_empty() => Ok(Delivery {
            address: ShippingAddress::from(saved),
            contact: CustomerContact { name, email, phone },
        }),
        _ => Err(errors),
    }
}

fn required(errors: &mut ValidationErrors, field: CheckoutField, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, FieldProblem::Missing);
    }
    value.to_string()
}

fn parse_field<T>(
    errors: &mut ValidationErrors,
    field: CheckoutField,
    value: &str,
    parse: fn(&str) -> Result<T, ContactError>,
) -> Option<T> {
    if value.trim().is_empty() {
        errors.push(field, FieldProblem::Missing);
        return None;
    }
    match parse(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(field, FieldProblem::Invalid(e.to_string()));
            None
        }
    }
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .map(str::trim)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nutriio_core::AddressKind;

    fn complete_form() -> CheckoutForm {
        CheckoutForm {
            full_name: "Asha Rao".to_string(),
            email: "asha@example.in".to_string(),
            phone: "+91 98765 43210".to_string(),
            address_line_1: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: " 560001 ".to_string(),
            ..CheckoutForm::default()
        }
    }

    fn saved() -> SavedAddress {
        SavedAddress {
            id: AddressId::new("addr-1"),
            user_id: UserId::new("user-1"),
            kind: AddressKind::Home,
            full_name: "Asha Rao".to_string(),
            phone_number: "9876543210".to_string(),
            address_line_1: "4 Lake View".to_string(),
            address_line_2: Some("Flat 2B".to_string()),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            postal_code: "411001".to_string(),
            country: "India".to_string(),
            is_default: true,
        }
    }

    #[test]
    fn test_empty_form_lists_every_required_field() {
        let errors = validate_manual(&CheckoutForm::default()).unwrap_err();
        let missing: Vec<_> = errors.missing().collect();
        assert_eq!(
            missing,
            vec![
                CheckoutField::FullName,
                CheckoutField::AddressLine1,
                CheckoutField::City,
                CheckoutField::PostalCode,
                CheckoutField::Email,
                CheckoutField::Phone,
            ]
        );
        assert!(errors.to_string().starts_with("Please fill in all required fields"));
    }

    #[test]
    fn test_complete_form_defaults_country_and_trims() {
        let delivery = validate_manual(&complete_form()).unwrap();
        assert_eq!(delivery.address.country, "India");
        assert_eq!(delivery.address.postal_code, "560001");
        assert_eq!(delivery.address.address_line_2, None);
        assert_eq!(delivery.contact.email.as_str(), "asha@example.in");
    }

    #[test]
    fn test_malformed_email_is_invalid_not_missing() {
        let mut form = complete_form();
        form.email = "asha.example.in".to_string();
        let errors = validate_manual(&form).unwrap_err();
        assert!(errors.contains(CheckoutField::Email));
        assert_eq!(errors.missing().count(), 0);
    }

    #[test]
    fn test_saved_address_takes_email_from_profile() {
        let profile = Profile {
            id: UserId::new("user-1"),
            full_name: None,
            email: Some("asha@example.in".to_string()),
            phone: None,
        };
        let delivery =
            resolve_saved_address(&saved(), &CheckoutForm::default(), Some(&profile)).unwrap();
        assert_eq!(delivery.address.city, "Pune");
        assert_eq!(delivery.contact.phone.as_str(), "9876543210");
        assert_eq!(delivery.contact.email.as_str(), "asha@example.in");
    }

    #[test]
    fn test_saved_address_without_any_email_fails() {
        let errors = resolve_saved_address(&saved(), &CheckoutForm::default(), None).unwrap_err();
        assert_eq!(errors.missing().collect::<Vec<_>>(), vec![CheckoutField::Email]);
    }
}
