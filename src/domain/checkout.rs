//! Checkout progression gate: login -> address -> review.
//!
//! The gate owns only the current step and the authentication flag. Address
//! form values belong to the caller, which is what makes "edit" preserve
//! them for free. Saving a new address to the account is the caller's I/O;
//! it sits between [`CheckoutGate::validate_address`] and
//! [`CheckoutGate::confirm_address`] so a failed save blocks the transition.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Address,
    Review,
}

/// New-address form fields. All seven are required before the gate opens.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressForm {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl AddressForm {
    /// Names of required fields that are empty or whitespace-only.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("name", &self.name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
            ("phone", &self.phone),
        ];
        fields
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// The address the customer intends to deliver to: either a previously saved
/// one, or a freshly entered form (optionally saved to the account).
#[derive(Debug, Clone)]
pub enum AddressSelection {
    Saved { address_id: i32 },
    New { form: AddressForm, save_to_account: bool },
}

impl AddressSelection {
    pub fn save_requested(&self) -> bool {
        matches!(
            self,
            AddressSelection::New {
                save_to_account: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Please log in to continue")]
    NotAuthenticated,

    #[error("Address is incomplete: missing {}", .0.join(", "))]
    IncompleteAddress(Vec<&'static str>),

    #[error("Order can only be placed from the review step")]
    NotInReview,
}

/// Gate deciding whether the customer may advance from entering an address to
/// reviewing and placing the order.
#[derive(Debug, Clone)]
pub struct CheckoutGate {
    step: CheckoutStep,
    authenticated: bool,
}

impl CheckoutGate {
    pub fn new(authenticated: bool) -> Self {
        Self {
            step: CheckoutStep::Address,
            authenticated,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Login state changed (the login form renders inside the address step).
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Guard for advancing to review: authenticated, and either a saved
    /// address is selected or the new-address form is fully populated.
    /// Call this before any "save to account" request is fired.
    pub fn validate_address(&self, selection: &AddressSelection) -> Result<(), CheckoutError> {
        if !self.authenticated {
            return Err(CheckoutError::NotAuthenticated);
        }
        match selection {
            AddressSelection::Saved { .. } => Ok(()),
            AddressSelection::New { form, .. } => {
                let missing = form.missing_fields();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(CheckoutError::IncompleteAddress(missing))
                }
            }
        }
    }

    /// Advance to review. Re-runs the guard; callers that requested a save
    /// must only call this once persistence succeeded.
    pub fn confirm_address(&mut self, selection: &AddressSelection) -> Result<(), CheckoutError> {
        self.validate_address(selection)?;
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Go back to editing. Always permitted; the caller keeps its form
    /// values, so nothing is reset here.
    pub fn edit_address(&mut self) {
        self.step = CheckoutStep::Address;
    }

    /// Terminal action: only reachable from review, and the address is
    /// re-validated at submission time rather than trusted from the earlier
    /// gate check.
    pub fn authorize_place_order(
        &self,
        selection: &AddressSelection,
    ) -> Result<(), CheckoutError> {
        if self.step != CheckoutStep::Review {
            return Err(CheckoutError::NotInReview);
        }
        self.validate_address(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> AddressForm {
        AddressForm {
            name: "Asha Rao".into(),
            street: "12 MG Road".into(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            postal_code: "560001".into(),
            country: "India".into(),
            phone: "9876543210".into(),
        }
    }

    #[test]
    fn unauthenticated_user_is_always_rejected() {
        // Scenario F: form completeness does not matter without a login
        let gate = CheckoutGate::new(false);
        let selection = AddressSelection::New {
            form: complete_form(),
            save_to_account: false,
        };
        assert_eq!(
            gate.validate_address(&selection),
            Err(CheckoutError::NotAuthenticated)
        );

        let saved = AddressSelection::Saved { address_id: 1 };
        assert_eq!(
            gate.validate_address(&saved),
            Err(CheckoutError::NotAuthenticated)
        );
    }

    #[test]
    fn saved_address_opens_the_gate() {
        let mut gate = CheckoutGate::new(true);
        let selection = AddressSelection::Saved { address_id: 7 };
        gate.confirm_address(&selection).unwrap();
        assert_eq!(gate.step(), CheckoutStep::Review);
    }

    #[test]
    fn incomplete_form_blocks_with_named_fields() {
        let gate = CheckoutGate::new(true);
        let mut form = complete_form();
        form.city = "".into();
        form.phone = "   ".into();
        let selection = AddressSelection::New {
            form,
            save_to_account: false,
        };

        assert_eq!(
            gate.validate_address(&selection),
            Err(CheckoutError::IncompleteAddress(vec!["city", "phone"]))
        );
    }

    #[test]
    fn complete_form_advances_to_review() {
        let mut gate = CheckoutGate::new(true);
        let selection = AddressSelection::New {
            form: complete_form(),
            save_to_account: true,
        };
        assert!(selection.save_requested());
        gate.confirm_address(&selection).unwrap();
        assert_eq!(gate.step(), CheckoutStep::Review);
    }

    #[test]
    fn edit_is_always_permitted_and_preserves_nothing_it_does_not_own() {
        let mut gate = CheckoutGate::new(true);
        let selection = AddressSelection::New {
            form: complete_form(),
            save_to_account: false,
        };
        gate.confirm_address(&selection).unwrap();

        gate.edit_address();
        assert_eq!(gate.step(), CheckoutStep::Address);

        // the caller's form is untouched, so advancing again still works
        gate.confirm_address(&selection).unwrap();
        assert_eq!(gate.step(), CheckoutStep::Review);
    }

    #[test]
    fn place_order_requires_review_step() {
        let gate = CheckoutGate::new(true);
        let selection = AddressSelection::Saved { address_id: 7 };
        assert_eq!(
            gate.authorize_place_order(&selection),
            Err(CheckoutError::NotInReview)
        );
    }

    #[test]
    fn place_order_revalidates_the_address() {
        let mut gate = CheckoutGate::new(true);
        let selection = AddressSelection::New {
            form: complete_form(),
            save_to_account: false,
        };
        gate.confirm_address(&selection).unwrap();

        // the form was blanked between review and submission
        let blanked = AddressSelection::New {
            form: AddressForm::default(),
            save_to_account: false,
        };
        assert!(matches!(
            gate.authorize_place_order(&blanked),
            Err(CheckoutError::IncompleteAddress(_))
        ));

        gate.authorize_place_order(&selection).unwrap();
    }

    #[test]
    fn losing_authentication_closes_the_gate_again() {
        let mut gate = CheckoutGate::new(true);
        let selection = AddressSelection::Saved { address_id: 7 };
        gate.confirm_address(&selection).unwrap();

        gate.set_authenticated(false);
        assert_eq!(
            gate.authorize_place_order(&selection),
            Err(CheckoutError::NotAuthenticated)
        );
    }
}
