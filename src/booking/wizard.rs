//! Four-step booking wizard: services → schedule → details → confirm.
//!
//! Modeled as a tagged state plus a pure reducer. A variant carries only the
//! data valid at its step, so combinations like "submitting while selecting
//! services" cannot be represented.

use crate::catalog::{self, Category};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Illustrative daily availability. Unavailable slots are inert: selecting
/// one is ignored by the reducer.
#[derive(Debug, Clone, Copy)]
pub struct TimeSlot {
    pub time: &'static str,
    pub available: bool,
}

pub const TIME_SLOTS: &[TimeSlot] = &[
    TimeSlot { time: "9:00 AM", available: true },
    TimeSlot { time: "10:00 AM", available: true },
    TimeSlot { time: "11:00 AM", available: false },
    TimeSlot { time: "1:00 PM", available: true },
    TimeSlot { time: "2:00 PM", available: true },
    TimeSlot { time: "3:00 PM", available: false },
    TimeSlot { time: "4:00 PM", available: true },
    TimeSlot { time: "5:00 PM", available: true },
];

pub fn slot_available(time: &str) -> bool {
    TIME_SLOTS
        .iter()
        .any(|slot| slot.time == time && slot.available)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::FirstName => self.first_name.as_deref(),
            Field::LastName => self.last_name.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Phone => self.phone.as_deref(),
        }
    }
}

/// Which fields have been blurred (or force-touched by a failed advance).
/// Errors are only rendered for touched fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touched {
    pub first_name: bool,
    pub last_name: bool,
    pub email: bool,
    pub phone: bool,
}

impl Touched {
    pub fn all() -> Self {
        Self {
            first_name: true,
            last_name: true,
            email: true,
            phone: true,
        }
    }

    fn mark(&mut self, field: Field) {
        match field {
            Field::FirstName => self.first_name = true,
            Field::LastName => self.last_name = true,
            Field::Email => self.email = true,
            Field::Phone => self.phone = true,
        }
    }

    pub fn is_touched(&self, field: Field) -> bool {
        match field {
            Field::FirstName => self.first_name,
            Field::LastName => self.last_name,
            Field::Email => self.email,
            Field::Phone => self.phone,
        }
    }
}

/// Validates every field at once; a failed advance shows all errors together.
pub fn validate(form: &ContactForm) -> FieldErrors {
    let digits = form.phone.chars().filter(char::is_ascii_digit).count();
    FieldErrors {
        first_name: form
            .first_name
            .trim()
            .is_empty()
            .then(|| "First name is required".to_string()),
        last_name: form
            .last_name
            .trim()
            .is_empty()
            .then(|| "Last name is required".to_string()),
        email: (!EMAIL_RE.is_match(form.email.trim()))
            .then(|| "Enter a valid email address".to_string()),
        phone: (digits < 10).then(|| "Enter a valid phone number".to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardState {
    Services {
        selection: Vec<String>,
        category: Option<Category>,
        /// URL-parameter seeding already consumed; later seeds are no-ops.
        seeded: bool,
    },
    Schedule {
        selection: Vec<String>,
        date: Option<String>,
        time: Option<String>,
    },
    Details {
        selection: Vec<String>,
        date: String,
        time: String,
        form: ContactForm,
        errors: FieldErrors,
        touched: Touched,
    },
    Confirm {
        selection: Vec<String>,
        date: String,
        time: String,
        form: ContactForm,
        submitting: bool,
        error: Option<String>,
    },
    Confirmed {
        selection: Vec<String>,
        date: String,
        time: String,
        form: ContactForm,
    },
}

impl Default for WizardState {
    fn default() -> Self {
        Self::Services {
            selection: Vec::new(),
            category: None,
            seeded: false,
        }
    }
}

impl WizardState {
    pub fn step(&self) -> u8 {
        match self {
            Self::Services { .. } => 1,
            Self::Schedule { .. } => 2,
            Self::Details { .. } => 3,
            Self::Confirm { .. } => 4,
            Self::Confirmed { .. } => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    ToggleService(String),
    SetCategory(Option<Category>),
    /// First-render injection from a `?service=` URL parameter.
    SeedFromUrl(String),
    SelectDate(String),
    SelectTime(String),
    SetField(Field, String),
    Blur(Field),
    /// Advance to the next step, gated on the current step's requirements.
    Next,
    /// Jump back to a completed step. Forward jumps are ignored.
    GoToStep(u8),
    Submit,
    SubmitSucceeded,
    SubmitFailed(String),
}

fn toggle(selection: &mut Vec<String>, id: String) {
    if let Some(pos) = selection.iter().position(|s| *s == id) {
        selection.remove(pos);
    } else {
        selection.push(id);
    }
}

pub fn reduce(state: WizardState, action: WizardAction) -> WizardState {
    use WizardAction as A;
    use WizardState as S;

    if let A::GoToStep(target) = action {
        return go_back(state, target);
    }

    match state {
        S::Services {
            mut selection,
            category,
            seeded,
        } => match action {
            A::ToggleService(id) => {
                toggle(&mut selection, id);
                S::Services { selection, category, seeded }
            }
            A::SetCategory(category) => S::Services { selection, category, seeded },
            A::SeedFromUrl(id) if !seeded => match catalog::service_by_id(&id) {
                Some(service) => S::Services {
                    selection: vec![id],
                    category: Some(service.category),
                    seeded: true,
                },
                None => S::Services { selection, category, seeded: true },
            },
            A::Next if !selection.is_empty() => S::Schedule {
                selection,
                date: None,
                time: None,
            },
            _ => S::Services { selection, category, seeded },
        },

        S::Schedule { selection, date, time } => match action {
            A::SelectDate(date) => S::Schedule {
                selection,
                date: Some(date),
                time,
            },
            A::SelectTime(candidate) if slot_available(&candidate) => S::Schedule {
                selection,
                date,
                time: Some(candidate),
            },
            A::Next => match (date, time) {
                (Some(date), Some(time)) => S::Details {
                    selection,
                    date,
                    time,
                    form: ContactForm::default(),
                    errors: FieldErrors::default(),
                    touched: Touched::default(),
                },
                (date, time) => S::Schedule { selection, date, time },
            },
            _ => S::Schedule { selection, date, time },
        },

        S::Details {
            selection,
            date,
            time,
            mut form,
            mut errors,
            mut touched,
        } => match action {
            A::SetField(field, value) => {
                match field {
                    Field::FirstName => form.first_name = value,
                    Field::LastName => form.last_name = value,
                    Field::Email => form.email = value,
                    Field::Phone => form.phone = value,
                }
                // Live revalidation only for fields already showing feedback.
                if touched.is_touched(field) {
                    errors = validate(&form);
                }
                S::Details { selection, date, time, form, errors, touched }
            }
            A::Blur(field) => {
                touched.mark(field);
                errors = validate(&form);
                S::Details { selection, date, time, form, errors, touched }
            }
            A::Next => {
                let errors = validate(&form);
                if errors.is_empty() {
                    S::Confirm {
                        selection,
                        date,
                        time,
                        form,
                        submitting: false,
                        error: None,
                    }
                } else {
                    // Failed advance surfaces every field error at once.
                    S::Details {
                        selection,
                        date,
                        time,
                        form,
                        errors,
                        touched: Touched::all(),
                    }
                }
            }
            _ => S::Details { selection, date, time, form, errors, touched },
        },

        S::Confirm {
            selection,
            date,
            time,
            form,
            submitting,
            error,
        } => match action {
            // Re-entry while in flight is ignored, not queued.
            A::Submit if !submitting => S::Confirm {
                selection,
                date,
                time,
                form,
                submitting: true,
                error: None,
            },
            A::SubmitSucceeded if submitting => S::Confirmed { selection, date, time, form },
            // The form stays editable; a failed payment never resets the wizard.
            A::SubmitFailed(message) if submitting => S::Confirm {
                selection,
                date,
                time,
                form,
                submitting: false,
                error: Some(message),
            },
            _ => S::Confirm { selection, date, time, form, submitting, error },
        },

        state @ S::Confirmed { .. } => state,
    }
}

/// Backward-only navigation. Data from steps at or beyond the target is
/// discarded; each state carries only what its step needs.
fn go_back(state: WizardState, target: u8) -> WizardState {
    use WizardState as S;

    if target >= state.step() {
        return state;
    }

    let selection = match &state {
        S::Services { selection, .. }
        | S::Schedule { selection, .. }
        | S::Details { selection, .. }
        | S::Confirm { selection, .. }
        | S::Confirmed { selection, .. } => selection.clone(),
    };

    // The terminal state has no summaries to click back from.
    if matches!(state, S::Confirmed { .. }) {
        return state;
    }

    match target {
        1 => S::Services {
            selection,
            category: None,
            seeded: true,
        },
        2 => {
            let (date, time) = match state {
                S::Details { date, time, .. } | S::Confirm { date, time, .. } => {
                    (Some(date), Some(time))
                }
                _ => (None, None),
            };
            S::Schedule { selection, date, time }
        }
        3 => match state {
            S::Confirm { date, time, form, .. } => S::Details {
                selection,
                date,
                time,
                form,
                errors: FieldErrors::default(),
                touched: Touched::default(),
            },
            state => state,
        },
        _ => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ContactForm {
        ContactForm {
            first_name: "Dana".into(),
            last_name: "Reyes".into(),
            email: "dana@example.com".into(),
            phone: "(310) 309-7901".into(),
        }
    }

    fn at_details() -> WizardState {
        let mut state = WizardState::default();
        state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        state = reduce(state, WizardAction::Next);
        state = reduce(state, WizardAction::SelectDate("2026-03-06".into()));
        state = reduce(state, WizardAction::SelectTime("2:00 PM".into()));
        reduce(state, WizardAction::Next)
    }

    fn at_confirm() -> WizardState {
        let mut state = at_details();
        for (field, value) in [
            (Field::FirstName, "Dana"),
            (Field::LastName, "Reyes"),
            (Field::Email, "dana@example.com"),
            (Field::Phone, "3103097901"),
        ] {
            state = reduce(state, WizardAction::SetField(field, value.into()));
        }
        reduce(state, WizardAction::Next)
    }

    #[test]
    fn cannot_advance_without_a_service() {
        let state = reduce(WizardState::default(), WizardAction::Next);
        assert_eq!(state.step(), 1);

        let state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        assert_eq!(reduce(state, WizardAction::Next).step(), 2);
    }

    #[test]
    fn toggling_twice_deselects() {
        let state = WizardState::default();
        let state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        let state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        assert!(matches!(
            &state,
            WizardState::Services { selection, .. } if selection.is_empty()
        ));
    }

    #[test]
    fn schedule_requires_both_date_and_time() {
        let mut state = WizardState::default();
        state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        state = reduce(state, WizardAction::Next);

        assert_eq!(reduce(state.clone(), WizardAction::Next).step(), 2);

        state = reduce(state, WizardAction::SelectDate("2026-03-06".into()));
        assert_eq!(reduce(state.clone(), WizardAction::Next).step(), 2);

        state = reduce(state, WizardAction::SelectTime("2:00 PM".into()));
        assert_eq!(reduce(state, WizardAction::Next).step(), 3);
    }

    #[test]
    fn unavailable_slots_are_inert() {
        let mut state = WizardState::default();
        state = reduce(state, WizardAction::ToggleService("brazilian".into()));
        state = reduce(state, WizardAction::Next);
        state = reduce(state, WizardAction::SelectTime("11:00 AM".into()));
        assert!(matches!(
            state,
            WizardState::Schedule { time: None, .. }
        ));
    }

    #[test]
    fn invalid_email_blocks_advance_with_only_the_email_error() {
        let mut state = at_details();
        let mut form = valid_form();
        form.email = "not-an-email".into();
        for (field, value) in [
            (Field::FirstName, form.first_name.clone()),
            (Field::LastName, form.last_name.clone()),
            (Field::Email, form.email.clone()),
            (Field::Phone, form.phone.clone()),
        ] {
            state = reduce(state, WizardAction::SetField(field, value));
        }

        let state = reduce(state, WizardAction::Next);
        match state {
            WizardState::Details { errors, touched, .. } => {
                assert!(errors.email.is_some());
                assert!(errors.first_name.is_none());
                assert!(errors.last_name.is_none());
                assert!(errors.phone.is_none());
                assert_eq!(touched, Touched::all());
            }
            other => panic!("expected Details, got step {}", other.step()),
        }
    }

    #[test]
    fn errors_appear_only_after_blur() {
        let state = at_details();
        // Empty form, nothing blurred: no errors surfaced yet.
        assert!(matches!(
            &state,
            WizardState::Details { errors, .. } if errors.is_empty()
        ));

        let state = reduce(state, WizardAction::Blur(Field::Email));
        match &state {
            WizardState::Details { errors, touched, .. } => {
                assert!(errors.email.is_some());
                assert!(touched.is_touched(Field::Email));
                assert!(!touched.is_touched(Field::Phone));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn submit_lifecycle() {
        let state = at_confirm();
        assert_eq!(state.step(), 4);

        let state = reduce(state, WizardAction::Submit);
        assert!(matches!(
            &state,
            WizardState::Confirm { submitting: true, .. }
        ));

        // A second submit while in flight changes nothing.
        let state = reduce(state, WizardAction::Submit);
        assert!(matches!(
            &state,
            WizardState::Confirm { submitting: true, .. }
        ));

        let state = reduce(state, WizardAction::SubmitSucceeded);
        assert_eq!(state.step(), 5);
    }

    #[test]
    fn failed_submit_returns_to_editable_confirm() {
        let state = reduce(at_confirm(), WizardAction::Submit);
        let state = reduce(state, WizardAction::SubmitFailed("Your card was declined.".into()));
        match state {
            WizardState::Confirm { submitting, error, form, .. } => {
                assert!(!submitting);
                assert_eq!(error.as_deref(), Some("Your card was declined."));
                assert_eq!(form.email, "dana@example.com");
            }
            other => panic!("expected Confirm, got step {}", other.step()),
        }
    }

    #[test]
    fn backward_navigation_only() {
        let state = at_confirm();
        assert_eq!(reduce(state.clone(), WizardAction::GoToStep(5)).step(), 4);
        assert_eq!(reduce(state.clone(), WizardAction::GoToStep(4)).step(), 4);

        let back = reduce(state.clone(), WizardAction::GoToStep(2));
        match &back {
            WizardState::Schedule { selection, date, time } => {
                assert_eq!(selection, &vec!["brazilian".to_string()]);
                assert_eq!(date.as_deref(), Some("2026-03-06"));
                assert_eq!(time.as_deref(), Some("2:00 PM"));
            }
            _ => panic!("expected Schedule"),
        }

        let back = reduce(state, WizardAction::GoToStep(3));
        assert!(matches!(
            &back,
            WizardState::Details { form, .. } if form.email == "dana@example.com"
        ));
    }

    #[test]
    fn url_seed_applies_once() {
        let state = reduce(WizardState::default(), WizardAction::SeedFromUrl("brazilian".into()));
        match &state {
            WizardState::Services { selection, category, seeded } => {
                assert_eq!(selection, &vec!["brazilian".to_string()]);
                assert_eq!(*category, Some(Category::Brazilian));
                assert!(seeded);
            }
            _ => unreachable!(),
        }

        // A later parameter change has no effect.
        let state = reduce(state, WizardAction::SeedFromUrl("eyebrows".into()));
        assert!(matches!(
            &state,
            WizardState::Services { selection, .. } if selection == &vec!["brazilian".to_string()]
        ));
    }

    #[test]
    fn unknown_url_seed_consumes_the_guard_without_selecting() {
        let state = reduce(WizardState::default(), WizardAction::SeedFromUrl("nails".into()));
        assert!(matches!(
            &state,
            WizardState::Services { selection, seeded: true, .. } if selection.is_empty()
        ));
    }

    #[test]
    fn validate_phone_by_digit_count() {
        let mut form = valid_form();
        form.phone = "310-309".into();
        assert!(validate(&form).phone.is_some());
        form.phone = "+1 (310) 309-7901".into();
        assert!(validate(&form).phone.is_none());
    }
}
