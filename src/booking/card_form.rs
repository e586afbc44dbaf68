//! Card-element payment form state.
//!
//! A parent step drives submission through a one-shot command that the form
//! consumes exactly once, instead of the parent toggling a flag and the form
//! inferring edges from repeated renders.

/// Per-field completion and inline error, mirrored from the card element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStatus {
    pub complete: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Number,
    Expiry,
    Cvc,
}

/// Result of confirming the payment against the server-issued client secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Succeeded { payment_intent_id: String },
    /// The processor wants a 3-D-Secure challenge. Surfaced as a retryable
    /// error for now; the challenge continuation is not implemented.
    RequiresAction,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardForm {
    pub number: FieldStatus,
    pub expiry: FieldStatus,
    pub cvc: FieldStatus,
    pub error: Option<String>,
    pending_submit: bool,
    in_flight: bool,
    succeeded_intent: Option<String>,
}

impl CardForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_changed(&mut self, field: CardField, status: FieldStatus) {
        match field {
            CardField::Number => self.number = status,
            CardField::Expiry => self.expiry = status,
            CardField::Cvc => self.cvc = status,
        }
    }

    pub fn all_fields_complete(&self) -> bool {
        self.number.complete && self.expiry.complete && self.cvc.complete
    }

    /// Parent-issued submit command. Ignored while a confirmation is already
    /// in flight or after success.
    pub fn request_submit(&mut self) {
        if !self.in_flight && self.succeeded_intent.is_none() {
            self.pending_submit = true;
        }
    }

    /// Consumes the pending submit command and marks the confirmation in
    /// flight. Returns false (and consumes nothing) when there is no pending
    /// command or one is already running.
    pub fn take_submit(&mut self) -> bool {
        if !self.pending_submit || self.in_flight {
            return false;
        }
        self.pending_submit = false;
        self.in_flight = true;
        self.error = None;
        true
    }

    /// Applies the confirmation result. The in-flight flag clears on every
    /// exit path.
    pub fn finish(&mut self, outcome: ConfirmOutcome) {
        self.in_flight = false;
        match outcome {
            ConfirmOutcome::Succeeded { payment_intent_id } => {
                self.error = None;
                self.succeeded_intent = Some(payment_intent_id);
            }
            ConfirmOutcome::RequiresAction => {
                self.error = Some(
                    "This card requires additional authentication. \
                     Please try a different card."
                        .to_string(),
                );
            }
            ConfirmOutcome::Failed(message) => {
                self.error = Some(message);
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn succeeded_intent(&self) -> Option<&str> {
        self.succeeded_intent.as_deref()
    }
}
