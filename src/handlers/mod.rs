pub mod bnpl;
pub mod cal_webhook;
pub mod checkout;
pub mod payment_intents;
pub mod sms;
pub mod stripe_webhook;
pub mod twilio_webhook;
