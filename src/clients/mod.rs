pub mod stripe;
pub mod twilio;
