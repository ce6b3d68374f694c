pub mod patient;
pub mod payment;
pub mod treatment;

pub use patient::PatientService;
pub use payment::PaymentService;
pub use treatment::TreatmentNoteService;
