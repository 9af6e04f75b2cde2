pub mod consultation;
pub mod document;
pub mod enums;
pub mod patient;

pub use consultation::Consultation;
pub use document::Document;
pub use patient::{age_between, Patient};
