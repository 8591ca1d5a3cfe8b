//! Repositories for database operations

pub mod booking;
pub mod payment;
pub mod report;
pub mod service;
pub mod user;

pub use booking::BookingRepository;
pub use payment::{ConfirmOutcome, PaymentRepository};
pub use report::ReportRepository;
pub use service::ServiceRepository;
pub use user::UserRepository;
