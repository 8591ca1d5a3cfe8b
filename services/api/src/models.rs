//! Models for the API service

pub mod booking;
pub mod payment;
pub mod report;
pub mod service;
pub mod user;

pub use booking::{Booking, BookingCreateRequest, BookingDetails, BookingStatus, DurationUnit};
pub use payment::{NewPayment, Payment};
pub use report::{SalesReport, ServiceReportRow};
pub use service::{Service, ServiceInput};
pub use user::{Role, User};
