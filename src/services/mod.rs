//! Service layer for the seat watcher.
//!
//! This module contains the business logic for:
//! - Catalog traversal (`CatalogCrawler`)
//! - Listing link extraction (`listing`)
//! - Course detail parsing (`parse_course_detail`)
//! - Open-seat inference (`SeatSampler`)
//! - Subscriber notification (`TransitionNotifier`)

mod availability;
mod catalog;
mod detail;
pub mod listing;
mod notifier;

pub use availability::SeatSampler;
pub use catalog::CatalogCrawler;
pub use detail::{UNKNOWN_SEMESTER, parse_course_detail};
pub use notifier::{
    LogMailer, MailMessage, Mailer, NotifyOutcome, OutboxMailer, TransitionNotifier,
};
