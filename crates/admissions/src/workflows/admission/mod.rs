//! Role-gated admissions workflow: application lifecycle, seat allocation,
//! course catalog, and the officer review gateway.

pub mod applications;
pub mod catalog;
pub mod identity;
pub mod review;
pub mod seats;
