//! Report exporters: a paginated PDF summary and a flat CSV of the view.
//!
//! Both return the finished bytes; callers write them out only once
//! serialization has succeeded.

pub mod csv;
pub mod format;
pub mod pdf;
