//! Reusable widgets shared by the report views.

pub mod filter_panel;
pub mod header;
