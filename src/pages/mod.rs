//! Page hierarchy automation

pub mod cascade;

pub use cascade::{
    CascadeOutcome, CascadeResolver, matches_prefix, select_delete_cascade, select_status_cascade,
};
