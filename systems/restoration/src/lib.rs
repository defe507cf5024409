#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cures and end-of-session restoration.
//!
//! Both paths revert recorded cells to their original material. A cure also
//! adds the cells to the permanent ledger; restoration leaves the ledger
//! untouched and clears the transient collections once it drains.

mod cure;
mod restore;

pub use cure::{cure_area, save_ledger, CureHandle};
pub use restore::Restoration;
