//! Export of derived data. Nothing here reads or persists engine state.

pub mod csv;
