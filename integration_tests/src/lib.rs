//! Cross-crate tests for `flood_core`; see `tests/`.
