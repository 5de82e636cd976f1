//! End-to-end scenarios across the workspace crates; see `tests/`.
