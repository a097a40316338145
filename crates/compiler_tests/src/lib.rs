//! This crate holds no library code of its own — it exists so the
//! integration suite under `tests/` can depend on the front-end crates as
//! `dev-dependencies` without pulling them into any downstream build.
