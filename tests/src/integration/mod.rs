//! Cross-crate flows driven through `round-engine`'s public ports.

mod flows;
