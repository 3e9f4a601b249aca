//! End-to-end engine integration through a custom codec.
