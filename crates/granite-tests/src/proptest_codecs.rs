//! Property-based round trips over the built-in codecs.
