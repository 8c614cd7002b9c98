//! Tests for runw-config.
