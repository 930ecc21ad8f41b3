// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Structural invariants of a committed index snapshot.
//!
//! The index keeps three views of the same documents: the stored documents,
//! the facet postings and the term postings. Every navigation count is
//! computed from the postings alone, so they must agree with the documents
//! exactly. `check_snapshot` walks all three and reports the first
//! disagreement.
//!
//! Tests call it after every mutation sequence. It is linear in the size of
//! the index and not meant for the query path.

mod snapshot;

pub use snapshot::*;
