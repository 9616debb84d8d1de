// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process-wide marshalling defaults.
//!
//! The weak typing toggle lives in a single atomic cell. Every
//! [`Marshaller::new`](crate::Marshaller::new) snapshots it; callers that need
//! isolation use [`Marshaller::with_weak_types`](crate::Marshaller::with_weak_types)
//! instead of flipping the global.

use std::sync::atomic::{AtomicBool, Ordering};

static ALLOW_WEAK_TYPES: AtomicBool = AtomicBool::new(false);

/// Set the process-wide default for untyped list/dict handling.
///
/// `true` passes untyped containers through wholesale; `false` (the default)
/// validates their elements one by one.
pub fn set_allow_weak_types(allow: bool) {
    ALLOW_WEAK_TYPES.store(allow, Ordering::Release);
}

/// Current process-wide default for untyped list/dict handling.
pub fn allow_weak_types() -> bool {
    ALLOW_WEAK_TYPES.load(Ordering::Acquire)
}
