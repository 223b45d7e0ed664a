//! Provider selection
//!
//! Pure selection logic over a snapshot of a user's bindings and the
//! provider catalog. Both the dispatcher and the recovery paths call these
//! functions, so neither layer depends on the other.
//!
//! All functions take bindings already ordered by ascending priority; the
//! repository guarantees that ordering.

use std::collections::HashMap;

use crate::models::{ProviderKind, provider, user_provider};

/// Outcome of initial provider selection for a submission.
#[derive(Debug)]
pub struct Selected<'a> {
    pub binding: &'a user_provider::Model,
    /// True when a kind hint was given but nothing matched it, and selection
    /// fell back to the plain priority order.
    pub hint_fallback: bool,
}

/// Outcome of looking up the next provider in a retry chain.
#[derive(Debug)]
pub enum NextInChain<'a> {
    /// The next binding in priority order, with provider and binding active
    Next(&'a user_provider::Model),
    /// A next binding exists but it or its provider is inactive
    Inactive,
    /// The failed provider is last in the ordering (or no longer bound)
    Exhausted,
}

fn is_usable(
    binding: &user_provider::Model,
    providers: &HashMap<i64, provider::Model>,
) -> bool {
    binding.active
        && providers
            .get(&binding.provider_id)
            .map(|p| p.active)
            .unwrap_or(false)
}

/// Selects the binding for a fresh submission.
///
/// With a kind hint, the highest-priority usable binding of that kind wins;
/// if none matches, selection falls back to the highest-priority usable
/// binding of any kind (the caller logs the fallback). Without a hint the
/// highest-priority usable binding wins directly. Returns `None` when no
/// binding has both the binding and its provider active.
pub fn select_provider<'a>(
    bindings: &'a [user_provider::Model],
    providers: &HashMap<i64, provider::Model>,
    kind_hint: Option<ProviderKind>,
) -> Option<Selected<'a>> {
    if let Some(hint) = kind_hint {
        let matching = bindings.iter().find(|b| {
            is_usable(b, providers)
                && providers
                    .get(&b.provider_id)
                    .map(|p| p.kind == hint.as_str())
                    .unwrap_or(false)
        });

        if let Some(binding) = matching {
            return Some(Selected {
                binding,
                hint_fallback: false,
            });
        }

        return bindings
            .iter()
            .find(|b| is_usable(b, providers))
            .map(|binding| Selected {
                binding,
                hint_fallback: true,
            });
    }

    bindings
        .iter()
        .find(|b| is_usable(b, providers))
        .map(|binding| Selected {
            binding,
            hint_fallback: false,
        })
}

/// Picks the fallback target for a stale successful send: the first binding
/// in priority order bound to a different provider than the original
/// attempt. No activity check is applied on this path.
pub fn first_alternative<'a>(
    bindings: &'a [user_provider::Model],
    current_provider_id: i64,
) -> Option<&'a user_provider::Model> {
    bindings
        .iter()
        .find(|b| b.provider_id != current_provider_id)
}

/// Finds the successor for a failed attempt: the binding immediately after
/// the failed provider in priority order, provided both it and its provider
/// are active.
pub fn next_in_chain<'a>(
    bindings: &'a [user_provider::Model],
    providers: &HashMap<i64, provider::Model>,
    failed_provider_id: i64,
) -> NextInChain<'a> {
    let position = bindings
        .iter()
        .position(|b| b.provider_id == failed_provider_id);

    let Some(position) = position else {
        return NextInChain::Exhausted;
    };

    match bindings.get(position + 1) {
        Some(next) if is_usable(next, providers) => NextInChain::Next(next),
        Some(_) => NextInChain::Inactive,
        None => NextInChain::Exhausted,
    }
}
