//! Directive dependency resolution.
//!
//! Orders the present directive kinds with Kahn's algorithm. Ties among ready
//! kinds are broken by `(stage_priority, kind)` so the result is deterministic.

use super::error::DependencyCycleError;
use super::kind::DirectiveKind;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Order `present` using the static dependency table.
pub fn resolve(present: &BTreeSet<DirectiveKind>) -> Result<Vec<DirectiveKind>, DependencyCycleError> {
    resolve_with(present, DirectiveKind::static_dependencies)
}

/// Order `present` using a caller-supplied edge table.
///
/// Dependencies on kinds outside `present` are ignored; the remaining edges
/// still apply.
pub fn resolve_with<'a>(
    present: &BTreeSet<DirectiveKind>,
    dependencies: impl Fn(DirectiveKind) -> &'a [DirectiveKind],
) -> Result<Vec<DirectiveKind>, DependencyCycleError> {
    let deps_of = |kind: DirectiveKind| -> BTreeSet<DirectiveKind> {
        dependencies(kind)
            .iter()
            .copied()
            .filter(|dep| present.contains(dep))
            .collect()
    };

    let mut pending: BTreeMap<DirectiveKind, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<DirectiveKind, Vec<DirectiveKind>> = BTreeMap::new();
    for &kind in present {
        let deps = deps_of(kind);
        pending.insert(kind, deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(kind);
        }
    }

    let mut ready: BinaryHeap<Reverse<(u8, DirectiveKind)>> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(kind, _)| Reverse((kind.stage_priority(), *kind)))
        .collect();

    let mut order = Vec::with_capacity(present.len());
    while let Some(Reverse((_, kind))) = ready.pop() {
        order.push(kind);
        for dependent in dependents.get(&kind).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse((dependent.stage_priority(), *dependent)));
                }
            }
        }
    }

    if order.len() == present.len() {
        return Ok(order);
    }

    let unresolved: Vec<DirectiveKind> = pending
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, _)| *kind)
        .collect();
    let cycle = find_cycle(&unresolved, &deps_of);
    Err(DependencyCycleError { cycle, unresolved })
}

/// Walk dependency edges among unresolved kinds until a kind repeats.
///
/// Every unresolved kind has at least one unresolved dependency, so the walk
/// always closes a cycle. The returned chain repeats its first kind at the end.
fn find_cycle(
    unresolved: &[DirectiveKind],
    deps_of: &impl Fn(DirectiveKind) -> BTreeSet<DirectiveKind>,
) -> Vec<DirectiveKind> {
    let Some(&start) = unresolved.first() else {
        return Vec::new();
    };

    let mut walk = vec![start];
    let mut current = start;
    loop {
        let next = deps_of(current)
            .into_iter()
            .find(|dep| unresolved.contains(dep));
        let Some(next) = next else {
            return walk;
        };
        if let Some(pos) = walk.iter().position(|kind| *kind == next) {
            let mut cycle = walk.split_off(pos);
            cycle.push(next);
            return cycle;
        }
        walk.push(next);
        current = next;
    }
}
