use crate::phases::Phase;

/// Index of the phase with the highest priority; ties go to the higher
/// weighted waiting, remaining ties to the lowest index.
pub fn rank_phases(phases: &[Phase]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, phase) in phases.iter().enumerate() {
        let Some(best_index) = best else {
            best = Some(index);
            continue;
        };
        let leader = &phases[best_index];
        if phase.priority > leader.priority
            || (phase.priority == leader.priority && phase.weighted_waiting > leader.weighted_waiting)
        {
            best = Some(index);
        }
    }
    best
}

/// Walk forward from `current` along its linked chain and return the chain
/// member that should run next instead of the ranked candidate, if any.
///
/// The chain member with the highest priority (first one on ties) qualifies
/// when that priority is positive and at least `ranked_priority`.
pub fn linked_continuation(phases: &[Phase], current: usize, ranked_priority: i32) -> Option<usize> {
    let n = phases.len();
    if current >= n {
        return None;
    }

    let mut best: Option<(usize, i32)> = None;
    let mut at = current;
    for _ in 0..n {
        if !phases[at].options.linked_with_next() {
            break;
        }
        let successor = (at + 1) % n;
        if successor == current {
            break;
        }
        let priority = phases[successor].priority;
        if best.is_none_or(|(_, best_priority)| priority > best_priority) {
            best = Some((successor, priority));
        }
        at = successor;
    }

    best.and_then(|(index, priority)| {
        (priority > 0 && priority >= ranked_priority).then_some(index)
    })
}

/// Pull `candidate` back to the start of its linked chain: while the phase
/// before it is linked to it and has positive priority, move to that phase.
/// Never moves onto `current`.
pub fn chain_start(phases: &[Phase], candidate: usize, current: Option<usize>) -> usize {
    let n = phases.len();
    if candidate >= n {
        return candidate;
    }

    let mut start = candidate;
    for _ in 0..n {
        let previous = (start + n - 1) % n;
        if previous == candidate || Some(previous) == current {
            break;
        }
        let phase = &phases[previous];
        if !(phase.options.linked_with_next() && phase.priority > 0) {
            break;
        }
        start = previous;
    }
    start
}
