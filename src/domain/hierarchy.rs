use std::collections::HashMap;

/// Whether making `parent_id` the parent of `node_id` closes a loop in a
/// parent-pointer tree. `parents` maps each node to its current parent.
///
/// Serves both department parents and employee managers.
pub fn creates_cycle(parents: &HashMap<u64, Option<u64>>, node_id: u64, parent_id: u64) -> bool {
    let mut cursor = Some(parent_id);
    let mut steps = 0;
    while let Some(id) = cursor {
        if id == node_id || steps > parents.len() {
            return true;
        }
        cursor = parents.get(&id).copied().flatten();
        steps += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> HashMap<u64, Option<u64>> {
        // 1 ─ 2 ─ 3, and 4 standalone
        HashMap::from([(1, None), (2, Some(1)), (3, Some(2)), (4, None)])
    }

    #[test]
    fn moving_under_a_descendant_is_a_cycle() {
        assert!(creates_cycle(&tree(), 1, 3));
        assert!(creates_cycle(&tree(), 2, 2));
    }

    #[test]
    fn moving_elsewhere_is_fine() {
        assert!(!creates_cycle(&tree(), 3, 4));
        assert!(!creates_cycle(&tree(), 4, 1));
    }

    #[test]
    fn two_node_swap_is_a_cycle() {
        // A (1) reports to B (2); making B report to A closes the loop.
        let managers = HashMap::from([(1, Some(2)), (2, None)]);
        assert!(creates_cycle(&managers, 2, 1));
    }

    #[test]
    fn corrupt_existing_loop_terminates() {
        let looped = HashMap::from([(1, Some(2)), (2, Some(1)), (3, None)]);
        assert!(creates_cycle(&looped, 3, 1));
    }
}
