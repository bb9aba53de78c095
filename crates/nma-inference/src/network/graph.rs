//! Connected components of the evidence network.
//!
//! Treatments are nodes; every study joins all of its treatments pairwise.
//! Node identity is by equality only (no hashing), so node order is the order
//! of first appearance in the input and results are deterministic.

/// Distinct values of `items`, in order of first appearance, plus the node
/// index of every input position.
pub(crate) fn index_values<T: PartialEq + Clone>(items: &[T]) -> (Vec<T>, Vec<usize>) {
    let mut values: Vec<T> = Vec::new();
    let mut index = Vec::with_capacity(items.len());
    for item in items {
        let i = match values.iter().position(|v| v == item) {
            Some(i) => i,
            None => {
                values.push(item.clone());
                values.len() - 1
            }
        };
        index.push(i);
    }
    (values, index)
}

/// Node-index partition of the treatments appearing in `studies`/`treatments`.
///
/// Returns the distinct treatments and the components as lists of indices
/// into that list. Components are ordered by their first node, members
/// ascending. Callers guarantee equal input lengths.
pub(crate) fn component_indices<S, T>(studies: &[S], treatments: &[T]) -> (Vec<T>, Vec<Vec<usize>>)
where
    S: PartialEq + Clone,
    T: PartialEq + Clone,
{
    let (nodes, node_of) = index_values(treatments);
    let (study_labels, study_of) = index_values(studies);

    // Treatments per study, deduplicated.
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); study_labels.len()];
    for (&s, &t) in study_of.iter().zip(&node_of) {
        if !members[s].contains(&t) {
            members[s].push(t);
        }
    }

    let n = nodes.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for clique in &members {
        for &a in clique {
            for &b in clique {
                if a != b && !adjacency[a].contains(&b) {
                    adjacency[a].push(b);
                }
            }
        }
    }

    let mut discovered = vec![false; n];
    let mut components = Vec::new();
    for root in 0..n {
        if discovered[root] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![root];
        discovered[root] = true;
        while let Some(node) = stack.pop() {
            component.push(node);
            for &next in adjacency[node].iter().rev() {
                if !discovered[next] {
                    discovered[next] = true;
                    stack.push(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    (nodes, components)
}

/// Partition the treatments of an arm list into connected components.
///
/// `studies[i]` and `treatments[i]` describe arm `i`. Two treatments share a
/// component iff a chain of studies links them. A treatment seen only in
/// single-arm studies forms a component on its own.
///
/// Components are ordered by first appearance of their earliest treatment,
/// and treatments within a component by first appearance. Only the shorter
/// of the two slices' common prefix is considered if the lengths differ.
pub fn connected_components<S, T>(studies: &[S], treatments: &[T]) -> Vec<Vec<T>>
where
    S: PartialEq + Clone,
    T: PartialEq + Clone,
{
    let len = studies.len().min(treatments.len());
    let (nodes, components) = component_indices(&studies[..len], &treatments[..len]);
    components
        .into_iter()
        .map(|c| c.into_iter().map(|i| nodes[i].clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_treatment_joins_studies() {
        let comps = connected_components(&[101, 101, 102, 102], &["A", "B", "C", "B"]);
        assert_eq!(comps, vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_empty_input() {
        let comps = connected_components::<i32, &str>(&[], &[]);
        assert!(comps.is_empty());
    }

    #[test]
    fn test_disconnected() {
        let comps = connected_components(&[1, 1, 2, 2, 3, 3], &["A", "B", "C", "D", "B", "E"]);
        assert_eq!(comps, vec![vec!["A", "B", "E"], vec!["C", "D"]]);
    }

    #[test]
    fn test_single_arm_study_is_isolated_node() {
        let comps = connected_components(&[1, 1, 2], &["A", "B", "Z"]);
        assert_eq!(comps, vec![vec!["A", "B"], vec!["Z"]]);
    }

    #[test]
    fn test_duplicate_edges_idempotent() {
        let once = connected_components(&[1, 1], &["A", "B"]);
        let twice = connected_components(&[1, 1, 2, 2, 1, 1], &["A", "B", "A", "B", "A", "B"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_multi_arm_clique_and_chain() {
        // A-B-C via a 3-arm study, then C-D, D-E: one component.
        let studies = ["s1", "s1", "s1", "s2", "s2", "s3", "s3"];
        let treatments = [3, 1, 2, 2, 4, 5, 4];
        let comps = connected_components(&studies, &treatments);
        assert_eq!(comps, vec![vec![3, 1, 2, 4, 5]]);
    }

    #[test]
    fn test_component_indices_order() {
        let (nodes, comps) = component_indices(&[1, 1, 2, 2], &["X", "Y", "Z", "W"]);
        assert_eq!(nodes, vec!["X", "Y", "Z", "W"]);
        assert_eq!(comps, vec![vec![0, 1], vec![2, 3]]);
    }
}
