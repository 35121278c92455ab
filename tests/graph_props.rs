use dirty_dag::prelude::*;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn ancestors(g: &DepGraph<u32, i64>, id: u32) -> HashSet<u32> {
    let mut seen = HashSet::new();
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        for parent in g.parents(next).unwrap() {
            if seen.insert(parent) {
                stack.push(parent);
            }
        }
    }
    seen
}

/// Layered random DAG: every node of layer `n > 0` draws one mandatory
/// producer and a coin-flip of extras from the layers above it, so the
/// result is acyclic by construction.
fn random_dag(
    rng: &mut SmallRng,
    layers: usize,
    width: usize,
    extra_edge_prob: f64,
) -> DepGraph<u32, i64> {
    let mut g = DepGraph::new();
    let mut earlier: Vec<u32> = Vec::new();
    let mut next_id = 1u32;
    for layer in 0..layers {
        let mut current = Vec::new();
        for _ in 0..width {
            let id = next_id;
            next_id += 1;
            g.add_node(id);
            if layer > 0 {
                let parent = earlier[rng.gen_range(0..earlier.len())];
                g.add_dependency(id, parent);
                for &candidate in &earlier {
                    if candidate != parent && rng.gen_range(0.0..1.0) < extra_edge_prob {
                        g.add_dependency(id, candidate);
                    }
                }
            }
            current.push(id);
        }
        earlier.extend(current);
    }
    g
}

fn param_seed(layers: usize, width: usize, extra_edge_prob: f64) -> u64 {
    let mut h = DefaultHasher::new();
    layers.hash(&mut h);
    width.hash(&mut h);
    extra_edge_prob.to_bits().hash(&mut h);
    h.finish()
}

proptest! {
    #[test]
    fn prop_orders_hold_their_contract(
        layers in 2usize..6,
        width in 1usize..5,
        extra_edge_prob in 0.0f64..0.8f64,
    ) {
        // Seed the RNG from the parameters so every case is reproducible
        let mut rng = SmallRng::seed_from_u64(param_seed(layers, width, extra_edge_prob));
        let g = random_dag(&mut rng, layers, width, extra_edge_prob);
        prop_assert!(g.validate_invariants().is_ok());
        for target in g.node_ids().collect::<Vec<_>>() {
            let order = g.evaluation_graph(target).unwrap().to_vec();
            let unique: HashSet<u32> = order.iter().copied().collect();
            prop_assert_eq!(unique.len(), order.len(), "duplicates for {}", target);
            prop_assert_eq!(*order.last().unwrap(), target);
            for (i, &a) in order.iter().enumerate() {
                for &b in &order[i + 1..] {
                    prop_assert!(
                        !ancestors(&g, a).contains(&b),
                        "{} feeds {} but is ordered after it", b, a
                    );
                }
            }
        }
    }

    #[test]
    fn prop_add_dependency_verdict_matches_reachability(
        layers in 2usize..6,
        width in 1usize..5,
        extra_edge_prob in 0.0f64..0.8f64,
        child_pick in 0usize..256,
        parent_pick in 0usize..256,
    ) {
        let mut rng = SmallRng::seed_from_u64(param_seed(layers, width, extra_edge_prob));
        let mut g = random_dag(&mut rng, layers, width, extra_edge_prob);
        let mut ids: Vec<u32> = g.node_ids().collect();
        ids.sort_unstable();
        let child = ids[child_pick % ids.len()];
        let parent = ids[parent_pick % ids.len()];
        // Refused iff the edge is a self loop, already present, or would
        // close a cycle (the child already feeds the proposed parent)
        let expected = child != parent
            && !g.has_dependency(child, parent)
            && !ancestors(&g, parent).contains(&child);
        let verdict = g.add_dependency(child, parent);
        prop_assert_eq!(verdict, expected, "add_dependency({}, {})", child, parent);
        if verdict {
            prop_assert!(g.has_dependency(child, parent));
        }
        prop_assert!(!ancestors(&g, child).contains(&child), "cycle through {}", child);
        prop_assert!(g.validate_invariants().is_ok());
    }

    #[test]
    fn prop_clean_settles_then_refires_exactly_the_dirty_cone(
        layers in 2usize..6,
        width in 1usize..5,
        extra_edge_prob in 0.0f64..0.8f64,
    ) {
        let mut rng = SmallRng::seed_from_u64(param_seed(layers, width, extra_edge_prob));
        let mut g = random_dag(&mut rng, layers, width, extra_edge_prob);
        let targets: Vec<u32> = g.node_ids().collect();
        let sum = |_: u32, out: &mut i64, parents: &[ParentView<u32, i64>]| {
            *out = parents.iter().map(|p| p.payload).sum::<i64>() + 1;
        };
        for &t in &targets {
            g.clean(t, sum).unwrap();
        }
        for &t in &targets {
            let mut fired = 0u32;
            g.clean(t, |_, _, _| fired += 1).unwrap();
            prop_assert_eq!(fired, 0, "settled target {} re-fired", t);
            prop_assert!(!g.is_dirty(t).unwrap());
        }
        // Dirty one root: exactly the nodes above it notice
        let root = 1u32; // first id of layer 0 is always a root
        g.make_dirty(root).unwrap();
        for &t in &targets {
            prop_assert_eq!(g.is_dirty(t).unwrap(), ancestors(&g, t).contains(&root));
        }
        if let Some(&t) = targets.iter().find(|&&t| ancestors(&g, t).contains(&root)) {
            let mut fired = Vec::new();
            g.clean(t, |e, _, _| fired.push(e)).unwrap();
            let fired: HashSet<u32> = fired.iter().copied().collect();
            let expected: HashSet<u32> = g
                .evaluation_graph(t)
                .unwrap()
                .iter()
                .copied()
                .filter(|&n| ancestors(&g, n).contains(&root))
                .collect();
            prop_assert_eq!(fired, expected);
        }
    }
}

#[cfg(feature = "parallel")]
mod parallel_props {
    use super::*;

    proptest! {
        #[test]
        fn prop_parallel_engines_match_sequential(
            layers in 2usize..6,
            width in 1usize..5,
            extra_edge_prob in 0.0f64..0.8f64,
        ) {
            let mut rng = SmallRng::seed_from_u64(param_seed(layers, width, extra_edge_prob));
            let mut seq = random_dag(&mut rng, layers, width, extra_edge_prob);
            let mut par = seq.clone();
            let sum = |_: u32, out: &mut i64, parents: &[ParentView<u32, i64>]| {
                *out = parents.iter().map(|p| p.payload).sum::<i64>() + 1;
            };
            let targets: Vec<u32> = seq.node_ids().collect();
            for &t in &targets {
                seq.clean(t, sum).unwrap();
                par.clean_mt(t, sum).unwrap();
            }
            for &t in &targets {
                prop_assert_eq!(seq.payload(t).unwrap(), par.payload(t).unwrap());
                prop_assert!(!par.is_dirty(t).unwrap());
            }
        }
    }
}
