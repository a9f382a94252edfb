use std::time::Instant;

use crate::models::{Cost, SquareMatrix};

/// Symmetric-ish TSP refinement used to polish a single route: greedy seed
/// then 2-opt and or-opt passes until no improvement or the deadline hits.
/// `start` and `end` are fixed endpoints (matrix indices); the returned
/// order covers every other node.
pub fn tsp_solve(
    matrix: &SquareMatrix<Cost>,
    start: Option<usize>,
    end: Option<usize>,
    deadline: Option<Instant>,
) -> Vec<usize> {
    let n = matrix.size();
    let fixed: Vec<usize> = start.iter().chain(end.iter()).copied().collect();
    let mut nodes: Vec<usize> = (0..n).filter(|i| !fixed.contains(i)).collect();

    if nodes.len() < 2 {
        return nodes;
    }

    // Greedy nearest-neighbour seed.
    let mut path = Vec::with_capacity(nodes.len());
    let mut current = match start {
        Some(s) => s,
        None => nodes[0],
    };
    if start.is_none() {
        path.push(nodes.remove(0));
    }
    while !nodes.is_empty() {
        let (pos, _) = nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, &node)| matrix.get(current, node))
            .unwrap();
        let node = nodes.remove(pos);
        path.push(node);
        current = node;
    }

    let edge = |from: Option<usize>, to: Option<usize>| -> Cost {
        match (from, to) {
            (Some(f), Some(t)) => matrix.get(f, t),
            _ => 0,
        }
    };
    let at = |path: &[usize], i: isize| -> Option<usize> {
        if i < 0 {
            start
        } else if i as usize >= path.len() {
            end
        } else {
            Some(path[i as usize])
        }
    };

    let expired = || deadline.is_some_and(|d| Instant::now() >= d);

    // Alternate 2-opt segment reversals and or-opt relocations of short
    // chains until a full sweep yields nothing.
    let mut improved = true;
    while improved && !expired() {
        improved = false;

        // 2-opt step.
        'two_opt: for i in 0..path.len() - 1 {
            for j in i + 1..path.len() {
                let before = edge(at(&path, i as isize - 1), at(&path, i as isize))
                    + edge(at(&path, j as isize), at(&path, j as isize + 1));
                let after = edge(at(&path, i as isize - 1), at(&path, j as isize))
                    + edge(at(&path, i as isize), at(&path, j as isize + 1));
                if after < before {
                    path[i..=j].reverse();
                    improved = true;
                    break 'two_opt;
                }
            }
        }

        if expired() {
            break;
        }

        // Or-opt step: move chains of length 1 to 3.
        'or_opt: for len in 1..=3usize.min(path.len() - 1) {
            for i in 0..=path.len() - len {
                let removal = edge(at(&path, i as isize - 1), at(&path, i as isize))
                    + edge(at(&path, (i + len) as isize - 1), at(&path, (i + len) as isize))
                    - edge(at(&path, i as isize - 1), at(&path, (i + len) as isize));

                for j in 0..=path.len() - len {
                    if j == i {
                        continue;
                    }
                    // Insertion point in the path without the chain.
                    let mut rest: Vec<usize> = Vec::with_capacity(path.len());
                    rest.extend_from_slice(&path[..i]);
                    rest.extend_from_slice(&path[i + len..]);

                    let prev = if j == 0 { start } else { Some(rest[j - 1]) };
                    let next = if j == rest.len() { end } else { Some(rest[j]) };
                    let insertion = edge(prev, Some(path[i]))
                        + edge(Some(path[i + len - 1]), next)
                        - edge(prev, next);

                    if insertion < removal {
                        let chain: Vec<usize> = path[i..i + len].to_vec();
                        rest.splice(j..j, chain);
                        path = rest;
                        improved = true;
                        break 'or_opt;
                    }
                }
            }
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_a_line_of_points() {
        // Points on a line at 0, 10, 20, 30; start fixed at node 0.
        let m = SquareMatrix::from_rows(vec![
            vec![0, 10, 20, 30],
            vec![10, 0, 10, 20],
            vec![20, 10, 0, 10],
            vec![30, 20, 10, 0],
        ])
        .unwrap();

        let order = tsp_solve(&m, Some(0), None, None);
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn fixed_endpoints_are_excluded_from_the_order() {
        let m = SquareMatrix::from_rows(vec![
            vec![0, 5, 9],
            vec![5, 0, 4],
            vec![9, 4, 0],
        ])
        .unwrap();

        let order = tsp_solve(&m, Some(0), Some(2), None);
        assert_eq!(order, vec![1]);
    }
}
