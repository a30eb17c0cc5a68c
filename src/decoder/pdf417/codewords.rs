//! Bar-space patterns of the PDF417 codeword clusters
//!
//! Every codeword is four bars and four spaces over 17 modules, no element
//! wider than six. The cluster of a pattern is (b1 - b2 + b3 - b4 + 9) mod 9
//! over its bar widths; rows cycle through clusters 0, 3 and 6, so a reader
//! can tell which row a codeword belongs to from its shape alone. The table
//! is built once on first use, listing for each cluster the patterns in
//! ascending order of their widths.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Modules per codeword
pub const CODEWORD_MODULES: usize = 17;

/// Distinct codeword values
pub const CODEWORD_VALUES: usize = 929;

/// Bar and space widths of one codeword, bar first
pub type Widths = [u8; 8];

const MAX_ELEMENT: u8 = 6;

#[derive(Debug)]
struct CodewordTable {
    patterns: [Vec<Widths>; 3],
    values: HashMap<u32, (usize, u16)>,
}

impl CodewordTable {
    fn generate() -> Self {
        let mut patterns: [Vec<Widths>; 3] = Default::default();
        let mut widths = [0u8; 8];
        enumerate(&mut widths, 0, CODEWORD_MODULES as u8, &mut |w| {
            let bars = w[0] as i32 - w[2] as i32 + w[4] as i32 - w[6] as i32;
            let cluster = (bars + 9).rem_euclid(9);
            if cluster % 3 != 0 {
                return;
            }
            let list = &mut patterns[(cluster / 3) as usize];
            if list.len() < CODEWORD_VALUES {
                list.push(*w);
            }
        });

        let mut values = HashMap::with_capacity(3 * CODEWORD_VALUES);
        for (cluster, list) in patterns.iter().enumerate() {
            for (value, w) in list.iter().enumerate() {
                values.insert(pack(w), (cluster, value as u16));
            }
        }
        Self { patterns, values }
    }
}

/// Visit every split of `left` modules over `widths[k..]` in ascending order
fn enumerate(widths: &mut Widths, k: usize, left: u8, visit: &mut impl FnMut(&Widths)) {
    if k == widths.len() {
        if left == 0 {
            visit(widths);
        }
        return;
    }
    let rest = (widths.len() - k - 1) as u8;
    for w in 1..=MAX_ELEMENT {
        if w + rest > left {
            break;
        }
        if left - w > rest * MAX_ELEMENT {
            continue;
        }
        widths[k] = w;
        enumerate(widths, k + 1, left - w, visit);
    }
}

fn pack(widths: &Widths) -> u32 {
    widths.iter().fold(0, |acc, &w| (acc << 3) | w as u32)
}

fn table() -> &'static CodewordTable {
    static TABLE: OnceLock<CodewordTable> = OnceLock::new();
    TABLE.get_or_init(CodewordTable::generate)
}

/// Widths of `value` in cluster index `cluster` (0, 1 or 2 for clusters 0, 3, 6)
pub fn pattern(cluster: usize, value: u16) -> Widths {
    table().patterns[cluster % 3][value as usize % CODEWORD_VALUES]
}

/// Cluster index and value of a codeword, `None` if no codeword has these widths
pub fn lookup(widths: &Widths) -> Option<(usize, u16)> {
    table().values.get(&pack(widths)).copied()
}

/// Module pattern of a codeword, dark first
pub fn modules(widths: &Widths) -> impl Iterator<Item = bool> + '_ {
    widths
        .iter()
        .enumerate()
        .flat_map(|(i, &w)| std::iter::repeat_n(i % 2 == 0, w as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_cluster_is_complete() {
        let table = table();
        for (cluster, list) in table.patterns.iter().enumerate() {
            assert_eq!(list.len(), CODEWORD_VALUES);
            for w in list {
                assert_eq!(w.iter().map(|&w| w as usize).sum::<usize>(), CODEWORD_MODULES);
                assert!(w.iter().all(|&w| (1..=MAX_ELEMENT).contains(&w)));
                assert_eq!(lookup(w).map(|(c, _)| c), Some(cluster));
            }
        }
        assert_eq!(table.values.len(), 3 * CODEWORD_VALUES);
    }

    #[test]
    fn test_patterns_are_ordered() {
        let list = &table().patterns[0];
        assert_eq!(list[0], [1, 1, 1, 1, 1, 5, 1, 6]);
        assert!(list.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_lookup_inverts_pattern() {
        for cluster in 0..3 {
            for value in [0u16, 1, 450, 900, 928] {
                assert_eq!(lookup(&pattern(cluster, value)), Some((cluster, value)));
            }
        }
        assert_eq!(lookup(&[8, 1, 1, 1, 1, 1, 1, 3]), None);
    }

    #[test]
    fn test_modules_start_with_a_bar() {
        let modules: Vec<bool> = modules(&pattern(1, 12)).collect();
        assert_eq!(modules.len(), CODEWORD_MODULES);
        assert!(modules[0]);
        assert!(!modules[CODEWORD_MODULES - 1]);
    }
}
