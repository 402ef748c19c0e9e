use log::trace;
use prodmatch_core::{Descriptor, DescriptorMatch};
use rayon::prelude::*;

/// Number of differing bits between two descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Exhaustive nearest-neighbour search in Hamming space.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher {
    /// Keep a match only when each side is the other's nearest neighbour
    pub cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(cross_check: bool) -> Self {
        Self { cross_check }
    }

    /// Best train descriptor for every query descriptor, sorted by ascending
    /// distance then query index.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let forward = nearest_neighbours(query, train);
        let backward = if self.cross_check {
            Some(nearest_neighbours(train, query))
        } else {
            None
        };

        let mut matches: Vec<DescriptorMatch> = forward
            .into_iter()
            .enumerate()
            .filter(|&(q, (t, _))| backward.as_ref().is_none_or(|back| back[t].0 == q))
            .map(|(q, (t, distance))| DescriptorMatch {
                query_idx: q,
                train_idx: t,
                distance,
            })
            .collect();

        matches.sort_by_key(|m| (m.distance, m.query_idx));
        trace!(
            "matched {} of {} queries against {} (cross-check {})",
            matches.len(),
            query.len(),
            train.len(),
            self.cross_check
        );
        matches
    }
}

/// `(index, distance)` of the closest `to` descriptor for each `from`
/// descriptor; the lowest index wins ties.
fn nearest_neighbours(from: &[Descriptor], to: &[Descriptor]) -> Vec<(usize, u32)> {
    from.par_iter()
        .map(|d| {
            let mut best = (0usize, u32::MAX);
            for (i, candidate) in to.iter().enumerate() {
                let dist = hamming_distance(d, candidate);
                if dist < best.1 {
                    best = (i, dist);
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desc(byte: u8) -> Descriptor {
        [byte; 32]
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(&desc(0), &desc(0)), 0);
        assert_eq!(hamming_distance(&desc(0), &desc(0xFF)), 256);
        assert_eq!(hamming_distance(&desc(0b0000_0001), &desc(0)), 32);
    }

    #[test]
    fn test_empty_inputs() {
        let m = BruteForceMatcher::new(true);
        assert!(m.match_descriptors(&[], &[desc(1)]).is_empty());
        assert!(m.match_descriptors(&[desc(1)], &[]).is_empty());
    }

    #[test]
    fn test_matches_sorted_by_distance() {
        let query = vec![desc(0b0000_0111), desc(0xF0), desc(0x00)];
        let train = vec![desc(0x00), desc(0xF0)];
        let matches = BruteForceMatcher::new(false).match_descriptors(&query, &train);
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches.iter().map(|m| (m.query_idx, m.train_idx, m.distance)).collect::<Vec<_>>(),
            vec![(1, 1, 0), (2, 0, 0), (0, 0, 96)]
        );
    }

    #[test]
    fn test_cross_check_drops_one_sided_matches() {
        // Both queries prefer train 0, but train 0 prefers query 1
        let query = vec![desc(0b0000_0011), desc(0b0000_0001)];
        let train = vec![desc(0b0000_0001), desc(0xFF)];

        let one_way = BruteForceMatcher::new(false).match_descriptors(&query, &train);
        assert_eq!(one_way.len(), 2);

        let mutual = BruteForceMatcher::new(true).match_descriptors(&query, &train);
        assert_eq!(mutual.len(), 1);
        assert_eq!((mutual[0].query_idx, mutual[0].train_idx, mutual[0].distance), (1, 0, 0));
    }

    proptest! {
        #[test]
        fn prop_self_match_is_exact(bytes in proptest::collection::vec(any::<u8>(), 1..20)) {
            let set: Vec<Descriptor> = bytes.iter().map(|&b| desc(b)).collect();
            let matches = BruteForceMatcher::new(false).match_descriptors(&set, &set);
            prop_assert_eq!(matches.len(), set.len());
            for m in &matches {
                prop_assert_eq!(m.distance, 0);
            }
            for pair in matches.windows(2) {
                prop_assert!(pair[0].query_idx < pair[1].query_idx);
            }
        }
    }
}
