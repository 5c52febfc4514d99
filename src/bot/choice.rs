//! Random-once choices.
//!
//! Loadout population picks between equally eligible alternatives (which
//! seal, which totem per element) once; the result is cached in the loadout
//! and only re-rolled when the loadout is repopulated.

use super::rng::BotRng;

/// Uniformly pick one element, or `None` for an empty slice.
pub fn choose_one<T: Copy>(options: &[T], rng: &mut BotRng) -> Option<T> {
    if options.is_empty() {
        return None;
    }
    Some(options[rng.random_index(options.len())])
}

/// Pick one of the `Some` options. Absent alternatives are ignored.
pub fn choose_present<T: Copy>(options: &[Option<T>], rng: &mut BotRng) -> Option<T> {
    let present: Vec<T> = options.iter().flatten().copied().collect();
    choose_one(&present, rng)
}

/// Weighted pick; entries with weight zero are never chosen.
pub fn choose_weighted<T: Copy>(options: &[(T, u32)], rng: &mut BotRng) -> Option<T> {
    let total: u32 = options.iter().map(|(_, weight)| *weight).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_index(total as usize) as u32;
    for (value, weight) in options {
        if roll < *weight {
            return Some(*value);
        }
        roll -= weight;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yields_none() {
        let mut rng = BotRng::from_seed(1);
        assert_eq!(choose_one::<u32>(&[], &mut rng), None);
        assert_eq!(choose_present::<u32>(&[None, None], &mut rng), None);
        assert_eq!(choose_weighted::<u32>(&[(1, 0)], &mut rng), None);
    }

    #[test]
    fn test_single_option_always_chosen() {
        let mut rng = BotRng::from_seed(3);
        for _ in 0..10 {
            assert_eq!(choose_one(&[9], &mut rng), Some(9));
            assert_eq!(choose_present(&[None, Some(4)], &mut rng), Some(4));
        }
    }

    #[test]
    fn test_weighted_respects_zero_weight() {
        let mut rng = BotRng::from_seed(11);
        for _ in 0..50 {
            assert_eq!(choose_weighted(&[("imp", 3), ("void", 0)], &mut rng), Some("imp"));
        }
    }

    #[test]
    fn test_choice_covers_all_options() {
        let mut rng = BotRng::from_seed(5);
        let mut seen = [false; 3];
        for _ in 0..100 {
            if let Some(i) = choose_one(&[0usize, 1, 2], &mut rng) {
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
