//! Euclidean rhythms
//!
//! Distributes `pulses` onsets as evenly as possible over `length` steps:
//! - E(3,8) -> x..x..x.
//! - E(5,8) -> x.x.xx.x

/// Onset flags for a euclidean rhythm, rotated right by `rotate`
///
/// Step `t` carries an onset when the running remainder
/// `(pulses * t) mod length` drops at the next step. Asking for at least as
/// many pulses as steps fills every step.
pub fn euclidean_rhythm(pulses: usize, length: usize, rotate: i32) -> Vec<bool> {
    if length == 0 {
        return Vec::new();
    }
    if pulses >= length {
        return vec![true; length];
    }

    let len = length as i64;
    let remainders: Vec<i64> = (-1..len - 1)
        .map(|t| (pulses as i64 * t).rem_euclid(len))
        .collect();

    let mut onsets: Vec<bool> = (0..length)
        .map(|i| remainders[i] > remainders[(i + 1) % length])
        .collect();

    let shift = (rotate as i64).rem_euclid(len) as usize;
    onsets.rotate_right(shift);
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onset_positions(onsets: &[bool]) -> Vec<usize> {
        onsets
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_tresillo() {
        assert_eq!(
            euclidean_rhythm(3, 8, 0),
            vec![true, false, false, true, false, false, true, false]
        );
    }

    #[test]
    fn test_five_of_eight() {
        assert_eq!(onset_positions(&euclidean_rhythm(5, 8, 0)), vec![0, 2, 4, 5, 7]);
    }

    #[test]
    fn test_rotation_shifts_right() {
        assert_eq!(onset_positions(&euclidean_rhythm(3, 8, 1)), vec![1, 4, 7]);
        assert_eq!(onset_positions(&euclidean_rhythm(3, 8, -1)), vec![2, 5, 7]);
        assert_eq!(euclidean_rhythm(3, 8, 8), euclidean_rhythm(3, 8, 0));
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(euclidean_rhythm(3, 0, 0).is_empty());
        assert_eq!(euclidean_rhythm(9, 4, 2), vec![true; 4]);
        assert_eq!(euclidean_rhythm(0, 4, 0), vec![false; 4]);
    }

    #[test]
    fn test_pulse_count_is_preserved() {
        for length in 1..16 {
            for pulses in 0..=length {
                let onsets = euclidean_rhythm(pulses, length, 3);
                assert_eq!(onsets.iter().filter(|on| **on).count(), pulses);
            }
        }
    }
}
