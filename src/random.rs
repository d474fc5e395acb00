//! Random draws with replay
//!
//! A `[: ... :]` repeat must play back the same random values on every
//! pass. The source keeps a stack of tapes: while a tape records, every draw
//! is appended to it; once rewound, draws come from the tape in order, and
//! only fall through to the generator (and the enclosing tapes) when the
//! tape runs out.

use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Default)]
struct Tape {
    draws: Vec<u64>,
    position: usize,
    replaying: bool,
}

#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
    tapes: Vec<Tape>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tapes: Vec::new(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            tapes: Vec::new(),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform integer in `min..=max` (bounds in either order)
    pub fn integer(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = (hi as i64 - lo as i64 + 1) as u64;
        let raw = self.draw(self.tapes.len());
        (lo as i64 + (raw % span) as i64) as i32
    }

    /// Uniform index in `0..len`
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.draw(self.tapes.len()) % len as u64) as usize
    }

    /// Start recording a new tape
    pub fn record(&mut self) {
        self.tapes.push(Tape::default());
    }

    /// Play the innermost tape back from the start
    pub fn rewind(&mut self) {
        if let Some(tape) = self.tapes.last_mut() {
            tape.replaying = true;
            tape.position = 0;
        }
    }

    /// Drop the innermost tape
    pub fn finish(&mut self) {
        self.tapes.pop();
    }

    fn draw(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return self.rng.gen();
        }

        let level = depth - 1;
        let tape = &mut self.tapes[level];
        if tape.replaying && tape.position < tape.draws.len() {
            let value = tape.draws[tape.position];
            tape.position += 1;
            return value;
        }

        let value = self.draw(level);
        let tape = &mut self.tapes[level];
        tape.draws.push(value);
        if tape.replaying {
            tape.position += 1;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_in_bounds() {
        let mut random = RandomSource::seeded(1);
        for _ in 0..200 {
            let v = random.integer(3, -2);
            assert!((-2..=3).contains(&v));
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = RandomSource::seeded(42);
        let mut b = RandomSource::seeded(42);
        let xs: Vec<i32> = (0..10).map(|_| a.integer(0, 100)).collect();
        let ys: Vec<i32> = (0..10).map(|_| b.integer(0, 100)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_replay_repeats_draws() {
        let mut random = RandomSource::seeded(7);
        random.record();
        let first: Vec<i32> = (0..5).map(|_| random.integer(0, 1000)).collect();
        random.rewind();
        let second: Vec<i32> = (0..5).map(|_| random.integer(0, 1000)).collect();
        random.finish();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_tapes_stay_aligned() {
        let mut random = RandomSource::seeded(9);
        let pass = |random: &mut RandomSource| {
            let mut values = vec![random.integer(0, 1000)];
            random.record();
            values.push(random.integer(0, 1000));
            random.rewind();
            values.push(random.integer(0, 1000));
            random.finish();
            values.push(random.integer(0, 1000));
            values
        };

        random.record();
        let first = pass(&mut random);
        random.rewind();
        let second = pass(&mut random);
        random.finish();

        assert_eq!(first, second);
        assert_eq!(first[1], first[2]);
    }
}
