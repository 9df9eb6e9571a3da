//! ## Register array
//! Fixed array of `M` one byte registers allocated once when estimator is created.
//! Register `idx` stores the maximum rank observed for hashes with index `idx`.
//! Registers only grow: both `update` and `merge` keep the maximum of old and new ranks.

use std::mem::{size_of, size_of_val};

/// Register array container
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Registers(Box<[u8]>);

impl Registers {
    /// Create `m` registers set to 0
    #[inline]
    pub(crate) fn new(m: usize) -> Self {
        Self(vec![0u8; m].into_boxed_slice())
    }

    /// Create registers from previously captured values
    #[inline]
    pub(crate) fn from_vec(registers: Vec<u8>) -> Self {
        Self(registers.into_boxed_slice())
    }

    /// Raise register `idx` to `rank` if it holds a lower rank
    #[inline]
    pub(crate) fn update(&mut self, idx: usize, rank: u8) {
        let register = &mut self.0[idx];
        if rank > *register {
            *register = rank;
        }
    }

    /// Merge `rhs` registers by taking register-wise maximum
    #[inline]
    pub(crate) fn merge(&mut self, rhs: &Registers) {
        for (lhs, &rhs) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs = (*lhs).max(rhs);
        }
    }

    /// Return number of zero registers and harmonic sum `sum(2^-rank)` of all registers
    #[inline]
    pub(crate) fn zeros_and_sum(&self) -> (usize, f64) {
        self.0.iter().fold((0, 0.0), |(zeros, sum), &rank| {
            (
                zeros + usize::from(rank == 0),
                sum + 1.0 / ((1u64 << rank) as f64),
            )
        })
    }

    /// Number of registers
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Return memory size of `Registers`
    #[inline]
    pub(crate) fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(&*self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_maximum() {
        let mut registers = Registers::new(16);
        registers.update(3, 5);
        registers.update(3, 2);
        assert_eq!(registers.as_slice()[3], 5);
        registers.update(3, 7);
        assert_eq!(registers.as_slice()[3], 7);
        assert!(registers
            .as_slice()
            .iter()
            .enumerate()
            .all(|(i, &r)| i == 3 || r == 0));
    }

    #[test]
    fn test_merge() {
        let mut lhs = Registers::from_vec(vec![0, 3, 5, 1]);
        let rhs = Registers::from_vec(vec![2, 1, 5, 0]);
        lhs.merge(&rhs);
        assert_eq!(lhs.as_slice(), &[2, 3, 5, 1]);
    }

    #[test]
    fn test_zeros_and_sum() {
        let registers = Registers::new(8);
        assert_eq!(registers.zeros_and_sum(), (8, 8.0));

        let registers = Registers::from_vec(vec![0, 1, 2, 3]);
        assert_eq!(registers.zeros_and_sum(), (1, 1.0 + 0.5 + 0.25 + 0.125));

        // saturated rank of precision 4
        let registers = Registers::from_vec(vec![61]);
        let (zeros, sum) = registers.zeros_and_sum();
        assert_eq!(zeros, 0);
        assert!(sum > 0.0);
    }

    #[test]
    fn test_size_of() {
        assert_eq!(Registers::new(4096).size_of(), 16 + 4096);
    }
}
