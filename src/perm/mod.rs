//! Permutations of a finite domain 0..degree.
use crate::error::{Error, Result};
use fxhash::FxBuildHasher;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Mul;

pub(crate) type FBuildHasher = FxBuildHasher;
pub(crate) type FHashMap<K, V> = HashMap<K, V, FBuildHasher>;
pub(crate) type FHashSet<K> = HashSet<K, FBuildHasher>;

/// Permutation of a given degree, densely represented by its images.
///
/// Composition applies left to right: `(p * q)(x) == q(p(x))`.
/// Ordering is lexicographic on the image sequence.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Perm(Vec<usize>);

impl Perm {
    /// Permutation mapping `i` to `images[i]`. Fails if `images` is not a bijection of 0..images.len().
    pub fn new(images: Vec<usize>) -> Result<Self> {
        let degree = images.len();
        let mut seen = vec![false; degree];
        for &x in &images {
            if x < degree {
                seen[x] = true;
            }
        }
        let covered = seen.into_iter().filter(|&s| s).count();
        Error::check_degree(degree, covered)?;
        Ok(Self(images))
    }

    /// Callers guarantee that `images` is a bijection.
    pub(crate) fn from_images_unchecked(images: Vec<usize>) -> Self {
        debug_assert!(images.iter().all(|&x| x < images.len()));
        Self(images)
    }

    pub fn identity(degree: usize) -> Self {
        Self((0..degree).collect())
    }

    /// Permutation from cycle notation. Cycles are applied left to right, so
    /// overlapping cycles compose like `(0 1)(1 2) == (0 1) * (1 2)`.
    pub fn from_cycles(degree: usize, cycles: &[Vec<usize>]) -> Result<Self> {
        let mut out = Self::identity(degree);
        for cycle in cycles {
            let mut images = (0..degree).collect_vec();
            for &x in cycle {
                Error::check_index(x, degree)?;
            }
            if !cycle.iter().all_unique() {
                return Err(Error::DegreeMismatch { expected: cycle.len(), actual: cycle.iter().unique().count() });
            }
            for (&x, &y) in cycle.iter().circular_tuple_windows() {
                images[x] = y;
            }
            out = &out * &Self(images);
        }
        Ok(out)
    }

    pub fn create_swap(degree: usize, i: usize, j: usize) -> Self {
        let mut out = Self::identity(degree);
        out.0.swap(i, j);
        out
    }

    /// Uniformly random permutation (Fisher-Yates).
    pub fn sample(degree: usize, rng: &mut impl Rng) -> Self {
        let mut images = (0..degree).collect_vec();
        images.shuffle(rng);
        Self(images)
    }

    /// Uniformly random permutation sampled with the given seed.
    pub fn random(degree: usize, seed: u64) -> Self {
        Self::sample(degree, &mut Pcg64Mcg::seed_from_u64(seed))
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }

    pub fn apply(&self, x: usize) -> Result<usize> {
        Error::check_index(x, self.degree())?;
        Ok(self.0[x])
    }

    pub fn inverse(&self) -> Self {
        let mut out = vec![0; self.0.len()];
        for (i, &x) in self.0.iter().enumerate() {
            out[x] = i;
        }
        Self(out)
    }

    /// Applies `self` first, then `other`.
    pub fn compose(&self, other: &Perm) -> Result<Self> {
        Error::check_degree(self.degree(), other.degree())?;
        Ok(self * other)
    }

    pub fn is_identity(&self) -> bool {
        self.iter().enumerate().all(|(i, x)| i == x)
    }

    pub fn images(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item=usize> + '_ {
        self.0.iter().cloned()
    }

    pub fn moved_points(&self) -> impl Iterator<Item=usize> + '_ {
        self.iter().enumerate().filter(|(i, x)| i != x).map(|(i, _)| i)
    }

    /// Lowest-index point not fixed by this permutation.
    pub fn first_moved_point(&self) -> Option<usize> {
        self.moved_points().next()
    }

    pub(crate) fn fixes(&self, x: usize) -> bool {
        self.0[x] == x
    }

    /// The same permutation on a larger domain, fixing all new points.
    pub fn extended(&self, degree: usize) -> Result<Self> {
        self.shifted(0, degree)
    }

    /// Embeds the permutation into 0..degree, acting on offset..offset + self.degree().
    pub fn shifted(&self, offset: usize, degree: usize) -> Result<Self> {
        if offset + self.degree() > degree {
            return Err(Error::DegreeMismatch { expected: degree, actual: offset + self.degree() });
        }
        let mut images = (0..degree).collect_vec();
        for (i, x) in self.iter().enumerate() {
            images[offset + i] = offset + x;
        }
        Ok(Self(images))
    }

    /// Disjoint cycles of length at least two, each starting with its smallest element.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.degree()];
        let mut out = vec![];
        for start in 0..self.degree() {
            if visited[start] || self.fixes(start) {
                continue;
            }
            let mut cycle = vec![];
            let mut x = start;
            while !visited[x] {
                visited[x] = true;
                cycle.push(x);
                x = self.0[x];
            }
            out.push(cycle);
        }
        out
    }

    /// Image of a tuple of points under pointwise application. Points must be in the domain.
    pub(crate) fn permuted(&self, points: &[usize]) -> Vec<usize> {
        points.iter().map(|&x| self.0[x]).collect()
    }
}

impl Mul<&Perm> for &Perm {
    type Output = Perm;

    /// Left-to-right composition: `(self * rhs)(x) == rhs(self(x))`.
    fn mul(self, rhs: &Perm) -> Perm {
        assert_eq!(self.degree(), rhs.degree());
        Perm(self.0.iter().map(|&x| rhs.0[x]).collect())
    }
}

impl Mul<Perm> for Perm {
    type Output = Perm;

    fn mul(self, rhs: Perm) -> Perm { &self * &rhs }
}

impl Mul<usize> for &Perm {
    type Output = usize;

    fn mul(self, rhs: usize) -> usize { self.0[rhs] }
}

impl TryFrom<Vec<usize>> for Perm {
    type Error = Error;

    fn try_from(images: Vec<usize>) -> Result<Self> { Self::new(images) }
}

impl Display for Perm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let cycles = self.cycles();
        if cycles.is_empty() {
            return write!(f, "()");
        }
        for cycle in cycles {
            write!(f, "({})", cycle.iter().join(" "))?;
        }
        Ok(())
    }
}
