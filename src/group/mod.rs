//! Permutation groups given by generators, answered through a stabilizer chain.
use crate::error::{Error, Result};
use crate::group::chain::StabilizerChain;
use crate::perm::Perm;
use itertools::Itertools;
use num_bigint::BigUint;
use num_traits::One;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use tracing::debug;

pub mod chain;

/// Permutation group of a given degree. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct PermutationGroup {
    degree: usize,
    generators: Vec<Perm>,
    chain: StabilizerChain,
}

impl PermutationGroup {
    /// Group generated by the given permutations, which must all have the given degree.
    pub fn new(degree: usize, generators: Vec<Perm>) -> Result<Self> {
        for g in &generators {
            Error::check_degree(degree, g.degree())?;
        }
        let chain = StabilizerChain::new(degree, &generators, &[]);
        debug!(degree, generators = generators.len(), order = %chain.order(), "Permutation group");
        Ok(Self { degree, generators, chain })
    }

    pub fn trivial(degree: usize) -> Self {
        Self { degree, generators: vec![], chain: StabilizerChain::new(degree, &[], &[]) }
    }

    /// Full symmetric group, generated by a transposition and a `degree`-cycle.
    pub fn symmetric(degree: usize) -> Self {
        let chain = StabilizerChain::symmetric(degree);
        let generators = chain.strong_generators().to_vec();
        Self { degree, generators, chain }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Generators as given on construction.
    pub fn generators(&self) -> &[Perm] {
        &self.generators
    }

    pub fn chain(&self) -> &StabilizerChain {
        &self.chain
    }

    pub fn order(&self) -> BigUint {
        self.chain.order()
    }

    /// Membership by sifting. False for permutations of a different degree.
    pub fn contains(&self, p: &Perm) -> bool {
        self.chain.contains(p)
    }

    pub fn is_trivial(&self) -> bool {
        self.chain.levels.is_empty()
    }

    pub fn is_symmetric(&self) -> bool {
        self.order() == factorial(self.degree)
    }

    pub fn is_alternating(&self) -> bool {
        self.degree >= 2 && self.order() == factorial(self.degree) / 2u32
    }

    /// All group elements, backtracking over the transversals of each level.
    /// Only practical for small groups.
    pub fn elements(&self) -> Elements<'_> {
        Elements { chain: &self.chain, indices: Some(vec![0; self.chain.levels.len()]) }
    }

    /// Uniformly random group element.
    pub fn random_element(&self, seed: u64) -> Perm {
        let rng = &mut Pcg64Mcg::seed_from_u64(seed);
        let points = self.chain.levels.iter().map(|l| l.orbit[rng.gen_range(0..l.orbit_len())]).collect_vec();
        self.chain.element(&points).expect("points are taken from the orbits")
    }

    /// Sorted orbit of a single point.
    pub fn orbit_of(&self, point: usize) -> Result<Vec<usize>> {
        Error::check_index(point, self.degree)?;
        Ok(chain::Level::new(self.degree, point, self.generators.clone()).orbit.into_iter().sorted_unstable().collect())
    }

    /// Stabilizer chain whose base starts with the given points.
    /// Fails if a point is outside of the domain.
    pub fn chain_with_base_prefix(&self, prefix: &[usize]) -> Result<Cow<'_, StabilizerChain>> {
        let prefix: Vec<usize> = prefix.iter().map(|&b| Error::check_index(b, self.degree)).try_collect()?;
        let prefix = prefix.into_iter().unique().collect_vec();
        if self.chain.base().starts_with(&prefix) {
            return Ok(Cow::Borrowed(&self.chain));
        }
        Ok(Cow::Owned(StabilizerChain::new(self.degree, self.chain.strong_generators(), &prefix)))
    }

    /// Contiguous range of points on which the group acts as the full symmetric group while
    /// fixing every other point, if there is one.
    pub fn symmetric_range(&self) -> Option<Range<usize>> {
        let moved = self.generators.iter().flat_map(|g| g.moved_points()).sorted_unstable().dedup().collect_vec();
        let (&first, &last) = (moved.first()?, moved.last()?);
        (moved.len() == last - first + 1 && self.order() == factorial(moved.len())).then_some(first..last + 1)
    }

    /// The same group acting on a larger domain, fixing all new points.
    pub fn extended(&self, degree: usize) -> Result<Self> {
        let generators: Vec<Perm> = self.generators.iter().map(|g| g.extended(degree)).try_collect()?;
        Self::new(degree, generators)
    }

    /// Direct product acting on the disjoint union of the groups' domains, in the given order.
    pub fn direct_product(groups: &[PermutationGroup]) -> Self {
        let degree = groups.iter().map(|g| g.degree).sum();
        let mut offset = 0;
        let mut generators = vec![];
        for group in groups {
            for g in &group.generators {
                generators.push(Self::shift(g, offset, degree));
            }
            offset += group.degree;
        }
        Self::from_valid(degree, generators)
    }

    /// Wreath product acting on `super_group.degree()` blocks of `proto.degree()` points each,
    /// where point `block * proto.degree() + local` is `local` in block `block`. Proto generators
    /// act on each block separately, super generators permute whole blocks.
    pub fn wreath_product(proto: &PermutationGroup, super_group: &PermutationGroup) -> Self {
        let block_len = proto.degree;
        let degree = super_group.degree * block_len;
        let mut generators = vec![];
        for g in &proto.generators {
            for block in 0..super_group.degree {
                generators.push(Self::shift(g, block * block_len, degree));
            }
        }
        for g in &super_group.generators {
            generators.push(Perm::from_images_unchecked((0..degree).map(|i|
                (g * (i / block_len)) * block_len + i % block_len).collect()));
        }
        Self::from_valid(degree, generators)
    }

    fn shift(g: &Perm, offset: usize, degree: usize) -> Perm {
        g.shifted(offset, degree).expect("group fits into the product domain")
    }

    pub(crate) fn from_valid(degree: usize, generators: Vec<Perm>) -> Self {
        debug_assert!(generators.iter().all(|g| g.degree() == degree));
        let chain = StabilizerChain::new(degree, &generators, &[]);
        Self { degree, generators, chain }
    }
}

/// Groups are equal if they have the same degree and the same elements.
impl PartialEq for PermutationGroup {
    fn eq(&self, other: &Self) -> bool {
        self.degree == other.degree && self.order() == other.order() &&
            other.generators.iter().all(|g| self.contains(g))
    }
}

impl Eq for PermutationGroup {}

impl Display for PermutationGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "degree {}, order {}: [{}]", self.degree, self.order(), self.generators.iter().join(", "))
    }
}

/// Lazy, restartable enumeration of all group elements.
pub struct Elements<'a> {
    chain: &'a StabilizerChain,
    indices: Option<Vec<usize>>,
}

impl Iterator for Elements<'_> {
    type Item = Perm;

    fn next(&mut self) -> Option<Perm> {
        let mut indices = self.indices.take()?;
        let points = self.chain.levels.iter().zip(&indices).map(|(l, &i)| l.orbit[i]).collect_vec();
        let out = self.chain.element(&points);

        for level in (0..indices.len()).rev() {
            indices[level] += 1;
            if indices[level] < self.chain.levels[level].orbit_len() {
                self.indices = Some(indices);
                break;
            }
            indices[level] = 0;
        }
        out
    }
}

pub fn factorial(n: usize) -> BigUint {
    (1..=n).fold(BigUint::one(), |acc, i| acc * BigUint::from(i))
}
