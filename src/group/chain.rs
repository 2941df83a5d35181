//! Base and strong generating set of a permutation group, built with the Schreier-Sims algorithm.
//! See D. Holt et al.: Handbook of Computational Group Theory, ch. 4.4.

use crate::perm::{FHashMap, Perm};
use itertools::Itertools;
use num_bigint::BigUint;
use num_traits::One;
use tracing::trace;

/// One level of a stabilizer chain: the stabilizer of all preceding base points,
/// acting on the orbit of this level's base point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Level {
    pub base: usize,
    /// Strong generators fixing all preceding base points.
    pub generators: Vec<Perm>,
    /// Orbit of the base point, in breadth-first discovery order starting with the base point.
    pub orbit: Vec<usize>,
    /// Permutation from any orbit element back to the base point.
    pub from: FHashMap<usize, Perm>,
}

impl Level {
    /// Orbit and Schreier transversal of the base point under the given generators.
    /// See K. H. Rosen: Computational Group Theory, p. 79.
    pub fn new(degree: usize, base: usize, generators: Vec<Perm>) -> Self {
        let inverses = generators.iter().map(Perm::inverse).collect_vec();
        let mut orbit = vec![base];
        let mut from = FHashMap::default();
        from.insert(base, Perm::identity(degree));
        let mut i = 0;
        while let Some(&e) = orbit.get(i) {
            for (g, g_inv) in generators.iter().zip(&inverses) {
                let new = g * e;
                if !from.contains_key(&new) {
                    let from_new = g_inv * &from[&e];
                    debug_assert_eq!(&from_new * new, base);
                    from.insert(new, from_new);
                    orbit.push(new);
                }
            }
            i += 1;
        }
        Self { base, generators, orbit, from }
    }

    /// Coset representative mapping the base point to `e`.
    pub fn representative(&self, e: usize) -> Option<Perm> {
        self.from.get(&e).map(Perm::inverse)
    }

    pub fn orbit_len(&self) -> usize {
        self.orbit.len()
    }
}

/// Sequence of levels G = G_0 >= G_1 >= ... >= G_k = 1 where G_{i+1} fixes base points 0..=i.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StabilizerChain {
    pub degree: usize,
    pub levels: Vec<Level>,
}

impl StabilizerChain {
    /// Runs Schreier-Sims on the given generators. The base starts with `base_prefix`
    /// (in this order, duplicates ignored) and is extended by the lowest-index point moved by
    /// any strong generator fixing all previous base points.
    pub fn new(degree: usize, generators: &[Perm], base_prefix: &[usize]) -> Self {
        let generators = generators.iter().filter(|g| !g.is_identity()).unique().cloned().collect_vec();
        let mut base = base_prefix.iter().cloned().unique().collect_vec();
        for g in &generators {
            if base.iter().all(|&b| g.fixes(b)) {
                base.push(g.first_moved_point().expect("non-identity generator"));
            }
        }
        let mut strong = (0..base.len()).map(|i|
            generators.iter().filter(|g| base[..i].iter().all(|&b| g.fixes(b))).cloned().collect_vec()
        ).collect_vec();
        let mut levels = base.iter().zip(&strong).map(|(&b, s)| Level::new(degree, b, s.clone())).collect_vec();

        let mut i = levels.len();
        while i > 0 {
            let level = i - 1;
            match Self::failing_schreier_generator(&levels, level) {
                Some((residue, j)) => {
                    if j == levels.len() {
                        let b = residue.first_moved_point().expect("non-identity residue");
                        base.push(b);
                        strong.push(vec![]);
                        levels.push(Level::new(degree, b, vec![]));
                    }
                    for l in level + 1..=j {
                        strong[l].push(residue.clone());
                        levels[l] = Level::new(degree, base[l], strong[l].clone());
                    }
                    i = j + 1;
                }
                None => i -= 1,
            }
        }

        trace!(degree, base = ?base, orbits = ?levels.iter().map(Level::orbit_len).collect_vec(), "Schreier-Sims");
        Self { degree, levels }
    }

    /// Chain of the full symmetric group, built in closed form with base 0..degree - 1.
    pub fn symmetric(degree: usize) -> Self {
        let levels = (0..degree.saturating_sub(1)).map(|i| {
            let swap = Perm::create_swap(degree, i, i + 1);
            let cycle = Perm::from_images_unchecked((0..degree).map(|x|
                if x < i { x } else if x + 1 == degree { i } else { x + 1 }).collect());
            let generators = if degree - i > 2 { vec![swap, cycle] } else { vec![swap] };
            let orbit = (i..degree).collect_vec();
            let from = orbit.iter().map(|&j| (j, Perm::create_swap(degree, i, j))).collect();
            Level { base: i, generators, orbit, from }
        }).collect();
        Self { degree, levels }
    }

    /// Finds a Schreier generator of the given level that does not sift through the deeper levels.
    /// Returns the sifting residue and the level at which sifting stopped.
    fn failing_schreier_generator(levels: &[Level], level: usize) -> Option<(Perm, usize)> {
        let l = &levels[level];
        for &beta in &l.orbit {
            let u_beta = l.from[&beta].inverse();
            for x in &l.generators {
                let u_beta_x = &u_beta * x;
                let h = &u_beta_x * &l.from[&(x * beta)];
                if h.is_identity() {
                    continue;
                }
                let (residue, j) = Self::sift_from(levels, h, level + 1);
                if j < levels.len() || !residue.is_identity() {
                    return Some((residue, j));
                }
            }
        }
        None
    }

    fn sift_from(levels: &[Level], mut p: Perm, start: usize) -> (Perm, usize) {
        for (i, level) in levels.iter().enumerate().skip(start) {
            let beta = &p * level.base;
            match level.from.get(&beta) {
                Some(from_beta) => p = &p * from_beta,
                None => return (p, i),
            }
        }
        (p, levels.len())
    }

    /// Strips `p` through all levels. Returns the residue and the number of levels passed.
    pub fn sift(&self, p: &Perm) -> (Perm, usize) {
        Self::sift_from(&self.levels, p.clone(), 0)
    }

    pub fn contains(&self, p: &Perm) -> bool {
        if p.degree() != self.degree {
            return false;
        }
        let (residue, passed) = self.sift(p);
        passed == self.levels.len() && residue.is_identity()
    }

    /// Product of the orbit lengths.
    pub fn order(&self) -> BigUint {
        self.levels.iter().fold(BigUint::one(), |acc, l| acc * BigUint::from(l.orbit_len()))
    }

    pub fn base(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.base).collect()
    }

    /// Strong generators of the whole group.
    pub fn strong_generators(&self) -> &[Perm] {
        self.levels.first().map_or(&[][..], |l| l.generators.as_slice())
    }

    /// Group element u_{k-1} * ... * u_1 * u_0 where u_i maps the base point of level i to `points[i]`.
    pub fn element(&self, points: &[usize]) -> Option<Perm> {
        let mut out = Perm::identity(self.degree);
        for (level, &e) in self.levels.iter().zip(points) {
            out = &level.representative(e)? * &out;
        }
        Some(out)
    }
}
