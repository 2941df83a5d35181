//! Task mappings (tuples assigning tasks to processors) up to architecture symmetry.
//!
//! Two mappings are equivalent if some automorphism maps one onto the other pointwise.
//! Each equivalence class is represented by its lexicographically smallest member.

use crate::error::{Error, Result};
use crate::group::PermutationGroup;
use crate::mapping::task_orbits::TaskOrbits;
use crate::perm::{FHashSet, Perm};
use itertools::Itertools;
use std::collections::VecDeque;
use std::ops::Range;
use tracing::trace;

pub mod task_orbits;

pub type TaskMapping = Vec<usize>;

/// How representatives are computed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ReprMethod {
    /// Greedy descent through a stabilizer chain whose base starts with the mapping's processors.
    #[default]
    Iterate,
    /// Minimum over the enumerated orbit. Exponential in the worst case.
    Orbit,
    /// Applies generators while they decrease the mapping. Fast, but may stop at a local
    /// minimum, so equivalent mappings can get different results.
    LocalSearch,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum LocalSearchVariant {
    /// Moves to the smallest image under all generators in each step.
    #[default]
    Bfs,
    /// Applies each decreasing generator in turn within a step.
    Dfs,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReprOptions {
    pub method: ReprMethod,
    pub variant: LocalSearchVariant,
    /// Mappings hold processor indices shifted by this amount, e.g. 1 for 1-based processors.
    pub offset: usize,
    /// Stop as soon as a representative registered in the given `TaskOrbits` is reached.
    /// Registered representatives are trusted to be minimal.
    pub match_known: bool,
    /// Relabel directly if the group is symmetric on a contiguous range of processors.
    pub optimize_symmetric: bool,
    /// Local search also uses the inverses of the generators.
    pub invert_generators: bool,
    /// Number of random group elements local search uses in addition to the generators.
    pub append_generators: usize,
    /// Seed for the random generators of local search.
    pub seed: u64,
}

impl ReprOptions {
    pub const DEFAULT: Self = Self {
        method: ReprMethod::Iterate,
        variant: LocalSearchVariant::Bfs,
        offset: 0,
        match_known: true,
        optimize_symmetric: true,
        invert_generators: false,
        append_generators: 0,
        seed: 0,
    };

    pub const fn with_method(method: ReprMethod) -> Self {
        Self { method, ..Self::DEFAULT }
    }
}

impl Default for ReprOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn check_mapping(group: &PermutationGroup, mapping: &[usize]) -> Result<()> {
    for &pe in mapping {
        Error::check_index(pe, group.degree())?;
    }
    Ok(())
}

/// Processor indices of a mapping holding indices shifted by `offset`.
fn to_processors(group: &PermutationGroup, mapping: &[usize], offset: usize) -> Result<TaskMapping> {
    mapping.iter().map(|&task| task.checked_sub(offset).filter(|&pe| pe < group.degree()).
        ok_or(Error::OutOfDomain { index: task, degree: group.degree() + offset })).collect()
}

fn shifted(mapping: &[usize], offset: usize) -> TaskMapping {
    mapping.iter().map(|&pe| pe + offset).collect()
}

/// Breadth-first enumeration of all images of a mapping, starting with the mapping itself.
/// Each image is yielded exactly once.
#[derive(Clone)]
pub struct Orbit<'a> {
    generators: &'a [Perm],
    seen: FHashSet<TaskMapping>,
    queue: VecDeque<TaskMapping>,
}

impl<'a> Orbit<'a> {
    fn new(generators: &'a [Perm], mapping: TaskMapping) -> Self {
        Self { generators, seen: FHashSet::from_iter([mapping.clone()]), queue: VecDeque::from([mapping]) }
    }
}

impl Iterator for Orbit<'_> {
    type Item = TaskMapping;

    fn next(&mut self) -> Option<TaskMapping> {
        let current = self.queue.pop_front()?;
        for g in self.generators {
            let image = g.permuted(&current);
            if !self.seen.contains(&image) {
                self.seen.insert(image.clone());
                self.queue.push_back(image);
            }
        }
        Some(current)
    }
}

pub fn orbit<'a>(group: &'a PermutationGroup, mapping: &[usize]) -> Result<Orbit<'a>> {
    check_mapping(group, mapping)?;
    Ok(Orbit::new(group.generators(), mapping.to_vec()))
}

/// Representatives registered so far, looked up in processor indices.
struct Known<'a> {
    orbits: Option<&'a TaskOrbits>,
    offset: usize,
}

impl Known<'_> {
    fn contains(&self, processors: &[usize]) -> bool {
        self.orbits.is_some_and(|orbits| orbits.contains(&shifted(processors, self.offset)))
    }
}

/// Lexicographically smallest mapping equivalent to the given one, or a small equivalent one
/// for `ReprMethod::LocalSearch`. Fails if the mapping refers to a processor outside of the
/// group's domain.
pub fn representative(group: &PermutationGroup, mapping: &[usize], options: &ReprOptions) -> Result<TaskMapping> {
    search(group, mapping, None, options)
}

/// Like `representative`, but also records the result in `orbits`, and with
/// `options.match_known`, stops at the first representative already recorded there.
pub fn representative_in(group: &PermutationGroup, mapping: &[usize], orbits: &mut TaskOrbits,
                         options: &ReprOptions) -> Result<TaskMapping> {
    let out = search(group, mapping, Some(&*orbits), options)?;
    orbits.insert(out.clone());
    Ok(out)
}

pub(crate) fn search(group: &PermutationGroup, mapping: &[usize], orbits: Option<&TaskOrbits>,
                     options: &ReprOptions) -> Result<TaskMapping> {
    let processors = to_processors(group, mapping, options.offset)?;
    let known = Known { orbits: orbits.filter(|_| options.match_known), offset: options.offset };
    let symmetric = if options.optimize_symmetric { group.symmetric_range() } else { None };
    let out = match symmetric {
        Some(range) => relabelled(&processors, range),
        None => match options.method {
            ReprMethod::Iterate => minimal_image(group, &processors, &known)?,
            ReprMethod::Orbit => orbit_minimum(group, processors, &known),
            ReprMethod::LocalSearch => local_search(group, processors, &known, options),
        },
    };
    let out = shifted(&out, options.offset);
    trace!(?mapping, representative = ?out, method = ?options.method, "Representative");
    Ok(out)
}

/// Whether both mappings have the same representative. Fails for mappings of different lengths.
pub fn equivalent(group: &PermutationGroup, a: &[usize], b: &[usize], options: &ReprOptions) -> Result<bool> {
    Error::check_degree(a.len(), b.len())?;
    Ok(representative(group, a, options)? == representative(group, b, options)?)
}

/// Minimum under a group acting as the symmetric group on `range` and fixing all other points:
/// processors in the range are renumbered from its start in order of first occurrence.
fn relabelled(mapping: &[usize], range: Range<usize>) -> TaskMapping {
    let mut targets = vec![None; range.len()];
    let mut next = range.start;
    mapping.iter().map(|&pe| {
        if !range.contains(&pe) {
            return pe;
        }
        *targets[pe - range.start].get_or_insert_with(|| {
            next += 1;
            next - 1
        })
    }).collect()
}

fn orbit_minimum(group: &PermutationGroup, mapping: TaskMapping, known: &Known) -> TaskMapping {
    let mut min = mapping.clone();
    for image in Orbit::new(group.generators(), mapping) {
        if known.contains(&image) {
            return image;
        }
        if image < min {
            min = image;
        }
    }
    min
}

/// With a base starting with the distinct processors d_0, d_1, ... of the mapping in order of
/// first occurrence, any group element is u_{k-1} * ... * u_0 with coset representatives u_i
/// mapping d_i to a point of the i-th basic orbit. The image of d_i then only depends on
/// u_0..=u_i, so choosing each u_i greedily minimizes the image of the mapping.
fn minimal_image(group: &PermutationGroup, mapping: &[usize], known: &Known) -> Result<TaskMapping> {
    if group.is_trivial() {
        return Ok(mapping.to_vec());
    }
    let points = mapping.iter().cloned().unique().collect_vec();
    let chain = group.chain_with_base_prefix(&points)?;
    let mut s = Perm::identity(group.degree());
    for level in chain.levels.iter().take(points.len()) {
        if known.orbits.is_some() {
            let image = s.permuted(mapping);
            if known.contains(&image) {
                return Ok(image);
            }
        }
        let Some(beta) = level.orbit.iter().cloned().min_by_key(|&beta| &s * beta) else { break };
        if let Some(u) = level.representative(beta) {
            s = &u * &s;
        }
    }
    Ok(s.permuted(mapping))
}

fn local_search(group: &PermutationGroup, mapping: TaskMapping, known: &Known, options: &ReprOptions) -> TaskMapping {
    let generators = local_search_generators(group, options);
    let mut current = mapping;
    loop {
        if known.contains(&current) {
            return current;
        }
        let next = match options.variant {
            LocalSearchVariant::Bfs => generators.iter().map(|g| g.permuted(&current)).filter(|image| *image < current).min(),
            LocalSearchVariant::Dfs => {
                let mut next = current.clone();
                for g in &generators {
                    let image = g.permuted(&next);
                    if image < next {
                        next = image;
                    }
                }
                (next < current).then_some(next)
            }
        };
        match next {
            Some(next) => current = next,
            None => return current,
        }
    }
}

fn local_search_generators(group: &PermutationGroup, options: &ReprOptions) -> Vec<Perm> {
    let inverses = group.generators().iter().filter(|_| options.invert_generators).map(Perm::inverse);
    let random = (0..options.append_generators as u64).map(|i| group.random_element(options.seed.wrapping_add(i)));
    group.generators().iter().cloned().chain(inverses).chain(random).unique().collect()
}
