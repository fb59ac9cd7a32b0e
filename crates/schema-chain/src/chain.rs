//! Building and validating the alter chain.
//!
//! Alter groups are stored by ref in a [`BTreeMap`](std::collections::BTreeMap).
//! Links between groups are refs into that map rather than pointers, so the
//! chain is a doubly-linked list expressed as keys and can be serialized as-is.
//!
//! Validation runs in three passes, each in ref order:
//!
//! 1. Every group is checked on its own: both alters present, matching
//!    back-refs, matching `skip-env` and `require-env` sets.
//! 2. Back-refs are resolved. A dangling back-ref or two groups claiming the
//!    same parent is rejected.
//! 3. Head and tail are located. A second root is rejected, as is any shape
//!    where walking from the head does not reach every group exactly once.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::alter::{env_allows, Alter, Direction};
use crate::error::{ChainError, Result};
use crate::scan::{scan_directory, AlterGroups};

/// An up/down pair of alters sharing one ref, plus its links in the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlterGroup {
    /// The alter applying this step.
    pub up: Option<Alter>,
    /// The alter reverting this step.
    pub down: Option<Alter>,
    /// Ref of the next group in the chain.
    pub forward_ref: Option<String>,
    /// Ref of the previous group in the chain.
    pub back_ref: Option<String>,
    /// Copied from the up alter once it is known to match the down alter.
    pub require_env: Vec<String>,
    /// Copied from the up alter once it is known to match the down alter.
    pub skip_env: Vec<String>,
}

impl AlterGroup {
    /// Creates a group holding both alters of one ref.
    #[must_use]
    pub fn new(up: Alter, down: Alter) -> Self {
        Self {
            up: Some(up),
            down: Some(down),
            ..Self::default()
        }
    }

    /// Returns true once both the up and the down alter are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.up.is_some() && self.down.is_some()
    }

    /// Returns the alter for `direction`, if present.
    #[must_use]
    pub fn alter(&self, direction: Direction) -> Option<&Alter> {
        match direction {
            Direction::Up => self.up.as_ref(),
            Direction::Down => self.down.as_ref(),
        }
    }

    /// Ref shared by the alters of this group.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.up
            .as_ref()
            .or(self.down.as_ref())
            .map(|alter| alter.reference.as_str())
    }

    /// Returns whether this group should run in `env`.
    #[must_use]
    pub fn runs_in(&self, env: &str) -> bool {
        env_allows(&self.require_env, &self.skip_env, env)
    }
}

/// A validated, linear chain of alter groups.
#[derive(Debug, Clone, Serialize)]
pub struct Chain {
    head: String,
    tail: String,
    groups: AlterGroups,
}

impl Chain {
    /// Ref of the root group.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Ref of the latest group.
    #[must_use]
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Number of groups in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always false; a chain has at least one group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Looks up a group by ref.
    #[must_use]
    pub fn get(&self, reference: &str) -> Option<&AlterGroup> {
        self.groups.get(reference)
    }

    /// All groups, keyed by ref.
    #[must_use]
    pub fn groups(&self) -> &AlterGroups {
        &self.groups
    }

    #[must_use]
    pub fn into_groups(self) -> AlterGroups {
        self.groups
    }

    /// Walks the chain from head to tail.
    #[must_use]
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            groups: &self.groups,
            next: Some(self.head.as_str()),
            direction: Direction::Up,
        }
    }

    /// Walks the chain from tail to head.
    #[must_use]
    pub fn iter_rev(&self) -> ChainIter<'_> {
        ChainIter {
            groups: &self.groups,
            next: Some(self.tail.as_str()),
            direction: Direction::Down,
        }
    }

    /// Returns the alters to apply for `direction`, in order.
    ///
    /// Up alters are listed head to tail and down alters tail to head. With
    /// an `env`, groups that do not run in that environment are left out.
    #[must_use]
    pub fn plan(&self, direction: Direction, env: Option<&str>) -> Vec<&Alter> {
        let walk = match direction {
            Direction::Up => self.iter(),
            Direction::Down => self.iter_rev(),
        };
        walk.filter(|(_, group)| env.is_none_or(|env| group.runs_in(env)))
            .filter_map(|(_, group)| group.alter(direction))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = (&'a str, &'a AlterGroup);
    type IntoIter = ChainIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the groups of a [`Chain`], yielding `(ref, group)`.
#[derive(Debug, Clone)]
pub struct ChainIter<'a> {
    groups: &'a AlterGroups,
    next: Option<&'a str>,
    /// `Up` follows forward refs, `Down` follows back refs.
    direction: Direction,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (&'a str, &'a AlterGroup);

    fn next(&mut self) -> Option<Self::Item> {
        let (reference, group) = self.groups.get_key_value(self.next?)?;
        self.next = match self.direction {
            Direction::Up => group.forward_ref.as_deref(),
            Direction::Down => group.back_ref.as_deref(),
        };
        Some((reference.as_str(), group))
    }
}

/// Scans `dir` and builds a validated chain from the alters found.
///
/// # Errors
///
/// Any error from [`scan_directory`] or [`build_and_validate_chain`].
pub fn load_chain(dir: &Path) -> Result<Chain> {
    build_and_validate_chain(scan_directory(dir)?)
}

/// Validates alter groups and links them into a [`Chain`].
///
/// # Errors
///
/// - [`ChainError::MissingAlterPair`] if a group lacks its up or down alter.
/// - [`ChainError::InvalidMetaData`] for mismatched back-refs or env lists
///   inside a group, a back-ref to an unknown ref, two groups with the same
///   parent, or two root groups.
/// - [`ChainError::CyclicChain`] if the groups do not form a single path.
pub fn build_and_validate_chain(mut groups: AlterGroups) -> Result<Chain> {
    for (reference, group) in &mut groups {
        validate_group(reference, group)?;
    }

    link_groups(&mut groups)?;

    let (head, tail) = find_ends(&groups)?;
    let chain = Chain { head, tail, groups };
    ensure_single_path(&chain)?;

    info!(
        alters = chain.len(),
        head = %chain.head,
        tail = %chain.tail,
        "Chain validated"
    );
    Ok(chain)
}

/// Checks a group on its own and copies the env gating onto it.
fn validate_group(reference: &str, group: &mut AlterGroup) -> Result<()> {
    let (up, down) = match (&group.up, &group.down) {
        (Some(up), Some(down)) => (up, down),
        (None, _) => {
            return Err(ChainError::MissingAlterPair {
                reference: reference.to_string(),
                missing: Direction::Up,
            })
        }
        (_, None) => {
            return Err(ChainError::MissingAlterPair {
                reference: reference.to_string(),
                missing: Direction::Down,
            })
        }
    };

    if up.back_ref != down.back_ref {
        return Err(ChainError::invalid(format!(
            "'backref' values for {reference} do not match ({} and {})",
            up.back_ref.as_deref().unwrap_or(""),
            down.back_ref.as_deref().unwrap_or("")
        )));
    }

    if up.skip_env.len() != down.skip_env.len() {
        return Err(ChainError::invalid(format!(
            "Different number of skip-env's found in:\n\t{}\n\t{}\n\
             These files must contain the same skip-env values.",
            up.file_name.display(),
            down.file_name.display()
        )));
    }
    if let Some(env) = first_unshared(&up.skip_env, &down.skip_env) {
        return Err(ChainError::invalid(format!(
            "skip-env value '{env}' is not found in both up & down alters for '{reference}'"
        )));
    }

    if up.require_env.len() != down.require_env.len() {
        return Err(ChainError::invalid(format!(
            "Uneven number of require-env's found in '{}' and '{}'",
            up.file_name.display(),
            down.file_name.display()
        )));
    }
    if let Some(env) = first_unshared(&up.require_env, &down.require_env) {
        return Err(ChainError::invalid(format!(
            "require-env value '{env}' is not found in both up & down alters for '{reference}'"
        )));
    }

    group.skip_env = up.skip_env.clone();
    group.require_env = up.require_env.clone();
    Ok(())
}

/// Returns the first entry present in only one of the two lists.
fn first_unshared<'a>(a: &'a [String], b: &'a [String]) -> Option<&'a str> {
    a.iter()
        .find(|env| !b.contains(env))
        .or_else(|| b.iter().find(|env| !a.contains(env)))
        .map(String::as_str)
}

/// Resolves every back-ref and fills in forward/back links.
fn link_groups(groups: &mut AlterGroups) -> Result<()> {
    let children: Vec<(String, String, String)> = groups
        .iter()
        .filter_map(|(reference, group)| {
            let up = group.up.as_ref()?;
            let parent = up.back_ref.clone()?;
            Some((reference.clone(), parent, up.file_name.display().to_string()))
        })
        .collect();

    for (child, parent_ref, file) in children {
        let Some(parent) = groups.get_mut(&parent_ref) else {
            return Err(ChainError::invalid(format!(
                "Invalid backref '{parent_ref}' found for '{file}'"
            )));
        };

        if let Some(sibling) = &parent.forward_ref {
            return Err(ChainError::invalid(format!(
                "Duplicate parent defined in {sibling} and {child} - both point to \
                 {parent_ref}. Chain must be linear."
            )));
        }
        parent.forward_ref = Some(child.clone());
        debug!(parent = %parent_ref, child = %child, "Linked alter");

        if let Some(group) = groups.get_mut(&child) {
            group.back_ref = Some(parent_ref);
        }
    }
    Ok(())
}

/// Finds the single root and the tail of the linked groups.
fn find_ends(groups: &AlterGroups) -> Result<(String, String)> {
    let mut head: Option<&str> = None;
    let mut tail: Option<&str> = None;

    for (reference, group) in groups {
        if group.back_ref.is_none() {
            if let Some(existing) = head {
                return Err(ChainError::invalid(format!(
                    "Duplicate root alters found ({reference} and {existing}). \
                     Chain must have one root alter."
                )));
            }
            head = Some(reference);
        }
        if group.forward_ref.is_none() {
            tail = Some(reference);
        }
    }

    match (head, tail) {
        (Some(head), Some(tail)) => Ok((head.to_string(), tail.to_string())),
        _ => Err(ChainError::CyclicChain),
    }
}

/// Checks that walking from the head visits every group once and ends at the tail.
///
/// Catches loops that are detached from an otherwise valid chain, such as a
/// group whose back-ref names itself.
fn ensure_single_path(chain: &Chain) -> Result<()> {
    let mut seen = HashSet::with_capacity(chain.len());
    let mut last = None;
    for (reference, _) in chain {
        if !seen.insert(reference) {
            return Err(ChainError::CyclicChain);
        }
        last = Some(reference);
    }
    if seen.len() != chain.len() || last != Some(chain.tail()) {
        return Err(ChainError::CyclicChain);
    }
    Ok(())
}
