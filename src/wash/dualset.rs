//! Branch-sensitive variable sets
//!
//! A [`DualSet`] holds a set of locals together with an optional split into
//! "when the construct evaluated to true" and "when it evaluated to false".
//! Both sets tracked during analysis are *possibly* sets (possibly
//! unassigned locals, possibly assigned finals), so joining control paths is
//! always a union and the state after an unconditional exit is empty.
//!
//! `DualSet` is deliberately not `Clone`: each value is threaded through one
//! subtree and consumed by [`DualSet::merge`], [`DualSet::resolve`] or
//! [`DualSet::into_views`].

use std::collections::BTreeSet;

use crate::ast::VarId;

pub type VarSet = BTreeSet<VarId>;

#[must_use]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DualSet {
    base: VarSet,
    views: Option<(VarSet, VarSet)>,
}

impl DualSet {
    pub fn new(base: VarSet) -> Self {
        Self { base, views: None }
    }

    /// A split state with explicit outcomes
    pub fn from_views(when_true: VarSet, when_false: VarSet) -> Self {
        Self {
            base: &when_true | &when_false,
            views: Some((when_true, when_false)),
        }
    }

    /// Unsplit child seeded from the current state of `self`
    pub fn derive(&self) -> DualSet {
        DualSet::new(self.current())
    }

    #[cfg(test)]
    fn is_split(&self) -> bool {
        self.views.is_some()
    }

    /// Variables of the set when the construct evaluates true
    pub fn true_view(&self) -> &VarSet {
        self.views.as_ref().map_or(&self.base, |(t, _)| t)
    }

    pub fn false_view(&self) -> &VarSet {
        self.views.as_ref().map_or(&self.base, |(_, f)| f)
    }

    /// Union of both outcomes without consuming the set
    pub fn current(&self) -> VarSet {
        match &self.views {
            Some((t, f)) => t | f,
            None => self.base.clone(),
        }
    }

    pub fn contains(&self, var: VarId) -> bool {
        match &self.views {
            Some((t, f)) => t.contains(&var) || f.contains(&var),
            None => self.base.contains(&var),
        }
    }

    /// Collapse the split; the construct's outcome no longer matters
    pub fn merge(self) -> VarSet {
        match self.views {
            Some((t, f)) => &t | &f,
            None => self.base,
        }
    }

    /// Hand this derived state back to the parent it was derived from
    pub fn resolve(self, parent: &mut DualSet) {
        *parent = self;
    }

    /// Logical not: swap the outcomes
    pub fn negate(self) -> Self {
        match self.views {
            Some((t, f)) => DualSet::from_views(f, t),
            None => self,
        }
    }

    pub fn into_views(self) -> (VarSet, VarSet) {
        match self.views {
            Some(views) => views,
            None => (self.base.clone(), self.base),
        }
    }

    /// Vacuous state: nothing follows, every property holds
    pub fn clear(&mut self) {
        self.base.clear();
        self.views = None;
    }

    /// Commit a split in place
    pub fn settle(&mut self) {
        let merged = std::mem::take(self).merge();
        self.base = merged;
    }

    pub fn insert(&mut self, var: VarId) {
        self.base.insert(var);
        if let Some((t, f)) = &mut self.views {
            t.insert(var);
            f.insert(var);
        }
    }

    pub fn remove(&mut self, var: VarId) {
        self.base.remove(&var);
        if let Some((t, f)) = &mut self.views {
            t.remove(&var);
            f.remove(&var);
        }
    }
}

/// Which outcome of a boolean operand a path takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    True,
    False,
}

/// State of one path through `a op b` for non-short-circuit boolean operators
///
/// `b` starts from the merged state of `a`; its effect on `b_start` (locals
/// it removed, locals it added) is replayed onto `a`'s chosen outcome.
fn compose(a_view: &VarSet, b_start: &VarSet, b_view: &VarSet) -> VarSet {
    let removed: VarSet = b_start.difference(b_view).copied().collect();
    let added: VarSet = b_view.difference(b_start).copied().collect();
    &(a_view - &removed) | &added
}

/// Combine the operand states of a non-short-circuit boolean operator
///
/// `truth(x, y)` gives the operator's result for operand outcomes `x` and `y`.
pub fn cross_product(
    a: DualSet,
    b_start: &VarSet,
    b: DualSet,
    truth: impl Fn(Outcome, Outcome) -> bool,
) -> DualSet {
    let mut when_true = VarSet::new();
    let mut when_false = VarSet::new();
    for (x, a_view) in [(Outcome::True, a.true_view()), (Outcome::False, a.false_view())] {
        for (y, b_view) in [(Outcome::True, b.true_view()), (Outcome::False, b.false_view())] {
            let path = compose(a_view, b_start, b_view);
            if truth(x, y) {
                when_true.extend(path);
            } else {
                when_false.extend(path);
            }
        }
    }
    DualSet::from_views(when_true, when_false)
}

/// The two sets tracked along one control path
#[must_use]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Flow {
    /// Locals not definitely assigned
    pub unassigned: DualSet,
    /// Final locals possibly assigned already
    pub finals: DualSet,
}

impl Flow {
    pub fn new(unassigned: VarSet, finals: VarSet) -> Self {
        Self {
            unassigned: DualSet::new(unassigned),
            finals: DualSet::new(finals),
        }
    }

    /// State after an unconditional exit
    pub fn vacuous() -> Self {
        Self::default()
    }

    pub fn is_vacuous(&self) -> bool {
        self.unassigned.current().is_empty() && self.finals.current().is_empty()
    }

    /// Unsplit copy of the current state
    pub fn fork(&self) -> Flow {
        Flow {
            unassigned: self.unassigned.derive(),
            finals: self.finals.derive(),
        }
    }

    pub fn settle(&mut self) {
        self.unassigned.settle();
        self.finals.settle();
    }

    pub fn clear(&mut self) {
        self.unassigned.clear();
        self.finals.clear();
    }

    /// States for the true and false outcomes of a condition
    pub fn split(self) -> (Flow, Flow) {
        let (ut, uf) = self.unassigned.into_views();
        let (ft, ff) = self.finals.into_views();
        (Flow::new(ut, ft), Flow::new(uf, ff))
    }

    /// Condition state from separately computed outcomes
    pub fn from_branches(when_true: Flow, when_false: Flow) -> Flow {
        Flow {
            unassigned: DualSet::from_views(when_true.unassigned.merge(), when_false.unassigned.merge()),
            finals: DualSet::from_views(when_true.finals.merge(), when_false.finals.merge()),
        }
    }

    /// Join of two control paths
    pub fn join(self, other: Flow) -> Flow {
        Flow::new(
            &self.unassigned.merge() | &other.unassigned.merge(),
            &self.finals.merge() | &other.finals.merge(),
        )
    }

    /// Replace `parent`, the state this one was derived from
    pub fn resolve(self, parent: &mut Flow) {
        self.unassigned.resolve(&mut parent.unassigned);
        self.finals.resolve(&mut parent.finals);
    }

    pub fn negate(self) -> Flow {
        Flow {
            unassigned: self.unassigned.negate(),
            finals: self.finals.negate(),
        }
    }

    /// A constant condition: the other outcome never happens
    pub fn constant(self, value: bool) -> Flow {
        let (when_true, when_false) = self.split();
        if value {
            Flow::from_branches(when_true, Flow::vacuous())
        } else {
            Flow::from_branches(Flow::vacuous(), when_false)
        }
    }

    /// Record an assignment to `var`; final locals also enter the finals set
    pub fn assign(&mut self, var: VarId, is_final: bool) {
        self.unassigned.remove(var);
        if is_final {
            self.finals.insert(var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[usize]) -> VarSet {
        ids.iter().map(|&i| VarId(i)).collect()
    }

    #[test]
    fn merge_is_union_of_views() {
        let dual = DualSet::from_views(set(&[1]), set(&[2]));
        assert_eq!(dual.merge(), set(&[1, 2]));
        assert_eq!(DualSet::new(set(&[3])).merge(), set(&[3]));
    }

    #[test]
    fn negate_swaps_views() {
        let dual = DualSet::from_views(set(&[1]), set(&[2])).negate();
        assert_eq!(dual.true_view(), &set(&[2]));
        assert_eq!(dual.false_view(), &set(&[1]));
    }

    #[test]
    fn unsplit_views_share_base() {
        let dual = DualSet::new(set(&[1, 2]));
        assert!(!dual.is_split());
        let (t, f) = dual.into_views();
        assert_eq!(t, f);
    }

    #[test]
    fn remove_applies_to_every_view() {
        let mut dual = DualSet::from_views(set(&[1, 2]), set(&[1]));
        dual.remove(VarId(1));
        assert_eq!(dual.into_views(), (set(&[2]), set(&[])));
    }

    #[test]
    fn resolve_replaces_parent_state() {
        let mut parent = DualSet::new(set(&[1, 2]));
        let mut child = parent.derive();
        child.remove(VarId(1));
        child.resolve(&mut parent);
        assert_eq!(parent.merge(), set(&[2]));
    }

    #[test]
    fn derived_state_is_independent_and_unsplit() {
        let parent = DualSet::from_views(set(&[1, 2]), set(&[2]));
        let mut child = parent.derive();
        assert!(!child.is_split());
        child.remove(VarId(1));
        assert_eq!(child.merge(), set(&[2]));
        assert_eq!(parent.true_view(), &set(&[1, 2]));
    }

    #[test]
    fn and_cross_product() {
        // x = a-true path assigns 1, b-true path assigns 2
        let a = DualSet::from_views(set(&[2, 3]), set(&[1, 2, 3]));
        let b_start = set(&[1, 2, 3]);
        let b = DualSet::from_views(set(&[1, 3]), set(&[1, 2, 3]));
        let result = cross_product(a, &b_start, b, |x, y| x == Outcome::True && y == Outcome::True);
        assert_eq!(result.true_view(), &set(&[3]));
        assert_eq!(result.false_view(), &set(&[1, 2, 3]));
    }

    #[test]
    fn constant_condition_clears_dead_outcome() {
        let flow = Flow::new(set(&[1]), set(&[])).constant(true);
        let (t, f) = flow.split();
        assert_eq!(t.unassigned.merge(), set(&[1]));
        assert!(f.is_vacuous());
    }

    #[test]
    fn join_unions_paths() {
        let a = Flow::new(set(&[1]), set(&[4]));
        let b = Flow::new(set(&[2]), set(&[]));
        let joined = a.join(b);
        assert_eq!(joined.unassigned.merge(), set(&[1, 2]));
        assert_eq!(joined.finals.merge(), set(&[4]));
    }
}
