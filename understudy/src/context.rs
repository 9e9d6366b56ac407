// vim: tw=80
//! Contexts: the registry of live expectations and sequences

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    mem,
    rc::{Rc, Weak},
};

use crate::{
    error::UnmetExpectations,
    expectation::{Entry, Expectation, ExpectationId, ExpectationInfo, Rfunc},
    matcher::Pattern,
    mock::MethodId,
    sequence::Sequence,
    value::Args,
    Error,
};

thread_local! {
    static DEFAULT: Context = Context::new();
}

/// The context used by mocks built without an explicit one.
///
/// Each thread gets its own, so tests running in parallel do not see each
/// other's expectations.
pub fn default_context() -> Context {
    DEFAULT.with(Context::clone)
}

#[derive(Default)]
pub(crate) struct State {
    next_id: u64,
    entries: HashMap<ExpectationId, Entry>,
    /// Unsequenced expectations, oldest first.
    free: Vec<ExpectationId>,
    /// Sequences with at least one member, oldest first.
    sequences: Vec<Sequence>,
}

impl State {
    /// Sequence heads, then free-standing expectations.
    fn active_ids(&self) -> Vec<ExpectationId> {
        let mut ids: Vec<ExpectationId> = Vec::new();
        for head in self.sequences.iter().filter_map(Sequence::head_id) {
            // One expectation may head several sequences
            if !ids.contains(&head) {
                ids.push(head);
            }
        }
        ids.extend_from_slice(&self.free);
        ids
    }

    fn remove(&mut self, id: ExpectationId) -> Option<Entry> {
        let entry = self.entries.remove(&id)?;
        if entry.sequenced {
            for seq in self.sequences.iter() {
                seq.forget(id);
            }
            self.sequences.retain(|seq| !seq.is_empty());
        } else {
            self.free.retain(|x| *x != id);
        }
        Some(entry)
    }
}

/// Holds every live [`Expectation`] and [`Sequence`] of one test.
///
/// Contexts are cheap handles; clones refer to the same registry.  Use a
/// separate context per test, or [`retire_all`](Self::retire_all) between
/// tests.
///
/// ```
/// # use understudy::*;
/// let ctx = Context::new();
/// let mock = Mock::builder(Class::new("Thing", "demo").method("bar", &[]))
///     .context(&ctx)
///     .build();
/// mock["bar"].expect(());
/// assert!(ctx.assert_satisfied().is_err());
/// mock.call("bar", ()).unwrap();
/// ctx.assert_satisfied().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Context {
    state: Rc<RefCell<State>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: Rc<RefCell<State>>) -> Self {
        Context { state }
    }

    fn handles(&self, ids: impl IntoIterator<Item=ExpectationId>)
        -> Vec<Expectation>
    {
        ids.into_iter()
            .map(|id| Expectation::new(self.clone(), id))
            .collect()
    }

    /// Add a new, free-standing expectation for `method`.
    ///
    /// Usually reached through
    /// [`MockMethod::expect`](crate::MockMethod::expect).
    pub fn register(&self, method: MethodId, pattern: Pattern) -> Expectation
    {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            let id = ExpectationId(state.next_id);
            debug!(target: "understudy::context", %id, %method, %pattern,
                "registered");
            state.entries.insert(id, Entry::new(method, pattern));
            state.free.push(id);
            id
        };
        Expectation::new(self.clone(), id)
    }

    /// The expectations able to match the next call: the head of every
    /// sequence, in the order the sequences were created, followed by every
    /// free-standing expectation, oldest first.
    pub fn active_expectations(&self) -> Vec<Expectation> {
        let ids = self.state.borrow().active_ids();
        self.handles(ids)
    }

    /// Free-standing expectations that are not optional.  These must all be
    /// satisfied before [`assert_satisfied`](Self::assert_satisfied)
    /// succeeds.
    pub fn required_expectations(&self) -> Vec<Expectation> {
        let ids = {
            let state = self.state.borrow();
            state.free.iter()
                .copied()
                .filter(|id| !state.entries[id].optional)
                .collect::<Vec<_>>()
        };
        self.handles(ids)
    }

    /// Every live expectation that is not optional, sequenced or not, oldest
    /// first.
    pub fn pending_expectations(&self) -> Vec<Expectation> {
        let mut ids = {
            let state = self.state.borrow();
            state.entries.iter()
                .filter(|(_, entry)| !entry.optional)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>()
        };
        ids.sort_unstable();
        self.handles(ids)
    }

    /// The free-standing expectations, oldest first.
    pub fn expectations(&self) -> Vec<Expectation> {
        let ids = self.state.borrow().free.clone();
        self.handles(ids)
    }

    /// Sequences that still have members.
    pub fn sequences(&self) -> Vec<Sequence> {
        self.state.borrow().sequences.clone()
    }

    /// Forget every expectation and sequence.
    pub fn retire_all(&self) {
        let (entries, sequences) = {
            let mut state = self.state.borrow_mut();
            state.free.clear();
            (mem::take(&mut state.entries), mem::take(&mut state.sequences))
        };
        debug!(target: "understudy::context", expectations = entries.len(),
            sequences = sequences.len(), "retired all");
        for seq in sequences {
            seq.clear();
        }
        // Entries may own mocks, whose drop must not see the state borrowed
        drop(entries);
    }

    /// Fail with [`Error::Unmet`] if any
    /// [required](Self::required_expectations) expectation remains.
    pub fn assert_satisfied(&self) -> Result<(), Error> {
        let required = self.required_expectations()
            .iter()
            .filter_map(Expectation::info)
            .collect::<Vec<_>>();
        if required.is_empty() {
            Ok(())
        } else {
            Err(UnmetExpectations { required }.into())
        }
    }

    /// Retire `expectation`, wherever it lives.  A sequenced expectation
    /// leaves every sequence it belongs to, and sequences left empty leave
    /// the context.
    pub fn remove(&self, expectation: &Expectation) -> Result<(), Error> {
        let id = expectation.id();
        let entry = self.state.borrow_mut().remove(id)
            .ok_or(Error::Retired(id))?;
        debug!(target: "understudy::context", %id, "removed");
        drop(entry);
        Ok(())
    }

    /// The first active expectation accepting this call.
    ///
    /// Patterns are evaluated with the state released; user predicates
    /// may call other mocks of this context.
    pub(crate) fn find_active(&self, method: &MethodId, args: &Args)
        -> Option<ExpectationId>
    {
        let candidates = {
            let state = self.state.borrow();
            state.active_ids()
                .into_iter()
                .filter_map(|id| {
                    let entry = &state.entries[&id];
                    (entry.method == *method)
                        .then(|| (id, entry.pattern.clone()))
                })
                .collect::<Vec<_>>()
        };
        candidates.into_iter()
            .find(|(_, pattern)| pattern.matches(args))
            .map(|(id, _)| id)
    }

    pub(crate) fn active_infos(&self) -> Vec<ExpectationInfo> {
        let state = self.state.borrow();
        state.active_ids()
            .into_iter()
            .map(|id| state.entries[&id].info(id))
            .collect()
    }

    pub(crate) fn with_entry<F, R>(&self, id: ExpectationId, f: F)
        -> Result<R, Error>
        where F: FnOnce(&mut Entry) -> R
    {
        let mut state = self.state.borrow_mut();
        let entry = state.entries.get_mut(&id).ok_or(Error::Retired(id))?;
        Ok(f(entry))
    }

    /// Count one call against `id`, retiring it if exhausted.  Returns how
    /// to produce the call's result.
    pub(crate) fn charge(&self, id: ExpectationId, args: &Args)
        -> Result<Rfunc, Error>
    {
        let mut state = self.state.borrow_mut();
        let entry = state.entries.get_mut(&id).ok_or(Error::Retired(id))?;
        let exhausted = entry.charge(args)?;
        let rfunc = entry.rfunc.clone();
        trace!(target: "understudy::expectation", %id, %args,
            remaining = %entry.times, "satisfied");
        let retired = if exhausted {
            debug!(target: "understudy::expectation", %id, "retired");
            state.remove(id)
        } else {
            None
        };
        drop(state);
        drop(retired);
        Ok(rfunc)
    }

    /// Move `id` from the free-standing list into `seq`'s keeping.
    pub(crate) fn adopt(&self, id: ExpectationId, seq: &Sequence)
        -> Result<(), Error>
    {
        let state = &mut *self.state.borrow_mut();
        let entry = state.entries.get_mut(&id).ok_or(Error::Retired(id))?;
        entry.sequenced = true;
        state.free.retain(|x| *x != id);
        if !state.sequences.contains(seq) {
            let at = state.sequences.partition_point(|s| s.id() < seq.id());
            state.sequences.insert(at, seq.clone());
        }
        debug!(target: "understudy::context", %id, sequence = %seq.id(),
            "sequenced");
        Ok(())
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<State>> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn is_bound_to(&self, bound: &Weak<RefCell<State>>) -> bool {
        bound.ptr_eq(&Rc::downgrade(&self.state))
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f.debug_struct("Context")
                .field("expectations", &state.entries.len())
                .field("sequences", &state.sequences.len())
                .finish(),
            Err(_) => f.write_str("Context { .. }")
        }
    }
}
