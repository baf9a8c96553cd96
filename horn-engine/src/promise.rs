//! The non-deterministic control layer: a lazy tree of alternatives.
//!
//! A [`Promise`] describes where solutions may come from without
//! computing any of them: a success leaf carrying an environment, a
//! dead end, a raised error, a suspended computation, an ordered
//! disjunction, or one of the two cut markers.  The [`Search`] driver
//! owns an explicit stack of alternatives and walks the tree strictly
//! depth-first left-to-right, forcing [`Promise::Delay`] thunks from a
//! loop — a trampoline, so object-language recursion never consumes
//! host stack.
//!
//! Cut is a control signal, not an error.  Every [`Promise::CutBarrier`]
//! carries a [`CutScope`] label minted by the VM at predicate entry (and
//! by the opaque control constructs: `call/1`, `catch/3`, the condition
//! of if-then-else).  A [`Promise::Cut`] names the barrier it commits
//! to: the driver discards every alternative accumulated above that
//! barrier, including barriers and handlers left by intervening calls
//! that already succeeded.  A cut whose barrier is not on the stack
//! prunes nothing.  Errors unwind the same stack looking for a handler
//! installed by `catch/3`; a handler that does not match lets the error
//! keep travelling.  Dropping the `Search` cancels the query: nothing
//! runs after the drop.

use crate::error::PrologError;
use crate::vm::VM;
use horn_terms::{unify, Env, Term};
use std::rc::Rc;

/// The label of a cut barrier.  Minted by [`VM::new_barrier`]; a
/// compiled `!` or a committing control construct names the scope it
/// prunes to.
pub type CutScope = u64;

/// A suspended computation producing more of the tree.
pub type Thunk = Box<dyn FnOnce(&mut VM) -> Promise>;

/// The success continuation threaded through goal execution.  Called
/// with the environment a subgoal succeeded in; returns the rest of
/// the computation.  Cloning shares the underlying closure.
#[derive(Clone)]
pub struct Cont(Rc<dyn Fn(&mut VM, Env) -> Promise>);

impl Cont {
    pub fn new(f: impl Fn(&mut VM, Env) -> Promise + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, vm: &mut VM, env: Env) -> Promise {
        (*self.0)(vm, env)
    }
}

/// A continuation that succeeds outright, the root of every query.
pub fn accept() -> Cont {
    Cont::new(|_vm, env| Promise::Unit(env))
}

/// One node of the lazy alternative tree.
pub enum Promise {
    /// Success: yield control to the driver with this environment.
    Unit(Env),
    /// No solutions here.
    Fail,
    /// Abort this branch with an error, which propagates unless caught.
    Error(PrologError),
    /// A thunk producing a node on demand.
    Delay(Thunk),
    /// Ordered disjunction; alternatives are tried left to right.
    Choice(Vec<Promise>),
    /// The labelled cut boundary for the inner tree.
    CutBarrier(CutScope, Box<Promise>),
    /// Commit: discard all alternatives above the named barrier, then
    /// continue with the inner tree.
    Cut(CutScope, Box<Promise>),
    /// An error handler installed along the branch by `catch/3`.
    Catch(Box<CatchNode>),
}

/// The payload of [`Promise::Catch`].
pub struct CatchNode {
    /// The protected computation.
    pub inner: Promise,
    /// The pattern a thrown ball must unify with.
    pub catcher: Term,
    /// The goal to run when the pattern matches.
    pub recovery: Term,
    /// The environment captured at `catch/3` entry; the recovery goal
    /// runs here, discarding the protected goal's partial bindings.
    pub env: Env,
    /// The continuation of the whole `catch/3` call.
    pub k: Cont,
    /// The cut scope the recovery goal runs under.
    pub cut: CutScope,
}

impl Promise {
    pub fn delay(f: impl FnOnce(&mut VM) -> Promise + 'static) -> Self {
        Promise::Delay(Box::new(f))
    }

    pub fn choice(alternatives: Vec<Promise>) -> Self {
        Promise::Choice(alternatives)
    }

    pub fn cut_barrier(scope: CutScope, inner: Promise) -> Self {
        Promise::CutBarrier(scope, Box::new(inner))
    }

    pub fn cut(scope: CutScope, inner: Promise) -> Self {
        Promise::Cut(scope, Box::new(inner))
    }

    pub fn catch(node: CatchNode) -> Self {
        Promise::Catch(Box::new(node))
    }
}

// A frame on the driver's stack: a pending alternative, a labelled cut
// boundary, or an error handler.
enum Frame {
    Alt(Promise),
    Barrier(CutScope),
    Handler(HandlerFrame),
}

struct HandlerFrame {
    catcher: Term,
    recovery: Term,
    env: Env,
    k: Cont,
    cut: CutScope,
}

/// The demand-driven driver over a [`Promise`] tree.
///
/// [`Search::next`] runs until the next success leaf and returns its
/// environment; calling it again resumes from the alternatives still
/// on the stack.  An uncaught error is terminal: the search is spent
/// afterwards.  Dropping the search discards every pending
/// alternative without running it.
pub struct Search {
    frames: Vec<Frame>,
    pending: Option<Promise>,
    spent: bool,
}

impl Search {
    pub fn new(root: Promise) -> Self {
        Self {
            frames: Vec::new(),
            pending: Some(root),
            spent: false,
        }
    }

    /// Advances to the next solution.  `Ok(Some(env))` is a solution,
    /// `Ok(None)` means the alternatives are exhausted, `Err` carries
    /// an uncaught error or a halt.
    pub fn next(&mut self, vm: &mut VM) -> Result<Option<Env>, PrologError> {
        if self.spent {
            return Ok(None);
        }
        loop {
            let promise = match self.pending.take() {
                Some(p) => p,
                None => match self.backtrack() {
                    Some(p) => p,
                    None => {
                        self.spent = true;
                        return Ok(None);
                    }
                },
            };

            match promise {
                Promise::Unit(env) => return Ok(Some(env)),
                Promise::Fail => {}
                Promise::Error(e) => {
                    if let Some(hook) = vm.hooks.on_error.as_mut() {
                        hook(&e);
                    }
                    match self.unwind(vm, e) {
                        Ok(recovery) => self.pending = Some(recovery),
                        Err(e) => {
                            self.spent = true;
                            return Err(e);
                        }
                    }
                }
                Promise::Delay(f) => self.pending = Some(f(vm)),
                Promise::Choice(alternatives) => {
                    let mut iter = alternatives.into_iter();
                    let first = iter.next();
                    let rest: Vec<Promise> = iter.collect();
                    for alt in rest.into_iter().rev() {
                        self.frames.push(Frame::Alt(alt));
                    }
                    self.pending = first;
                }
                Promise::CutBarrier(scope, inner) => {
                    self.frames.push(Frame::Barrier(scope));
                    self.pending = Some(*inner);
                }
                Promise::Cut(scope, inner) => {
                    let found = self
                        .frames
                        .iter()
                        .rposition(|f| matches!(f, Frame::Barrier(s) if *s == scope));
                    if let Some(pos) = found {
                        self.frames.truncate(pos + 1);
                    }
                    self.pending = Some(*inner);
                }
                Promise::Catch(node) => {
                    self.frames.push(Frame::Handler(HandlerFrame {
                        catcher: node.catcher,
                        recovery: node.recovery,
                        env: node.env,
                        k: node.k,
                        cut: node.cut,
                    }));
                    self.pending = Some(node.inner);
                }
            }
        }
    }

    /// Cancels the search, discarding all pending alternatives.
    pub fn close(&mut self) {
        self.frames.clear();
        self.pending = None;
        self.spent = true;
    }

    fn backtrack(&mut self) -> Option<Promise> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::Alt(p) = frame {
                return Some(p);
            }
        }
        None
    }

    /// Unwinds the stack towards the nearest handler whose catcher
    /// unifies with the ball.  A halt passes every handler.
    fn unwind(&mut self, vm: &mut VM, error: PrologError) -> Result<Promise, PrologError> {
        let ball = match &error {
            PrologError::Ball { term, .. } => *term,
            PrologError::Halted(_) => {
                return Err(error);
            }
        };
        while let Some(frame) = self.frames.pop() {
            let Frame::Handler(handler) = frame else {
                continue;
            };
            let (env, ok) = unify(&vm.arena, &handler.env, ball, handler.catcher, false);
            if ok {
                let recovery = handler.recovery;
                let k = handler.k;
                let cut = handler.cut;
                return Ok(Promise::delay(move |vm| vm.solve(recovery, &env, &k, cut)));
            }
        }
        Err(error)
    }
}
