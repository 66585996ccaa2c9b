//! Compiled kernel representation and its evaluator

use rand::Rng;

/// Value source for a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    /// The workload size of the current invocation
    Count,
    /// A fresh pseudo-random value per evaluation
    Random,
    /// Integer literal
    Const(i64),
    /// A declared variable
    Var(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateOp {
    Add,
    Sub,
    Mul,
    Xor,
}

impl UpdateOp {
    fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            UpdateOp::Add => lhs.wrapping_add(rhs),
            UpdateOp::Sub => lhs.wrapping_sub(rhs),
            UpdateOp::Mul => lhs.wrapping_mul(rhs),
            UpdateOp::Xor => lhs ^ rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Stmt {
    Let {
        slot: usize,
        value: Operand,
    },
    Update {
        slot: usize,
        op: UpdateOp,
        value: Operand,
    },
    Repeat {
        times: Operand,
        body: Vec<Stmt>,
    },
}

/// A parsed kernel: variable slots, statement tree and the returned slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Program {
    pub(crate) slots: usize,
    pub(crate) body: Vec<Stmt>,
    pub(crate) ret: usize,
}

impl Program {
    /// Evaluate the program once. `vars` must hold at least `slots` entries.
    pub(crate) fn run<R: Rng>(&self, vars: &mut [i64], count: i64, rng: &mut R) -> i64 {
        vars.fill(0);
        exec_block(&self.body, vars, count, rng);
        vars[self.ret]
    }

    /// Approximate in-memory size of the statement tree
    pub(crate) fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + count_stmts(&self.body) * std::mem::size_of::<Stmt>()
    }
}

fn count_stmts(stmts: &[Stmt]) -> usize {
    stmts
        .iter()
        .map(|stmt| match stmt {
            Stmt::Repeat { body, .. } => 1 + count_stmts(body),
            _ => 1,
        })
        .sum()
}

#[inline]
fn eval<R: Rng>(operand: Operand, vars: &[i64], count: i64, rng: &mut R) -> i64 {
    match operand {
        Operand::Count => count,
        Operand::Random => rng.gen(),
        Operand::Const(value) => value,
        Operand::Var(slot) => vars[slot],
    }
}

fn exec_block<R: Rng>(stmts: &[Stmt], vars: &mut [i64], count: i64, rng: &mut R) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { slot, value } => {
                vars[*slot] = eval(*value, vars, count, rng);
            }
            Stmt::Update { slot, op, value } => {
                let rhs = eval(*value, vars, count, rng);
                vars[*slot] = op.apply(vars[*slot], rhs);
            }
            Stmt::Repeat { times, body } => {
                // negative counts run zero times
                let n = eval(*times, vars, count, rng).max(0);
                for _ in 0..n {
                    exec_block(body, vars, count, rng);
                }
            }
        }
    }
}
