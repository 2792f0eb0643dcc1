//! Genetic-programming trees.
//!
//! A [`GpTree`] is a [`TreeGenome`] whose nodes are tagged terminal or
//! non-terminal and carry a symbol from a [`PrimitiveSet`]. Terminals that
//! parse as numbers are constants; every other terminal is an input
//! variable, indexed in declaration order.
//!
//! Trees can be interpreted directly ([`TreeGenome::evaluate_with`]) or
//! flattened once into a postfix [`Program`] for repeated evaluation over
//! many input rows.

use super::tree::{TreeGenome, TreeMethod, TreeNode};
use crate::error::{EvolveError, Result};
use crate::random::{self, EvoRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Node tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Terminal,
    NonTerminal,
}

/// Data of a GP tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpNode {
    pub node_type: NodeType,
    pub symbol: String,
}

impl GpNode {
    pub fn terminal(symbol: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::Terminal,
            symbol: symbol.into(),
        }
    }

    pub fn function(symbol: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::NonTerminal,
            symbol: symbol.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.node_type == NodeType::Terminal
    }
}

impl fmt::Display for GpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// A tree genome over GP nodes.
pub type GpTree = TreeGenome<GpNode>;

type GpFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

struct Function {
    name: String,
    arity: usize,
    func: GpFn,
}

/// Function and terminal symbols available to GP trees.
///
/// Functions are total: domain guards (protected division and the like)
/// belong in the function bodies.
#[derive(Default)]
pub struct PrimitiveSet {
    functions: Vec<Function>,
    terminals: Vec<String>,
    variables: Vec<String>,
}

impl PrimitiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a function symbol.
    ///
    /// Zero-arity symbols are terminals. A function registered with arity 0
    /// makes tree building, validation and compilation fail with
    /// [`EvolveError::Configuration`].
    pub fn with_function<F>(mut self, name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.functions.retain(|f| f.name != name);
        self.functions.push(Function {
            name: name.to_string(),
            arity,
            func: Arc::new(func),
        });
        self
    }

    /// Registers a terminal: a numeric constant or a variable name.
    pub fn with_terminal(mut self, symbol: &str) -> Self {
        if self.terminals.iter().any(|t| t == symbol) {
            return self;
        }
        if parse_constant(symbol).is_none() {
            self.variables.push(symbol.to_string());
        }
        self.terminals.push(symbol.to_string());
        self
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    /// Variable names in input order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.function_index(name).map(|i| self.functions[i].arity)
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.iter().any(|t| t == symbol)
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    /// Rejects functions registered without arguments.
    fn check_functions(&self) -> Result<()> {
        match self.functions.iter().find(|f| f.arity == 0) {
            Some(f) => Err(EvolveError::config(format!(
                "GP function '{}' must take at least one argument",
                f.name
            ))),
            None => Ok(()),
        }
    }

    fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    /// Applies a function symbol.
    pub fn apply(&self, name: &str, args: &[f64]) -> Result<f64> {
        let idx = self
            .function_index(name)
            .ok_or_else(|| EvolveError::config(format!("unknown GP function '{name}'")))?;
        Ok((self.functions[idx].func)(args))
    }

    pub(crate) fn random_terminal(&self, rng: &mut EvoRng) -> Result<GpNode> {
        random::choose(rng, &self.terminals)
            .map(|s| GpNode::terminal(s.clone()))
            .ok_or_else(|| EvolveError::config("the GP terminal set is empty"))
    }

    /// A random function symbol and its arity.
    pub(crate) fn random_function(&self, rng: &mut EvoRng) -> Result<(GpNode, usize)> {
        random::choose(rng, &self.functions)
            .map(|f| (GpNode::function(f.name.clone()), f.arity))
            .ok_or_else(|| EvolveError::config("the GP function set is empty"))
    }

    /// A random function with the given arity, if any.
    pub(crate) fn random_function_with_arity(
        &self,
        arity: usize,
        rng: &mut EvoRng,
    ) -> Option<GpNode> {
        let same: Vec<&Function> = self.functions.iter().filter(|f| f.arity == arity).collect();
        random::choose(rng, &same).map(|f| GpNode::function(f.name.clone()))
    }

    /// Parses a terminal symbol into a constant or a variable reference.
    fn terminal_instruction(&self, symbol: &str) -> Result<Instruction> {
        if let Some(v) = parse_constant(symbol) {
            return Ok(Instruction::Const(v));
        }
        self.variable_index(symbol)
            .map(Instruction::Var)
            .ok_or_else(|| EvolveError::config(format!("unknown GP terminal '{symbol}'")))
    }
}

impl fmt::Debug for PrimitiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let functions: Vec<(&str, usize)> = self
            .functions
            .iter()
            .map(|f| (f.name.as_str(), f.arity))
            .collect();
        f.debug_struct("PrimitiveSet")
            .field("functions", &functions)
            .field("terminals", &self.terminals)
            .finish()
    }
}

/// A terminal is a constant only when it parses to a finite number, so
/// names like `inf` or `nan` stay variables.
fn parse_constant(symbol: &str) -> Option<f64> {
    symbol.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Builds a random GP subtree rooted at `depth`.
///
/// At `max_depth` a terminal is forced. At depth 0 the node is always a
/// function so programs never degenerate into a bare terminal. Elsewhere
/// Grow draws from functions and terminals together, Full only from
/// functions. Ramped is resolved first.
pub fn build_gp_tree(
    primitives: &PrimitiveSet,
    depth: usize,
    max_depth: usize,
    method: TreeMethod,
    rng: &mut EvoRng,
) -> Result<TreeNode<GpNode>> {
    primitives.check_functions()?;
    if primitives.terminals.is_empty() {
        return Err(EvolveError::config("the GP terminal set is empty"));
    }
    if primitives.functions.is_empty() && depth < max_depth {
        return Err(EvolveError::config("the GP function set is empty"));
    }
    let (method, max_depth) = method.resolve(max_depth, rng);
    build_gp_node(primitives, depth, max_depth.max(depth), method, rng)
}

fn build_gp_node(
    primitives: &PrimitiveSet,
    depth: usize,
    max_depth: usize,
    method: TreeMethod,
    rng: &mut EvoRng,
) -> Result<TreeNode<GpNode>> {
    if depth >= max_depth {
        return Ok(TreeNode::leaf(primitives.random_terminal(rng)?));
    }

    let pick_function = match method {
        TreeMethod::Grow if depth > 0 => {
            let total = primitives.functions.len() + primitives.terminals.len();
            rng.random_range(0..total) < primitives.functions.len()
        }
        _ => true,
    };

    if !pick_function {
        return Ok(TreeNode::leaf(primitives.random_terminal(rng)?));
    }

    let (node, arity) = primitives.random_function(rng)?;
    let children = (0..arity)
        .map(|_| build_gp_node(primitives, depth + 1, max_depth, method, rng))
        .collect::<Result<Vec<_>>>()?;
    Ok(TreeNode::with_children(node, children))
}

/// One step of a compiled GP program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Push a constant.
    Const(f64),
    /// Push input `i`.
    Var(usize),
    /// Pop `arity` values, apply function `function`, push the result.
    Call { function: usize, arity: usize },
}

/// A GP tree flattened into postfix order.
#[derive(Clone)]
pub struct Program {
    code: Vec<Instruction>,
    functions: Vec<GpFn>,
    n_vars: usize,
}

impl Program {
    /// Compiles a tree against its primitive set.
    ///
    /// # Errors
    /// Returns [`EvolveError::Configuration`] for symbols missing from the
    /// set and [`EvolveError::InvalidOperation`] for an empty tree or a
    /// node whose child count differs from its arity.
    pub fn compile(tree: &GpTree, primitives: &PrimitiveSet) -> Result<Self> {
        let root = tree
            .root()
            .ok_or_else(|| EvolveError::invalid("cannot compile an empty GP tree"))?;
        primitives.check_functions()?;
        let mut program = Program {
            code: Vec::with_capacity(root.node_count()),
            functions: Vec::new(),
            n_vars: primitives.variables.len(),
        };
        let mut fn_slots: Vec<Option<usize>> = vec![None; primitives.functions.len()];
        program.emit(root, primitives, &mut fn_slots)?;
        Ok(program)
    }

    fn emit(
        &mut self,
        node: &TreeNode<GpNode>,
        primitives: &PrimitiveSet,
        fn_slots: &mut [Option<usize>],
    ) -> Result<()> {
        check_node(node, primitives)?;
        for child in &node.children {
            self.emit(child, primitives, fn_slots)?;
        }
        match node.data.node_type {
            NodeType::Terminal => {
                let ins = primitives.terminal_instruction(&node.data.symbol)?;
                self.code.push(ins);
            }
            NodeType::NonTerminal => {
                let idx = primitives
                    .function_index(&node.data.symbol)
                    .ok_or_else(|| {
                        EvolveError::config(format!("unknown GP function '{}'", node.data.symbol))
                    })?;
                let slot = match fn_slots[idx] {
                    Some(s) => s,
                    None => {
                        self.functions.push(primitives.functions[idx].func.clone());
                        let s = self.functions.len() - 1;
                        fn_slots[idx] = Some(s);
                        s
                    }
                };
                self.code.push(Instruction::Call {
                    function: slot,
                    arity: node.children.len(),
                });
            }
        }
        Ok(())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    /// Runs the program on one input row.
    ///
    /// # Errors
    /// Returns [`EvolveError::Evaluation`] if fewer inputs than variables
    /// are supplied.
    pub fn eval(&self, inputs: &[f64]) -> Result<f64> {
        if inputs.len() < self.n_vars {
            return Err(EvolveError::Evaluation(format!(
                "program expects {} inputs, got {}",
                self.n_vars,
                inputs.len()
            )));
        }
        let mut stack: Vec<f64> = Vec::with_capacity(self.code.len());
        for ins in &self.code {
            match *ins {
                Instruction::Const(v) => stack.push(v),
                Instruction::Var(i) => stack.push(inputs[i]),
                Instruction::Call { function, arity } => {
                    let base = stack.len() - arity;
                    let v = (self.functions[function])(&stack[base..]);
                    stack.truncate(base);
                    stack.push(v);
                }
            }
        }
        stack
            .pop()
            .ok_or_else(|| EvolveError::Evaluation("empty program".into()))
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("code", &self.code)
            .field("n_vars", &self.n_vars)
            .finish()
    }
}

fn check_node(node: &TreeNode<GpNode>, primitives: &PrimitiveSet) -> Result<()> {
    let expected = match node.data.node_type {
        NodeType::Terminal => 0,
        NodeType::NonTerminal => primitives.arity(&node.data.symbol).ok_or_else(|| {
            EvolveError::config(format!("unknown GP function '{}'", node.data.symbol))
        })?,
    };
    if node.children.len() != expected {
        return Err(EvolveError::invalid(format!(
            "GP node '{}' has {} children, expected {expected}",
            node.data.symbol,
            node.children.len()
        )));
    }
    Ok(())
}

impl TreeGenome<GpNode> {
    /// Renders the tree as nested prefix calls, e.g. `add(x, mul(y, 2))`.
    pub fn preorder_expression(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root() {
            write_expression(root, &mut out);
        }
        out
    }

    /// Checks every node's tag and child count against `primitives`.
    pub fn validate(&self, primitives: &PrimitiveSet) -> Result<()> {
        primitives.check_functions()?;
        self.iter().try_for_each(|node| check_node(node, primitives))
    }

    /// Interprets the tree on one input row.
    pub fn evaluate_with(&self, primitives: &PrimitiveSet, inputs: &[f64]) -> Result<f64> {
        let root = self
            .root()
            .ok_or_else(|| EvolveError::invalid("cannot evaluate an empty GP tree"))?;
        interpret(root, primitives, inputs)
    }

    pub fn compile(&self, primitives: &PrimitiveSet) -> Result<Program> {
        Program::compile(self, primitives)
    }
}

fn write_expression(node: &TreeNode<GpNode>, out: &mut String) {
    out.push_str(&node.data.symbol);
    if node.data.node_type == NodeType::NonTerminal {
        out.push('(');
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_expression(child, out);
        }
        out.push(')');
    }
}

fn interpret(node: &TreeNode<GpNode>, primitives: &PrimitiveSet, inputs: &[f64]) -> Result<f64> {
    match node.data.node_type {
        NodeType::Terminal => match primitives.terminal_instruction(&node.data.symbol)? {
            Instruction::Const(v) => Ok(v),
            Instruction::Var(i) => inputs.get(i).copied().ok_or_else(|| {
                EvolveError::Evaluation(format!("missing input for variable '{}'", node.data.symbol))
            }),
            Instruction::Call { .. } => Err(EvolveError::invalid(format!(
                "terminal '{}' resolved to a call",
                node.data.symbol
            ))),
        },
        NodeType::NonTerminal => {
            check_node(node, primitives)?;
            let args = node
                .children
                .iter()
                .map(|c| interpret(c, primitives, inputs))
                .collect::<Result<Vec<f64>>>()?;
            primitives.apply(&node.data.symbol, &args)
        }
    }
}
