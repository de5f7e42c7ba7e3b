//! In-memory ugen graph model.
//!
//! A [`Graph`] is the parsed body of one synthdef: an ordered list of
//! [`Ugen`]s plus the shared constant pool their inputs may reference. Every
//! [`Input`] is either a constant-pool reference or an edge to an output slot
//! of another ugen in the same graph.
//!
//! Graphs are built once by the loader (or by hand in tests) through
//! [`Graph::new`], which rejects dangling references. They are never mutated
//! afterwards. Cycles are not rejected at construction; the differ and the tree
//! renderer detect them on their own.

use thiserror::Error;

/// Computation rate of a ugen or of one of its outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rate {
    /// Computed once when the synth starts.
    Scalar,
    /// Computed once per control block.
    Control,
    /// Computed once per sample.
    Audio,
    /// Computed on demand by a demand-rate consumer.
    Demand,
}

impl Rate {
    /// Numeric rate code as stored in SCgf files.
    pub fn code(self) -> u8 {
        match self {
            Rate::Scalar => 0,
            Rate::Control => 1,
            Rate::Audio => 2,
            Rate::Demand => 3,
        }
    }

    /// Parses a numeric rate code, returning `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Rate::Scalar),
            1 => Some(Rate::Control),
            2 => Some(Rate::Audio),
            3 => Some(Rate::Demand),
            _ => None,
        }
    }
}

/// A single ugen input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Input {
    /// Reads a value from the graph's constant pool.
    Constant {
        /// Index into the constant pool.
        index: usize,
    },
    /// Reads an output slot of another ugen.
    Ugen {
        /// Index of the producing ugen.
        node: usize,
        /// Output slot of the producing ugen.
        output: usize,
    },
}

impl Input {
    /// Returns `true` if this input reads from the constant pool.
    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Input::Constant { .. })
    }
}

/// One unit generator in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Ugen {
    /// Class name, e.g. `SinOsc` or `BinaryOpUGen`.
    pub name: String,
    /// Computation rate.
    pub rate: Rate,
    /// Operator selector for ugens that share a class name.
    pub special_index: i16,
    /// Ordered inputs.
    pub inputs: Vec<Input>,
    /// Rate of each output slot.
    pub outputs: Vec<Rate>,
}

impl Ugen {
    /// Creates a ugen with no inputs and a single output at `rate`.
    pub fn new(name: impl Into<String>, rate: Rate) -> Self {
        Self {
            name: name.into(),
            rate,
            special_index: 0,
            inputs: Vec::new(),
            outputs: vec![rate],
        }
    }

    /// Appends a constant-pool input.
    pub fn with_constant(mut self, index: usize) -> Self {
        self.inputs.push(Input::Constant { index });
        self
    }

    /// Appends an input reading output 0 of `node`.
    pub fn with_ugen(mut self, node: usize) -> Self {
        self.inputs.push(Input::Ugen { node, output: 0 });
        self
    }

    /// Sets the special index.
    pub fn with_special_index(mut self, special_index: i16) -> Self {
        self.special_index = special_index;
        self
    }

    /// Replaces the output list.
    pub fn with_outputs(mut self, outputs: Vec<Rate>) -> Self {
        self.outputs = outputs;
        self
    }
}

/// Reasons a ugen graph is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An input references a ugen index past the end of the graph.
    #[error("ugen {ugen} input {input} references ugen {target}, but the graph has {len} ugens")]
    DanglingUgen {
        /// Index of the ugen owning the input.
        ugen: usize,
        /// Position of the input.
        input: usize,
        /// Referenced ugen index.
        target: usize,
        /// Number of ugens in the graph.
        len: usize,
    },

    /// An input references an output slot the producing ugen does not have.
    #[error(
        "ugen {ugen} input {input} reads output {output} of ugen {target}, which has {outputs} outputs"
    )]
    OutputOutOfRange {
        /// Index of the ugen owning the input.
        ugen: usize,
        /// Position of the input.
        input: usize,
        /// Referenced ugen index.
        target: usize,
        /// Referenced output slot.
        output: usize,
        /// Number of outputs on the referenced ugen.
        outputs: usize,
    },

    /// An input references a constant index past the end of the pool.
    #[error(
        "ugen {ugen} input {input} references constant {index}, but the pool has {len} constants"
    )]
    DanglingConstant {
        /// Index of the ugen owning the input.
        ugen: usize,
        /// Position of the input.
        input: usize,
        /// Referenced constant index.
        index: usize,
        /// Number of constants in the pool.
        len: usize,
    },

    /// The graph contains a cycle.
    #[error("ugen graph contains a cycle")]
    Cycle,

    /// A requested root index is not a ugen of this graph.
    #[error("root ugen {root} out of range for a graph of {len} ugens")]
    RootOutOfRange {
        /// Requested root.
        root: usize,
        /// Number of ugens in the graph.
        len: usize,
    },
}

/// An immutable ugen graph with its constant pool.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Graph {
    constants: Vec<f32>,
    ugens: Vec<Ugen>,
}

impl Graph {
    /// Builds a graph, checking that every input points at an existing ugen
    /// output or constant.
    pub fn new(constants: Vec<f32>, ugens: Vec<Ugen>) -> Result<Self, GraphError> {
        for (ugen, u) in ugens.iter().enumerate() {
            for (input, inp) in u.inputs.iter().enumerate() {
                match *inp {
                    Input::Constant { index } => {
                        if index >= constants.len() {
                            return Err(GraphError::DanglingConstant {
                                ugen,
                                input,
                                index,
                                len: constants.len(),
                            });
                        }
                    }
                    Input::Ugen { node, output } => {
                        let Some(target) = ugens.get(node) else {
                            return Err(GraphError::DanglingUgen {
                                ugen,
                                input,
                                target: node,
                                len: ugens.len(),
                            });
                        };
                        if output >= target.outputs.len() {
                            return Err(GraphError::OutputOutOfRange {
                                ugen,
                                input,
                                target: node,
                                output,
                                outputs: target.outputs.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(Self { constants, ugens })
    }

    /// The constant pool.
    #[inline]
    pub fn constants(&self) -> &[f32] {
        &self.constants
    }

    /// All ugens in file order.
    #[inline]
    pub fn ugens(&self) -> &[Ugen] {
        &self.ugens
    }

    /// The ugen at `index`. Panics if out of range.
    #[inline]
    pub fn ugen(&self, index: usize) -> &Ugen {
        &self.ugens[index]
    }

    /// The constant at `index`. Panics if out of range.
    #[inline]
    pub fn constant(&self, index: usize) -> f32 {
        self.constants[index]
    }

    /// Number of ugens.
    #[inline]
    pub fn len(&self) -> usize {
        self.ugens.len()
    }

    /// Returns `true` if the graph has no ugens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ugens.is_empty()
    }

    /// Index of the first ugen that no other ugen reads from.
    ///
    /// Falls back to 0 when every ugen has a consumer, which only happens on a
    /// cyclic graph.
    pub fn root(&self) -> usize {
        let mut consumers = vec![0usize; self.ugens.len()];
        for u in &self.ugens {
            for inp in &u.inputs {
                if let Input::Ugen { node, .. } = *inp {
                    consumers[node] += 1;
                }
            }
        }
        consumers.iter().position(|&c| c == 0).unwrap_or(0)
    }

    /// Orders ugens so that every producer precedes its consumers (Kahn's
    /// algorithm). Returns [`GraphError::Cycle`] if no such order exists.
    pub fn topological_order(&self) -> Result<Vec<usize>, GraphError> {
        let n = self.ugens.len();
        let mut in_degree = vec![0usize; n];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, u) in self.ugens.iter().enumerate() {
            for inp in &u.inputs {
                if let Input::Ugen { node, .. } = *inp {
                    in_degree[i] += 1;
                    consumers[node].push(i);
                }
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).rev().collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for &to in &consumers[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push(to);
                }
            }
        }

        if sorted.len() != n {
            return Err(GraphError::Cycle);
        }
        Ok(sorted)
    }

    /// Checks that no cycle is reachable from `root`, following inputs
    /// depth-first. Cycles elsewhere in the graph are ignored.
    pub fn check_acyclic_from(&self, root: usize) -> Result<(), GraphError> {
        if root >= self.ugens.len() {
            return Err(GraphError::RootOutOfRange {
                root,
                len: self.ugens.len(),
            });
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.ugens.len()];
        // (node, next input position to follow)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::OnPath;

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let Some(input) = self.ugens[node].inputs.get(next) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;
            if let Input::Ugen { node: child, .. } = *input {
                match marks[child] {
                    Mark::OnPath => return Err(GraphError::Cycle),
                    Mark::Done => {}
                    Mark::Unvisited => {
                        marks[child] = Mark::OnPath;
                        stack.push((child, 0));
                    }
                }
            }
        }
        Ok(())
    }
}
