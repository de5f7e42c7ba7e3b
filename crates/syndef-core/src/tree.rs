//! Box-drawing tree view of a ugen graph.
//!
//! ```text
//! Out(2)
//! ├── 0.000000
//! └── SinOsc(1)
//!     ├── 440.000000
//!     └── 0.000000
//! ```

use crate::graph::{Graph, GraphError, Input};

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Renders `graph` as a tree rooted at `root`.
///
/// Fails up front if `root` is out of range or a cycle is reachable from it;
/// otherwise returns an iterator that produces one line per ugen or constant
/// visited. Cycles the root cannot reach do not matter.
/// Shared subgraphs are printed once per path that reaches them.
pub fn render(graph: &Graph, root: usize) -> Result<TreeLines<'_>, GraphError> {
    graph.check_acyclic_from(root)?;
    Ok(TreeLines {
        graph,
        start: Some(root),
        stack: Vec::new(),
    })
}

/// Collects [`render`] output into a single newline-terminated string.
pub fn render_to_string(graph: &Graph, root: usize) -> Result<String, GraphError> {
    let mut out = String::new();
    for line in render(graph, root)? {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

struct Frame {
    node: usize,
    prefix: String,
    next_input: usize,
}

/// Lazy line iterator returned by [`render`].
pub struct TreeLines<'a> {
    graph: &'a Graph,
    start: Option<usize>,
    stack: Vec<Frame>,
}

impl Iterator for TreeLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(root) = self.start.take() {
            self.stack.push(Frame {
                node: root,
                prefix: String::new(),
                next_input: 0,
            });
            return Some(format!("{}({})", self.graph.ugen(root).name, root));
        }

        loop {
            let frame = self.stack.last_mut()?;
            let inputs = &self.graph.ugen(frame.node).inputs;
            if frame.next_input >= inputs.len() {
                self.stack.pop();
                continue;
            }

            let position = frame.next_input;
            frame.next_input += 1;
            let last = position + 1 == inputs.len();
            let connector = if last { LAST } else { BRANCH };

            return match inputs[position] {
                Input::Constant { index } => Some(format!(
                    "{}{}{:.6}",
                    frame.prefix,
                    connector,
                    self.graph.constant(index)
                )),
                Input::Ugen { node, .. } => {
                    let line = format!(
                        "{}{}{}({})",
                        frame.prefix,
                        connector,
                        self.graph.ugen(node).name,
                        node
                    );
                    let prefix = format!("{}{}", frame.prefix, if last { SPACE } else { PIPE });
                    self.stack.push(Frame {
                        node,
                        prefix,
                        next_input: 0,
                    });
                    Some(line)
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Rate, Ugen};

    #[test]
    fn binary_op_with_constant_operands() {
        let g = Graph::new(
            vec![2.0, 3.0],
            vec![
                Ugen::new("BinaryOpUgen", Rate::Control)
                    .with_constant(0)
                    .with_constant(1),
            ],
        )
        .unwrap();
        let lines: Vec<String> = render(&g, g.root()).unwrap().collect();
        assert_eq!(
            lines,
            vec!["BinaryOpUgen(0)", "├── 2.000000", "└── 3.000000"]
        );
    }

    #[test]
    fn nested_inputs_are_indented() {
        let g = Graph::new(
            vec![440.0, 0.0],
            vec![
                Ugen::new("SinOsc", Rate::Audio)
                    .with_constant(0)
                    .with_constant(1),
                Ugen::new("Pan2", Rate::Audio).with_ugen(0).with_constant(1),
                Ugen::new("Out", Rate::Audio).with_constant(1).with_ugen(1),
            ],
        )
        .unwrap();
        let text = render_to_string(&g, g.root()).unwrap();
        assert_eq!(
            text,
            "Out(2)\n\
             ├── 0.000000\n\
             └── Pan2(1)\n    \
             ├── SinOsc(0)\n    \
             │   ├── 440.000000\n    \
             │   └── 0.000000\n    \
             └── 0.000000\n"
        );
    }

    #[test]
    fn leaf_root_renders_single_line() {
        let g = Graph::new(vec![], vec![Ugen::new("WhiteNoise", Rate::Audio)]).unwrap();
        assert_eq!(render(&g, 0).unwrap().collect::<Vec<_>>(), vec!["WhiteNoise(0)"]);
    }

    #[test]
    fn shared_node_is_printed_per_path() {
        let g = Graph::new(
            vec![1.0],
            vec![
                Ugen::new("DC", Rate::Audio).with_constant(0),
                Ugen::new("Mix", Rate::Audio).with_ugen(0).with_ugen(0),
            ],
        )
        .unwrap();
        let lines: Vec<String> = render(&g, 1).unwrap().collect();
        assert_eq!(
            lines,
            vec![
                "Mix(1)",
                "├── DC(0)",
                "│   └── 1.000000",
                "└── DC(0)",
                "    └── 1.000000",
            ]
        );
    }

    #[test]
    fn cyclic_graph_is_rejected() {
        let g = Graph::new(
            vec![],
            vec![
                Ugen::new("A", Rate::Audio).with_ugen(1),
                Ugen::new("B", Rate::Audio).with_ugen(0),
            ],
        )
        .unwrap();
        assert!(matches!(render(&g, 0), Err(GraphError::Cycle)));
    }

    #[test]
    fn detached_cycle_does_not_block_rendering() {
        let g = Graph::new(
            vec![],
            vec![
                Ugen::new("Out", Rate::Audio).with_ugen(1),
                Ugen::new("SinOsc", Rate::Audio),
                Ugen::new("A", Rate::Audio).with_ugen(3),
                Ugen::new("B", Rate::Audio).with_ugen(2),
            ],
        )
        .unwrap();
        let lines: Vec<String> = render(&g, 0).unwrap().collect();
        assert_eq!(lines, vec!["Out(0)", "└── SinOsc(1)"]);
    }

    #[test]
    fn root_out_of_range_is_rejected() {
        assert!(matches!(
            render(&Graph::default(), 0),
            Err(GraphError::RootOutOfRange { root: 0, len: 0 })
        ));
    }
}
