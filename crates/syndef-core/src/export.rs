//! JSON, Graphviz and XML views of a synthdef.
//!
//! These writers are purely presentational. The JSON form follows the field
//! names SuperCollider tooling uses (`initialParamValues`, `ugenIndex`, ...),
//! with constant inputs written as `ugenIndex: -1`.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::graph::Input;
use crate::synthdef::Synthdef;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSynthdef<'a> {
    name: &'a str,
    constants: &'a [f32],
    initial_param_values: &'a [f32],
    param_names: Vec<JsonParamName<'a>>,
    ugens: Vec<JsonUgen<'a>>,
    variants: Vec<JsonVariant<'a>>,
}

#[derive(Serialize)]
struct JsonParamName<'a> {
    name: &'a str,
    index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonUgen<'a> {
    name: &'a str,
    rate: u8,
    special_index: i16,
    inputs: Vec<JsonInput>,
    outputs: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonInput {
    ugen_index: i64,
    output_index: usize,
}

#[derive(Serialize)]
struct JsonVariant<'a> {
    name: &'a str,
    values: &'a [f32],
}

impl From<Input> for JsonInput {
    fn from(input: Input) -> Self {
        match input {
            Input::Constant { index } => JsonInput {
                ugen_index: -1,
                output_index: index,
            },
            Input::Ugen { node, output } => JsonInput {
                ugen_index: node as i64,
                output_index: output,
            },
        }
    }
}

impl<'a> From<&'a Synthdef> for JsonSynthdef<'a> {
    fn from(def: &'a Synthdef) -> Self {
        JsonSynthdef {
            name: &def.name,
            constants: def.graph.constants(),
            initial_param_values: &def.param_values,
            param_names: def
                .param_names
                .iter()
                .map(|p| JsonParamName {
                    name: &p.name,
                    index: p.index,
                })
                .collect(),
            ugens: def
                .graph
                .ugens()
                .iter()
                .map(|u| JsonUgen {
                    name: &u.name,
                    rate: u.rate.code(),
                    special_index: u.special_index,
                    inputs: u.inputs.iter().copied().map(JsonInput::from).collect(),
                    outputs: u.outputs.iter().map(|r| r.code()).collect(),
                })
                .collect(),
            variants: def
                .variants
                .iter()
                .map(|v| JsonVariant {
                    name: &v.name,
                    values: &v.values,
                })
                .collect(),
        }
    }
}

/// Writes `def` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(def: &Synthdef, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, &JsonSynthdef::from(def))?;
    writeln!(out)?;
    Ok(())
}

/// Writes `def` as a Graphviz digraph.
///
/// Each ugen becomes a node `u{index}`; each constant input becomes its own
/// box node so shared constants do not collapse distinct edges. Edges run from
/// producer to consumer and are labelled with the input position.
pub fn write_dot<W: Write>(def: &Synthdef, mut out: W) -> Result<()> {
    let g = &def.graph;
    writeln!(out, "digraph \"{}\" {{", dot_escape(&def.name))?;
    writeln!(out, "  rankdir=BT;")?;
    for (i, u) in g.ugens().iter().enumerate() {
        writeln!(out, "  u{i} [label=\"{}({i})\"];", dot_escape(&u.name))?;
    }
    for (i, u) in g.ugens().iter().enumerate() {
        for (k, input) in u.inputs.iter().enumerate() {
            match *input {
                Input::Constant { index } => {
                    writeln!(
                        out,
                        "  c{i}_{k} [shape=box, label=\"{:.6}\"];",
                        g.constant(index)
                    )?;
                    writeln!(out, "  c{i}_{k} -> u{i} [label=\"{k}\"];")?;
                }
                Input::Ugen { node, output } => {
                    writeln!(out, "  u{node} -> u{i} [label=\"{k}\", taillabel=\"{output}\"];")?;
                }
            }
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Writes `def` as an XML document.
pub fn write_xml<W: Write>(def: &Synthdef, mut out: W) -> Result<()> {
    let g = &def.graph;
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<synthdef name="{}">"#, xml_escape(&def.name))?;

    writeln!(out, "  <constants>")?;
    for (i, c) in g.constants().iter().enumerate() {
        writeln!(out, r#"    <constant index="{i}" value="{c}"/>"#)?;
    }
    writeln!(out, "  </constants>")?;

    writeln!(out, "  <params>")?;
    for (i, v) in def.param_values.iter().enumerate() {
        writeln!(out, r#"    <param index="{i}" value="{v}"/>"#)?;
    }
    for p in &def.param_names {
        writeln!(
            out,
            r#"    <paramName name="{}" index="{}"/>"#,
            xml_escape(&p.name),
            p.index
        )?;
    }
    writeln!(out, "  </params>")?;

    writeln!(out, "  <ugens>")?;
    for (i, u) in g.ugens().iter().enumerate() {
        writeln!(
            out,
            r#"    <ugen index="{i}" name="{}" rate="{}" specialIndex="{}">"#,
            xml_escape(&u.name),
            u.rate.code(),
            u.special_index
        )?;
        for (k, input) in u.inputs.iter().enumerate() {
            match *input {
                Input::Constant { index } => {
                    writeln!(out, r#"      <input index="{k}" constant="{index}"/>"#)?;
                }
                Input::Ugen { node, output } => writeln!(
                    out,
                    r#"      <input index="{k}" ugen="{node}" output="{output}"/>"#
                )?,
            }
        }
        for (k, rate) in u.outputs.iter().enumerate() {
            writeln!(out, r#"      <output index="{k}" rate="{}"/>"#, rate.code())?;
        }
        writeln!(out, "    </ugen>")?;
    }
    writeln!(out, "  </ugens>")?;

    writeln!(out, "  <variants>")?;
    for v in &def.variants {
        writeln!(out, r#"    <variant name="{}">"#, xml_escape(&v.name))?;
        for value in &v.values {
            writeln!(out, "      <value>{value}</value>")?;
        }
        writeln!(out, "    </variant>")?;
    }
    writeln!(out, "  </variants>")?;

    writeln!(out, "</synthdef>")?;
    Ok(())
}

fn xml_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
