//! SCgf synthdef file format.
//!
//! A synthdef file holds one or more named definitions, each a ugen graph
//! with its constant pool, control parameters and optional parameter presets
//! ("variants"). All numbers are big-endian. Version 1 files store counts and
//! indices as 16-bit integers; version 2 widens them to 32 bits.
//!
//! An input whose ugen index is `-1` reads from the constant pool, with the
//! following index naming the constant. It decodes to [`Input::Constant`].

use std::path::Path;

use thiserror::Error;

use crate::error::Error;
use crate::graph::{Graph, GraphError, Input, Rate, Ugen};

/// File magic.
pub const MAGIC: &[u8; 4] = b"SCgf";

/// Highest file version understood by [`read_synthdefs`] and written by
/// [`write_synthdefs`].
pub const VERSION: i32 = 2;

/// A named control parameter, pointing into [`Synthdef::param_values`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamName {
    /// Control name.
    pub name: String,
    /// Index of the first value belonging to this control.
    pub index: usize,
}

/// A named set of parameter values.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    /// Variant name, e.g. `default.alt`.
    pub name: String,
    /// One value per parameter.
    pub values: Vec<f32>,
}

/// One synth definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Synthdef {
    /// Definition name.
    pub name: String,
    /// Ugen graph and constant pool.
    pub graph: Graph,
    /// Initial parameter values.
    pub param_values: Vec<f32>,
    /// Named controls.
    pub param_names: Vec<ParamName>,
    /// Parameter presets.
    pub variants: Vec<Variant>,
}

impl Synthdef {
    /// Creates a definition with no parameters or variants.
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            graph,
            param_values: Vec::new(),
            param_names: Vec::new(),
            variants: Vec::new(),
        }
    }
}

/// Errors raised while decoding an SCgf file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The file does not start with `SCgf`.
    #[error("not a synthdef file (magic {0:?})")]
    BadMagic([u8; 4]),

    /// The file version is not 1 or 2.
    #[error("unsupported synthdef version {0}")]
    UnsupportedVersion(i32),

    /// The file ended in the middle of a field.
    #[error("unexpected end of file at byte {offset} (needed {needed} more bytes)")]
    UnexpectedEof {
        /// Byte offset of the truncated field.
        offset: usize,
        /// Bytes the field required.
        needed: usize,
    },

    /// A name is not valid UTF-8.
    #[error("invalid UTF-8 in name at byte {offset}")]
    InvalidName {
        /// Byte offset of the name.
        offset: usize,
    },

    /// A count or index field is negative.
    #[error("negative {what} ({value}) at byte {offset}")]
    Negative {
        /// Field description.
        what: &'static str,
        /// Decoded value.
        value: i32,
        /// Byte offset of the field.
        offset: usize,
    },

    /// A rate byte is not one of the known rates.
    #[error("unknown rate {code} at byte {offset}")]
    UnknownRate {
        /// Decoded rate code.
        code: u8,
        /// Byte offset of the field.
        offset: usize,
    },

    /// A definition's graph has dangling references.
    #[error("malformed graph in synthdef '{name}': {source}")]
    MalformedGraph {
        /// Definition name.
        name: String,
        /// What is wrong with the graph.
        #[source]
        source: GraphError,
    },

    /// The file holds no definitions.
    #[error("file contains no synthdefs")]
    NoDefinitions,

    /// No definition has the requested name.
    #[error("synthdef '{0}' not found")]
    DefinitionNotFound(String),
}

/// Errors raised while encoding definitions that SCgf cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A count or index does not fit its field.
    #[error("{what} {value} does not fit in a {bits}-bit field")]
    Overflow {
        /// Field description.
        what: &'static str,
        /// Value that overflowed.
        value: usize,
        /// Width of the field.
        bits: u32,
    },

    /// A name is longer than the 255 bytes a pstring holds.
    #[error("name '{name}' is {len} bytes, longer than 255")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Its length in bytes.
        len: usize,
    },

    /// A variant does not carry one value per parameter.
    #[error("variant '{name}' has {values} values but the synthdef has {params} parameters")]
    VariantLength {
        /// Variant name.
        name: String,
        /// Values in the variant.
        values: usize,
        /// Parameters in the synthdef.
        params: usize,
    },
}

/// Decodes every definition in an SCgf byte buffer.
pub fn read_synthdefs(data: &[u8]) -> Result<Vec<Synthdef>, LoadError> {
    let mut r = Reader { data, pos: 0 };

    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(LoadError::BadMagic([magic[0], magic[1], magic[2], magic[3]]));
    }
    let version = r.i32()?;
    let wide = match version {
        1 => false,
        2 => true,
        v => return Err(LoadError::UnsupportedVersion(v)),
    };

    let count = r.i16()?;
    let count = non_negative(i32::from(count), "synthdef count", r.pos - 2)?;
    let mut defs = Vec::with_capacity(r.capacity(count));
    for _ in 0..count {
        defs.push(r.synthdef(wide)?);
    }
    tracing::debug!(version, defs = defs.len(), "decoded SCgf");
    Ok(defs)
}

/// Reads a synthdef file and returns the definition called `name`, or the
/// first definition when `name` is `None`.
pub fn load_synthdef(path: impl AsRef<Path>, name: Option<&str>) -> Result<Synthdef, Error> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::read_file(path, e))?;
    let defs = read_synthdefs(&data)?;
    tracing::debug!(path = %path.display(), defs = defs.len(), "loaded synthdef file");

    let def = match name {
        Some(name) => defs
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| LoadError::DefinitionNotFound(name.to_string()))?,
        None => defs.into_iter().next().ok_or(LoadError::NoDefinitions)?,
    };
    Ok(def)
}

/// Encodes definitions as a version 2 SCgf file.
///
/// Fails rather than writing a file that would not decode back to `defs`.
pub fn write_synthdefs(defs: &[Synthdef]) -> Result<Vec<u8>, EncodeError> {
    let mut w = Writer::default();
    w.buf.extend_from_slice(MAGIC);
    w.i32(VERSION);
    w.short(defs.len(), "synthdef count")?;
    for def in defs {
        w.synthdef(def)?;
    }
    Ok(w.buf)
}

fn non_negative(value: i32, what: &'static str, offset: usize) -> Result<usize, LoadError> {
    usize::try_from(value).map_err(|_| LoadError::Negative {
        what,
        value,
        offset,
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Preallocation bound for `n` declared items: each takes at least one
    /// byte, so never more than the bytes left.
    fn capacity(&self, n: usize) -> usize {
        n.min(self.data.len() - self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(LoadError::UnexpectedEof {
                offset: self.pos,
                needed: n,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    fn i16(&mut self) -> Result<i16, LoadError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> Result<i32, LoadError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> Result<f32, LoadError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// A 16- or 32-bit signed integer depending on the file version.
    fn int(&mut self, wide: bool) -> Result<i32, LoadError> {
        if wide {
            self.i32()
        } else {
            self.i16().map(i32::from)
        }
    }

    fn count(&mut self, wide: bool, what: &'static str) -> Result<usize, LoadError> {
        let offset = self.pos;
        let value = self.int(wide)?;
        non_negative(value, what, offset)
    }

    fn pstring(&mut self) -> Result<String, LoadError> {
        let offset = self.pos;
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| LoadError::InvalidName { offset })
    }

    fn rate(&mut self) -> Result<Rate, LoadError> {
        let offset = self.pos;
        let code = self.u8()?;
        Rate::from_code(code).ok_or(LoadError::UnknownRate { code, offset })
    }

    fn floats(&mut self, n: usize) -> Result<Vec<f32>, LoadError> {
        (0..n).map(|_| self.f32()).collect()
    }

    fn input(&mut self, wide: bool) -> Result<Input, LoadError> {
        let offset = self.pos;
        let ugen = self.int(wide)?;
        let index = self.count(wide, "input index")?;
        if ugen == -1 {
            return Ok(Input::Constant { index });
        }
        let node = non_negative(ugen, "ugen index", offset)?;
        Ok(Input::Ugen {
            node,
            output: index,
        })
    }

    fn ugen(&mut self, wide: bool) -> Result<Ugen, LoadError> {
        let name = self.pstring()?;
        let rate = self.rate()?;
        let num_inputs = self.count(wide, "input count")?;
        let num_outputs = self.count(wide, "output count")?;
        let special_index = self.i16()?;
        let inputs = (0..num_inputs)
            .map(|_| self.input(wide))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = (0..num_outputs)
            .map(|_| self.rate())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ugen {
            name,
            rate,
            special_index,
            inputs,
            outputs,
        })
    }

    fn synthdef(&mut self, wide: bool) -> Result<Synthdef, LoadError> {
        let name = self.pstring()?;

        let num_constants = self.count(wide, "constant count")?;
        let constants = self.floats(num_constants)?;

        let num_params = self.count(wide, "parameter count")?;
        let param_values = self.floats(num_params)?;

        let num_param_names = self.count(wide, "parameter name count")?;
        let mut param_names = Vec::with_capacity(self.capacity(num_param_names));
        for _ in 0..num_param_names {
            let name = self.pstring()?;
            let index = self.count(wide, "parameter index")?;
            param_names.push(ParamName { name, index });
        }

        let num_ugens = self.count(wide, "ugen count")?;
        let mut ugens = Vec::with_capacity(self.capacity(num_ugens));
        for _ in 0..num_ugens {
            ugens.push(self.ugen(wide)?);
        }

        let offset = self.pos;
        let num_variants = non_negative(i32::from(self.i16()?), "variant count", offset)?;
        let mut variants = Vec::with_capacity(self.capacity(num_variants));
        for _ in 0..num_variants {
            let name = self.pstring()?;
            let values = self.floats(num_params)?;
            variants.push(Variant { name, values });
        }

        let graph = Graph::new(constants, ugens).map_err(|source| LoadError::MalformedGraph {
            name: name.clone(),
            source,
        })?;
        tracing::debug!(name = %name, ugens = graph.len(), "decoded synthdef");

        Ok(Synthdef {
            name,
            graph,
            param_values,
            param_names,
            variants,
        })
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn count(&mut self, n: usize, what: &'static str) -> Result<(), EncodeError> {
        let v = i32::try_from(n).map_err(|_| EncodeError::Overflow {
            what,
            value: n,
            bits: 32,
        })?;
        self.i32(v);
        Ok(())
    }

    fn short(&mut self, n: usize, what: &'static str) -> Result<(), EncodeError> {
        let v = i16::try_from(n).map_err(|_| EncodeError::Overflow {
            what,
            value: n,
            bits: 16,
        })?;
        self.i16(v);
        Ok(())
    }

    fn pstring(&mut self, s: &str) -> Result<(), EncodeError> {
        let len = u8::try_from(s.len()).map_err(|_| EncodeError::NameTooLong {
            name: s.to_string(),
            len: s.len(),
        })?;
        self.u8(len);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn synthdef(&mut self, def: &Synthdef) -> Result<(), EncodeError> {
        self.pstring(&def.name)?;

        self.count(def.graph.constants().len(), "constant count")?;
        for &c in def.graph.constants() {
            self.f32(c);
        }

        self.count(def.param_values.len(), "parameter count")?;
        for &v in &def.param_values {
            self.f32(v);
        }

        self.count(def.param_names.len(), "parameter name count")?;
        for p in &def.param_names {
            self.pstring(&p.name)?;
            self.count(p.index, "parameter index")?;
        }

        self.count(def.graph.len(), "ugen count")?;
        for u in def.graph.ugens() {
            self.pstring(&u.name)?;
            self.u8(u.rate.code());
            self.count(u.inputs.len(), "input count")?;
            self.count(u.outputs.len(), "output count")?;
            self.i16(u.special_index);
            for input in &u.inputs {
                match *input {
                    Input::Constant { index } => {
                        self.i32(-1);
                        self.count(index, "constant index")?;
                    }
                    Input::Ugen { node, output } => {
                        self.count(node, "ugen index")?;
                        self.count(output, "output index")?;
                    }
                }
            }
            for rate in &u.outputs {
                self.u8(rate.code());
            }
        }

        self.short(def.variants.len(), "variant count")?;
        for v in &def.variants {
            if v.values.len() != def.param_values.len() {
                return Err(EncodeError::VariantLength {
                    name: v.name.clone(),
                    values: v.values.len(),
                    params: def.param_values.len(),
                });
            }
            self.pstring(&v.name)?;
            for &value in &v.values {
                self.f32(value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_def() -> Synthdef {
        let graph = Graph::new(
            vec![440.0, 0.0],
            vec![
                Ugen::new("Control", Rate::Control),
                Ugen::new("SinOsc", Rate::Audio)
                    .with_ugen(0)
                    .with_constant(1),
                Ugen::new("Out", Rate::Audio)
                    .with_constant(1)
                    .with_ugen(1)
                    .with_outputs(vec![]),
            ],
        )
        .unwrap();
        Synthdef {
            name: "sine".to_string(),
            graph,
            param_values: vec![440.0],
            param_names: vec![ParamName {
                name: "freq".to_string(),
                index: 0,
            }],
            variants: vec![Variant {
                name: "sine.low".to_string(),
                values: vec![110.0],
            }],
        }
    }

    /// Hand-built version 1 file: one def, one constant, one ugen.
    fn v1_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"SCgf");
        b.extend_from_slice(&1i32.to_be_bytes());
        b.extend_from_slice(&1i16.to_be_bytes());
        b.push(3);
        b.extend_from_slice(b"one");
        b.extend_from_slice(&1i16.to_be_bytes()); // constants
        b.extend_from_slice(&220.0f32.to_be_bytes());
        b.extend_from_slice(&0i16.to_be_bytes()); // params
        b.extend_from_slice(&0i16.to_be_bytes()); // param names
        b.extend_from_slice(&1i16.to_be_bytes()); // ugens
        b.push(6);
        b.extend_from_slice(b"SinOsc");
        b.push(2);
        b.extend_from_slice(&1i16.to_be_bytes()); // inputs
        b.extend_from_slice(&1i16.to_be_bytes()); // outputs
        b.extend_from_slice(&0i16.to_be_bytes()); // special index
        b.extend_from_slice(&(-1i16).to_be_bytes());
        b.extend_from_slice(&0i16.to_be_bytes());
        b.push(2);
        b.extend_from_slice(&0i16.to_be_bytes()); // variants
        b
    }

    #[test]
    fn encoded_definition_decodes_unchanged() {
        let def = sine_def();
        let decoded = read_synthdefs(&write_synthdefs(std::slice::from_ref(&def)).unwrap()).unwrap();
        assert_eq!(decoded, vec![def]);
    }

    #[test]
    fn version_one_uses_narrow_fields() {
        let defs = read_synthdefs(&v1_bytes()).unwrap();
        assert_eq!(defs.len(), 1);
        let def = &defs[0];
        assert_eq!(def.name, "one");
        assert_eq!(def.graph.constants(), &[220.0]);
        assert_eq!(def.graph.ugen(0).inputs, vec![Input::Constant { index: 0 }]);
        assert_eq!(def.graph.ugen(0).rate, Rate::Audio);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = v1_bytes();
        bytes[0] = b'X';
        assert_eq!(
            read_synthdefs(&bytes),
            Err(LoadError::BadMagic(*b"XCgf"))
        );
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut bytes = v1_bytes();
        bytes[4..8].copy_from_slice(&3i32.to_be_bytes());
        assert_eq!(read_synthdefs(&bytes), Err(LoadError::UnsupportedVersion(3)));
    }

    #[test]
    fn truncated_file_rejected() {
        let bytes = v1_bytes();
        let err = read_synthdefs(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedEof { .. }), "got: {err}");
    }

    #[test]
    fn unknown_rate_rejected() {
        let mut bytes = v1_bytes();
        // Rate byte follows "SinOsc".
        let pos = bytes.windows(6).position(|w| w == b"SinOsc").unwrap() + 6;
        bytes[pos] = 7;
        assert!(matches!(
            read_synthdefs(&bytes),
            Err(LoadError::UnknownRate { code: 7, .. })
        ));
    }

    #[test]
    fn dangling_constant_reported_as_malformed_graph() {
        let mut bytes = v1_bytes();
        // Constant index of the only input: two bytes before the output rate.
        let len = bytes.len();
        bytes[len - 5..len - 3].copy_from_slice(&4i16.to_be_bytes());
        let err = read_synthdefs(&bytes).unwrap_err();
        assert!(
            matches!(
                err,
                LoadError::MalformedGraph {
                    source: GraphError::DanglingConstant { index: 4, .. },
                    ..
                }
            ),
            "got: {err}"
        );
    }

    #[test]
    fn load_picks_named_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.scsyndef");
        let mut other = sine_def();
        other.name = "other".to_string();
        std::fs::write(&path, write_synthdefs(&[sine_def(), other]).unwrap()).unwrap();

        assert_eq!(load_synthdef(&path, None).unwrap().name, "sine");
        assert_eq!(load_synthdef(&path, Some("other")).unwrap().name, "other");
        let err = load_synthdef(&path, Some("missing")).unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    /// v2 header for one def named "x" with no constants, params or names,
    /// leaving the ugen count for the caller.
    fn v2_prefix() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"SCgf");
        b.extend_from_slice(&2i32.to_be_bytes());
        b.extend_from_slice(&1i16.to_be_bytes());
        b.push(1);
        b.push(b'x');
        b.extend_from_slice(&0i32.to_be_bytes()); // constants
        b.extend_from_slice(&0i32.to_be_bytes()); // params
        b
    }

    #[test]
    fn huge_declared_ugen_count_is_eof_not_abort() {
        let mut bytes = v2_prefix();
        bytes.extend_from_slice(&0i32.to_be_bytes()); // param names
        bytes.extend_from_slice(&i32::MAX.to_be_bytes()); // ugens
        let err = read_synthdefs(&bytes).unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedEof { .. }), "got: {err}");
    }

    #[test]
    fn huge_declared_param_name_count_is_eof_not_abort() {
        let mut bytes = v2_prefix();
        bytes.extend_from_slice(&i32::MAX.to_be_bytes()); // param names
        let err = read_synthdefs(&bytes).unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedEof { .. }), "got: {err}");
    }

    #[test]
    fn long_name_is_not_truncated_on_write() {
        let mut def = sine_def();
        def.name = "n".repeat(256);
        assert_eq!(
            write_synthdefs(&[def]),
            Err(EncodeError::NameTooLong {
                name: "n".repeat(256),
                len: 256
            })
        );
    }

    #[test]
    fn too_many_definitions_rejected_on_write() {
        let defs = vec![Synthdef::new("d", Graph::default()); i16::MAX as usize + 1];
        assert!(matches!(
            write_synthdefs(&defs),
            Err(EncodeError::Overflow {
                what: "synthdef count",
                bits: 16,
                ..
            })
        ));
    }

    #[test]
    fn short_variant_rejected_on_write() {
        let mut def = sine_def();
        def.variants[0].values.clear();
        assert!(matches!(
            write_synthdefs(&[def]),
            Err(EncodeError::VariantLength {
                values: 0,
                params: 1,
                ..
            })
        ));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_synthdef("/nonexistent/x.scsyndef", None).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
