//! Parser for Agilent (Varian) `procpar` parameter tables.
//!
//! Each parameter is a record of three parts. A header line holds the name
//! and 10 attributes, including whether the values are real or strings.
//! Then comes the number of values followed by the values, and finally the
//! number of allowed values followed by the allowed values. Strings are
//! double quoted, and multiple string values go one per line.
//!
//! ```text
//! np 7 1 1000000 32 2 2 1 0 1 64
//! 1 256
//! 0
//! seqcon 2 2 5 0 0 2 1 0 1 64
//! 1 "nccnn"
//! 0
//! ```

use crate::error::{NiftiError, Result};
use quick_error::ResultExt;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Whether a parameter holds real numbers or strings.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ParameterKind {
    /// Real values, basic type 1.
    Real,
    /// String values, basic type 2.
    String,
}

impl ParameterKind {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ParameterKind::Real),
            2 => Some(ParameterKind::String),
            _ => None,
        }
    }

    fn code(self) -> i64 {
        match self {
            ParameterKind::Real => 1,
            ParameterKind::String => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ParameterKind::Real => "real",
            ParameterKind::String => "string",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
enum Values {
    Real(Vec<f64>),
    String(Vec<String>),
}

impl Values {
    fn len(&self) -> usize {
        match self {
            Values::Real(v) => v.len(),
            Values::String(v) => v.len(),
        }
    }

    fn empty(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Real => Values::Real(Vec::new()),
            ParameterKind::String => Values::String(Vec::new()),
        }
    }
}

/// A single parameter of a table.
#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    name: String,
    subtype: i64,
    max: f64,
    min: f64,
    step: f64,
    ggroup: i64,
    dgroup: i64,
    protection: i64,
    active: i64,
    intptr: i64,
    values: Values,
    allowed: Values,
}

impl Parameter {
    /// A real parameter with the given subtype and values.
    pub fn real(name: &str, subtype: i64, values: Vec<f64>) -> Self {
        Self::with_values(name, subtype, Values::Real(values))
    }

    /// A string parameter with the given subtype and values.
    pub fn string(name: &str, subtype: i64, values: Vec<String>) -> Self {
        Self::with_values(name, subtype, Values::String(values))
    }

    fn with_values(name: &str, subtype: i64, values: Values) -> Self {
        let allowed = match values {
            Values::Real(_) => Values::Real(Vec::new()),
            Values::String(_) => Values::String(Vec::new()),
        };
        Parameter {
            name: name.to_string(),
            subtype,
            max: 0.,
            min: 0.,
            step: 0.,
            ggroup: 0,
            dgroup: 0,
            protection: 0,
            active: 1,
            intptr: 0,
            values,
            allowed,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the values are real or strings.
    pub fn kind(&self) -> ParameterKind {
        match self.values {
            Values::Real(_) => ParameterKind::Real,
            Values::String(_) => ParameterKind::String,
        }
    }

    /// The subtype code.
    pub fn subtype(&self) -> i64 {
        self.subtype
    }

    /// The name of the subtype.
    pub fn subtype_name(&self) -> &'static str {
        match self.subtype {
            1 => "Real",
            2 => "String",
            3 => "Delay",
            4 => "Flag",
            5 => "Frequency",
            6 => "Pulse",
            7 => "Integer",
            _ => "",
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allowed values. Zero means any value is allowed.
    pub fn allowed_len(&self) -> usize {
        self.allowed.len()
    }

    fn wrong_kind(&self, expected: ParameterKind) -> NiftiError {
        NiftiError::ParameterType(self.name.clone(), expected.name())
    }

    fn bad_index(&self, index: usize) -> NiftiError {
        NiftiError::ParameterIndex {
            name: self.name.clone(),
            index,
            len: self.len(),
        }
    }

    /// All real values.
    ///
    /// # Errors
    ///
    /// `ParameterType` if the parameter holds strings.
    pub fn real_values(&self) -> Result<&[f64]> {
        match &self.values {
            Values::Real(v) => Ok(v),
            Values::String(_) => Err(self.wrong_kind(ParameterKind::Real)),
        }
    }

    /// The real value at `index`.
    ///
    /// # Errors
    ///
    /// `ParameterType` if the parameter holds strings, `ParameterIndex` if
    /// `index` is out of range.
    pub fn real_value(&self, index: usize) -> Result<f64> {
        self.real_values()?
            .get(index)
            .copied()
            .ok_or_else(|| self.bad_index(index))
    }

    /// All string values.
    ///
    /// # Errors
    ///
    /// `ParameterType` if the parameter holds reals.
    pub fn string_values(&self) -> Result<&[String]> {
        match &self.values {
            Values::String(v) => Ok(v),
            Values::Real(_) => Err(self.wrong_kind(ParameterKind::String)),
        }
    }

    /// The string value at `index`.
    ///
    /// # Errors
    ///
    /// `ParameterType` if the parameter holds reals, `ParameterIndex` if
    /// `index` is out of range.
    pub fn string_value(&self, index: usize) -> Result<&str> {
        self.string_values()?
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.bad_index(index))
    }
}

fn write_values(f: &mut fmt::Formatter, values: &Values) -> fmt::Result {
    write!(f, "{}", values.len())?;
    match values {
        Values::Real(v) => {
            for x in v {
                write!(f, " {}", x)?;
            }
        }
        Values::String(v) => {
            for (i, s) in v.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, " \"{}\"", s.replace('"', "\\\""))?;
            }
        }
    }
    writeln!(f)
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {}",
            self.name,
            self.subtype,
            self.kind().code(),
            self.max,
            self.min,
            self.step,
            self.ggroup,
            self.dgroup,
            self.protection,
            self.active,
            self.intptr
        )?;
        write_values(f, &self.values)?;
        write_values(f, &self.allowed)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
}

/// Splits the text into words and quoted strings, keeping line numbers.
struct Tokens<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Tokens {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        while let Some(&c) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            let _ = self.chars.next();
        }
        let line = self.line;
        match self.chars.peek() {
            None => Ok(None),
            Some('"') => {
                let _ = self.chars.next();
                let mut s = String::new();
                loop {
                    match self.chars.next() {
                        None => {
                            return Err(NiftiError::Procpar(line, "unterminated string".to_string()))
                        }
                        Some('"') => break,
                        Some('\\') if self.chars.peek() == Some(&'"') => {
                            let _ = self.chars.next();
                            s.push('"');
                        }
                        Some(c) => {
                            if c == '\n' {
                                self.line += 1;
                            }
                            s.push(c);
                        }
                    }
                }
                Ok(Some((line, Token::Quoted(s))))
            }
            Some(_) => {
                let mut s = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    s.push(c);
                    let _ = self.chars.next();
                }
                Ok(Some((line, Token::Word(s))))
            }
        }
    }

    fn word(&mut self, what: &str) -> Result<(usize, String)> {
        match self.next_token()? {
            Some((line, Token::Word(w))) => Ok((line, w)),
            Some((line, Token::Quoted(_))) => Err(NiftiError::Procpar(
                line,
                format!("expected {}, found a string", what),
            )),
            None => Err(NiftiError::Procpar(
                self.line,
                format!("unexpected end of input, expected {}", what),
            )),
        }
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let (line, w) = self.word(what)?;
        w.parse()
            .map_err(|_| NiftiError::Procpar(line, format!("bad {} `{}`", what, w)))
    }

    fn values(&mut self, kind: ParameterKind, what: &str) -> Result<Values> {
        let count: usize = self.number(what)?;
        let mut values = Values::empty(kind);
        for _ in 0..count {
            match &mut values {
                Values::Real(v) => v.push(self.number("real value")?),
                Values::String(v) => match self.next_token()? {
                    Some((_, Token::Quoted(s))) => v.push(s),
                    Some((line, Token::Word(w))) => {
                        return Err(NiftiError::Procpar(
                            line,
                            format!("expected a quoted string, found `{}`", w),
                        ))
                    }
                    None => {
                        return Err(NiftiError::Procpar(
                            self.line,
                            "unexpected end of input, expected a string".to_string(),
                        ))
                    }
                },
            }
        }
        Ok(values)
    }
}

/// A table of named parameters.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct ProcPar {
    parameters: BTreeMap<String, Parameter>,
}

impl ProcPar {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from the given text.
    ///
    /// # Errors
    ///
    /// `Procpar` with the offending line if a record is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let mut table = ProcPar::new();
        while let Some((line, first)) = tokens.next_token()? {
            let name = match first {
                Token::Word(w) => w,
                Token::Quoted(_) => {
                    return Err(NiftiError::Procpar(line, "expected a parameter name".to_string()))
                }
            };
            // a trailing line which is not a full record ends the table
            let mut attrs = Vec::with_capacity(10);
            while attrs.len() < 10 {
                match tokens.next_token()? {
                    Some((_, Token::Word(w))) => attrs.push(w),
                    Some((l, Token::Quoted(_))) => {
                        return Err(NiftiError::Procpar(
                            l,
                            "unexpected string in header".to_string(),
                        ))
                    }
                    None => {
                        log::debug!("Ignoring incomplete record `{}` at line {}", name, line);
                        return Ok(table);
                    }
                }
            }
            let num = |i: usize, what: &str| -> Result<f64> {
                attrs[i]
                    .parse()
                    .map_err(|_| NiftiError::Procpar(line, format!("bad {} `{}`", what, attrs[i])))
            };
            let int = |i: usize, what: &str| -> Result<i64> { num(i, what).map(|v| v as i64) };
            let kind = ParameterKind::from_code(int(1, "basic type")?).ok_or_else(|| {
                NiftiError::Procpar(line, format!("unknown basic type `{}`", attrs[1]))
            })?;
            let mut param = Parameter {
                name,
                subtype: int(0, "subtype")?,
                max: num(2, "maximum")?,
                min: num(3, "minimum")?,
                step: num(4, "step")?,
                ggroup: int(5, "Ggroup")?,
                dgroup: int(6, "Dgroup")?,
                protection: int(7, "protection")?,
                active: int(8, "active flag")?,
                intptr: int(9, "intptr")?,
                values: Values::empty(kind),
                allowed: Values::empty(kind),
            };
            param.values = tokens.values(kind, "value count")?;
            param.allowed = tokens.values(kind, "allowed value count")?;
            let _ = table.insert(param);
        }
        Ok(table)
    }

    /// Read a table from a byte source.
    pub fn from_reader<R: Read>(mut source: R) -> Result<Self> {
        let mut text = String::new();
        let _ = source.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Read a table from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut text = String::new();
        let _ = BufReader::new(File::open(path).context(path)?)
            .read_to_string(&mut text)
            .context(path)?;
        Self::parse(&text)
    }

    /// Whether a parameter with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Add a parameter, returning the one it replaced.
    pub fn insert(&mut self, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(parameter.name.clone(), parameter)
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.parameters.remove(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Parameter names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// The parameter with this name.
    ///
    /// # Errors
    ///
    /// `MissingParameter` if there is none.
    pub fn parameter(&self, name: &str) -> Result<&Parameter> {
        self.parameters
            .get(name)
            .ok_or_else(|| NiftiError::MissingParameter(name.to_string()))
    }

    /// Shorthand for the real value at `index` of a parameter.
    pub fn real_value(&self, name: &str, index: usize) -> Result<f64> {
        self.parameter(name)?.real_value(index)
    }

    /// Shorthand for all real values of a parameter.
    pub fn real_values(&self, name: &str) -> Result<&[f64]> {
        self.parameter(name)?.real_values()
    }

    /// Shorthand for the string value at `index` of a parameter.
    pub fn string_value(&self, name: &str, index: usize) -> Result<&str> {
        self.parameter(name)?.string_value(index)
    }

    /// Shorthand for all string values of a parameter.
    pub fn string_values(&self, name: &str) -> Result<&[String]> {
        self.parameter(name)?.string_values()
    }
}

impl fmt::Display for ProcPar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for p in self.parameters.values() {
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
np 7 1 1000000 32 2 2 1 0 1 64
1 256
0
seqcon 2 2 5 0 0 2 1 0 1 64
1 \"nccnn\"
0
pss 1 1 1e+18 -1e+18 0 2 1 0 1 64
3 -1.5 0 1.5
0
comment 2 2 256 0 0 2 1 0 1 64
2 \"first line\"
\"with a \\\"quote\\\"\"
2 \"a\" \"b\"
";

    #[test]
    fn parse_sample() {
        let pp = ProcPar::parse(SAMPLE).unwrap();
        assert_eq!(pp.len(), 4);
        assert_eq!(pp.real_value("np", 0).unwrap(), 256.);
        assert_eq!(pp.parameter("np").unwrap().subtype_name(), "Integer");
        assert_eq!(pp.string_value("seqcon", 0).unwrap(), "nccnn");
        assert_eq!(pp.real_values("pss").unwrap(), &[-1.5, 0., 1.5]);
        let comment = pp.parameter("comment").unwrap();
        assert_eq!(comment.kind(), ParameterKind::String);
        assert_eq!(comment.string_value(1).unwrap(), "with a \"quote\"");
        assert_eq!(comment.allowed_len(), 2);
        assert_eq!(pp.names().collect::<Vec<_>>(), vec!["comment", "np", "pss", "seqcon"]);
    }

    #[test]
    fn access_errors() {
        let pp = ProcPar::parse(SAMPLE).unwrap();
        assert!(matches!(pp.parameter("nv"), Err(NiftiError::MissingParameter(_))));
        assert!(matches!(
            pp.string_value("np", 0),
            Err(NiftiError::ParameterType(..))
        ));
        assert!(matches!(
            pp.real_value("pss", 3),
            Err(NiftiError::ParameterIndex { index: 3, len: 3, .. })
        ));
    }

    #[test]
    fn display_parses_back() {
        let pp = ProcPar::parse(SAMPLE).unwrap();
        let text = pp.to_string();
        assert_eq!(ProcPar::parse(&text).unwrap(), pp);
    }

    #[test]
    fn trailing_line_is_ignored() {
        let text = format!("{}\n1\n", SAMPLE);
        assert_eq!(ProcPar::parse(&text).unwrap().len(), 4);
    }

    #[test]
    fn malformed_records() {
        let err = ProcPar::parse("np 7 1 1000000 32 2 2 1 0 1 64\n1 abc\n0\n").unwrap_err();
        assert!(matches!(err, NiftiError::Procpar(2, _)));
        let err = ProcPar::parse("np 7 9 1000000 32 2 2 1 0 1 64\n1 1\n0\n").unwrap_err();
        assert!(matches!(err, NiftiError::Procpar(1, _)));
        let err = ProcPar::parse("s 2 2 5 0 0 2 1 0 1 64\n1 \"open\n0\n").unwrap_err();
        assert!(matches!(err, NiftiError::Procpar(2, _)));
    }

    #[test]
    fn insert_and_remove() {
        let mut pp = ProcPar::new();
        assert!(pp.is_empty());
        assert!(pp
            .insert(Parameter::string("apptype", 2, vec!["im2D".to_string()]))
            .is_none());
        assert!(pp.contains("apptype"));
        assert!(pp.remove("apptype").is_some());
        assert!(!pp.contains("apptype"));
    }
}
