//! Minimal WKT1 parser.
//!
//! Parses the nested `KEYWORD["string", 1.0, CHILD[...]]` syntax into a tree
//! and offers the lookups the validator needs: projection name, parameter
//! values and the spheroid definition. This is deliberately not a complete
//! OGC parser; it accepts the CRS strings emitted for radar composites
//! (PROJCS/GEOGCS, WKT1 and the common ESRI variant).

use crate::error::{GeorefError, Result};

/// One value inside a WKT node.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Str(String),
    Num(f64),
    Node(WktNode),
}

/// A `KEYWORD[...]` element.
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

impl WktNode {
    /// Parse a full WKT string into its root node.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut parser = Parser {
            chars: input.char_indices().peekable(),
            input,
        };
        let node = parser.node()?;
        parser.skip_ws();
        if parser.chars.peek().is_some() {
            return Err(GeorefError::Wkt("trailing content after root node".into()));
        }
        Ok(node)
    }

    /// First string value of this node, typically its name.
    pub fn name(&self) -> Option<&str> {
        self.values.iter().find_map(|v| match v {
            WktValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Depth-first search for the first child node with `keyword`
    /// (case-insensitive).
    pub fn find(&self, keyword: &str) -> Option<&WktNode> {
        for value in &self.values {
            if let WktValue::Node(node) = value {
                if node.keyword.eq_ignore_ascii_case(keyword) {
                    return Some(node);
                }
                if let Some(found) = node.find(keyword) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Numeric value at position `idx` among this node's non-node values.
    pub fn number(&self, idx: usize) -> Option<f64> {
        self.values
            .iter()
            .filter_map(|v| match v {
                WktValue::Num(n) => Some(*n),
                _ => None,
            })
            .nth(idx)
    }

    /// Value of a `PARAMETER["name", value]` child, case-insensitive.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        for value in &self.values {
            if let WktValue::Node(node) = value {
                if node.keyword.eq_ignore_ascii_case("PARAMETER")
                    && node
                        .name()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                {
                    return node.number(0);
                }
                if let Some(found) = node.parameter(name) {
                    return Some(found);
                }
            }
        }
        None
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self
            .chars
            .peek()
            .is_some_and(|(_, c)| c.is_whitespace() || *c == ',')
        {
            self.chars.next();
        }
    }

    fn node(&mut self) -> Result<WktNode> {
        self.skip_ws();
        let start = match self.chars.peek() {
            Some((i, c)) if c.is_ascii_alphabetic() || *c == '_' => *i,
            _ => return Err(GeorefError::Wkt("expected keyword".into())),
        };
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }
        let keyword = self.input[start..end].to_string();

        self.skip_ws();
        match self.chars.next() {
            Some((_, '[')) | Some((_, '(')) => {}
            _ => {
                return Err(GeorefError::Wkt(format!(
                    "keyword '{}' not followed by '['",
                    keyword
                )))
            }
        }

        let mut values = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                None => return Err(GeorefError::Wkt(format!("unterminated '{}'", keyword))),
                Some((_, ']')) | Some((_, ')')) => {
                    self.chars.next();
                    break;
                }
                Some((_, '"')) => values.push(WktValue::Str(self.string()?)),
                Some((_, c)) if c.is_ascii_digit() || *c == '-' || *c == '+' || *c == '.' => {
                    values.push(WktValue::Num(self.number()?))
                }
                Some(_) => values.push(WktValue::Node(self.node()?)),
            }
        }
        Ok(WktNode { keyword, values })
    }

    fn string(&mut self) -> Result<String> {
        self.chars.next(); // opening quote
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(GeorefError::Wkt("unterminated string".into())),
                Some((_, '"')) => {
                    // WKT escapes a quote by doubling it
                    if self.chars.peek().is_some_and(|(_, c)| *c == '"') {
                        self.chars.next();
                        out.push('"');
                    } else {
                        return Ok(out);
                    }
                }
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.chars.peek().map(|(i, _)| *i).unwrap_or(0);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')) {
                break;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }
        self.input[start..end]
            .parse::<f64>()
            .map_err(|_| GeorefError::Wkt(format!("invalid number '{}'", &self.input[start..end])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO_WKT: &str = concat!(
        "PROJCS[\"DMI stereographic\",",
        "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",",
        "SPHEROID[\"WGS 84\",6378137,298.257223563]],",
        "PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],",
        "PROJECTION[\"Polar_Stereographic\"],",
        "PARAMETER[\"latitude_of_origin\",56],",
        "PARAMETER[\"central_meridian\",10.5666],",
        "PARAMETER[\"false_easting\",0],",
        "PARAMETER[\"false_northing\",0],",
        "UNIT[\"metre\",1]]"
    );

    #[test]
    fn test_parse_nested_projcs() {
        let root = WktNode::parse(STEREO_WKT).unwrap();
        assert_eq!(root.keyword, "PROJCS");
        assert_eq!(root.name(), Some("DMI stereographic"));
        assert_eq!(
            root.find("PROJECTION").and_then(|n| n.name()),
            Some("Polar_Stereographic")
        );
        assert_eq!(root.parameter("central_meridian"), Some(10.5666));
        assert_eq!(root.parameter("CENTRAL_MERIDIAN"), Some(10.5666));
    }

    #[test]
    fn test_spheroid_numbers() {
        let root = WktNode::parse(STEREO_WKT).unwrap();
        let spheroid = root.find("SPHEROID").unwrap();
        assert_eq!(spheroid.number(0), Some(6378137.0));
        assert_eq!(spheroid.number(1), Some(298.257223563));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(WktNode::parse("not wkt at all [").is_err());
        assert!(WktNode::parse("PROJCS[\"unterminated\"").is_err());
        assert!(WktNode::parse("").is_err());
    }

    #[test]
    fn test_escaped_quote() {
        let root = WktNode::parse("UNIT[\"deg\"\"ree\",1]").unwrap();
        assert_eq!(root.name(), Some("deg\"ree"));
    }
}
