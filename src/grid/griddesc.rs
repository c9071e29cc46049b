//! GRIDDESC parsing.
//!
//! A GRIDDESC file is IOAPI list-directed text with two segments:
//!
//! ```text
//! ' '                                   <- header, ignored
//! 'LAM_40N97W'                          <- coordinate system name
//!   2 33.000 45.000 -97.000 -97.000 40.000
//! ' '                                   <- end of coordinate systems
//! '12US1'                               <- grid name
//! 'LAM_40N97W' -2556000.0 -1728000.0 12000.0 12000.0 459 299 1
//! ' '                                   <- end of grids
//! ```
//!
//! Tokens are separated by whitespace or commas, strings are single-quoted
//! and `!` starts a comment outside quotes.

use super::GridDefinition;
use super::projection::{Projection, ProjectionParams};
use crate::error::{OpenAqError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load the grid named `grid_name` from a GRIDDESC file
pub fn load_grid(path: &Path, grid_name: &str) -> Result<GridDefinition> {
    let text = fs::read_to_string(path)?;
    let desc = GridDesc::parse(&text, path)?;
    desc.grid(grid_name)
}

/// Grid line of a GRIDDESC grid entry
#[derive(Debug, Clone, PartialEq)]
struct GridEntry {
    coord_name: String,
    xorig: f64,
    yorig: f64,
    xcell: f64,
    ycell: f64,
    ncols: usize,
    nrows: usize,
    nthik: i32,
}

/// All coordinate systems and grids of one GRIDDESC file
#[derive(Debug, Clone)]
pub struct GridDesc {
    path: PathBuf,
    coordinate_systems: HashMap<String, ProjectionParams>,
    grids: HashMap<String, GridEntry>,
}

impl GridDesc {
    /// Parse GRIDDESC text; `path` is only used in error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        // The first line is a header and is never parsed
        let mut lines = text
            .lines()
            .enumerate()
            .skip(1)
            .map(|(index, line)| (index + 1, tokenize(line)))
            .filter(|(_, tokens)| !tokens.is_empty());

        let invalid = |line: usize, reason: String| OpenAqError::InvalidGridDesc {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut coordinate_systems = HashMap::new();
        loop {
            let Some((line, tokens)) = lines.next() else {
                return Err(invalid(
                    text.lines().count(),
                    "unterminated coordinate system segment".to_string(),
                ));
            };
            let name = tokens[0].text().to_string();
            if name.is_empty() {
                break;
            }

            let (param_line, params) = lines.next().ok_or_else(|| {
                invalid(line, format!("coordinate system {} has no parameters", name))
            })?;
            let values = numbers(&params, 6)
                .map_err(|reason| invalid(param_line, format!("{}: {}", name, reason)))?;

            coordinate_systems.insert(
                name,
                ProjectionParams {
                    gdtyp: values[0] as i32,
                    p_alp: values[1],
                    p_bet: values[2],
                    p_gam: values[3],
                    xcent: values[4],
                    ycent: values[5],
                },
            );
        }

        let mut grids = HashMap::new();
        while let Some((line, tokens)) = lines.next() {
            let name = tokens[0].text().to_string();
            if name.is_empty() {
                break;
            }

            let (grid_line, params) = lines
                .next()
                .ok_or_else(|| invalid(line, format!("grid {} has no definition", name)))?;
            let coord_name = params[0].text().to_string();
            if !coordinate_systems.contains_key(&coord_name) {
                return Err(invalid(
                    grid_line,
                    format!(
                        "grid {} uses undefined coordinate system '{}'",
                        name, coord_name
                    ),
                ));
            }
            let values = numbers(&params[1..], 7)
                .map_err(|reason| invalid(grid_line, format!("{}: {}", name, reason)))?;
            if values[4] < 1.0 || values[5] < 1.0 {
                return Err(invalid(
                    grid_line,
                    format!("grid {} must have at least one row and column", name),
                ));
            }

            grids.insert(
                name,
                GridEntry {
                    coord_name,
                    xorig: values[0],
                    yorig: values[1],
                    xcell: values[2],
                    ycell: values[3],
                    ncols: values[4] as usize,
                    nrows: values[5] as usize,
                    nthik: values[6] as i32,
                },
            );
        }

        debug!(
            "Parsed {}: {} coordinate systems, {} grids",
            path.display(),
            coordinate_systems.len(),
            grids.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            coordinate_systems,
            grids,
        })
    }

    /// Names of all grids, sorted
    pub fn grid_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.grids.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the definition of one grid
    pub fn grid(&self, name: &str) -> Result<GridDefinition> {
        let entry = self
            .grids
            .get(name)
            .ok_or_else(|| OpenAqError::GridNotFound {
                name: name.to_string(),
                path: self.path.clone(),
            })?;
        let params = self.coordinate_systems[&entry.coord_name];
        let projection = Projection::from_params(&entry.coord_name, &params)?;

        Ok(GridDefinition {
            name: name.to_string(),
            coord_name: entry.coord_name.clone(),
            params,
            projection,
            xorig: entry.xorig,
            yorig: entry.yorig,
            xcell: entry.xcell,
            ycell: entry.ycell,
            ncols: entry.ncols,
            nrows: entry.nrows,
            nthik: entry.nthik,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Quoted(String),
    Bare(String),
}

impl Token {
    /// Token text, with quoted strings trimmed
    fn text(&self) -> &str {
        match self {
            Token::Quoted(s) => s.trim(),
            Token::Bare(s) => s,
        }
    }
}

/// Split one line into list-directed tokens
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '!' => break,
            '\'' => {
                chars.next();
                let mut quoted = String::new();
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    quoted.push(c);
                }
                tokens.push(Token::Quoted(quoted));
            }
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            _ => {
                let mut bare = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == ',' || c == '\'' || c == '!' {
                        break;
                    }
                    bare.push(c);
                    chars.next();
                }
                tokens.push(Token::Bare(bare));
            }
        }
    }

    tokens
}

/// Parse the first `count` tokens as numbers (Fortran `D` exponents allowed)
fn numbers(tokens: &[Token], count: usize) -> std::result::Result<Vec<f64>, String> {
    if tokens.len() < count {
        return Err(format!(
            "expected {} numeric values, found {}",
            count,
            tokens.len()
        ));
    }

    tokens[..count]
        .iter()
        .map(|token| {
            let text = token.text().replace(['D', 'd'], "E");
            text.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", token.text()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const GRIDDESC_12US1: &str = "' '
'LAM_40N97W'
  2        33.000        45.000       -97.000       -97.000        40.000
'POLSTE_HEMI'
  6         1.000        45.000       -98.000       -98.000        90.000
' '
'12US1'
'LAM_40N97W'  -2556000.000  -1728000.000  12000.000  12000.000 459 299 1
'108NHEMI2'
'POLSTE_HEMI' -10098000.0D0 -10098000.0D0 108000.0D0 108000.0D0 187 187 1
' '
";

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("'LAM_40N97W'  -2556000.000, 12000.0 459 ! comment");
        assert_eq!(
            tokens,
            vec![
                Token::Quoted("LAM_40N97W".to_string()),
                Token::Bare("-2556000.000".to_string()),
                Token::Bare("12000.0".to_string()),
                Token::Bare("459".to_string()),
            ]
        );
        assert_eq!(tokenize("' '")[0].text(), "");
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_parse_standard_griddesc() {
        let desc = GridDesc::parse(GRIDDESC_12US1, Path::new("GRIDDESC")).unwrap();
        assert_eq!(desc.grid_names(), vec!["108NHEMI2", "12US1"]);

        let grid = desc.grid("12US1").unwrap();
        assert_eq!(grid.name, "12US1");
        assert_eq!(grid.coord_name, "LAM_40N97W");
        assert_eq!(grid.params.gdtyp, 2);
        assert_eq!(grid.params.p_alp, 33.0);
        assert_eq!(grid.params.p_bet, 45.0);
        assert_eq!(grid.xorig, -2556000.0);
        assert_eq!(grid.yorig, -1728000.0);
        assert_eq!(grid.xcell, 12000.0);
        assert_eq!(grid.ncols, 459);
        assert_eq!(grid.nrows, 299);
        assert_eq!(grid.nthik, 1);
    }

    #[test]
    fn test_parse_fortran_exponents() {
        let desc = GridDesc::parse(GRIDDESC_12US1, Path::new("GRIDDESC")).unwrap();
        let grid = desc.grid("108NHEMI2").unwrap();
        assert_eq!(grid.params.gdtyp, 6);
        assert_eq!(grid.xorig, -10098000.0);
        assert_eq!(grid.xcell, 108000.0);
        assert_eq!(grid.ncols, 187);
    }

    #[test]
    fn test_unknown_grid() {
        let desc = GridDesc::parse(GRIDDESC_12US1, Path::new("GRIDDESC")).unwrap();
        match desc.grid("36US3") {
            Err(OpenAqError::GridNotFound { name, .. }) => assert_eq!(name, "36US3"),
            other => panic!("Expected GridNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_with_undefined_coordinate_system() {
        let text = "' '\n' '\n'BAD'\n'NOPE' 0 0 1 1 2 2 1\n' '\n";
        match GridDesc::parse(text, Path::new("GRIDDESC")) {
            Err(OpenAqError::InvalidGridDesc { line, reason, .. }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("NOPE"));
            }
            other => panic!("Expected InvalidGridDesc, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_number() {
        let text = "' '\n'LAM'\n2 33 45 -97 -97 abc\n' '\n";
        match GridDesc::parse(text, Path::new("GRIDDESC")) {
            Err(OpenAqError::InvalidGridDesc { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("abc"));
            }
            other => panic!("Expected InvalidGridDesc, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_segment_may_end_at_eof() {
        let text = "' '\n'LL'\n1 0 0 0 0 0\n' '\n'GLOBAL1'\n'LL' -180 -90 1 1 360 180 0\n";
        let desc = GridDesc::parse(text, Path::new("GRIDDESC")).unwrap();
        let grid = desc.grid("GLOBAL1").unwrap();
        assert_eq!(grid.ncols, 360);
        assert_eq!(grid.nrows, 180);
    }

    #[test]
    fn test_load_grid_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", GRIDDESC_12US1).unwrap();

        let grid = load_grid(file.path(), "12US1").unwrap();
        assert_eq!((grid.ncols, grid.nrows), (459, 299));
    }

    #[test]
    fn test_load_grid_missing_file() {
        let result = load_grid(Path::new("/nonexistent/GRIDDESC"), "12US1");
        assert!(matches!(result, Err(OpenAqError::Io(_))));
    }
}
