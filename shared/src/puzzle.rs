//! Puzzle solutions: random generation, pre-authored file parsing, and
//! run-length clue derivation.

use log::warn;
use rand::Rng;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors from parsing a pre-authored puzzle file.
#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("missing dimensions header")]
    MissingHeader,

    #[error("malformed dimensions header {0:?}")]
    BadHeader(String),

    #[error("puzzle dimensions must be non-zero")]
    EmptyDimensions,

    #[error("expected {expected} rows, found {found}")]
    MissingRows { expected: u32, found: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A puzzle solution: which cells of the board are filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub width: u32,
    pub height: u32,
    /// `cells[row][col]`, true = filled. Row 0 is the top of the board.
    pub cells: Vec<Vec<bool>>,
}

impl Puzzle {
    /// Parses the puzzle text format: first line `<height> <width>`, then
    /// `height` rows where `'o'` marks a filled cell and any other character
    /// (or a missing trailing character) means empty.
    pub fn parse(text: &str) -> Result<Puzzle, PuzzleError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(PuzzleError::MissingHeader)?;
        let mut dims = header.split_whitespace();
        let mut dim = || -> Result<u32, PuzzleError> {
            dims.next()
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| PuzzleError::BadHeader(header.to_string()))
        };
        let height = dim()?;
        let width = dim()?;
        if width == 0 || height == 0 {
            return Err(PuzzleError::EmptyDimensions);
        }

        let mut cells = Vec::with_capacity(height as usize);
        for _ in 0..height {
            let line = lines.next().ok_or(PuzzleError::MissingRows {
                expected: height,
                found: cells.len() as u32,
            })?;
            let mut row: Vec<bool> = line
                .chars()
                .take(width as usize)
                .map(|c| c == 'o')
                .collect();
            row.resize(width as usize, false);
            cells.push(row);
        }

        Ok(Puzzle {
            width,
            height,
            cells,
        })
    }

    /// Loads one puzzle file.
    pub fn load(path: &Path) -> Result<Puzzle, PuzzleError> {
        Puzzle::parse(&fs::read_to_string(path)?)
    }

    /// Loads every `*.txt` puzzle in a directory. Files that fail to parse
    /// are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Vec<Puzzle>, PuzzleError> {
        let mut puzzles = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "txt") {
                match Puzzle::load(&path) {
                    Ok(puzzle) => puzzles.push(puzzle),
                    Err(e) => warn!("skipping puzzle {}: {}", path.display(), e),
                }
            }
        }
        Ok(puzzles)
    }
}

/// The pre-authored puzzles compiled into the binary.
pub fn builtin_puzzles() -> Vec<Puzzle> {
    let sources = [
        include_str!("../../puzzles/flower.txt"),
        include_str!("../../puzzles/snowglobe.txt"),
    ];
    sources
        .iter()
        .map(|text| Puzzle::parse(text).expect("built-in puzzle must parse"))
        .collect()
}

/// Generates a solution with each cell an independent fair coin.
pub fn random_solution<R: Rng>(rng: &mut R, width: u32, height: u32) -> Vec<Vec<bool>> {
    (0..height)
        .map(|_| (0..width).map(|_| rng.gen_bool(0.5)).collect())
        .collect()
}

/// Run-length clue tables derived from a solution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clues {
    pub width: u32,
    pub height: u32,
    /// One clue list per row, top to bottom.
    pub by_row: Vec<Vec<u32>>,
    /// One clue list per column, left to right.
    pub by_col: Vec<Vec<u32>>,
}

impl Clues {
    /// Derives row and column clues from a solution. Every line gets at
    /// least one entry: a line with no filled cells at all becomes the
    /// single clue `0`.
    pub fn derive(width: u32, height: u32, solution: &[Vec<bool>]) -> Clues {
        let by_row = solution
            .iter()
            .map(|row| line_runs(row.iter().copied()))
            .collect();
        let by_col = (0..width as usize)
            .map(|x| line_runs((0..height as usize).map(|y| solution[y][x])))
            .collect();
        Clues {
            width,
            height,
            by_row,
            by_col,
        }
    }
}

/// Run lengths of contiguous filled cells along one line. The trailing run
/// is flushed at end of line; an all-empty line yields `[0]`.
fn line_runs(cells: impl Iterator<Item = bool>) -> Vec<u32> {
    let mut runs = Vec::new();
    let mut run = 0u32;
    for filled in cells {
        if filled {
            run += 1;
        } else {
            if run > 0 {
                runs.push(run);
            }
            run = 0;
        }
    }
    if run > 0 || runs.is_empty() {
        runs.push(run);
    }
    runs
}
