//! ECC 200 module placement
//!
//! Codewords are laid into the mapping matrix as 8-module "utah" shapes
//! along diagonal sweeps, with four special corner shapes. The same map is
//! used to read a sampled symbol and to draw an encoded one.

use std::sync::OnceLock;

use super::tables::SYMBOL_SIZES;

/// Placement maps of every supported size, indexed like [`SYMBOL_SIZES`]
pub fn placement_for(size_index: usize) -> Option<&'static Placement> {
    static PLACEMENTS: OnceLock<Vec<Placement>> = OnceLock::new();
    PLACEMENTS
        .get_or_init(|| {
            SYMBOL_SIZES
                .iter()
                .map(|s| Placement::new(s.mapping_rows(), s.mapping_cols()))
                .collect()
        })
        .get(size_index)
}

/// Content of one mapping matrix module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Bit of a codeword; `mask` selects it within the byte
    Bit { codeword: usize, mask: u8 },
    /// Lower-right filler module in sizes with 4 spare modules
    Fixed(bool),
}

/// Placement map of a mapping matrix
#[derive(Debug, Clone)]
pub struct Placement {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Cell>>,
    codewords: usize,
}

impl Placement {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut placement = Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            codewords: 0,
        };
        placement.fill();
        placement
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Codewords the map holds
    pub fn codewords(&self) -> usize {
        self.codewords
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells[row * self.cols + col]
    }

    /// Assemble codewords from a mapping matrix reader
    pub fn read(&self, mut module: impl FnMut(usize, usize) -> bool) -> Vec<u8> {
        let mut codewords = vec![0u8; self.codewords];
        for row in 0..self.rows {
            for col in 0..self.cols {
                if let Some(Cell::Bit { codeword, mask }) = self.cell(row, col) {
                    if module(row, col) {
                        codewords[codeword] |= mask;
                    }
                }
            }
        }
        codewords
    }

    /// Module colours for `codewords`, row major
    pub fn draw(&self, codewords: &[u8]) -> Vec<bool> {
        self.cells
            .iter()
            .map(|cell| match cell {
                Some(Cell::Bit { codeword, mask }) => {
                    codewords.get(*codeword).is_some_and(|c| c & mask != 0)
                }
                Some(Cell::Fixed(dark)) => *dark,
                None => false,
            })
            .collect()
    }

    fn fill(&mut self) {
        let (nrow, ncol) = (self.rows as i32, self.cols as i32);
        let mut pos = 0usize;
        let mut row = 4i32;
        let mut col = 0i32;

        loop {
            if row == nrow && col == 0 {
                self.corner(pos, 1);
                pos += 1;
            }
            if row == nrow - 2 && col == 0 && ncol % 4 != 0 {
                self.corner(pos, 2);
                pos += 1;
            }
            if row == nrow - 2 && col == 0 && ncol % 8 == 4 {
                self.corner(pos, 3);
                pos += 1;
            }
            if row == nrow + 4 && col == 2 && ncol % 8 == 0 {
                self.corner(pos, 4);
                pos += 1;
            }

            // Up and to the right
            loop {
                if row < nrow && col >= 0 && self.is_free(row, col) {
                    self.utah(row, col, pos);
                    pos += 1;
                }
                row -= 2;
                col += 2;
                if !(row >= 0 && col < ncol) {
                    break;
                }
            }
            row += 1;
            col += 3;

            // Down and to the left
            loop {
                if row >= 0 && col < ncol && self.is_free(row, col) {
                    self.utah(row, col, pos);
                    pos += 1;
                }
                row += 2;
                col -= 2;
                if !(row < nrow && col >= 0) {
                    break;
                }
            }
            row += 3;
            col += 1;

            if !(row < nrow || col < ncol) {
                break;
            }
        }

        let (r, c) = (self.rows - 1, self.cols - 1);
        if self.cells[r * self.cols + c].is_none() {
            self.cells[r * self.cols + c] = Some(Cell::Fixed(true));
            self.cells[r * self.cols + c - 1] = Some(Cell::Fixed(false));
            self.cells[(r - 1) * self.cols + c] = Some(Cell::Fixed(false));
            self.cells[(r - 1) * self.cols + c - 1] = Some(Cell::Fixed(true));
        }
        self.codewords = pos;
    }

    fn is_free(&self, row: i32, col: i32) -> bool {
        self.cells[row as usize * self.cols + col as usize].is_none()
    }

    /// Place bit `bit` (1 = most significant) of codeword `pos`, wrapping at the edges
    fn module(&mut self, mut row: i32, mut col: i32, pos: usize, bit: u8) {
        let (nrow, ncol) = (self.rows as i32, self.cols as i32);
        if row < 0 {
            row += nrow;
            col += 4 - ((nrow + 4) % 8);
        }
        if col < 0 {
            col += ncol;
            row += 4 - ((ncol + 4) % 8);
        }
        self.cells[row as usize * self.cols + col as usize] = Some(Cell::Bit {
            codeword: pos,
            mask: 1 << (8 - bit),
        });
    }

    fn utah(&mut self, row: i32, col: i32, pos: usize) {
        self.module(row - 2, col - 2, pos, 1);
        self.module(row - 2, col - 1, pos, 2);
        self.module(row - 1, col - 2, pos, 3);
        self.module(row - 1, col - 1, pos, 4);
        self.module(row - 1, col, pos, 5);
        self.module(row, col - 2, pos, 6);
        self.module(row, col - 1, pos, 7);
        self.module(row, col, pos, 8);
    }

    fn corner(&mut self, pos: usize, shape: u8) {
        let (nrow, ncol) = (self.rows as i32, self.cols as i32);
        let modules: [(i32, i32); 8] = match shape {
            1 => [
                (nrow - 1, 0),
                (nrow - 1, 1),
                (nrow - 1, 2),
                (0, ncol - 2),
                (0, ncol - 1),
                (1, ncol - 1),
                (2, ncol - 1),
                (3, ncol - 1),
            ],
            2 => [
                (nrow - 3, 0),
                (nrow - 2, 0),
                (nrow - 1, 0),
                (0, ncol - 4),
                (0, ncol - 3),
                (0, ncol - 2),
                (0, ncol - 1),
                (1, ncol - 1),
            ],
            3 => [
                (nrow - 3, 0),
                (nrow - 2, 0),
                (nrow - 1, 0),
                (0, ncol - 2),
                (0, ncol - 1),
                (1, ncol - 1),
                (2, ncol - 1),
                (3, ncol - 1),
            ],
            _ => [
                (nrow - 1, 0),
                (nrow - 1, ncol - 1),
                (0, ncol - 3),
                (0, ncol - 2),
                (0, ncol - 1),
                (1, ncol - 3),
                (1, ncol - 2),
                (1, ncol - 1),
            ],
        };
        for (i, (row, col)) in modules.into_iter().enumerate() {
            self.module(row, col, pos, i as u8 + 1);
        }
    }
}
