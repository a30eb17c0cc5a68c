pub mod matrix;
pub mod point;
pub mod qr_code;
pub mod symbol;

pub use matrix::BitMatrix;
pub use point::{BoundingBox, Point, Quad};
pub use qr_code::{ECLevel, MaskPattern};
pub use symbol::{Candidate, DecodedSymbol, Symbology, SymbologyFamily};
