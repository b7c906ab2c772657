mod coords;
mod error;
mod expr;
mod parse;
mod scan;
mod sheet;
mod store;

pub use crate::coords::{cell_id, Address};
pub use crate::error::{Error, Result};
pub use crate::expr::{CellRef, Coord, Expr, Function};
pub use crate::parse::FormulaParser;
pub use crate::scan::{Scanner, Token, TokenKind};
pub use crate::sheet::{CellInfo, SpreadSheet, Updates};
pub use crate::store::Store;
