//! Expression trees and the reference algebra that lets a formula be
//! re-rendered against any base cell.

use crate::coords::{self, Address};
use crate::error::{Error, Result};

/// One axis of a cell reference.
///
/// For an absolute coordinate `index` is the 0-based column or row. For a
/// relative one it is the signed offset from the base cell the formula was
/// parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub absolute: bool,
    pub index: i64,
}

impl Coord {
    fn new(absolute: bool, parsed: u32, base: u32) -> Self {
        let index = if absolute {
            i64::from(parsed)
        } else {
            i64::from(parsed) - i64::from(base)
        };
        Self { absolute, index }
    }

    fn resolve(&self, base: u32) -> Option<u32> {
        let index = if self.absolute {
            self.index
        } else {
            i64::from(base) + self.index
        };
        u32::try_from(index).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: Coord,
    pub row: Coord,
}

impl CellRef {
    /// Parses a reference literal such as `c4`, `$c4`, `c$4` or `$c$4`,
    /// freezing relative axes as offsets from `base`.
    pub fn parse(text: &str, base: Address) -> Result<Self> {
        let address = Address::parse(text)?;
        let col_absolute = text.starts_with('$');
        let row_absolute = text[1..].contains('$');
        Ok(Self {
            col: Coord::new(col_absolute, address.col, base.col),
            row: Coord::new(row_absolute, address.row, base.row),
        })
    }

    /// The absolute cell this reference points at when held by `base`.
    pub fn resolve(&self, base: Address) -> Option<Address> {
        Some(Address::new(
            self.col.resolve(base.col)?,
            self.row.resolve(base.row)?,
        ))
    }

    /// Reference text as it would be written in `base`, `$` markers included.
    pub fn render(&self, base: Address) -> Result<String> {
        let address = self.resolve(base).ok_or_else(|| {
            Error::Syntax(format!("reference falls outside the sheet when placed in {base}"))
        })?;
        let mut text = String::new();
        if self.col.absolute {
            text.push('$');
        }
        text.push_str(&coords::index_to_col(address.col));
        if self.row.absolute {
            text.push('$');
        }
        text.push_str(&coords::index_to_row(address.row));
        Ok(text)
    }
}

/// The fixed function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Add,
    /// Negation with one argument, subtraction with two.
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

impl Function {
    /// Looks up a function called by name. Operators are not callable by name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    pub fn apply(&self, args: &[f64]) -> f64 {
        match (self, args) {
            (Self::Add, [a, b]) => a + b,
            (Self::Sub, [a]) => -a,
            (Self::Sub, [a, b]) => a - b,
            (Self::Mul, [a, b]) => a * b,
            (Self::Div, [a, b]) => a / b,
            (Self::Min, [first, rest @ ..]) => rest.iter().fold(*first, |m, v| m.min(*v)),
            (Self::Max, [first, rest @ ..]) => rest.iter().fold(*first, |m, v| m.max(*v)),
            _ => unreachable!("{} applied to {} arguments", self.name(), args.len()),
        }
    }
}

/// A parsed formula. Trees are immutable once built; moving a formula to
/// another cell means rendering it there and parsing the result.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(CellRef),
    App(Function, Vec<Expr>),
}

// Binding strength used to decide where rendering needs parentheses.
const ADDITIVE: u8 = 1;
const MULTIPLICATIVE: u8 = 2;
const UNARY: u8 = 3;
const ATOM: u8 = 4;

impl Expr {
    /// Every reference in the tree, left to right.
    pub fn refs(&self) -> Vec<&CellRef> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a CellRef>) {
        match self {
            Self::Number(_) => {}
            Self::Ref(cell_ref) => refs.push(cell_ref),
            Self::App(_, args) => args.iter().for_each(|arg| arg.collect_refs(refs)),
        }
    }

    /// Formula text for this tree as written in cell `base`.
    pub fn render(&self, base: Address) -> Result<String> {
        let mut out = String::new();
        self.write_to(&mut out, base)?;
        Ok(out)
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::App(Function::Add | Function::Sub, args) if args.len() == 2 => ADDITIVE,
            Self::App(Function::Mul | Function::Div, _) => MULTIPLICATIVE,
            Self::App(Function::Sub, _) => UNARY,
            _ => ATOM,
        }
    }

    fn write_to(&self, out: &mut String, base: Address) -> Result<()> {
        match self {
            Self::Number(value) => out.push_str(&value.to_string()),
            Self::Ref(cell_ref) => out.push_str(&cell_ref.render(base)?),
            Self::App(func @ (Function::Min | Function::Max), args) => {
                out.push_str(func.name());
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write_to(out, base)?;
                }
                out.push(')');
            }
            Self::App(Function::Sub, args) if args.len() == 1 => {
                out.push('-');
                args[0].write_operand(out, base, args[0].precedence() < ATOM)?;
            }
            Self::App(func, args) => {
                let [left, right] = args.as_slice() else {
                    unreachable!("{} with {} operands", func.name(), args.len());
                };
                let level = self.precedence();
                left.write_operand(out, base, left.precedence() < level)?;
                out.push_str(func.name());
                right.write_operand(out, base, right.precedence() <= level)?;
            }
        }
        Ok(())
    }

    fn write_operand(&self, out: &mut String, base: Address, parens: bool) -> Result<()> {
        if parens {
            out.push('(');
        }
        self.write_to(out, base)?;
        if parens {
            out.push(')');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str) -> Address {
        Address::parse(id).unwrap()
    }

    #[test]
    fn relative_reference_keeps_offset() {
        let cell_ref = CellRef::parse("C5", at("e9")).unwrap();
        assert_eq!(cell_ref.col, Coord { absolute: false, index: -2 });
        assert_eq!(cell_ref.row, Coord { absolute: false, index: -4 });
        assert_eq!(cell_ref.resolve(at("e9")), Some(at("c5")));
        assert_eq!(cell_ref.render(at("f6")).unwrap(), "d2");
    }

    #[test]
    fn absolute_axes_ignore_base() {
        let cell_ref = CellRef::parse("$c$5", at("c4")).unwrap();
        assert_eq!(cell_ref.col, Coord { absolute: true, index: 2 });
        assert_eq!(cell_ref.row, Coord { absolute: true, index: 4 });
        assert_eq!(cell_ref.render(at("z99")).unwrap(), "$c$5");
    }

    #[test]
    fn mixed_reference_renders_markers() {
        let cell_ref = CellRef::parse("c$2", at("a5")).unwrap();
        assert_eq!(cell_ref.render(at("f6")).unwrap(), "h$2");
        let cell_ref = CellRef::parse("$c2", at("a5")).unwrap();
        assert_eq!(cell_ref.render(at("f6")).unwrap(), "$c3");
    }

    #[test]
    fn reference_off_the_sheet_fails_to_render() {
        let cell_ref = CellRef::parse("a1", at("b2")).unwrap();
        assert!(matches!(cell_ref.render(at("a1")), Err(Error::Syntax(_))));
        assert_eq!(cell_ref.resolve(at("a2")), None);
    }

    #[test]
    fn functions_apply() {
        assert_eq!(Function::Add.apply(&[2.0, 3.0]), 5.0);
        assert_eq!(Function::Sub.apply(&[2.0]), -2.0);
        assert_eq!(Function::Sub.apply(&[2.0, 3.0]), -1.0);
        assert_eq!(Function::Mul.apply(&[2.0, 3.0]), 6.0);
        assert_eq!(Function::Div.apply(&[3.0, 2.0]), 1.5);
        assert_eq!(Function::Min.apply(&[4.0, -1.0, 2.0]), -1.0);
        assert_eq!(Function::Max.apply(&[4.0]), 4.0);
        assert_eq!(Function::named("max"), Some(Function::Max));
        assert_eq!(Function::named("sum"), None);
    }

    #[test]
    #[should_panic]
    fn binary_operator_with_one_argument_is_a_bug() {
        Function::Mul.apply(&[1.0]);
    }

    #[test]
    fn render_parenthesizes_by_precedence() {
        use Expr::{App, Number};
        let sum = App(Function::Add, vec![Number(1.0), Number(2.0)]);
        let product = App(Function::Mul, vec![sum.clone(), Number(3.0)]);
        assert_eq!(product.render(Address::default()).unwrap(), "(1+2)*3");

        let nested = App(
            Function::Add,
            vec![Number(1.0), App(Function::Sub, vec![Number(2.0), Number(3.0)])],
        );
        assert_eq!(nested.render(Address::default()).unwrap(), "1+(2-3)");

        let negated = App(Function::Sub, vec![App(Function::Sub, vec![Number(1.0)])]);
        assert_eq!(negated.render(Address::default()).unwrap(), "-(-1)");
    }

    #[test]
    fn refs_are_listed_in_order() {
        let base = at("a1");
        let b2 = CellRef::parse("b2", base).unwrap();
        let c3 = CellRef::parse("$c3", base).unwrap();
        let expr = Expr::App(
            Function::Max,
            vec![Expr::Ref(b2), Expr::Number(1.0), Expr::Ref(c3)],
        );
        assert_eq!(expr.refs(), vec![&b2, &c3]);
    }
}
