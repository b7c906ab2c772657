use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::Serialize;

use crate::coords::Address;
use crate::error::{Error, Result};
use crate::expr::{CellRef, Expr};
use crate::parse::FormulaParser;

/// Recomputed cells mapped to their new values, in recomputation order.
pub type Updates = IndexMap<String, f64>;

/// What [`SpreadSheet::query`] reports for a cell.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CellInfo {
    pub formula: String,
    pub value: f64,
}

#[derive(Debug, Clone)]
struct Cell {
    address: Address,
    expr: Option<Rc<Expr>>,
    // `expr` rendered against `address`.
    formula: String,
    value: f64,
    /// Cells whose formulas read this one.
    dependents: BTreeSet<String>,
}

impl Cell {
    fn new(address: Address) -> Self {
        Self {
            address,
            expr: None,
            formula: String::new(),
            value: 0.,
            dependents: BTreeSet::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.expr.is_none()
    }
}

/// State of every cell touched by one operation, as it was before the
/// operation touched it. `None` means the cell had no record.
#[derive(Debug, Default)]
struct UndoLog {
    saved: HashMap<String, Option<Cell>>,
}

impl UndoLog {
    fn record(&mut self, id: &str, cell: Option<&Cell>) {
        if !self.saved.contains_key(id) {
            self.saved.insert(id.to_string(), cell.cloned());
        }
    }
}

pub struct SpreadSheet {
    parser: FormulaParser,
    cells: HashMap<String, Cell>,
    // Log of the last top-level mutating operation.
    undo_log: UndoLog,
}

impl Default for SpreadSheet {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadSheet {
    pub fn new() -> Self {
        Self {
            parser: FormulaParser::new(),
            cells: HashMap::new(),
            undo_log: UndoLog::default(),
        }
    }

    /// Sets `cell` to `formula` and recomputes it and everything that
    /// depends on it.
    pub fn edit(&mut self, cell: &str, formula: &str) -> Result<Updates> {
        debug!("edit {cell} = {formula}");
        self.transaction(|sheet, log| {
            let address = Address::parse(cell)?;
            let expr = sheet.parser.parse(formula, address)?;
            sheet.install(log, address, expr)
        })
    }

    pub fn query(&self, cell: &str) -> CellInfo {
        Address::parse(cell)
            .ok()
            .and_then(|address| self.cells.get(&address.to_string()))
            .map_or_else(CellInfo::default, |cell| CellInfo {
                formula: cell.formula.clone(),
                value: cell.value,
            })
    }

    /// Removes the formula in `cell` and recomputes its dependents.
    /// Deleting an empty cell is a no-op.
    pub fn delete(&mut self, cell: &str) -> Result<Updates> {
        debug!("delete {cell}");
        self.transaction(|sheet, log| match Address::parse(cell) {
            Ok(address) => sheet.remove(log, address),
            Err(_) => Ok(Updates::new()),
        })
    }

    /// Copies the formula in `src` into `dest`, shifting relative
    /// references. Copying an empty cell deletes `dest`.
    pub fn copy(&mut self, dest: &str, src: &str) -> Result<Updates> {
        debug!("copy {src} to {dest}");
        self.transaction(|sheet, log| {
            let dest = Address::parse(dest)?;
            let src = Address::parse(src)?;
            let Some(expr) = sheet.cells.get(&src.to_string()).and_then(|c| c.expr.clone())
            else {
                return sheet.remove(log, dest);
            };
            let text = expr.render(dest)?;
            let expr = sheet.parser.parse(&text, dest)?;
            sheet.install(log, dest, expr)
        })
    }

    /// Every non-empty cell with its formula, ordered by dependency depth
    /// and then by id.
    pub fn dump(&self) -> Vec<(String, String)> {
        let mut prereqs: BTreeMap<&str, Vec<&str>> = self
            .cells
            .iter()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(id, _)| (id.as_str(), Vec::new()))
            .collect();
        for (id, cell) in self.cells.iter().filter(|(_, cell)| !cell.is_empty()) {
            for dependent in &cell.dependents {
                if let Some(list) = prereqs.get_mut(dependent.as_str()) {
                    list.push(id.as_str());
                }
            }
        }

        let mut depths = HashMap::new();
        let mut order: Vec<(usize, &str)> = prereqs
            .keys()
            .map(|&id| (depth(id, &prereqs, &mut depths), id))
            .collect();
        order.sort_unstable();
        order
            .into_iter()
            .map(|(_, id)| (id.to_string(), self.cells[id].formula.clone()))
            .collect()
    }

    /// Drops every cell. Cannot be undone.
    pub fn clear(&mut self) {
        debug!("clear");
        self.cells.clear();
        self.undo_log = UndoLog::default();
    }

    /// Reverts the cells touched by the last mutating operation.
    pub fn undo(&mut self) {
        let log = std::mem::take(&mut self.undo_log);
        debug!("undo {} cells", log.saved.len());
        self.restore(log);
    }

    /// Number of cells holding a formula.
    pub fn len(&self) -> usize {
        self.cells.values().filter(|cell| !cell.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Runs `op` against a fresh undo log, rolling everything back if it fails.
    fn transaction<T>(
        &mut self,
        op: impl FnOnce(&mut Self, &mut UndoLog) -> Result<T>,
    ) -> Result<T> {
        let mut log = UndoLog::default();
        match op(self, &mut log) {
            Ok(value) => {
                self.undo_log = log;
                Ok(value)
            }
            Err(err) => {
                warn!("rolling back {} cells: {err}", log.saved.len());
                self.restore(log);
                self.undo_log = UndoLog::default();
                Err(err)
            }
        }
    }

    fn restore(&mut self, log: UndoLog) {
        for (id, saved) in log.saved {
            match saved {
                Some(cell) => {
                    self.cells.insert(id, cell);
                }
                None => {
                    self.cells.remove(&id);
                }
            }
        }
    }

    fn install(&mut self, log: &mut UndoLog, address: Address, expr: Expr) -> Result<Updates> {
        let formula = expr.render(address)?;
        let expr = Rc::new(expr);
        let old = self
            .cells
            .get(&address.to_string())
            .and_then(|cell| cell.expr.clone());
        self.update_cell(log, address, |cell| {
            cell.expr = Some(expr);
            cell.formula = formula;
        });
        if let Some(old) = old {
            self.remove_as_dependent(log, address, &old);
        }
        self.recompute(log, address)
    }

    fn remove(&mut self, log: &mut UndoLog, address: Address) -> Result<Updates> {
        let id = address.to_string();
        let Some((expr, dependents)) = self
            .cells
            .get(&id)
            .and_then(|cell| Some((cell.expr.clone()?, cell.dependents.clone())))
        else {
            return Ok(Updates::new());
        };
        self.remove_as_dependent(log, address, &expr);
        self.remove_cell(log, &id);

        let mut updates = Updates::new();
        for dependent in dependents {
            if let Some(address) = self.formula_address(&dependent) {
                updates.extend(self.recompute(log, address)?);
            }
        }
        Ok(updates)
    }

    fn recompute(&mut self, log: &mut UndoLog, address: Address) -> Result<Updates> {
        let mut updates = Updates::new();
        let mut working = HashSet::new();
        self.eval_cell(log, address, &mut working, &mut updates)?;
        Ok(updates)
    }

    // Computes the cell at `address`, then cascades into its dependents.
    // `working` holds the cells on the current cascade path.
    fn eval_cell(
        &mut self,
        log: &mut UndoLog,
        address: Address,
        working: &mut HashSet<String>,
        updates: &mut Updates,
    ) -> Result<()> {
        let id = address.to_string();
        let value = match self.cells.get(&id).and_then(|cell| cell.expr.clone()) {
            Some(expr) => self.eval_expr(log, address, &expr)?,
            None => 0.,
        };
        trace!("{id} = {value}");
        let cell = self.update_cell(log, address, |cell| cell.value = value);
        let dependents: Vec<String> = cell.dependents.iter().cloned().collect();
        updates.insert(id.clone(), value);

        working.insert(id.clone());
        for dependent in dependents {
            if working.contains(&dependent) {
                return Err(Error::CircularRef(dependent));
            }
            if let Some(address) = self.formula_address(&dependent) {
                self.eval_cell(log, address, working, updates)?;
            }
        }
        working.remove(&id);
        Ok(())
    }

    // Evaluates `expr` held by the cell at `base`, registering that cell as a
    // dependent of every cell it reads.
    fn eval_expr(&mut self, log: &mut UndoLog, base: Address, expr: &Expr) -> Result<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),
            Expr::Ref(cell_ref) => {
                let target = resolve(cell_ref, base)?;
                let dependent = base.to_string();
                let cell = self.update_cell(log, target, |cell| {
                    cell.dependents.insert(dependent);
                });
                Ok(cell.value)
            }
            Expr::App(func, args) => {
                let values = args
                    .iter()
                    .map(|arg| self.eval_expr(log, base, arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(func.apply(&values))
            }
        }
    }

    fn remove_as_dependent(&mut self, log: &mut UndoLog, base: Address, expr: &Expr) {
        let dependent = base.to_string();
        for cell_ref in expr.refs() {
            let Some(target) = cell_ref.resolve(base) else {
                continue;
            };
            let id = target.to_string();
            if !self.cells.contains_key(&id) {
                continue;
            }
            let cell = self.update_cell(log, target, |cell| {
                cell.dependents.remove(&dependent);
            });
            if cell.is_empty() && cell.dependents.is_empty() {
                self.remove_cell(log, &id);
            }
        }
    }

    // All cell mutations go through here so the undo log sees them.
    fn update_cell(
        &mut self,
        log: &mut UndoLog,
        address: Address,
        update: impl FnOnce(&mut Cell),
    ) -> &Cell {
        let id = address.to_string();
        log.record(&id, self.cells.get(&id));
        let cell = self.cells.entry(id).or_insert_with(|| Cell::new(address));
        update(cell);
        cell
    }

    fn remove_cell(&mut self, log: &mut UndoLog, id: &str) {
        log.record(id, self.cells.get(id));
        self.cells.remove(id);
    }

    fn formula_address(&self, id: &str) -> Option<Address> {
        self.cells
            .get(id)
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.address)
    }
}

fn resolve(cell_ref: &CellRef, base: Address) -> Result<Address> {
    cell_ref
        .resolve(base)
        .ok_or_else(|| Error::Syntax(format!("reference outside the sheet from {base}")))
}

// Longest prerequisite chain leading to `id`.
fn depth<'a>(
    id: &'a str,
    prereqs: &BTreeMap<&'a str, Vec<&'a str>>,
    depths: &mut HashMap<&'a str, usize>,
) -> usize {
    if let Some(depth) = depths.get(id) {
        return *depth;
    }
    let result = prereqs
        .get(id)
        .and_then(|list| list.iter().map(|&p| depth(p, prereqs, depths)).max())
        .map_or(0, |deepest| deepest + 1);
    depths.insert(id, result);
    result
}
