//! Pretty-printer for partial structures
//!
//! Renders a structure as text for debugging and test failure messages:
//! every element with its sort and representative, then every non-empty
//! operation and predicate table in sorted order.

use std::fmt;

use crate::structure::PartialStructure;
use crate::table::RelationStorage;

/// Pretty-print configuration
pub struct PrettyConfig {
    pub indent: usize,
    /// Also list elements that are not their own representative
    pub show_merged: bool,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            show_merged: true,
        }
    }
}

/// A pretty-printer with indentation tracking
pub struct Pretty {
    output: String,
    indent_level: usize,
    config: PrettyConfig,
}

impl Default for Pretty {
    fn default() -> Self {
        Self::new()
    }
}

impl Pretty {
    pub fn new() -> Self {
        Self::with_config(PrettyConfig::default())
    }

    pub fn with_config(config: PrettyConfig) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            config,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn indent(&mut self) {
        for _ in 0..(self.indent_level * self.config.indent) {
            self.output.push(' ');
        }
    }

    fn line(&mut self, s: &str) {
        self.indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Render a structure. Representatives are looked up without path
    /// compression, so the structure is only borrowed.
    pub fn structure(&mut self, structure: &PartialStructure) {
        let sig = std::rc::Rc::clone(structure.signature());

        self.line(&format!(
            "structure: {} elements, {} classes",
            structure.len(),
            structure.num_classes()
        ));
        self.indent_level += 1;
        for elem in 0..structure.len() {
            let (Ok(sort), Ok(rep)) = (structure.sort_of(elem), structure.find_naive(elem)) else {
                continue;
            };
            let sort_name = sig.sort_name(sort).unwrap_or("?");
            if rep == elem {
                self.line(&format!("{elem} : {sort_name}"));
            } else if self.config.show_merged {
                self.line(&format!("{elem} : {sort_name} = {rep}"));
            }
        }
        self.indent_level -= 1;

        if structure.is_dirty() {
            self.line("(tables not yet rebuilt)");
        }

        for (op, operation) in sig.operations() {
            let Some(table) = structure.operation_table(op) else {
                continue;
            };
            if table.is_empty() {
                continue;
            }
            let mut rows: Vec<(Vec<usize>, usize)> =
                table.iter().map(|(args, result)| (args.to_vec(), result)).collect();
            rows.sort();

            self.line(&format!("{}:", operation.name));
            self.indent_level += 1;
            for (args, result) in rows {
                self.line(&format!("{}({}) = {}", operation.name, join(&args), result));
            }
            self.indent_level -= 1;
        }

        for (pred, predicate) in sig.predicates() {
            let Some(table) = structure.predicate_table(pred) else {
                continue;
            };
            if table.is_empty() {
                continue;
            }
            let mut rows: Vec<Vec<usize>> = table.rows().collect();
            rows.sort();

            self.line(&format!("{}:", predicate.name));
            self.indent_level += 1;
            for args in rows {
                self.line(&format!("{}({})", predicate.name, join(&args)));
            }
            self.indent_level -= 1;
        }
    }
}

fn join(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a structure with the default configuration
pub fn pretty_print(structure: &PartialStructure) -> String {
    let mut pretty = Pretty::new();
    pretty.structure(structure);
    pretty.finish()
}

impl fmt::Display for PartialStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty_print(self))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::signature::Signature;

    #[test]
    fn test_pretty_print_structure() {
        let mut sig = Signature::new();
        let s = sig.add_sort("S").unwrap();
        let e = sig.add_operation("e", vec![], s).unwrap();
        let f = sig.add_operation("f", vec![s], s).unwrap();
        let p = sig.add_predicate("P", vec![s, s]).unwrap();

        let mut structure = PartialStructure::new(Rc::new(sig));
        let a = structure.define_operation(e, &[]).unwrap();
        let b = structure.define_operation(f, &[a]).unwrap();
        structure.define_predicate(p, &[a, b]).unwrap();

        let text = pretty_print(&structure);
        assert_eq!(
            text,
            "structure: 2 elements, 2 classes\n  0 : S\n  1 : S\ne:\n  e() = 0\nf:\n  f(0) = 1\nP:\n  P(0, 1)\n"
        );
        assert_eq!(structure.to_string(), text);
    }

    #[test]
    fn test_pretty_print_merged() {
        let mut sig = Signature::new();
        let s = sig.add_sort("S").unwrap();
        let f = sig.add_operation("f", vec![s], s).unwrap();

        let mut structure = PartialStructure::new(Rc::new(sig));
        let a = structure.add_element(s).unwrap();
        let b = structure.add_element(s).unwrap();
        structure.define_operation(f, &[a]).unwrap();
        structure.define_operation(f, &[b]).unwrap();
        structure.merge(a, b).unwrap();

        let dirty = structure.to_string();
        assert!(dirty.contains("(tables not yet rebuilt)"));
        assert!(dirty.contains("  1 : S = 0\n"));

        structure.rebuild().unwrap();
        let mut hidden = Pretty::with_config(PrettyConfig {
            indent: 4,
            show_merged: false,
        });
        hidden.structure(&structure);
        assert_eq!(
            hidden.finish(),
            "structure: 4 elements, 2 classes\n    0 : S\n    2 : S\nf:\n    f(0) = 2\n"
        );
    }

    #[test]
    fn test_display_through_shared_borrow() {
        let mut sig = Signature::new();
        let s = sig.add_sort("S").unwrap();
        let mut structure = PartialStructure::new(Rc::new(sig));
        for _ in 0..5 {
            structure.add_element(s).unwrap();
        }
        // A parent chain 4 -> 3 -> 2 -> 1 -> 0
        for x in (0..4).rev() {
            structure.merge(x, x + 1).unwrap();
        }

        let frozen: &PartialStructure = &structure;
        let text = format!("{frozen}");
        assert!(text.starts_with("structure: 5 elements, 1 classes\n  0 : S\n"));
        assert!(text.contains("  4 : S = 0\n"));
        assert_eq!(frozen.to_string(), text);
    }
}
