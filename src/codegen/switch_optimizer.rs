/// Switch dispatch selection
/// Chooses between tableswitch and lookupswitch from the density of the case keys

use super::opcodes::{Label, Op};

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: i32,
    pub target: Label,
}

#[derive(Debug, Clone)]
pub struct SwitchOptimizer {
    pub cases: Vec<SwitchCase>,
    pub default: Label,
}

impl SwitchOptimizer {
    /// `default` is the statement end when the switch has no default label
    pub fn new(default: Label) -> Self {
        SwitchOptimizer {
            cases: Vec::new(),
            default,
        }
    }

    pub fn add_case(&mut self, value: i32, target: Label) {
        self.cases.push(SwitchCase { value, target });
    }

    /// Dispatch op for the collected cases by the space and time cost of each form
    pub fn optimize(&self) -> Op {
        if self.cases.is_empty() {
            return Op::LookupSwitch {
                default: self.default,
                pairs: Vec::new(),
            };
        }

        let mut sorted = self.cases.clone();
        sorted.sort_by_key(|case| case.value);

        let lo = sorted[0].value;
        let hi = sorted[sorted.len() - 1].value;
        let nlabels = sorted.len() as i64;

        let table_space_cost = 4 + (hi as i64 - lo as i64 + 1); // words
        let table_time_cost = 3; // comparisons
        let lookup_space_cost = 3 + 2 * nlabels;
        let lookup_time_cost = nlabels;

        let use_table = table_space_cost + 3 * table_time_cost <= lookup_space_cost + 3 * lookup_time_cost;
        log::trace!(
            "switch over {} keys in {}..={}: {}",
            nlabels,
            lo,
            hi,
            if use_table { "tableswitch" } else { "lookupswitch" }
        );

        if use_table {
            self.table(lo, hi, &sorted)
        } else {
            Op::LookupSwitch {
                default: self.default,
                pairs: sorted.iter().map(|case| (case.value, case.target)).collect(),
            }
        }
    }

    fn table(&self, lo: i32, hi: i32, sorted: &[SwitchCase]) -> Op {
        let range = (hi as i64 - lo as i64 + 1) as usize;
        let mut targets = vec![self.default; range];
        for case in sorted {
            targets[(case.value as i64 - lo as i64) as usize] = case.target;
        }
        Op::TableSwitch {
            low: lo,
            high: hi,
            default: self.default,
            targets,
        }
    }
}
