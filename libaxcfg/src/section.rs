//! Section nesting, per-section setting inventory and required settings.
//!
//! Open sections form a path from the outermost ancestor to the current
//! section. A new header closes the current section (checking its required
//! settings), then unwinds the path until the top is one of the new
//! section's parents. Settings recorded in ancestors on the path are visible
//! to every descendant.
//!
//! Inside a section, `if`/`elseif`/`else` chains are recorded as a tree so a
//! required setting set in every branch of an exhaustive chain counts as set.

use crate::catalog::{self, normalize_name, Setting, SettingsCatalog};
use crate::diagnostic::{Diagnostic, Range};
use std::collections::HashSet;
use tracing::trace;

/// One `if` chain: a branch per `if`/`elseif`/`else`.
#[derive(Debug, Clone, Default)]
struct Chain {
    branches: Vec<BranchSettings>,
    has_else: bool,
}

#[derive(Debug, Clone, Default)]
struct BranchSettings {
    settings: HashSet<String>,
    /// Chains opened inside this branch.
    children: Vec<usize>,
}

impl Chain {
    fn new() -> Self {
        Self {
            branches: vec![BranchSettings::default()],
            has_else: false,
        }
    }
}

/// State of one open section.
#[derive(Debug, Clone)]
struct SectionFrame {
    name: String,
    range: Range,
    /// Settings set outside any conditional.
    direct: HashSet<String>,
    /// Every setting set in the section.
    all: HashSet<String>,
    chains: Vec<Chain>,
    /// Chains not nested in another chain.
    roots: Vec<usize>,
    /// Chains currently open, innermost last.
    open: Vec<usize>,
}

impl SectionFrame {
    fn new(name: &str, range: Range) -> Self {
        Self {
            name: name.to_string(),
            range,
            direct: HashSet::new(),
            all: HashSet::new(),
            chains: Vec::new(),
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    fn current_branch(&mut self) -> Option<&mut BranchSettings> {
        let id = *self.open.last()?;
        self.chains[id].branches.last_mut()
    }

    /// Settings of every open branch, innermost last.
    fn open_branches(&self) -> impl Iterator<Item = &BranchSettings> {
        self.open
            .iter()
            .filter_map(|&id| self.chains[id].branches.last())
    }

    fn chain_satisfies(&self, id: usize, group: &[String]) -> bool {
        let chain = &self.chains[id];
        chain.has_else
            && chain
                .branches
                .iter()
                .all(|branch| self.branch_satisfies(branch, group))
    }

    fn branch_satisfies(&self, branch: &BranchSettings, group: &[String]) -> bool {
        group.iter().any(|name| branch.settings.contains(name))
            || branch
                .children
                .iter()
                .any(|&child| self.chain_satisfies(child, group))
    }
}

/// Tracks sections for one validation run.
#[derive(Debug)]
pub struct SectionTracker<'a> {
    catalog: &'a SettingsCatalog,
    path: Vec<SectionFrame>,
}

impl<'a> SectionTracker<'a> {
    pub fn new(catalog: &'a SettingsCatalog) -> Self {
        Self {
            catalog,
            path: Vec::new(),
        }
    }

    /// Name of the section currently receiving settings.
    pub fn current(&self) -> Option<&str> {
        self.path.last().map(|f| f.name.as_str())
    }

    /// Start a new section whose name sits at `range`.
    pub fn enter(&mut self, name: &str, range: Range, diagnostics: &mut Vec<Diagnostic>) {
        self.check_current(diagnostics);
        if let Some(current) = self.path.last_mut() {
            current.open.clear();
        }

        let parents = catalog::parent_sections(name);
        while let Some(top) = self.path.last() {
            if parents.contains(&top.name.as_str()) {
                break;
            }
            self.path.pop();
        }
        trace!(section = name, depth = self.path.len(), "enter section");
        self.path.push(SectionFrame::new(name, range));
    }

    /// Close everything at the end of the document.
    pub fn finish(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        self.check_current(diagnostics);
        self.path.clear();
    }

    /// Record a catalog setting set at `range` in the current section.
    pub fn record(&mut self, setting: &Setting, range: Range, diagnostics: &mut Vec<Diagnostic>) {
        let catalog = self.catalog;
        let depth = self.path.len();
        let Some(frame) = self.path.last_mut() else {
            return;
        };
        let name = setting.name.clone();

        for excluded in &setting.excludes {
            let reachable = frame.direct.contains(excluded)
                || frame.open_branches().any(|b| b.settings.contains(excluded));
            if reachable {
                let other = catalog
                    .get(excluded)
                    .map(|s| s.display_name.as_str())
                    .unwrap_or(excluded.as_str());
                diagnostics.push(Diagnostic::warning(
                    range,
                    format!(
                        "{} can not be specified simultaneously with {}",
                        setting.display_name, other
                    ),
                ));
            }
        }

        if !setting.multi_line {
            let repeated = if frame.open.is_empty() {
                frame.direct.contains(&name)
            } else {
                frame.direct.contains(&name)
                    || frame.open_branches().any(|b| b.settings.contains(&name))
            };
            if repeated {
                diagnostics.push(Diagnostic::warning(
                    range,
                    format!("{} is already defined", setting.display_name),
                ));
            } else {
                let ancestor = self.path[..depth - 1]
                    .iter()
                    .rev()
                    .find(|a| a.all.contains(&name))
                    .map(|a| a.name.clone());
                if let Some(ancestor) = ancestor {
                    diagnostics.push(Diagnostic::hint(
                        range,
                        format!("{} is already defined in [{}]", setting.display_name, ancestor),
                    ));
                }
            }
        }

        let Some(frame) = self.path.last_mut() else {
            return;
        };
        match frame.current_branch() {
            Some(branch) => {
                branch.settings.insert(name.clone());
            }
            None => {
                frame.direct.insert(name.clone());
            }
        }
        frame.all.insert(name);
    }

    /// An `if` opened in the current section.
    pub fn open_if(&mut self) {
        let Some(frame) = self.path.last_mut() else {
            return;
        };
        let id = frame.chains.len();
        frame.chains.push(Chain::new());
        match frame.current_branch() {
            Some(branch) => branch.children.push(id),
            None => frame.roots.push(id),
        }
        frame.open.push(id);
    }

    /// An `elseif` (or `else` when `is_else`) continues the innermost chain.
    pub fn next_branch(&mut self, is_else: bool) {
        let Some(frame) = self.path.last_mut() else {
            return;
        };
        let Some(&id) = frame.open.last() else {
            return;
        };
        let chain = &mut frame.chains[id];
        chain.branches.push(BranchSettings::default());
        chain.has_else |= is_else;
    }

    /// The innermost chain ended with `endif`.
    pub fn close_if(&mut self) {
        if let Some(frame) = self.path.last_mut() {
            frame.open.pop();
        }
    }

    /// Report missing required settings for the current section.
    fn check_current(&self, diagnostics: &mut Vec<Diagnostic>) {
        let Some(frame) = self.path.last() else {
            return;
        };
        let ancestors = &self.path[..self.path.len() - 1];

        for group in catalog::required_groups(&frame.name) {
            let members: Vec<String> = group.iter().map(|m| normalize_name(m)).collect();
            let direct = members.iter().any(|m| frame.direct.contains(m));
            let inherited = ancestors
                .iter()
                .any(|a| members.iter().any(|m| a.all.contains(m)));
            let branched = frame
                .roots
                .iter()
                .any(|&id| frame.chain_satisfies(id, &members));
            if direct || inherited || branched {
                continue;
            }
            let first = group.first().copied().unwrap_or_default();
            let display = self
                .catalog
                .get(first)
                .map(|s| s.display_name.as_str())
                .unwrap_or(first);
            diagnostics.push(Diagnostic::error(
                frame.range,
                format!("{} is required", display),
            ));
        }
    }
}
