//! CLI front door.
//!
//! Provides the command helpers behind the `ngrename` binary:
//! - [`run_rename`]: validate, confirm, plan and (unless dry-run) write a rename
//! - [`run_refs`]: list every reference of the symbol at a location
//!
//! Each call loads the workspace from disk, so the on-disk files are the only
//! state carried between invocations.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ngrename_angular::{ConfirmationHandler, ConfirmationReason, Decision, RenameEngine};
use ngrename_core::diff::generate_unified_diff;
use ngrename_core::error::RenameError;
use ngrename_core::facts::Symbol;
use ngrename_core::types::{Location, SymbolInfo};
use ngrename_core::workspace::{normalize_path, WorkspaceBuffers};

use crate::config::Config;
use crate::error::CliError;
use crate::output::{ReferenceInfo, RefsResponse, RenameResponse};

// ============================================================================
// Workspace
// ============================================================================

/// A workspace loaded from disk with its configuration.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub engine: RenameEngine,
}

impl Workspace {
    /// Load configuration, read every workspace file and index it.
    pub fn open(root: &Path, config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = Config::discover(root, config_path)?;
        let buffers = WorkspaceBuffers::from_dir(root, &config.workspace_options())?;
        let engine =
            RenameEngine::from_buffers(buffers, config.naming, config.rename_options(None))?;
        debug!(root = %root.display(), "opened workspace");
        Ok(Workspace {
            root: root.to_path_buf(),
            config,
            engine,
        })
    }

    /// Resolve a `path:line:col` argument to a symbol.
    pub fn symbol_at(&self, at: &str) -> Result<Symbol, CliError> {
        let mut location = parse_location(at)?;
        location.file = self.relative(&location.file);
        Ok(self.engine.symbol_at_location(&location)?)
    }

    /// Output info for `symbol`, located against current buffers.
    pub fn symbol_info(&self, symbol: &Symbol) -> Result<SymbolInfo, CliError> {
        self.engine.read(|ctx| {
            let path = ctx.declaring_path(symbol)?;
            let content = ctx
                .buffers
                .get(path)
                .ok_or_else(|| RenameError::FileNotFound {
                    path: path.to_string(),
                })?;
            Ok(SymbolInfo::from_symbol(symbol, path, content))
        })
    }

    /// Workspace-relative form of a user-supplied path.
    fn relative(&self, file: &str) -> String {
        let path = Path::new(file);
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).unwrap_or(path)
        } else {
            path
        };
        normalize_path(&relative.to_string_lossy())
    }
}

/// Parse `path:line:col`.
pub fn parse_location(at: &str) -> Result<Location, CliError> {
    match Location::parse(at) {
        Some(location) if location.line > 0 && location.col > 0 => Ok(location),
        _ => Err(CliError::invalid_args(format!(
            "invalid location format '{}', expected path:line:col",
            at
        ))),
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Arguments for [`run_rename`].
#[derive(Debug, Clone)]
pub struct RenameRequest<'a> {
    pub at: &'a str,
    pub to: &'a str,
    /// Overrides `[search] comments_and_text` when set.
    pub search: Option<bool>,
    pub dry_run: bool,
}

/// Rename the symbol at `request.at`.
///
/// A dry run validates and plans but never asks for confirmation or writes;
/// a rejected name fails in both modes.
pub fn run_rename(
    workspace: &Workspace,
    request: &RenameRequest<'_>,
    confirm: &mut dyn ConfirmationHandler,
) -> Result<RenameResponse, CliError> {
    let symbol = workspace.symbol_at(request.at)?;
    let info = workspace.symbol_info(&symbol)?;
    let search = request
        .search
        .unwrap_or(workspace.config.search.comments_and_text);
    let engine = &workspace.engine;

    if request.dry_run {
        let decision = engine.validate(symbol.symbol_id, request.to)?;
        if let Decision::Reject(reason) = decision {
            return Err(CliError::Rename(reason.into()));
        }
        let plan = engine.plan_rename(symbol.symbol_id, request.to, search)?;
        let buffers = engine.snapshot();
        let edits = plan.output_edits(|f| buffers.get(f));
        let diff = generate_unified_diff(&edits, &plan.file_renames);
        return Ok(RenameResponse::new(info, decision, &plan, edits).with_diff(diff));
    }

    let before = engine.snapshot();
    let outcome = engine.rename(symbol.symbol_id, request.to, search, confirm)?;
    let after = engine.snapshot();
    after.persist(&workspace.root, &outcome.summary)?;

    let mut written: Vec<String> = outcome
        .summary
        .files_touched
        .iter()
        .map(|f| outcome.summary.final_path(f).to_string())
        .collect();
    for rename in &outcome.summary.renames_performed {
        if !written.contains(&rename.new_path) {
            written.push(rename.new_path.clone());
        }
    }
    written.sort();
    info!(files = written.len(), "wrote rename to disk");

    let edits = outcome.plan.output_edits(|f| before.get(f));
    Ok(RenameResponse::new(info, outcome.decision, &outcome.plan, edits).with_files_written(written))
}

/// List the references of the symbol at `at`.
pub fn run_refs(workspace: &Workspace, at: &str) -> Result<RefsResponse, CliError> {
    let symbol = workspace.symbol_at(at)?;
    let info = workspace.symbol_info(&symbol)?;
    let references = workspace.engine.read(|ctx| {
        ctx.facts
            .references_of(symbol.symbol_id)
            .iter()
            .filter_map(|reference| {
                let path = ctx.facts.file_path(reference.file_id)?;
                let content = ctx.buffers.get(path)?;
                Some(ReferenceInfo::from_reference(reference, path, content))
            })
            .collect::<Vec<_>>()
    });
    Ok(RefsResponse::new(info, references))
}

/// Human-readable rendering of a rename response.
pub fn format_rename_text(response: &RenameResponse) -> String {
    let mut out = String::new();
    let summary = &response.summary;
    if response.dry_run {
        out.push_str(&format!(
            "Dry run: would rename {} '{}' to '{}'\n",
            response.symbol.kind, response.symbol.name, response.new_name
        ));
        out.push_str(&format!(
            "  {} file(s) would be affected, {} edit(s), {} file rename(s)\n",
            summary.files_changed, summary.edits_count, summary.renames_count
        ));
        if let Decision::AllowWithConfirmation(reason) = &response.decision {
            out.push_str(&format!("  Needs confirmation: {}\n", reason));
        }
        if let Some(diff) = &response.unified_diff {
            out.push('\n');
            out.push_str(diff);
        }
    } else {
        out.push_str(&format!(
            "Renamed {} '{}' to '{}'\n",
            response.symbol.kind, response.symbol.name, response.new_name
        ));
        out.push_str(&format!(
            "  {} file(s) modified, {} edit(s) applied\n",
            summary.files_changed, summary.edits_count
        ));
        for rename in &response.file_renames {
            out.push_str(&format!("  moved {}\n", rename));
        }
    }
    out
}

// ============================================================================
// Confirmation
// ============================================================================

/// Asks on `output` and reads a yes/no answer from `input`.
///
/// Anything other than `y` or `yes` (case-insensitive) declines, including
/// end of input.
pub struct PromptConfirmation<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirmation<R, W> {
    pub fn new(input: R, output: W) -> Self {
        PromptConfirmation { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmationHandler for PromptConfirmation<R, W> {
    fn confirm(&mut self, reason: &ConfirmationReason) -> bool {
        if writeln!(self.output, "{}", reason)
            .and_then(|_| write!(self.output, "Proceed? [y/N] "))
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
