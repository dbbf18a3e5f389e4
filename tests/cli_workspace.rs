//! Workspace-level tests for the CLI front door.
//!
//! Each test writes a small Angular project into a temp directory, opens it
//! with [`Workspace::open`] and drives [`run_rename`] / [`run_refs`] against
//! the files on disk.
//!
//! ## Running These Tests
//!
//! ```bash
//! cargo nextest run -p ngrename --test cli_workspace
//! ```

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ngrename::angular::ConfirmationReason;
use ngrename::cli::{run_refs, run_rename, RenameRequest, Workspace};
use ngrename::error::CliError;
use ngrename::facts::ReferenceKind;

const COMPONENT: &str = r#"import { Component } from '@angular/core';

// FooBarComponent shows the title
@Component({
  selector: 'app-foo-bar',
  templateUrl: './foo-bar.component.html',
  styleUrls: ['./foo-bar.component.css'],
})
export class FooBarComponent {
  title = 'Hello';
}
"#;

const TEMPLATE: &str = "<h1>{{ title }}</h1>\n";
const STYLES: &str = "h1 { margin: 0; }\n";

const MODULE: &str = r#"import { NgModule } from '@angular/core';
import { FooBarComponent } from './foo-bar.component';

@NgModule({ declarations: [FooBarComponent] })
export class AppModule {}
"#;

/// Write `files` under a fresh temp directory.
fn setup_workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().expect("has parent")).expect("create dirs");
        fs::write(full, content).expect("write file");
    }
    dir
}

fn project() -> TempDir {
    setup_workspace(&[
        ("src/app/foo-bar.component.ts", COMPONENT),
        ("src/app/foo-bar.component.html", TEMPLATE),
        ("src/app/foo-bar.component.css", STYLES),
        ("src/app/app.module.ts", MODULE),
        // Always excluded; would fail strict analysis if loaded.
        ("node_modules/pkg/broken.html", "<!-- never closed"),
    ])
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap_or_else(|e| panic!("{}: {}", path, e))
}

fn request<'a>(at: &'a str, to: &'a str) -> RenameRequest<'a> {
    RenameRequest {
        at,
        to,
        search: None,
        dry_run: false,
    }
}

fn yes(_: &ConfirmationReason) -> bool {
    true
}

fn no(_: &ConfirmationReason) -> bool {
    false
}

// ============================================================================
// Rename
// ============================================================================

mod rename {
    use super::*;

    #[test]
    fn field_rename_writes_files() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let response = run_rename(
            &workspace,
            &request("src/app/foo-bar.component.html:1:8", "heading"),
            &mut yes,
        )
        .unwrap();

        assert!(!response.dry_run);
        assert_eq!(response.symbol.kind, "field");
        assert_eq!(
            response.files_written,
            Some(vec![
                "src/app/foo-bar.component.html".to_string(),
                "src/app/foo-bar.component.ts".to_string(),
            ])
        );
        assert_eq!(read(dir.path(), "src/app/foo-bar.component.html"), "<h1>{{ heading }}</h1>\n");
        let component = read(dir.path(), "src/app/foo-bar.component.ts");
        assert!(component.contains("  heading = 'Hello';"));
        assert!(component.contains("// FooBarComponent shows the heading"));
    }

    #[test]
    fn no_search_text_leaves_comments() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        let mut req = request("src/app/foo-bar.component.ts:10:3", "heading");
        req.search = Some(false);

        run_rename(&workspace, &req, &mut yes).unwrap();
        assert!(read(dir.path(), "src/app/foo-bar.component.ts")
            .contains("// FooBarComponent shows the title"));
    }

    #[test]
    fn component_rename_moves_files_on_disk() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let response = run_rename(
            &workspace,
            &request("src/app/foo-bar.component.ts:9:14", "NewNameComponent"),
            &mut yes,
        )
        .unwrap();
        assert_eq!(response.file_renames.len(), 3);

        let app = dir.path().join("src/app");
        for old in ["foo-bar.component.ts", "foo-bar.component.html", "foo-bar.component.css"] {
            assert!(!app.join(old).exists(), "{old} should have moved");
        }
        assert_eq!(read(dir.path(), "src/app/new-name.component.css"), STYLES);
        assert_eq!(read(dir.path(), "src/app/new-name.component.html"), TEMPLATE);
        let component = read(dir.path(), "src/app/new-name.component.ts");
        assert!(component.contains("templateUrl: './new-name.component.html'"));
        assert!(component.contains("styleUrls: ['./new-name.component.css']"));
        assert!(component.contains("export class NewNameComponent {"));
        assert!(read(dir.path(), "src/app/app.module.ts")
            .contains("import { NewNameComponent } from './new-name.component';"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        let mut req = request("src/app/foo-bar.component.ts:9:14", "NewNameComponent");
        req.dry_run = true;

        // A dry run never asks.
        let response = run_rename(&workspace, &req, &mut no).unwrap();

        assert!(response.dry_run);
        assert_eq!(response.decision.as_str(), "allow_with_confirmation");
        let diff = response.unified_diff.unwrap();
        assert!(diff.contains("rename from src/app/foo-bar.component.ts"));
        assert!(diff.contains("rename to src/app/new-name.component.ts"));
        assert_eq!(read(dir.path(), "src/app/foo-bar.component.ts"), COMPONENT);
        assert!(!dir.path().join("src/app/new-name.component.ts").exists());
    }

    #[test]
    fn declined_rename_changes_nothing() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let err = run_rename(
            &workspace,
            &request("src/app/foo-bar.component.ts:9:14", "NewNameComponent"),
            &mut no,
        )
        .unwrap_err();

        assert_eq!(err.error_code().code(), 5);
        assert_eq!(read(dir.path(), "src/app/foo-bar.component.ts"), COMPONENT);
        assert_eq!(read(dir.path(), "src/app/app.module.ts"), MODULE);
    }

    #[test]
    fn bad_inputs_map_to_exit_codes() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let cases = [
            ("src/app/foo-bar.component.ts", "heading", 2),
            ("src/app/foo-bar.component.ts:10:3", "1heading", 2),
            ("src/app/foo-bar.component.ts:2:1", "heading", 3),
            ("src/app/missing.ts:1:1", "heading", 3),
            ("src/app/foo-bar.component.ts:9:14", "AppModule", 5),
        ];
        for (at, to, code) in cases {
            let err = run_rename(&workspace, &request(at, to), &mut yes).unwrap_err();
            assert_eq!(err.error_code().code(), code, "{at} -> {to}: {err}");
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config {
    use super::*;

    #[test]
    fn pascal_style_from_config_file() {
        let dir = project();
        fs::write(
            dir.path().join(".ngrename.toml"),
            "[naming]\nfile_name_style = \"pascal\"\n",
        )
        .unwrap();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        run_rename(
            &workspace,
            &request("src/app/foo-bar.component.ts:9:14", "NewNameComponent"),
            &mut yes,
        )
        .unwrap();
        assert!(dir.path().join("src/app/NewName.component.ts").exists());
        assert!(dir.path().join("src/app/NewName.component.html").exists());
    }

    #[test]
    fn excluded_paths_are_not_analyzed() {
        let dir = project();
        fs::create_dir_all(dir.path().join("src/legacy")).unwrap();
        fs::write(dir.path().join("src/legacy/old.html"), "<div class=\"x").unwrap();
        assert!(Workspace::open(dir.path(), None).is_err());

        let config = dir.path().join("custom.toml");
        fs::write(&config, "[workspace]\nexclude = [\"src/legacy/**\"]\n").unwrap();
        assert!(Workspace::open(dir.path(), Some(&config)).is_ok());
    }

    #[test]
    fn malformed_config_is_invalid_arguments() {
        let dir = project();
        fs::write(dir.path().join(".ngrename.toml"), "[naming\n").unwrap();
        let err = Workspace::open(dir.path(), None).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.error_code().code(), 2);
    }
}

// ============================================================================
// References
// ============================================================================

mod refs {
    use super::*;

    #[test]
    fn lists_structural_and_textual_references() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();

        let response = run_refs(&workspace, "src/app/foo-bar.component.ts:10:3").unwrap();
        assert_eq!(response.symbol.name, "title");

        let structural: Vec<_> = response
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Structural)
            .collect();
        assert_eq!(structural.len(), 2);
        assert_eq!(structural[0].location.file, "src/app/foo-bar.component.html");
        assert_eq!((structural[0].location.line, structural[0].location.col), (1, 8));
        assert!(structural[1].declaration);

        assert!(response
            .references
            .iter()
            .any(|r| r.kind == ReferenceKind::Textual && r.location.line == 3));
    }

    #[test]
    fn absolute_paths_are_made_relative() {
        let dir = project();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        let at = format!(
            "{}:1:8",
            dir.path().join("src/app/foo-bar.component.html").display()
        );
        let response = run_refs(&workspace, &at).unwrap();
        assert_eq!(response.symbol.name, "title");
    }
}
