//! Naming-convention policy: derived file names and class-name conventions.
//!
//! Components, modules and pipes live in files named
//! `<stem>.<segment>.<ext>`, where the stem is the symbol name without its
//! kind suffix written in the configured [`FileNameStyle`]:
//!
//! | Symbol | Style | Declaring file |
//! |--------|-------|----------------|
//! | `FooBarComponent` | kebab | `foo-bar.component.ts` |
//! | `FooBarComponent` | pascal | `FooBar.component.ts` |
//! | `AppModule` | snake | `app.module.ts` |
//! | pipe `shortDate` | kebab | `short-date.pipe.ts` |

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};

use ngrename_core::facts::SymbolKind;
use ngrename_core::patch::FileRename;
use ngrename_core::workspace::{file_name, join_path, parent_dir};

/// How the stem of a derived file name is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNameStyle {
    /// `foo-bar`
    #[default]
    Kebab,
    /// `FooBar`
    Pascal,
    /// `fooBar`
    Camel,
    /// `foo_bar`
    Snake,
}

impl FileNameStyle {
    pub const ALL: [FileNameStyle; 4] = [
        FileNameStyle::Kebab,
        FileNameStyle::Pascal,
        FileNameStyle::Camel,
        FileNameStyle::Snake,
    ];

    /// Write `stem` in this style.
    pub fn apply(&self, stem: &str) -> String {
        match self {
            FileNameStyle::Kebab => stem.to_kebab_case(),
            FileNameStyle::Pascal => stem.to_upper_camel_case(),
            FileNameStyle::Camel => stem.to_lower_camel_case(),
            FileNameStyle::Snake => stem.to_snake_case(),
        }
    }
}

/// Naming rules applied by the validator and the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingPolicy {
    pub file_name_style: FileNameStyle,
    /// Components and modules must end in `Component` / `Module`.
    pub require_kind_suffix: bool,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        NamingPolicy {
            file_name_style: FileNameStyle::Kebab,
            require_kind_suffix: true,
        }
    }
}

/// File-name segment for kinds with derived file names.
pub fn kind_segment(kind: SymbolKind) -> Option<&'static str> {
    match kind {
        SymbolKind::Component => Some("component"),
        SymbolKind::Module => Some("module"),
        SymbolKind::Pipe => Some("pipe"),
        SymbolKind::Field | SymbolKind::TemplateLocal => None,
    }
}

/// Class-name suffix conventionally carried by a kind.
pub fn kind_suffix(kind: SymbolKind) -> Option<&'static str> {
    match kind {
        SymbolKind::Component => Some("Component"),
        SymbolKind::Module => Some("Module"),
        _ => None,
    }
}

/// Stem of a symbol name: the name without its kind suffix.
///
/// Returns `None` when nothing is left.
pub fn name_stem(kind: SymbolKind, name: &str) -> Option<&str> {
    let stem = kind_suffix(kind)
        .and_then(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

impl NamingPolicy {
    /// Derived declaring-file name for a symbol, e.g. `foo-bar.component.ts`.
    pub fn derived_file_name(&self, kind: SymbolKind, name: &str) -> Option<String> {
        let segment = kind_segment(kind)?;
        let stem = name_stem(kind, name)?;
        Some(format!("{}.{}.ts", self.file_name_style.apply(stem), segment))
    }

    /// File renames implied by renaming `old_name` to `new_name`.
    ///
    /// Only applies when the declaring file is named after `old_name` (in any
    /// style). Every file in the same directory sharing its `<stem>.<segment>.`
    /// prefix moves along. `paths` is every file in the workspace.
    pub fn derived_renames<'a, I>(
        &self,
        kind: SymbolKind,
        decl_path: &str,
        old_name: &str,
        new_name: &str,
        paths: I,
    ) -> Vec<FileRename>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(segment) = kind_segment(kind) else {
            return Vec::new();
        };
        let (Some(old_stem), Some(new_stem)) =
            (name_stem(kind, old_name), name_stem(kind, new_name))
        else {
            return Vec::new();
        };

        let decl_name = file_name(decl_path);
        let Some(old_prefix) = FileNameStyle::ALL
            .iter()
            .map(|style| format!("{}.{}.", style.apply(old_stem), segment))
            .find(|prefix| decl_name.strip_prefix(prefix.as_str()) == Some("ts"))
        else {
            return Vec::new();
        };
        let new_prefix = format!("{}.{}.", self.file_name_style.apply(new_stem), segment);
        if old_prefix == new_prefix {
            return Vec::new();
        }

        let dir = parent_dir(decl_path);
        let mut renames: Vec<FileRename> = paths
            .into_iter()
            .filter(|path| parent_dir(path) == dir)
            .filter_map(|path| {
                let rest = file_name(path).strip_prefix(old_prefix.as_str())?;
                let new_path = join_path(dir, &format!("{}{}", new_prefix, rest));
                Some(FileRename::new(path, new_path))
            })
            .collect();
        renames.sort();
        renames
    }

    /// Describe how `name` breaks the naming convention for `kind`, if it does.
    pub fn convention_violation(&self, kind: SymbolKind, name: &str) -> Option<String> {
        match kind {
            SymbolKind::Component | SymbolKind::Module => {
                let starts_upper = name.chars().next().is_some_and(|c| c.is_uppercase());
                if !starts_upper || name.contains('_') || name.contains('$') {
                    return Some(format!("'{}' is not PascalCase", name));
                }
                let suffix = kind_suffix(kind)?;
                if self.require_kind_suffix && name_stem(kind, name).map_or(true, |s| s == name) {
                    return Some(format!(
                        "'{}' should be a non-empty name followed by '{}'",
                        name, suffix
                    ));
                }
                None
            }
            SymbolKind::Pipe => {
                let starts_lower = name.chars().next().is_some_and(|c| c.is_lowercase());
                if !starts_lower || name.contains('_') || name.contains('$') {
                    return Some(format!("pipe name '{}' is not camelCase", name));
                }
                None
            }
            SymbolKind::Field | SymbolKind::TemplateLocal => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod style_tests {
        use super::*;

        #[test]
        fn styles_write_stems() {
            assert_eq!(FileNameStyle::Kebab.apply("FooBar"), "foo-bar");
            assert_eq!(FileNameStyle::Pascal.apply("FooBar"), "FooBar");
            assert_eq!(FileNameStyle::Camel.apply("FooBar"), "fooBar");
            assert_eq!(FileNameStyle::Snake.apply("FooBar"), "foo_bar");
        }

        #[test]
        fn derived_file_names() {
            let policy = NamingPolicy::default();
            assert_eq!(
                policy.derived_file_name(SymbolKind::Component, "FooBarComponent"),
                Some("foo-bar.component.ts".to_string())
            );
            assert_eq!(
                policy.derived_file_name(SymbolKind::Pipe, "shortDate"),
                Some("short-date.pipe.ts".to_string())
            );
            assert_eq!(policy.derived_file_name(SymbolKind::Module, "Module"), None);
            assert_eq!(policy.derived_file_name(SymbolKind::Field, "title"), None);
        }
    }

    mod rename_tests {
        use super::*;

        const PATHS: &[&str] = &[
            "src/app/foo-bar.component.ts",
            "src/app/foo-bar.component.html",
            "src/app/foo-bar.component.spec.ts",
            "src/app/foo-bar.service.ts",
            "src/other/foo-bar.component.css",
        ];

        #[test]
        fn related_files_move_together() {
            let renames = NamingPolicy::default().derived_renames(
                SymbolKind::Component,
                "src/app/foo-bar.component.ts",
                "FooBarComponent",
                "NewNameComponent",
                PATHS.iter().copied(),
            );
            assert_eq!(
                renames,
                vec![
                    FileRename::new(
                        "src/app/foo-bar.component.html",
                        "src/app/new-name.component.html"
                    ),
                    FileRename::new(
                        "src/app/foo-bar.component.spec.ts",
                        "src/app/new-name.component.spec.ts"
                    ),
                    FileRename::new(
                        "src/app/foo-bar.component.ts",
                        "src/app/new-name.component.ts"
                    ),
                ]
            );
        }

        #[test]
        fn pascal_style_matches_kebab_files() {
            let policy = NamingPolicy {
                file_name_style: FileNameStyle::Pascal,
                require_kind_suffix: true,
            };
            let renames = policy.derived_renames(
                SymbolKind::Component,
                "src/app/foo-bar.component.ts",
                "FooBarComponent",
                "NewNameComponent",
                ["src/app/foo-bar.component.ts"],
            );
            assert_eq!(
                renames,
                vec![FileRename::new(
                    "src/app/foo-bar.component.ts",
                    "src/app/NewName.component.ts"
                )]
            );
        }

        #[test]
        fn unrelated_declaring_file_does_not_move() {
            let renames = NamingPolicy::default().derived_renames(
                SymbolKind::Component,
                "src/app/widgets.ts",
                "FooBarComponent",
                "NewNameComponent",
                ["src/app/widgets.ts"],
            );
            assert!(renames.is_empty());
        }

        #[test]
        fn empty_stem_does_not_move() {
            let renames = NamingPolicy::default().derived_renames(
                SymbolKind::Module,
                "src/foo.module.ts",
                "FooModule",
                "Module",
                ["src/foo.module.ts"],
            );
            assert!(renames.is_empty());
        }

        #[test]
        fn same_derived_name_does_not_move() {
            let renames = NamingPolicy::default().derived_renames(
                SymbolKind::Pipe,
                "src/foo.pipe.ts",
                "foo",
                "Foo",
                ["src/foo.pipe.ts"],
            );
            assert!(renames.is_empty());
        }
    }

    mod convention_tests {
        use super::*;

        #[test]
        fn component_suffix_required() {
            let policy = NamingPolicy::default();
            assert!(policy
                .convention_violation(SymbolKind::Component, "NewNameComponent")
                .is_none());
            assert!(policy
                .convention_violation(SymbolKind::Component, "NewNameSomething")
                .is_some());
            assert!(policy
                .convention_violation(SymbolKind::Module, "Module")
                .is_some());
            assert!(policy
                .convention_violation(SymbolKind::Component, "newNameComponent")
                .is_some());
        }

        #[test]
        fn suffix_optional_when_disabled() {
            let policy = NamingPolicy {
                require_kind_suffix: false,
                ..NamingPolicy::default()
            };
            assert!(policy
                .convention_violation(SymbolKind::Component, "NewNameSomething")
                .is_none());
        }

        #[test]
        fn pipes_are_camel_case() {
            let policy = NamingPolicy::default();
            assert!(policy.convention_violation(SymbolKind::Pipe, "bar").is_none());
            assert!(policy.convention_violation(SymbolKind::Pipe, "Bar").is_some());
            assert!(policy.convention_violation(SymbolKind::Field, "ANY_thing").is_none());
        }
    }
}
