//! Build pipeline sections: prepare, build, release, test.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{ManifestError, ManifestResult};
use crate::value::{field, str_field, str_field_or_empty, string_list, string_seq};

fn prepare_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("static pattern"))
}

/// Wrap each script line in its own subshell so it runs in an isolated
/// scope. Every stored script list holds lines in this form.
pub(crate) fn wrap_script(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().map(|line| format!("( {line} )")).collect()
}

/// The `prepare` sub-section of `build`: a versioned base-layer recipe.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrepareSpec {
    /// Cache version tag; bumping it invalidates the prepared layer.
    pub version: String,
    /// Subshell-wrapped script lines, cleanup fragment last.
    pub script: Vec<String>,
    /// Path globs retained across cache invalidation.
    pub keep: Vec<String>,
    /// Build-time arguments.
    pub build_arg: Vec<String>,
}

impl PrepareSpec {
    /// Load from either a bare script list or a full mapping with
    /// `version`, `script`, `keep`, and `build_arg`.
    pub fn load(meta: &Value) -> ManifestResult<Self> {
        let mut spec = match meta {
            Value::Sequence(_) => Self {
                version: "0".to_string(),
                script: wrap_script(string_seq(meta)),
                ..Self::default()
            },
            _ => {
                let version = field(meta, "version")
                    .and_then(crate::value::scalar_string)
                    .unwrap_or_else(|| "0".to_string())
                    .trim()
                    .to_string();
                if !prepare_version_pattern().is_match(&version) {
                    return Err(ManifestError::InvalidPrepareVersion(version));
                }
                Self {
                    version,
                    script: wrap_script(string_list(meta, "script")),
                    keep: string_list(meta, "keep"),
                    build_arg: string_list(meta, "build_arg"),
                }
            }
        };
        spec.script.push(spec.cleanup_fragment());
        Ok(spec)
    }

    /// Generated fragment that clears the prepared tree except kept globs.
    fn cleanup_fragment(&self) -> String {
        let keep_filter: String = self
            .keep
            .iter()
            .map(|glob| format!("| grep -v '\\b{glob}\\b' "))
            .collect();
        format!("( ls -1 {keep_filter}| xargs rm -rf )")
    }
}

/// The `build` section: base image plus prepare and build scripts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildSpec {
    pub base: String,
    pub script: Vec<String>,
    pub build_arg: Vec<String>,
    pub prepare: PrepareSpec,
}

impl BuildSpec {
    pub fn load(meta: &Value) -> ManifestResult<Self> {
        let base = str_field(meta, "base")
            .ok_or_else(|| ManifestError::MissingBuildSection("no base in section build".to_string()))?;
        let prepare = match field(meta, "prepare") {
            Some(prepare_meta) => PrepareSpec::load(prepare_meta)?,
            None => PrepareSpec::load(&Value::Mapping(Default::default()))?,
        };
        Ok(Self {
            base,
            script: wrap_script(string_list(meta, "script")),
            build_arg: string_list(meta, "build_arg"),
            prepare,
        })
    }
}

/// One artifact copy rule in the `release` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopyRule {
    pub src: String,
    pub dest: String,
}

/// The `release` section: destination image and artifact copy rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReleaseSpec {
    pub script: Vec<String>,
    pub dest_base: String,
    pub copy: Vec<CopyRule>,
}

impl ReleaseSpec {
    pub fn load(meta: &Value) -> ManifestResult<Self> {
        let mut copy = Vec::new();
        if let Some(rules) = field(meta, "copy").and_then(Value::as_sequence) {
            for rule in rules {
                match rule {
                    Value::String(src) => copy.push(CopyRule {
                        src: src.clone(),
                        dest: src.clone(),
                    }),
                    Value::Mapping(_) => {
                        if let Some(src) = str_field(rule, "src") {
                            let dest = str_field(rule, "dest").unwrap_or_else(|| src.clone());
                            copy.push(CopyRule { src, dest });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(Self {
            script: wrap_script(string_list(meta, "script")),
            dest_base: str_field_or_empty(meta, "dest_base"),
            copy,
        })
    }
}

/// The `test` section: test script lines.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestSpec {
    pub script: Vec<String>,
}

impl TestSpec {
    pub fn load(meta: &Value) -> ManifestResult<Self> {
        Ok(Self {
            script: wrap_script(string_list(meta, "script")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_build_requires_base() {
        let err = BuildSpec::load(&yaml("script: [make]")).unwrap_err();
        assert!(matches!(err, ManifestError::MissingBuildSection(_)));
    }

    #[test]
    fn test_build_wraps_script_lines() {
        let build = BuildSpec::load(&yaml("base: golang:1.21\nscript:\n  - make\n  - make install")).unwrap();
        assert_eq!(build.base, "golang:1.21");
        assert_eq!(build.script, vec!["( make )", "( make install )"]);
    }

    #[test]
    fn test_prepare_list_form() {
        let prepare = PrepareSpec::load(&yaml("- pip install -r req.txt")).unwrap();
        assert_eq!(prepare.version, "0");
        assert_eq!(
            prepare.script,
            vec!["( pip install -r req.txt )", "( ls -1 | xargs rm -rf )"]
        );
        assert!(prepare.keep.is_empty());
    }

    #[test]
    fn test_prepare_mapping_form_with_keep() {
        let prepare = PrepareSpec::load(&yaml(
            "version: 2\nscript: [apt-get update]\nkeep: [node_modules, vendor]",
        ))
        .unwrap();
        assert_eq!(prepare.version, "2");
        assert_eq!(prepare.script[0], "( apt-get update )");
        assert_eq!(
            prepare.script[1],
            "( ls -1 | grep -v '\\bnode_modules\\b' | grep -v '\\bvendor\\b' | xargs rm -rf )"
        );
    }

    #[test]
    fn test_prepare_rejects_bad_version() {
        let err = PrepareSpec::load(&yaml("version: 1.2-rc")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidPrepareVersion(_)));
    }

    #[test]
    fn test_release_copy_rules() {
        let release = ReleaseSpec::load(&yaml(
            "dest_base: ubuntu:22.04\ncopy:\n  - bin/app\n  - src: conf/app.conf\n    dest: /etc/app.conf\n  - 42",
        ))
        .unwrap();
        assert_eq!(release.dest_base, "ubuntu:22.04");
        assert_eq!(
            release.copy,
            vec![
                CopyRule { src: "bin/app".to_string(), dest: "bin/app".to_string() },
                CopyRule { src: "conf/app.conf".to_string(), dest: "/etc/app.conf".to_string() },
            ]
        );
    }

    #[test]
    fn test_test_section() {
        let test = TestSpec::load(&yaml("script: [go test ./...]")).unwrap();
        assert_eq!(test.script, vec!["( go test ./... )"]);
    }
}
