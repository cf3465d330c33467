//! Script Loader (C2, `spec.md` §4.1).

use std::collections::HashSet;
use std::path::Path;

use orion_error::prelude::*;

use crate::ast::Field;
use crate::error::{LoadReason, LoadResult};
use crate::parser::parse_script_fields;
use crate::script::{Script, ScriptRef};

/// Parse one script file and validate it into a [`Script`] descriptor.
///
/// `path` must already be absolute (callers — the Selector, §4.2 — are
/// responsible for path resolution; the loader only reads and validates).
#[tracing::instrument(name = "script.load", skip_all, fields(path = %path.display()))]
pub fn load_script(path: &Path) -> LoadResult<ScriptRef> {
    if path.extension().and_then(|e| e.to_str()) != Some("nse") {
        tracing::warn!(domain = "sel", path = %path.display(), "script file does not use .nse extension");
    }

    let source = std::fs::read_to_string(path)
        .owe(LoadReason::Parse)
        .position(path.display().to_string())?;

    let fields = parse_script_fields(&source)
        .owe(LoadReason::Parse)
        .position(path.display().to_string())?;

    build_script(path, fields).position(path.display().to_string())
}

fn build_script(path: &Path, fields: Vec<Field>) -> LoadResult<ScriptRef> {
    let mut seen = HashSet::new();
    let mut description = None;
    let mut author = None;
    let mut license = None;
    let mut categories: Option<Vec<String>> = None;
    let mut runlevel_decl: Option<f64> = None;
    let mut hostrule = None;
    let mut portrule = None;
    let mut action = None;

    for field in fields {
        let key = match &field {
            Field::Description(_) => "description",
            Field::Author(_) => "author",
            Field::License(_) => "license",
            Field::Categories(_) => "categories",
            Field::Runlevel(_) => "runlevel",
            Field::HostRule(_) => "hostrule",
            Field::PortRule(_) => "portrule",
            Field::Action(_) => "action",
        };
        if !seen.insert(key) {
            return fail(format!("duplicate field '{key}'"));
        }
        match field {
            Field::Description(v) => description = Some(v),
            Field::Author(v) => author = Some(v),
            Field::License(v) => license = Some(v),
            Field::Categories(v) => categories = Some(v),
            Field::Runlevel(v) => runlevel_decl = Some(v),
            Field::HostRule(v) => hostrule = Some(v),
            Field::PortRule(v) => portrule = Some(v),
            Field::Action(v) => action = Some(v),
        }
    }

    // description is required at load time (spec.md §3).
    let description = match description {
        Some(d) if !d.is_empty() => d,
        Some(_) => return fail("'description' must not be empty"),
        None => return fail("missing required field 'description'"),
    };

    // categories must be a non-empty sequence of strings (spec.md §3).
    let categories = match categories {
        Some(c) if !c.is_empty() => {
            if let Some(bad) = c.iter().find(|s| s.trim().is_empty()) {
                return fail(format!("empty category entry {bad:?}"));
            }
            c
        }
        Some(_) => return fail("'categories' must not be empty"),
        None => return fail("missing required field 'categories'"),
    };

    // action must be present (it plays the role of the "callable" action
    // function in spec.md §3 — our action is always a valid expression
    // once parsed, so presence is the only check needed here).
    let action = action.ok_or_else(|| "missing required field 'action'".to_string());
    let action = match action {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    // At least one applicability predicate must be present (spec.md §3).
    if hostrule.is_none() && portrule.is_none() {
        return fail("script declares neither 'hostrule' nor 'portrule'");
    }

    // A hostrule referencing port.* fields is a contradiction: there is
    // no port record when a host-kind task evaluates it.
    if let Some(expr) = &hostrule {
        if expr.references_port() {
            return fail("'hostrule' must not reference port.* fields");
        }
    }

    // `action` is shared between a script's host-kind and port-kind tasks
    // (there is only one `action` field). A host-kind task is built
    // whenever `hostrule` is present, even alongside a `portrule`, and
    // evaluates this same `action` with no port in context — so a
    // port.*-referencing action is rejected here too, not just in
    // `hostrule` itself.
    if hostrule.is_some() && action.references_port() {
        return fail("'action' must not reference port.* fields when the script declares a 'hostrule'");
    }

    let runlevel = nse_core::Runlevel::from_declared(runlevel_decl);

    let basename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let short_basename = basename
        .strip_suffix(".nse")
        .unwrap_or(&basename)
        .to_string();
    let id = short_basename.clone();

    Ok(std::sync::Arc::new(Script {
        filename: path.to_path_buf(),
        basename,
        short_basename,
        id,
        categories,
        author,
        license,
        description,
        runlevel,
        hostrule,
        portrule,
        action,
    }))
}

fn fail<T>(detail: impl Into<String>) -> LoadResult<T> {
    Err(orion_error::StructError::from(LoadReason::Validation).with_detail(detail.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_valid_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "telnet-banner.nse",
            r#"
            description = "detects telnet"
            categories = ["discovery", "safe"]
            portrule = port.number == 23 and port.protocol == "tcp"
            action = "telnet on " ++ str(port.number)
            "#,
        );
        let script = load_script(&path).unwrap();
        assert_eq!(script.id, "telnet-banner");
        assert_eq!(script.categories, vec!["discovery", "safe"]);
        assert!(script.has_portrule());
        assert!(!script.has_hostrule());
        assert_eq!(script.runlevel, nse_core::Runlevel(1));
    }

    #[test]
    fn rejects_missing_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "bad.nse",
            r#"
            categories = ["discovery"]
            portrule = port.number == 80
            action = "x"
            "#,
        );
        assert!(load_script(&path).is_err());
    }

    #[test]
    fn rejects_missing_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "bad.nse",
            r#"
            description = "x"
            categories = ["discovery"]
            action = "x"
            "#,
        );
        assert!(load_script(&path).is_err());
    }

    #[test]
    fn rejects_hostrule_referencing_port_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "bad.nse",
            r#"
            description = "x"
            categories = ["discovery"]
            hostrule = port.number == 80
            action = "x"
            "#,
        );
        assert!(load_script(&path).is_err());
    }

    #[test]
    fn rejects_action_referencing_port_fields_when_hostrule_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "bad.nse",
            r#"
            description = "x"
            categories = ["discovery"]
            hostrule = host.address == "10.0.0.1"
            action = "port " ++ str(port.number)
            "#,
        );
        assert!(load_script(&path).is_err());
    }

    #[test]
    fn allows_action_referencing_port_fields_when_only_portrule_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "ok.nse",
            r#"
            description = "x"
            categories = ["discovery"]
            portrule = port.number == 80
            action = "port " ++ str(port.number)
            "#,
        );
        assert!(load_script(&path).is_ok());
    }

    #[test]
    fn warns_but_succeeds_without_nse_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            "telnet-banner.txt",
            r#"
            description = "detects telnet"
            categories = ["discovery"]
            portrule = port.number == 23
            action = "hit"
            "#,
        );
        assert!(load_script(&path).is_ok());
    }
}
