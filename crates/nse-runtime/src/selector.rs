//! Selector (C3, `spec.md` §4.2): resolves a user rule list against the
//! Script Index into an ordered list of loaded `Script`s.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use orion_error::prelude::*;

use nse_config::{is_reserved, reject_reserved, ALL_RULE};
use nse_lang::{load_index, load_script, ScriptIndex, ScriptRef};

use crate::error::{RuntimeReason, RuntimeResult};
use crate::host_api::{FetchKind, HostApi};

/// One entry of the canonical rule table (`spec.md` §4.2 step 4, §9
/// "Dynamic rule table"): keyed by `lower(token)`, remembering the
/// user's original casing and whether it has been satisfied.
struct RuleEntry {
    original: String,
    loaded: bool,
}

/// Resolve `user_rules` into the ordered list of `Script`s to run this
/// scan (`spec.md` §4.2).
#[tracing::instrument(name = "selector.select", skip_all, fields(rules = user_rules.len()))]
pub fn select(user_rules: &[String], api: &dyn HostApi) -> RuntimeResult<Vec<ScriptRef>> {
    // Step 1: reserved check.
    reject_reserved(user_rules).owe(RuntimeReason::Select)?;

    // Step 2/3: inject "default" when empty + default mode, append
    // scanner-internal reserved rules (e.g. "version").
    let mut rules: Vec<String> = user_rules.to_vec();
    if rules.is_empty() && api.default_mode() {
        rules.push("default".to_string());
    }
    if api.scriptversion() {
        rules.push("version".to_string());
    }

    // Step 4: canonical rule table, lower(token) -> (original, loaded).
    let mut table: HashMap<String, RuleEntry> = HashMap::new();
    for r in &rules {
        table
            .entry(r.to_ascii_lowercase())
            .or_insert_with(|| RuleEntry {
                original: r.clone(),
                loaded: false,
            });
    }
    let wants_all = table.contains_key(ALL_RULE);

    // Step 5: index-driven loading.
    let index = load_index_with_rebuild(api)?;
    let mut loaded_paths: HashSet<PathBuf> = HashSet::new();
    let mut scripts: Vec<ScriptRef> = Vec::new();

    for entry in &index.entries {
        let cat_key = entry.category.to_ascii_lowercase();
        let matched_by_category = table.contains_key(&cat_key);
        let matched_by_all = wants_all && !is_reserved(&entry.category);
        if !matched_by_category && !matched_by_all {
            continue;
        }
        let fetched = api.fetchfile_absolute(&entry.filename);
        if fetched.kind != FetchKind::File {
            continue;
        }
        if matched_by_category {
            table.get_mut(&cat_key).unwrap().loaded = true;
        }
        if !loaded_paths.insert(fetched.absolute_path.clone()) {
            continue;
        }
        let script = load_script(&fetched.absolute_path).owe(RuntimeReason::Select)?;
        scripts.push(script);
    }

    // Step 6: by-name loading for every rule not yet satisfied.
    // Iterate in the order rules were first supplied so output is
    // deterministic for a deterministic input.
    let mut seen_keys: HashSet<String> = HashSet::new();
    for r in &rules {
        let key = r.to_ascii_lowercase();
        if !seen_keys.insert(key.clone()) {
            continue;
        }
        if key == ALL_RULE {
            continue;
        }
        if table.get(&key).map(|e| e.loaded).unwrap_or(false) {
            continue;
        }
        load_by_name(api, r, &mut loaded_paths, &mut scripts)?;
    }

    Ok(scripts)
}

fn load_by_name(
    api: &dyn HostApi,
    rule: &str,
    loaded_paths: &mut HashSet<PathBuf>,
    scripts: &mut Vec<ScriptRef>,
) -> RuntimeResult<()> {
    let direct = api.fetchfile_absolute(rule);
    match direct.kind {
        FetchKind::File => {
            load_one(api, &direct.absolute_path, loaded_paths, scripts)?;
            return Ok(());
        }
        FetchKind::Directory => {
            load_directory(api, &direct.absolute_path, loaded_paths, scripts)?;
            return Ok(());
        }
        FetchKind::Nil => {}
    }

    let with_ext = format!("{rule}.nse");
    let fetched = api.fetchfile_absolute(&with_ext);
    match fetched.kind {
        FetchKind::File => {
            load_one(api, &fetched.absolute_path, loaded_paths, scripts)?;
            Ok(())
        }
        FetchKind::Directory => {
            load_directory(api, &fetched.absolute_path, loaded_paths, scripts)?;
            Ok(())
        }
        FetchKind::Nil => no_such_rule(rule),
    }
}

fn load_directory(
    api: &dyn HostApi,
    dir: &Path,
    loaded_paths: &mut HashSet<PathBuf>,
    scripts: &mut Vec<ScriptRef>,
) -> RuntimeResult<()> {
    let files = api
        .dump_dir(dir)
        .map_err(|e| {
            orion_error::StructError::from(RuntimeReason::Select)
                .with_detail(format!("reading directory {}: {e}", dir.display()))
        })?;
    for file in files {
        load_one(api, &file, loaded_paths, scripts)?;
    }
    Ok(())
}

fn load_one(
    _api: &dyn HostApi,
    path: &Path,
    loaded_paths: &mut HashSet<PathBuf>,
    scripts: &mut Vec<ScriptRef>,
) -> RuntimeResult<()> {
    if !loaded_paths.insert(path.to_path_buf()) {
        return Ok(());
    }
    let script = load_script(path).owe(RuntimeReason::Select)?;
    scripts.push(script);
    Ok(())
}

fn no_such_rule<T>(rule: &str) -> RuntimeResult<T> {
    orion_error::StructError::from(RuntimeReason::Select)
        .with_detail(format!("No such category, filename or directory: {rule}"))
        .err()
}

/// Load the script index, attempting one rebuild-and-retry on failure
/// (`spec.md` §4.2 "Error conditions": "attempt an index rebuild once,
/// then retry; if still missing, fatal").
fn load_index_with_rebuild(api: &dyn HostApi) -> RuntimeResult<ScriptIndex> {
    match load_index(api.script_dbpath()) {
        Ok(idx) => Ok(idx),
        Err(_) => {
            if api.updatedb() {
                load_index(api.script_dbpath()).owe(RuntimeReason::Index)
            } else {
                index_missing()
            }
        }
    }
}

fn index_missing() -> RuntimeResult<ScriptIndex> {
    orion_error::StructError::from(RuntimeReason::Index)
        .with_detail("script index missing or corrupt and rebuild failed")
        .err()
}
