use std::path::Path;
use std::process;

use andor_core::{AccessModel, Operation};

use crate::{report_error, OutputFormat};

/// Validate an access model file and print what it defines.
pub(crate) fn cmd_check(file: &Path, output: OutputFormat, quiet: bool) {
    let model = match AccessModel::load(file) {
        Ok(m) => m,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&model)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => print_model(&model),
    }
}

fn print_model(model: &AccessModel) {
    let workflow = model.workflow();
    println!(
        "Workflow '{}' (default state: {})",
        workflow.name(),
        workflow.default_state()
    );
    println!();
    println!("  States:");
    for state in workflow.states() {
        println!("    {:>4}  {}", state.index, state.name);
    }

    let registry = model.registry();
    println!();
    println!("  Roles:");
    for name in registry.role_names() {
        println!("    {}", name);
        let Some(role) = registry.role(name) else {
            continue;
        };
        for state in workflow.states() {
            if let Some(ops) = role.permissions.get(&state.name) {
                println!("      {}: {}", state.name, join_ops(ops.iter().copied()));
            }
        }
        for (from, to) in &role.transitions {
            println!("      may regress {} -> {}", from, to);
        }
    }
    println!();
    println!("Model is valid.");
}

pub(crate) fn join_ops(ops: impl Iterator<Item = Operation>) -> String {
    let names: Vec<&str> = ops.map(Operation::as_str).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
