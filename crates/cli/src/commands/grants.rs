use std::path::Path;
use std::process;

use andor_core::{AccessModel, UserDirectory};

use super::check::join_ops;
use crate::{report_error, OutputFormat};

/// Print the operations a user holds at every state.
pub(crate) fn cmd_grants(
    model_path: &Path,
    users_path: &Path,
    username: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let model = match AccessModel::load(model_path) {
        Ok(m) => m,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let users = match UserDirectory::load(users_path, &model) {
        Ok(u) => u,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let Some(identity) = users.resolve(username) else {
        report_error(&format!("unknown user '{}'", username), output, quiet);
        process::exit(1);
    };

    let grants = model.grants_by_state(&identity.roles);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let states: Vec<serde_json::Value> = grants
                .iter()
                .map(|(index, g)| {
                    serde_json::json!({
                        "state": g.state,
                        "index": index,
                        "operations": g.operations,
                    })
                })
                .collect();
            let response = serde_json::json!({
                "user": identity.username,
                "roles": identity.roles,
                "grants": states,
            });
            let json = serde_json::to_string_pretty(&response)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            let roles: Vec<&str> = identity.roles.iter().map(String::as_str).collect();
            println!("{} ({})", identity.username, roles.join(", "));
            for (index, g) in &grants {
                println!(
                    "  {:>4}  {:<16} {}",
                    index,
                    g.state,
                    join_ops(g.operations.iter().copied())
                );
            }
        }
    }
}
